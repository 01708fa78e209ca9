//! The interface a host debugger uses to drive a DSP5680xx core.

mod clock;

pub use clock::{Clock, ManualClock, SystemClock, Watchdog};

use crate::architecture::dsp5680xx::TargetState;
use crate::error::Error;

/// Order of the two bytes of a 16 bit memory word in byte buffers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Low byte first, the host's view of word and double word data.
    #[default]
    LittleEndian,
    /// High byte first.
    BigEndian,
}

impl ByteOrder {
    pub fn split(self, word: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => word.to_le_bytes(),
            ByteOrder::BigEndian => word.to_be_bytes(),
        }
    }

    pub fn join(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        }
    }

    /// Replace the byte at the start of a buffer in `word`, keeping the other one.
    pub fn merge_first(self, word: u16, byte: u8) -> u16 {
        let mut bytes = self.split(word);
        bytes[0] = byte;
        self.join(bytes)
    }
}

/// Optional operations a driver supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Single instruction stepping.
    pub step: bool,
    /// Bulk block memory transfer.
    pub bulk_write: bool,
    /// Checksum of a memory range computed on the target.
    pub checksum: bool,
    /// Flash erase and programming.
    pub flash: bool,
}

/// A generic interface to control a core.
pub trait CoreInterface {
    /// Read the state of the core from the debug port and update the session.
    fn poll(&mut self) -> Result<TargetState, Error>;

    /// The state recorded by the last operation, without touching the target.
    fn status(&self) -> TargetState;

    fn halt(&mut self) -> Result<(), Error>;

    /// Let the core run, from `address` if given or from where it stopped otherwise.
    fn resume(&mut self, address: Option<u32>) -> Result<(), Error>;

    fn step(&mut self) -> Result<(), Error>;

    /// Read `count` elements of `size` bytes.
    fn read_memory(&mut self, address: u32, size: u32, count: usize) -> Result<Vec<u8>, Error>;

    /// Write `count` elements of `size` bytes taken from `data`.
    fn write_memory(
        &mut self,
        address: u32,
        size: u32,
        count: usize,
        data: &[u8],
    ) -> Result<(), Error>;

    fn read_buffer(&mut self, address: u32, len: usize) -> Result<Vec<u8>, Error> {
        self.read_memory(address, 1, len)
    }

    fn write_buffer(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        self.write_memory(address, 1, data.len(), data)
    }

    fn bulk_write(&mut self, address: u32, data: &[u32]) -> Result<(), Error>;

    fn assert_reset(&mut self) -> Result<(), Error>;

    fn deassert_reset(&mut self) -> Result<(), Error>;

    /// Halt the core and reset the peripherals, where the variant supports it.
    fn soft_reset_halt(&mut self) -> Result<(), Error>;

    fn checksum_memory(&mut self, address: u32, count: u32) -> Result<u32, Error>;

    fn capabilities(&self) -> Capabilities;
}
