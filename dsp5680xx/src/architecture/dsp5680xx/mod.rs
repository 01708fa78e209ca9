//! Debug support for the 56800E core of the DSP5680xx family.

pub mod address;
pub mod communication_interface;
pub mod instruction;
pub mod once;
pub mod state;

use std::sync::Arc;

use dsp5680xx_target::Chip;

pub use address::{Address, MemorySpace};
pub use communication_interface::Dsp5680xxCommunicationInterface;
pub use state::{poll_action, PollAction, TargetState};

use crate::core::{ByteOrder, Capabilities, Clock, CoreInterface, SystemClock, Watchdog};
use crate::flashing::Flasher;
use crate::probe::{DebugProbeError, JtagAccess};
use crate::Error;
use once::{CoreMode, JtagStatus, OnceStatus};

/// SIM control register value that resets the peripherals.
const SIM_CMD_RESET: u16 = 0x10;

/// An error that occurred while controlling a DSP5680xx core.
#[derive(thiserror::Error, Debug)]
pub enum Dsp5680xxError {
    #[error("An error with the usage of the probe occurred")]
    DebugProbe(#[from] DebugProbeError),
    #[error("The core did not enter debug mode (EOnCE status {0:#04x}), the flash may be secured")]
    DebugModeNotEntered(u8),
    #[error("The JTAG status reads as all ones, check the connection to the target")]
    TargetDead,
    #[error("The target state is unknown and the JTAG status is {0:?}")]
    CommunicationFailure(JtagStatus),
    #[error("JTAG reports the core running but EOnCE reports {0:?}")]
    InconsistentState(CoreMode),
    #[error("The core did not leave debug mode after {0} attempts")]
    ResumeFailed(u32),
    #[error("Operation timed out")]
    Timeout,
    #[error("The core has to be halted, but it is {0:?}")]
    NotHalted(TargetState),
    #[error("OBASE reads as {0:#04x}, the EOnCE registers are not mapped")]
    InvalidObase(u8),
    #[error("Core instructions are one to three words long, got {0}")]
    InvalidInstructionLength(usize),
    #[error("Access size of {0} bytes is not supported")]
    InvalidAccessSize(u32),
    #[error("A transfer of {0} elements does not fit in memory")]
    TransferTooLarge(usize),
    #[error("{needed} bytes of data are needed, but only {actual} were given")]
    BufferTooSmall { needed: usize, actual: usize },
    #[error("{0} is not supported for this architecture")]
    NotImplemented(&'static str),
}

/// A debug session with one DSP5680xx core.
#[derive(Debug)]
pub struct Dsp5680xx {
    pub(crate) interface: Dsp5680xxCommunicationInterface,
    pub(crate) chip: Chip,
    pub(crate) clock: Arc<dyn Clock>,
    state: TargetState,
    stored_pc: u32,
    byte_order: ByteOrder,
}

impl Dsp5680xx {
    pub fn new(probe: Box<dyn JtagAccess>, chip: Chip) -> Self {
        Dsp5680xx {
            interface: Dsp5680xxCommunicationInterface::new(probe, &chip.debug),
            chip,
            clock: Arc::new(SystemClock),
            state: TargetState::Unknown,
            stored_pc: 0,
            byte_order: ByteOrder::default(),
        }
    }

    /// Attach to a chip from the built-in target descriptions.
    pub fn attach(probe: Box<dyn JtagAccess>, chip_name: &str) -> Result<Self, Error> {
        let chip = crate::config::get_target_by_name(chip_name)?;
        Ok(Self::new(probe, chip))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Set the order of the two bytes of a word in byte buffers.
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn chip(&self) -> &Chip {
        &self.chip
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    /// The program counter captured by the last halt.
    pub fn stored_pc(&self) -> u32 {
        self.stored_pc
    }

    /// Flash operations on this core.
    pub fn flash(&mut self) -> Flasher<'_> {
        Flasher::new(self)
    }

    fn ensure_halted(&self) -> Result<(), Dsp5680xxError> {
        if self.state != TargetState::Halted {
            return Err(Dsp5680xxError::NotHalted(self.state));
        }
        Ok(())
    }

    pub(crate) fn halt_if_needed(&mut self) -> Result<(), Dsp5680xxError> {
        if self.state != TargetState::Halted {
            self.halt()?;
        }
        Ok(())
    }

    pub fn poll(&mut self) -> Result<TargetState, Dsp5680xxError> {
        let status = self.interface.once().jtag_status()?;

        match poll_action(self.state, status) {
            PollAction::EnterDebugMode => {
                if let Err(error) = self.enter_debug_mode() {
                    tracing::warn!("Failed to put EOnCE in debug mode. Is the flash locked?");
                    return Err(error);
                }
                self.state = TargetState::Halted;
            }
            PollAction::ReleaseFromReset => {
                self.halt()?;
                self.interface.once().exit_debug_mode()?;
                self.confirm_running()?;
            }
            PollAction::ConfirmRunning => self.confirm_running()?,
            PollAction::LinkDead => {
                self.state = TargetState::Unknown;
                tracing::error!("JTAG status reads as all ones, the target is dead or disconnected");
                return Err(Dsp5680xxError::TargetDead);
            }
            PollAction::CommunicationFailure => {
                tracing::error!("Target state unknown, JTAG status {:?}", status);
                return Err(Dsp5680xxError::CommunicationFailure(status));
            }
            PollAction::Keep => {}
        }

        Ok(self.state)
    }

    /// A core that does not enter debug mode is in no known state.
    fn enter_debug_mode(&mut self) -> Result<(), Dsp5680xxError> {
        if let Err(error) = self.interface.once().enter_debug_mode() {
            self.state = TargetState::Unknown;
            return Err(error);
        }
        Ok(())
    }

    fn confirm_running(&mut self) -> Result<(), Dsp5680xxError> {
        let status = self.interface.once().read_status()?;
        if status.mode() != CoreMode::Normal {
            tracing::error!("JTAG reports normal execution, but EOnCE status is {:?}", status);
            self.state = TargetState::Unknown;
            return Err(Dsp5680xxError::InconsistentState(status.mode()));
        }
        self.state = TargetState::Running;
        Ok(())
    }

    pub fn halt(&mut self) -> Result<(), Dsp5680xxError> {
        if self.state == TargetState::Halted {
            tracing::debug!("Core is already halted");
            return Ok(());
        }

        self.enter_debug_mode()?;
        self.state = TargetState::Halted;

        let status = self.interface.once().jtag_status()?;
        tracing::trace!("JTAG status after halt: {:?}", status);

        self.stored_pc = self.interface.read_pc()?;
        tracing::debug!("Core halted at {:#08x}", self.stored_pc);
        Ok(())
    }

    pub fn resume(&mut self, address: Option<u32>) -> Result<(), Dsp5680xxError> {
        if self.state == TargetState::Running {
            tracing::debug!("Core is already running");
            return Ok(());
        }

        let status: OnceStatus = self.interface.once().read_status()?;
        if !status.is_debug() {
            self.enter_debug_mode()?;
        }
        self.state = TargetState::Halted;

        if let Some(address) = address {
            self.interface.write_pc(address)?;
        }

        let settings = self.chip.debug.resume;
        let mut watchdog = Watchdog::new(self.clock.clone(), settings);
        while watchdog.attempt() {
            self.interface.once().exit_debug_mode()?;
            if self.interface.once().jtag_status()? == JtagStatus::Normal {
                self.state = TargetState::Running;
                tracing::debug!("Core resumed");
                return Ok(());
            }
        }

        // Exit requests have been sent, the core may be running or busy by now.
        self.state = TargetState::Unknown;
        if watchdog.timed_out() {
            tracing::error!("Timed out waiting for the core to leave debug mode");
            return Err(Dsp5680xxError::Timeout);
        }
        tracing::error!(
            "Core still in debug mode after {} attempts",
            settings.attempts
        );
        Err(Dsp5680xxError::ResumeFailed(settings.attempts))
    }

    pub fn step(&mut self) -> Result<(), Dsp5680xxError> {
        Err(Dsp5680xxError::NotImplemented("single stepping"))
    }

    /// Number of bytes moved by `count` accesses of `size` bytes.
    fn transfer_length(size: u32, count: usize) -> Result<usize, Dsp5680xxError> {
        if !matches!(size, 1 | 2 | 4) {
            return Err(Dsp5680xxError::InvalidAccessSize(size));
        }
        (size as usize)
            .checked_mul(count)
            .ok_or(Dsp5680xxError::TransferTooLarge(count))
    }

    pub fn read_memory(
        &mut self,
        address: u32,
        size: u32,
        count: usize,
    ) -> Result<Vec<u8>, Dsp5680xxError> {
        let needed = Self::transfer_length(size, count)?;
        self.ensure_halted()?;
        let address = Address::translate(address);
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(needed)
            .map_err(|_| Dsp5680xxError::TransferTooLarge(count))?;

        match size {
            1 => {
                for index in 0..count.div_ceil(2) {
                    let word = self.interface.read_16(address.offset_by(index as u32))?;
                    bytes.extend(self.byte_order.split(word));
                }
                bytes.truncate(count);
            }
            2 => {
                for index in 0..count {
                    let word = self.interface.read_16(address.offset_by(index as u32))?;
                    bytes.extend(word.to_le_bytes());
                }
            }
            _ => {
                for index in 0..count {
                    let value = self.interface.read_32(address.offset_by(2 * index as u32))?;
                    bytes.extend(value.to_le_bytes());
                }
            }
        }

        Ok(bytes)
    }

    pub fn write_memory(
        &mut self,
        address: u32,
        size: u32,
        count: usize,
        data: &[u8],
    ) -> Result<(), Dsp5680xxError> {
        let needed = Self::transfer_length(size, count)?;
        let data = data.get(..needed).ok_or(Dsp5680xxError::BufferTooSmall {
            needed,
            actual: data.len(),
        })?;
        self.ensure_halted()?;
        let address = Address::translate(address);

        match size {
            1 => {
                let pairs = data.chunks_exact(2);
                let trailing = pairs.remainder().first().copied();
                let words: Vec<u16> = pairs
                    .map(|pair| self.byte_order.join([pair[0], pair[1]]))
                    .collect();
                self.interface.write_block_16(address, &words)?;

                if let Some(byte) = trailing {
                    let cell = address.offset_by(words.len() as u32);
                    let old = self.interface.read_16(cell)?;
                    self.interface
                        .write_16(cell, self.byte_order.merge_first(old, byte))?;
                }
                Ok(())
            }
            2 => {
                let words: Vec<u16> = data
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                self.interface.write_block_16(address, &words)
            }
            _ => {
                let values: Vec<u32> = data
                    .chunks_exact(4)
                    .map(|quad| u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]))
                    .collect();
                self.interface.write_block_32(address, &values)
            }
        }
    }

    pub fn read_buffer(&mut self, address: u32, len: usize) -> Result<Vec<u8>, Dsp5680xxError> {
        self.read_memory(address, 1, len)
    }

    pub fn write_buffer(&mut self, address: u32, data: &[u8]) -> Result<(), Dsp5680xxError> {
        self.write_memory(address, 1, data.len(), data)
    }

    pub fn bulk_write(&mut self, _address: u32, _data: &[u32]) -> Result<(), Dsp5680xxError> {
        Err(Dsp5680xxError::NotImplemented("bulk write"))
    }

    /// Download a block of machine code. The scan engine queue is flushed before returning.
    pub fn download(&mut self, address: Address, code: &[u16]) -> Result<(), Dsp5680xxError> {
        self.ensure_halted()?;
        tracing::debug!("Downloading {} words to {}", code.len(), address);
        self.interface.write_block_16(address, code)?;
        self.interface.once().flush()?;
        Ok(())
    }

    pub fn assert_reset(&mut self) {
        self.state = TargetState::Reset;
    }

    pub fn deassert_reset(&mut self) {
        self.state = TargetState::Running;
    }

    pub fn soft_reset_halt(&mut self) -> Result<(), Dsp5680xxError> {
        self.halt()?;
        self.reset_sim()
    }

    /// Reset the peripherals through the SIM, on variants where its location is known.
    pub(crate) fn reset_sim(&mut self) -> Result<(), Dsp5680xxError> {
        if let Some(sim_base) = self.chip.sim_base {
            tracing::debug!("Resetting peripherals through the SIM at X:{:#06x}", sim_base);
            self.interface
                .write_16(Address::data(sim_base), SIM_CMD_RESET)?;
        }
        Ok(())
    }

    pub fn checksum_memory(&mut self, _address: u32, _count: u32) -> Result<u32, Dsp5680xxError> {
        Err(Dsp5680xxError::NotImplemented("memory checksum"))
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            step: false,
            bulk_write: false,
            checksum: false,
            flash: true,
        }
    }
}

impl CoreInterface for Dsp5680xx {
    fn poll(&mut self) -> Result<TargetState, Error> {
        Ok(Dsp5680xx::poll(self)?)
    }

    fn status(&self) -> TargetState {
        self.state
    }

    fn halt(&mut self) -> Result<(), Error> {
        Ok(Dsp5680xx::halt(self)?)
    }

    fn resume(&mut self, address: Option<u32>) -> Result<(), Error> {
        Ok(Dsp5680xx::resume(self, address)?)
    }

    fn step(&mut self) -> Result<(), Error> {
        Ok(Dsp5680xx::step(self)?)
    }

    fn read_memory(&mut self, address: u32, size: u32, count: usize) -> Result<Vec<u8>, Error> {
        Ok(Dsp5680xx::read_memory(self, address, size, count)?)
    }

    fn write_memory(
        &mut self,
        address: u32,
        size: u32,
        count: usize,
        data: &[u8],
    ) -> Result<(), Error> {
        Ok(Dsp5680xx::write_memory(self, address, size, count, data)?)
    }

    fn bulk_write(&mut self, address: u32, data: &[u32]) -> Result<(), Error> {
        Ok(Dsp5680xx::bulk_write(self, address, data)?)
    }

    fn assert_reset(&mut self) -> Result<(), Error> {
        Dsp5680xx::assert_reset(self);
        Ok(())
    }

    fn deassert_reset(&mut self) -> Result<(), Error> {
        Dsp5680xx::deassert_reset(self);
        Ok(())
    }

    fn soft_reset_halt(&mut self) -> Result<(), Error> {
        Ok(Dsp5680xx::soft_reset_halt(self)?)
    }

    fn checksum_memory(&mut self, address: u32, count: u32) -> Result<u32, Error> {
        Ok(Dsp5680xx::checksum_memory(self, address, count)?)
    }

    fn capabilities(&self) -> Capabilities {
        Dsp5680xx::capabilities(self)
    }
}
