//! Word level access to core memory.
//!
//! The host cannot read core memory directly. The core is made to copy a
//! memory cell into a data register and from there into the memory mapped
//! transmit register, which the host then reads through EOnCE.

use dsp5680xx_target::DebugProperties;

use crate::probe::{DebugProbeError, JtagAccess};

use super::address::{bridge_address, Address, BRIDGE_HIGH, BRIDGE_LOW};
use super::instruction::CoreInstruction;
use super::once::Once;
use super::Dsp5680xxError;

/// Memory and register access through the EOnCE module of one core.
#[derive(Debug)]
pub struct Dsp5680xxCommunicationInterface {
    once: Once,
    write_flush_interval: u32,
}

impl Dsp5680xxCommunicationInterface {
    pub fn new(probe: Box<dyn JtagAccess>, debug: &DebugProperties) -> Self {
        Self {
            once: Once::new(probe, debug.core_ir_length, debug.master_ir_length),
            write_flush_interval: debug.write_flush_interval.max(1),
        }
    }

    pub fn once(&mut self) -> &mut Once {
        &mut self.once
    }

    /// Let the core execute `instruction` with the given operands.
    pub fn execute(
        &mut self,
        instruction: CoreInstruction,
        value: u32,
        displacement: u16,
    ) -> Result<(), Dsp5680xxError> {
        let words = instruction.assemble(value, displacement);
        tracing::trace!("{} {:04X?}", instruction.encoding().mnemonic, &*words);
        self.once.execute_instruction(&words)
    }

    /// Let the core execute an instruction without operands.
    pub fn run(&mut self, instruction: CoreInstruction) -> Result<(), Dsp5680xxError> {
        self.execute(instruction, 0, 0)
    }

    /// Queue writes for the duration of `f`. The queue is flushed on every exit path.
    pub fn batched<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, Dsp5680xxError>,
    ) -> Result<T, Dsp5680xxError> {
        self.once.start_batch();
        let result = f(self);
        let flushed = self.once.end_batch();
        let value = result?;
        flushed?;
        Ok(value)
    }

    /// Flush every `interval` iterations of a batched loop.
    pub fn flush_every(&mut self, index: usize, interval: u32) -> Result<(), DebugProbeError> {
        if (index + 1) % interval.max(1) as usize == 0 {
            self.once.flush()?;
        }
        Ok(())
    }

    /// Point r0 at the lower transmit/receive register pair.
    pub fn load_bridge_to_r0(&mut self) -> Result<(), Dsp5680xxError> {
        let obase = self.once.read_obase()?;
        self.execute(
            CoreInstruction::MoveLongToR0,
            bridge_address(obase, BRIDGE_LOW),
            0,
        )
    }

    /// Point r0 at the upper transmit/receive register pair.
    pub fn load_bridge_high_to_r0(&mut self) -> Result<(), Dsp5680xxError> {
        let obase = self.once.read_obase()?;
        if obase == 0 {
            return Err(Dsp5680xxError::InvalidObase(obase));
        }
        self.execute(
            CoreInstruction::MoveLongToR0,
            bridge_address(obase, BRIDGE_HIGH),
            0,
        )
    }

    pub fn read_16(&mut self, address: Address) -> Result<u16, Dsp5680xxError> {
        self.execute(CoreInstruction::MoveLongToR0, address.offset, 0)?;
        if address.is_program() {
            self.run(CoreInstruction::MovePR0IncToY0)?;
        } else {
            self.run(CoreInstruction::MoveXR0ToY0)?;
        }
        self.load_bridge_to_r0()?;
        self.run(CoreInstruction::MoveY0ToXR0)?;

        let value = self.once.rx_lower()?;
        tracing::trace!("{} -> {:#06x}", address, value);
        Ok(value)
    }

    /// Read two consecutive words. Odd addresses are rounded down.
    pub fn read_32(&mut self, address: Address) -> Result<u32, Dsp5680xxError> {
        let address = Address {
            offset: address.offset & !1,
            ..address
        };

        self.execute(CoreInstruction::MoveLongToR0, address.offset, 0)?;
        if address.is_program() {
            self.run(CoreInstruction::MovePR0IncToY0)?;
            self.run(CoreInstruction::MovePR0IncToY1)?;
        } else {
            self.run(CoreInstruction::MoveXR0IncToY0)?;
            self.run(CoreInstruction::MoveXR0ToY1)?;
        }
        self.load_bridge_to_r0()?;
        self.run(CoreInstruction::MoveY0ToXR0Inc)?;
        self.run(CoreInstruction::MoveY1ToXR0)?;

        let low = self.once.rx_lower()?;
        let high = self.once.rx_upper()?;
        let value = (u32::from(high) << 16) | u32::from(low);
        tracing::trace!("{} -> {:#010x}", address, value);
        Ok(value)
    }

    pub fn write_16(&mut self, address: Address, value: u16) -> Result<(), Dsp5680xxError> {
        tracing::trace!("{} <- {:#06x}", address, value);
        self.execute(CoreInstruction::MoveLongToR0, address.offset, 0)?;
        if address.is_program() {
            self.execute(CoreInstruction::MoveImmToY0, value.into(), 0)?;
            self.run(CoreInstruction::MoveY0ToPR0Inc)
        } else {
            self.execute(CoreInstruction::MoveImmToXR0, value.into(), 0)
        }
    }

    /// Write two consecutive words, the low half first.
    pub fn write_32(&mut self, address: Address, value: u32) -> Result<(), Dsp5680xxError> {
        tracing::trace!("{} <- {:#010x}", address, value);
        self.execute(CoreInstruction::MoveLongToR0, address.offset, 0)?;
        self.execute(CoreInstruction::MoveLongToY, value, 0)?;
        if address.is_program() {
            self.run(CoreInstruction::MoveY0ToPR0Inc)?;
            self.run(CoreInstruction::MoveY1ToPR0Inc)
        } else {
            self.run(CoreInstruction::MoveY0ToXR0Inc)?;
            self.run(CoreInstruction::MoveY1ToXR0Inc)
        }
    }

    /// Write consecutive words with the scan engine batching the shifts.
    pub fn write_block_16(&mut self, address: Address, data: &[u16]) -> Result<(), Dsp5680xxError> {
        let interval = self.write_flush_interval;
        self.batched(|interface| {
            for (index, word) in data.iter().enumerate() {
                interface.flush_every(index, interval)?;
                interface.write_16(address.offset_by(index as u32), *word)?;
            }
            Ok(())
        })
    }

    /// Write consecutive double words with the scan engine batching the shifts.
    pub fn write_block_32(&mut self, address: Address, data: &[u32]) -> Result<(), Dsp5680xxError> {
        let interval = self.write_flush_interval;
        self.batched(|interface| {
            for (index, value) in data.iter().enumerate() {
                interface.flush_every(index, interval)?;
                interface.write_32(address.offset_by(2 * index as u32), *value)?;
            }
            Ok(())
        })
    }

    /// Read the program counter. Clobbers r0, r4 and y.
    pub fn read_pc(&mut self) -> Result<u32, Dsp5680xxError> {
        self.run(CoreInstruction::MovePcToR4)?;
        self.run(CoreInstruction::MoveR4ToY)?;
        self.load_bridge_to_r0()?;
        self.run(CoreInstruction::MoveY0ToXR0Inc)?;
        self.run(CoreInstruction::MoveY1ToXR0)?;

        let low = self.once.rx_lower()?;
        let high = self.once.rx_upper()?;
        Ok((u32::from(high) << 16) | u32::from(low))
    }

    pub fn write_pc(&mut self, pc: u32) -> Result<(), Dsp5680xxError> {
        self.execute(CoreInstruction::MoveLongToPc, pc, 0)
    }
}
