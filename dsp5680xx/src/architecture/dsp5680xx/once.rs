//! EOnCE command codec.
//!
//! Every access to the core goes through the EOnCE command register: one
//! control byte selects a register and the direction of the following data
//! shift, and optionally lets the core execute the instruction that was just
//! shifted in or leave debug mode.

use bitfield::bitfield;

use crate::probe::{DebugProbeError, JtagAccess, TapSelection, MAX_DR_LENGTH};

use super::Dsp5680xxError;

/// Instructions of the core TAP.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TapInstruction {
    Idcode,
    EnableOnce,
    DebugRequest,
    Bypass,
}

impl TapInstruction {
    pub fn code(self) -> u32 {
        match self {
            TapInstruction::Idcode => 0x2,
            TapInstruction::EnableOnce => 0x6,
            TapInstruction::DebugRequest => 0x7,
            TapInstruction::Bypass => 0xF,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0x2 => Some(TapInstruction::Idcode),
            0x6 => Some(TapInstruction::EnableOnce),
            0x7 => Some(TapInstruction::DebugRequest),
            0xF => Some(TapInstruction::Bypass),
            _ => None,
        }
    }
}

/// Master TAP instruction which mass erases the flash and clears the security bytes.
pub const MASTER_FLASH_ERASE: u32 = 0x08;

/// Core state captured in the instruction register during every IR scan.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JtagStatus {
    Normal,
    StopWait,
    Busy,
    Debug,
    /// All ones, usually a disconnected or unpowered target.
    Dead,
    Unknown(u8),
}

impl JtagStatus {
    pub fn from_capture(capture: u32) -> Self {
        match capture & 0xF {
            0x01 => JtagStatus::Normal,
            0x05 => JtagStatus::StopWait,
            0x09 => JtagStatus::Busy,
            0x0D => JtagStatus::Debug,
            0x0F => JtagStatus::Dead,
            other => JtagStatus::Unknown(other as u8),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            JtagStatus::Normal => 0x01,
            JtagStatus::StopWait => 0x05,
            JtagStatus::Busy => 0x09,
            JtagStatus::Debug => 0x0D,
            JtagStatus::Dead => 0x0F,
            JtagStatus::Unknown(code) => code,
        }
    }
}

/// Registers selectable through the EOnCE command register.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OnceRegister {
    /// Control register.
    Ocr,
    /// Status register.
    Osr,
    /// Program data bus register, the core executes what is shifted in here.
    Opdbr,
    /// Base address of the memory mapped EOnCE registers, upper byte only.
    Obase,
    /// Transmit register, lower half. Written by the core, read by the host.
    Otx,
    /// Transmit register, upper half.
    Otx1,
    /// Receive register, lower half. Written by the host, read by the core.
    Orx,
    /// Receive register, upper half.
    Orx1,
    /// No register, used together with the exit flag.
    None,
}

impl OnceRegister {
    pub fn selector(self) -> u8 {
        match self {
            OnceRegister::Ocr => 0x01,
            OnceRegister::Osr => 0x03,
            OnceRegister::Opdbr => 0x04,
            OnceRegister::Obase => 0x05,
            OnceRegister::Otx => 0x07,
            OnceRegister::Otx1 => 0x09,
            OnceRegister::Orx => 0x0B,
            OnceRegister::Orx1 => 0x0D,
            OnceRegister::None => 0x1F,
        }
    }

    pub fn from_selector(selector: u8) -> Option<Self> {
        [
            OnceRegister::Ocr,
            OnceRegister::Osr,
            OnceRegister::Opdbr,
            OnceRegister::Obase,
            OnceRegister::Otx,
            OnceRegister::Otx1,
            OnceRegister::Orx,
            OnceRegister::Orx1,
            OnceRegister::None,
        ]
        .into_iter()
        .find(|register| register.selector() == selector)
    }
}

bitfield! {
    /// Contents of the EOnCE command register.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct OnceCommand(u8);
    impl Debug;

    /// Read from the selected register.
    pub rw, set_rw: 7;
    /// Execute the instruction in OPDBR.
    pub go, set_go: 6;
    /// Leave debug mode after the command.
    pub ex, set_ex: 5;
    pub u8, selector, set_selector: 4, 0;
}

impl OnceCommand {
    pub fn new(register: OnceRegister, rw: bool, go: bool, ex: bool) -> Self {
        let mut command = OnceCommand(0);
        command.set_selector(register.selector());
        command.set_rw(rw);
        command.set_go(go);
        command.set_ex(ex);
        command
    }

    pub fn read(register: OnceRegister) -> Self {
        Self::new(register, true, false, false)
    }

    pub fn write(register: OnceRegister) -> Self {
        Self::new(register, false, false, false)
    }

    pub fn register(&self) -> Option<OnceRegister> {
        OnceRegister::from_selector(self.selector())
    }
}

/// Processing state of the core as seen by the EOnCE module.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CoreMode {
    Normal,
    StopWait,
    Busy,
    Debug,
}

bitfield! {
    /// EOnCE status register, also captured while shifting a command.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct OnceStatus(u8);
    impl Debug;

    pub os1, _: 5;
    pub os0, _: 4;
}

impl OnceStatus {
    /// Mask of the core mode bits.
    pub const MODE_MASK: u8 = 0x30;

    pub fn mode(&self) -> CoreMode {
        match (self.os1(), self.os0()) {
            (false, false) => CoreMode::Normal,
            (false, true) => CoreMode::StopWait,
            (true, false) => CoreMode::Busy,
            (true, true) => CoreMode::Debug,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.mode() == CoreMode::Debug
    }
}

/// Command level access to the EOnCE module of the core TAP.
#[derive(Debug)]
pub struct Once {
    probe: Box<dyn JtagAccess>,
    /// Set while a write loop queues shifts instead of performing them.
    batching: bool,
    core_ir_length: u32,
    master_ir_length: u32,
}

impl Once {
    pub fn new(probe: Box<dyn JtagAccess>, core_ir_length: u8, master_ir_length: u8) -> Self {
        Once {
            probe,
            batching: false,
            core_ir_length: core_ir_length.into(),
            master_ir_length: master_ir_length.into(),
        }
    }

    pub fn active_tap(&self) -> TapSelection {
        self.probe.active_tap()
    }

    /// Start queuing writes. Reads still flush the queue before they are performed.
    pub fn start_batch(&mut self) {
        self.batching = true;
    }

    /// Stop queuing writes and perform everything that is still queued.
    pub fn end_batch(&mut self) -> Result<(), DebugProbeError> {
        self.batching = false;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<(), DebugProbeError> {
        self.probe.execute()
    }

    fn check_length(length: u32, max: u32) -> Result<(), DebugProbeError> {
        if length == 0 || length > max {
            return Err(DebugProbeError::ShiftTooLong { length, max });
        }
        Ok(())
    }

    fn shift_ir(&mut self, instruction: u32, length: u32) -> Result<u32, DebugProbeError> {
        Self::check_length(length, MAX_DR_LENGTH)?;
        self.flush()?;
        let capture = self.probe.shift_ir(instruction, length)?;
        tracing::trace!("IR {:#x} -> captured {:#x}", instruction, capture);
        Ok(capture)
    }

    fn shift_dr(&mut self, data: u32, length: u32) -> Result<u32, DebugProbeError> {
        Self::check_length(length, MAX_DR_LENGTH)?;
        self.flush()?;
        let capture = self.probe.shift_dr(data, length)?;
        tracing::trace!("DR {:#x} ({} bits) -> captured {:#x}", data, length, capture);
        Ok(capture)
    }

    /// A data register write whose capture is not needed, queued while batching.
    fn write_dr(&mut self, data: u32, length: u32) -> Result<(), DebugProbeError> {
        if self.batching {
            Self::check_length(length, MAX_DR_LENGTH)?;
            tracing::trace!("DR {:#x} ({} bits) queued", data, length);
            self.probe.schedule_shift_dr(data, length)
        } else {
            self.shift_dr(data, length).map(|_| ())
        }
    }

    /// Shift a command and return the status captured while doing so.
    pub fn execute(&mut self, command: OnceCommand) -> Result<OnceStatus, Dsp5680xxError> {
        let capture = self.shift_dr(command.0.into(), 8)?;
        Ok(OnceStatus(capture as u8))
    }

    fn issue(&mut self, command: OnceCommand) -> Result<(), Dsp5680xxError> {
        self.write_dr(command.0.into(), 8)?;
        Ok(())
    }

    /// Let the core execute a one to three word instruction.
    pub fn execute_instruction(&mut self, words: &[u16]) -> Result<(), Dsp5680xxError> {
        if words.is_empty() || words.len() > 3 {
            return Err(Dsp5680xxError::InvalidInstructionLength(words.len()));
        }

        let last = words.len() - 1;
        for (index, word) in words.iter().enumerate() {
            self.issue(OnceCommand::new(
                OnceRegister::Opdbr,
                false,
                index == last,
                false,
            ))?;
            self.write_dr((*word).into(), 16)?;
        }

        Ok(())
    }

    pub fn read_register(
        &mut self,
        register: OnceRegister,
        length: u32,
    ) -> Result<u32, Dsp5680xxError> {
        self.issue(OnceCommand::read(register))?;
        Ok(self.shift_dr(0, length)?)
    }

    pub fn write_register(&mut self, register: OnceRegister, data: u16) -> Result<(), Dsp5680xxError> {
        self.issue(OnceCommand::write(register))?;
        self.write_dr(data.into(), 16)?;
        Ok(())
    }

    pub fn read_status(&mut self) -> Result<OnceStatus, Dsp5680xxError> {
        let status = self.read_register(OnceRegister::Osr, 8)?;
        Ok(OnceStatus(status as u8))
    }

    pub fn read_obase(&mut self) -> Result<u8, Dsp5680xxError> {
        Ok(self.read_register(OnceRegister::Obase, 8)? as u8)
    }

    /// Read the lower half of the transmit register.
    pub fn rx_lower(&mut self) -> Result<u16, Dsp5680xxError> {
        Ok(self.read_register(OnceRegister::Otx, 16)? as u16)
    }

    /// Read the upper half of the transmit register.
    pub fn rx_upper(&mut self) -> Result<u16, Dsp5680xxError> {
        Ok(self.read_register(OnceRegister::Otx1, 16)? as u16)
    }

    /// Write the upper half of the receive register.
    pub fn tx_upper(&mut self, data: u16) -> Result<(), Dsp5680xxError> {
        self.write_register(OnceRegister::Orx1, data)
    }

    /// Select the EOnCE module and return the core state captured on the way.
    pub fn jtag_status(&mut self) -> Result<JtagStatus, Dsp5680xxError> {
        let capture = self.shift_ir(TapInstruction::EnableOnce.code(), self.core_ir_length)?;
        Ok(JtagStatus::from_capture(capture))
    }

    pub fn enter_debug_mode(&mut self) -> Result<OnceStatus, Dsp5680xxError> {
        self.shift_ir(TapInstruction::DebugRequest.code(), self.core_ir_length)?;
        for _ in 0..2 {
            self.shift_ir(TapInstruction::EnableOnce.code(), self.core_ir_length)?;
        }

        let status = self.read_status()?;
        if !status.is_debug() {
            tracing::debug!("EOnCE status after debug request: {:?}", status);
            return Err(Dsp5680xxError::DebugModeNotEntered(status.0));
        }

        tracing::debug!("Core entered debug mode");
        Ok(status)
    }

    pub fn exit_debug_mode(&mut self) -> Result<OnceStatus, Dsp5680xxError> {
        self.execute(OnceCommand::new(OnceRegister::None, false, false, true))
    }

    /// Mass erase through the master TAP. Only possible while the master TAP is in the scan path.
    pub fn master_flash_erase(&mut self, clock_divisor: u8) -> Result<(), Dsp5680xxError> {
        self.shift_ir(MASTER_FLASH_ERASE, self.master_ir_length)?;
        self.shift_dr(clock_divisor.into(), 8)?;
        Ok(())
    }
}
