//! Registers and commands of the HFM flash module.

use bitfield::bitfield;

/// Register offsets from the module base, in words.
pub mod register {
    /// Clock divider. Bit 7 reads as set once the divider has been written.
    pub const CLKDIV: u16 = 0x00;
    /// Bank and lock configuration.
    pub const CNFG: u16 = 0x01;
    pub const PROT: u16 = 0x10;
    pub const PROTB: u16 = 0x11;
    pub const USTAT: u16 = 0x13;
    pub const CMD: u16 = 0x14;
    /// Result of the data signature command.
    pub const DATA: u16 = 0x18;
}

/// Set in CLKDIV once the divider has been loaded.
pub const CLKDIV_LOADED: u16 = 0x80;

bitfield! {
    /// User status register.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct Ustat(u16);
    impl Debug;

    /// Command buffer empty. Writing a one starts the buffered command.
    pub cbeif, _: 7;
    /// Command complete.
    pub ccif, _: 6;
    /// Protection violation.
    pub pviol, _: 5;
    /// Access error.
    pub accerr, _: 4;
    /// Erase verify found the array blank.
    pub blank, _: 2;
}

impl Ustat {
    pub const START: u16 = 0x80;
    pub const COMPLETE: u16 = 0x40;
    pub const PVIOL: u16 = 0x20;
    pub const ACCERR: u16 = 0x10;
    pub const BLANK: u16 = 0x04;

    pub fn failed(&self) -> bool {
        self.pviol() || self.accerr()
    }
}

/// Commands accepted by the CMD register.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HfmCommand {
    EraseVerify,
    CalculateDataSignature,
    WordProgram,
    MassErase,
}

impl HfmCommand {
    pub fn code(self) -> u16 {
        match self {
            HfmCommand::EraseVerify => 0x05,
            HfmCommand::CalculateDataSignature => 0x06,
            HfmCommand::WordProgram => 0x20,
            HfmCommand::MassErase => 0x41,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x05 => Some(HfmCommand::EraseVerify),
            0x06 => Some(HfmCommand::CalculateDataSignature),
            0x20 => Some(HfmCommand::WordProgram),
            0x41 => Some(HfmCommand::MassErase),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ustat_bits() {
        let ustat = Ustat(Ustat::START | Ustat::COMPLETE | Ustat::BLANK);

        assert!(ustat.cbeif());
        assert!(ustat.ccif());
        assert!(ustat.blank());
        assert!(!ustat.failed());
        assert!(Ustat(Ustat::PVIOL).failed());
        assert!(Ustat(Ustat::ACCERR).failed());
    }
}
