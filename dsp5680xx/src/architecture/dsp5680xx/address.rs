//! Mapping of flat host addresses onto the two address spaces of the core.

use std::fmt;

/// Host addresses at or above this value refer to data memory.
pub const DATA_SPACE_OFFSET: u32 = 0x20_0000;

/// Upper byte of the reserved window holding the memory mapped EOnCE registers.
const DEBUG_WINDOW: u32 = 0xFF_0000;

/// Word offset of the transmit/receive register pair in the EOnCE window.
pub const BRIDGE_LOW: u32 = 0xFFFE;
/// Word offset of the upper transmit/receive register pair.
pub const BRIDGE_HIGH: u32 = 0xFFFF;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MemorySpace {
    /// `P:` memory, flash and program RAM.
    Program,
    /// `X:` memory, data RAM and peripherals.
    Data,
}

/// A word address in one of the two address spaces.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Address {
    pub space: MemorySpace,
    pub offset: u32,
}

impl Address {
    pub fn program(offset: u32) -> Self {
        Address {
            space: MemorySpace::Program,
            offset,
        }
    }

    pub fn data(offset: u32) -> Self {
        Address {
            space: MemorySpace::Data,
            offset,
        }
    }

    /// Translate a flat host address.
    ///
    /// Addresses in the debug window keep their value, other data space
    /// addresses lose the data space offset.
    pub fn translate(address: u32) -> Self {
        if address < DATA_SPACE_OFFSET {
            Address::program(address)
        } else if address & DEBUG_WINDOW == DEBUG_WINDOW {
            Address::data(address)
        } else {
            Address::data(address - DATA_SPACE_OFFSET)
        }
    }

    /// The address `words` further on, in the same space.
    pub fn offset_by(self, words: u32) -> Self {
        Address {
            space: self.space,
            offset: self.offset.wrapping_add(words) & 0xFF_FFFF,
        }
    }

    pub fn is_program(&self) -> bool {
        self.space == MemorySpace::Program
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.space {
            MemorySpace::Program => write!(f, "P:{:#06x}", self.offset),
            MemorySpace::Data => write!(f, "X:{:#06x}", self.offset),
        }
    }
}

/// Address of a bridge register pair, given the content of OBASE.
pub fn bridge_address(obase: u8, offset: u32) -> u32 {
    (u32::from(obase) << 16) | offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(0x0000_0000, Address::program(0x0000))]
    #[test_case(0x0000_8700, Address::program(0x8700))]
    #[test_case(0x001F_FFFF, Address::program(0x1F_FFFF))]
    #[test_case(0x0020_0000, Address::data(0x0000))]
    #[test_case(0x0020_F400, Address::data(0xF400))]
    #[test_case(0x00FF_FFFE, Address::data(0xFF_FFFE); "debug window")]
    #[test_case(0x00FF_0000, Address::data(0xFF_0000); "debug window start")]
    fn translate(raw: u32, address: Address) {
        assert_eq!(Address::translate(raw), address);
    }

    #[test]
    fn display() {
        assert_eq!(Address::data(0xF400).to_string(), "X:0xf400");
        assert_eq!(Address::program(0x1FF7).offset_by(1).to_string(), "P:0x1ff8");
    }

    #[test]
    fn bridge() {
        assert_eq!(bridge_address(0xFF, BRIDGE_LOW), 0xFF_FFFE);
        assert_eq!(bridge_address(0xFF, BRIDGE_HIGH), 0xFF_FFFF);
    }
}
