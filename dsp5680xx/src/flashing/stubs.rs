//! Machine code downloaded to program RAM and run by the core.

/// A position independent routine for the 56800E core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stub {
    pub name: &'static str,
    pub code: &'static [u16],
}

/// Copies each word received through the EOnCE bridge to `p:(r3)+`.
pub const PRAM_WRITER: Stub = Stub {
    name: "program RAM writer",
    code: &[
        0x8A44, 0xFFFE, 0x017D, 0xE700, 0xF514, 0xE700, 0x8563, 0x8442, 0x0003, 0xA976,
    ],
};

/// Programs every word the host writes to ORX1 into flash at `p:(r3)+`.
///
/// Expects r2 to hold the flash module base and waits for each command to
/// complete before accepting the next word.
pub const FLASH_PROGRAMMER: Stub = Stub {
    name: "flash programmer",
    code: &[
        0x8A46, 0x0013, 0x407D, 0xE700, 0xE700, 0x8A44, 0xFFFE, 0x017B, 0xE700, 0xF514, 0x8563,
        0x8646, 0x0020, 0x0014, 0x8646, 0x0080, 0x0013, 0x8A46, 0x0013, 0x2004, 0x8246, 0x0013,
        0x0020, 0xA968, 0x8A46, 0x0013, 0x1065, 0x8246, 0x0013, 0x0010, 0xA961,
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn stub_sizes() {
        assert_eq!(PRAM_WRITER.code.len(), 10);
        assert_eq!(FLASH_PROGRAMMER.code.len(), 31);
    }

    #[test]
    fn flash_programmer_issues_word_program() {
        // move #0x20,x:(r2+0x14) followed by move #0x80,x:(r2+0x13)
        let window = FLASH_PROGRAMMER
            .code
            .windows(6)
            .position(|words| words == [0x8646, 0x0020, 0x0014, 0x8646, 0x0080, 0x0013]);

        assert_eq!(window, Some(11));
    }
}
