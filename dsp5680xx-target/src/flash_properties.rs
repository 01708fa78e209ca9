use crate::serialize::{hex_range, hex_u_int};
use crate::PollSettings;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Properties of the on-chip flash module (HFM) and its program flash array.
///
/// All addresses are word addresses. `range`, `stub_address` and `lock_address`
/// are in program space, `module_base` is in data space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FlashProperties {
    /// Data space address of the flash module register block.
    #[serde(serialize_with = "hex_u_int")]
    pub module_base: u32,
    /// Word range of the program flash array.
    #[serde(serialize_with = "hex_range")]
    pub range: Range<u32>,
    /// Program RAM address the flashing stub is downloaded to.
    #[serde(serialize_with = "hex_u_int")]
    pub stub_address: u32,
    /// Flash clock divisor written to `CLKDIV`.
    #[serde(serialize_with = "hex_u_int")]
    pub clock_divisor: u8,
    /// Word programmed twice at `lock_address` to secure the device.
    #[serde(serialize_with = "hex_u_int")]
    pub lock_word: u16,
    /// First of the two security words.
    #[serde(serialize_with = "hex_u_int")]
    pub lock_address: u32,
    /// Watchdog for a single flash module command.
    pub command: PollSettings,
    /// Number of words streamed to the flashing stub between forced scan engine flushes.
    pub stream_flush_interval: u32,
}

impl FlashProperties {
    /// Size of the flash array in words.
    pub fn size(&self) -> u32 {
        self.range.end.saturating_sub(self.range.start)
    }

    /// Returns true if the `words` long block at `address` lies completely in the flash array.
    pub fn contains(&self, address: u32, words: u32) -> bool {
        address >= self.range.start
            && address
                .checked_add(words)
                .is_some_and(|end| end <= self.range.end)
    }
}

impl Default for FlashProperties {
    fn default() -> Self {
        FlashProperties {
            module_base: 0xF400,
            range: 0..0x2000,
            stub_address: 0x8700,
            clock_divisor: 0x29,
            lock_word: 0xE70A,
            lock_address: 0x1FF7,
            command: PollSettings {
                attempts: 100,
                timeout_ms: 1000,
            },
            stream_flush_interval: 7,
        }
    }
}
