use crate::architecture::dsp5680xx::Dsp5680xxError;
use crate::probe::DebugProbeError;

use super::hfm::HfmCommand;

/// Describes any error that happened during flash erase or programming.
#[derive(Debug, thiserror::Error, docsplay::Display)]
pub enum FlashError {
    /// The flash is read protected. Unlock it through the master TAP first.
    Protected,

    /// Only a mass erase is supported, sectors {first} to {last} were requested.
    SectorEraseUnsupported { first: u32, last: u32 },

    /// The flash has to be erased before it is programmed.
    NotErased,

    /// Flash is programmed in pairs of words, but {0} words were given.
    OddWordCount(usize),

    /// {words} words starting at P:{address:#06x} do not fit in the flash array.
    OutOfRange { address: u32, words: usize },

    /// Flash command {command:?} failed, USTAT reads {ustat:#04x}.
    CommandFailed { command: HfmCommand, ustat: u16 },

    /// The flash module did not complete the command within {0} status reads.
    NotReady(u32),

    /// Timed out waiting for the flash module to complete the command.
    Timeout,

    /// Unable to set the flash clock divisor, CLKDIV reads {actual:#04x} instead of {expected:#04x}.
    ClockDivisor { expected: u16, actual: u16 },

    /// The flash signature {target:#06x} does not match the data signature {host:#06x}. Program the flash again.
    SignatureMismatch { target: u16, host: u16 },

    /// Unlocking the flash requires the master TAP in the scan path.
    MasterTapRequired,

    /// An error occurred while controlling the core.
    Core(#[from] Dsp5680xxError),
}

impl From<DebugProbeError> for FlashError {
    fn from(error: DebugProbeError) -> Self {
        FlashError::Core(error.into())
    }
}
