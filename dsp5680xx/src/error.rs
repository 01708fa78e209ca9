use crate::architecture::dsp5680xx::Dsp5680xxError;
use crate::config::RegistryError;
use crate::flashing::FlashError;
use crate::probe::DebugProbeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("An error with the usage of the probe occurred")]
    Probe(#[from] DebugProbeError),
    #[error("A DSP5680xx core specific error occurred")]
    Dsp5680xx(#[from] Dsp5680xxError),
    #[error("A flash operation failed")]
    Flash(#[from] FlashError),
    #[error("Unable to load specification for chip")]
    ChipNotFound(#[from] RegistryError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
