//! Access to the JTAG scan chain of a DSP5680xx.
//!
//! The driver never talks to an adapter directly. Everything it does is a
//! sequence of instruction and data register shifts, issued through the
//! [`JtagAccess`] trait. Adapter crates implement the trait for their
//! hardware, [`fake_probe::FakeDsp`] implements it for a simulated target.

pub mod fake_probe;

use thiserror::Error;

/// Longest data register shift the scan engine has to support.
pub const MAX_DR_LENGTH: u32 = 32;

/// Error while shifting bits through the scan chain.
#[derive(Error, Debug)]
pub enum DebugProbeError {
    #[error("USB Communication Error")]
    Usb(#[source] Option<Box<dyn std::error::Error + Send + Sync>>),
    #[error("An error specific to a probe type occurred")]
    ProbeSpecific(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("A shift of {length} bits exceeds the {max} bit limit of the scan engine")]
    ShiftTooLong { length: u32, max: u32 },
    #[error("Operation timed out")]
    Timeout,
    #[error("You need to be attached to the target to perform this action")]
    NotAttached,
    #[error("Error in previous batched command: shift {0} of the queue failed")]
    BatchError(usize),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// The TAP that receives instruction and data register shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapSelection {
    /// The TAP of the 56800E core, which gives access to the EOnCE module.
    Core,
    /// The chip level TAP, only used to mass erase a secured device.
    Master,
}

/// Low-Level Access to the JTAG protocol
///
/// Shifts are synchronous unless they are explicitly queued with
/// [`JtagAccess::schedule_shift_dr`]. A synchronous shift must be performed
/// after every queued shift before it, so captured values are never stale.
pub trait JtagAccess: std::fmt::Debug {
    /// Shift `length` bits of `instruction` into the instruction register of the
    /// active TAP and return the captured bits.
    fn shift_ir(&mut self, instruction: u32, length: u32) -> Result<u32, DebugProbeError>;

    /// Shift `length` bits of `data` through the selected data register and
    /// return the captured bits.
    fn shift_dr(&mut self, data: u32, length: u32) -> Result<u32, DebugProbeError>;

    /// Queue a data register shift whose captured bits are not needed.
    ///
    /// The default implementation performs the shift immediately.
    fn schedule_shift_dr(&mut self, data: u32, length: u32) -> Result<(), DebugProbeError> {
        self.shift_dr(data, length).map(|_| ())
    }

    /// Perform all queued shifts.
    fn execute(&mut self) -> Result<(), DebugProbeError> {
        Ok(())
    }

    /// The TAP currently in the scan path.
    fn active_tap(&self) -> TapSelection {
        TapSelection::Core
    }
}
