//! # Debugging and flashing of DSP5680xx hybrid controllers
//!
//! This crate drives the 56800E core of the Freescale DSP5680xx / MC56F80xx
//! family through its JTAG port and the EOnCE debug module. It halts and
//! resumes the core, reads and writes both address spaces and erases,
//! programs and secures the on-chip flash.
//!
//! The scan engine is abstracted by [`probe::JtagAccess`], so any adapter
//! that can shift instruction and data registers can be used.
//!
//! ## Halting the core and reading memory
//!
//! ```
//! use dsp5680xx::probe::fake_probe::FakeDsp;
//! use dsp5680xx::Dsp5680xx;
//!
//! # fn main() -> Result<(), dsp5680xx::Error> {
//! let mut target = Dsp5680xx::attach(Box::new(FakeDsp::new()), "MC56F8013")?;
//!
//! target.halt()?;
//! target.write_memory(0x20_0100, 2, 1, &0xBEEFu16.to_le_bytes())?;
//! assert_eq!(target.read_memory(0x20_0100, 2, 1)?, 0xBEEFu16.to_le_bytes());
//! # Ok(())
//! # }
//! ```
//!
//! ## Programming the flash
//!
//! ```
//! # use dsp5680xx::probe::fake_probe::FakeDsp;
//! # use dsp5680xx::Dsp5680xx;
//! # fn main() -> Result<(), dsp5680xx::Error> {
//! # let mut target = Dsp5680xx::attach(Box::new(FakeDsp::new()), "MC56F8013")?;
//! let mut flash = target.flash();
//! flash.erase(0, 0)?;
//! flash.program(0x0000, &[0xE984, 0x0000])?;
//! # Ok(())
//! # }
//! ```

pub mod architecture;
pub mod config;
pub mod core;
mod error;
pub mod flashing;
pub mod probe;

pub use crate::architecture::dsp5680xx::{Dsp5680xx, Dsp5680xxError, TargetState};
pub use crate::config::RegistryError;
pub use crate::core::{ByteOrder, Capabilities, CoreInterface};
pub use crate::error::Error;
pub use crate::flashing::FlashError;
pub use crate::probe::{DebugProbeError, JtagAccess};
