//! Erasing, programming and securing the on-chip program flash.
//!
//! The flash module is driven by the core itself: every register access is an
//! instruction the host lets the core execute. Programming downloads a small
//! stub to program RAM which takes the data words from the EOnCE bridge while
//! the core runs.

mod error;
mod flasher;
pub mod hfm;
pub mod signature;
pub mod stubs;

pub use error::FlashError;
pub use flasher::Flasher;
pub use signature::data_signature;
