//! Target description schema
//!
//! The DSP5680xx family shares one debug unit and one flash module design, but
//! the variants differ in where the flash controller and the System Integration
//! Module live, how large the flash array is and how patient the host has to be
//! while waiting for the core. This crate contains the schema structs for the
//! YAML files describing those variants.
//!
#![warn(missing_docs)]

mod chip;
mod chip_family;
mod flash_properties;
pub(crate) mod serialize;

pub use chip::{Chip, DebugProperties, PollSettings};
pub use chip_family::{ChipFamily, TargetDescriptionSource};
pub use flash_properties::FlashProperties;
