use crate::serialize::hex_option;
use crate::FlashProperties;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single chip variant.
///
/// This describes an exact chip variant, including the location of its flash
/// module and the budgets the host uses while talking to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Chip {
    /// This is the name of the chip in base form.
    /// E.g. `MC56F8013`.
    pub name: String,
    /// Data space address of the System Integration Module control register.
    ///
    /// Only variants with a known SIM layout perform a SIM reset on `soft_reset_halt`
    /// and before a mass erase.
    #[serde(
        default,
        serialize_with = "hex_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub sim_base: Option<u32>,
    /// Debug port geometry and core polling budgets.
    #[serde(default)]
    pub debug: DebugProperties,
    /// The flash module of this variant.
    #[serde(default)]
    pub flash: FlashProperties,
}

impl Chip {
    /// Create a chip description with the default debug and flash properties.
    pub fn generic(name: impl Into<String>) -> Self {
        Chip {
            name: name.into(),
            sim_base: None,
            debug: DebugProperties::default(),
            flash: FlashProperties::default(),
        }
    }
}

/// Debug port and core control properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DebugProperties {
    /// Instruction register length of the core TAP.
    pub core_ir_length: u8,
    /// Instruction register length of the chip level (master) TAP.
    pub master_ir_length: u8,
    /// How long to wait for the core to leave debug mode after a resume.
    pub resume: PollSettings,
    /// Number of queued memory writes after which the scan engine is forced to execute.
    pub write_flush_interval: u32,
}

impl Default for DebugProperties {
    fn default() -> Self {
        DebugProperties {
            core_ir_length: 4,
            master_ir_length: 8,
            resume: PollSettings {
                attempts: 20,
                timeout_ms: 1000,
            },
            write_flush_interval: 4095,
        }
    }
}

/// Budget of a bounded polling loop.
///
/// A loop gives up as soon as either the attempts or the timeout are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollSettings {
    /// Maximum number of status reads.
    pub attempts: u32,
    /// Deadline in milliseconds, measured from the first status read.
    pub timeout_ms: u64,
}

impl PollSettings {
    /// The deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
