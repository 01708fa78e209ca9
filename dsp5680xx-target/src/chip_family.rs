use super::chip::Chip;

use serde::{Deserialize, Serialize};

/// Source of a target description.
///
/// This is used for diagnostics, when
/// an error related to a target description occurs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TargetDescriptionSource {
    /// The target description is a built-in target description,
    /// which was included into the driver at compile time.
    BuiltIn,
    /// The target description was from an external source
    /// during runtime.
    #[default]
    External,
}

/// This describes a chip family with all its variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChipFamily {
    /// This is the name of the chip family in base form.
    /// E.g. `DSP5680xx`.
    pub name: String,
    /// This vector holds all the variants of the family.
    pub variants: Vec<Chip>,
    /// Source of the target description, used for diagnostics.
    #[serde(skip)]
    pub source: TargetDescriptionSource,
}

impl ChipFamily {
    /// Validates the [`ChipFamily`] such that the driver can use it.
    pub fn validate(&self) -> Result<(), String> {
        if self.variants.is_empty() {
            return Err(format!("chip family {} has no variants", self.name));
        }

        for variant in &self.variants {
            let flash = &variant.flash;
            let debug = &variant.debug;

            if flash.size() == 0 {
                return Err(format!("{}: the flash range is empty", variant.name));
            }

            if flash.range.contains(&flash.stub_address) {
                return Err(format!(
                    "{}: the flashing stub at {:#06x} would overwrite the flash array",
                    variant.name, flash.stub_address
                ));
            }

            if !flash.contains(flash.lock_address, 2) {
                return Err(format!(
                    "{}: the security words at {:#06x} are outside the flash array",
                    variant.name, flash.lock_address
                ));
            }

            if flash.clock_divisor > 0x7F {
                return Err(format!(
                    "{}: clock divisor {:#x} does not fit in seven bits",
                    variant.name, flash.clock_divisor
                ));
            }

            if debug.core_ir_length == 0 || debug.master_ir_length == 0 {
                return Err(format!("{}: zero length instruction register", variant.name));
            }

            if debug.resume.attempts == 0 || flash.command.attempts == 0 {
                return Err(format!("{}: polling needs at least one attempt", variant.name));
            }

            if debug.write_flush_interval == 0 || flash.stream_flush_interval == 0 {
                return Err(format!("{}: flush intervals must be positive", variant.name));
            }
        }

        Ok(())
    }

    /// Get the variant with the given name, ignoring case.
    pub fn variant(&self, name: &str) -> Option<&Chip> {
        self.variants
            .iter()
            .find(|variant| variant.name.eq_ignore_ascii_case(name))
    }

    /// Get the names of all variants of this family.
    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|variant| variant.name.as_str())
    }
}
