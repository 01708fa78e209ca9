//! Target descriptions known to the driver.

use std::io::Read;
use std::path::Path;

use dsp5680xx_target::{Chip, ChipFamily, TargetDescriptionSource};

/// The built-in description of the DSP5680xx family.
const BUILTIN_TARGETS: &str = include_str!("../targets/DSP5680xx.yaml");

/// Error while looking up or loading a target description.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("The requested chip '{0}' was not found.")]
    ChipNotFound(String),
    #[error("The chip family '{name}' is invalid: {reason}")]
    InvalidChipFamilyDefinition { name: String, reason: String },
    #[error("An IO error was encountered")]
    Io(#[from] std::io::Error),
    #[error("Invalid YAML in target description")]
    Yaml(#[from] serde_yaml::Error),
}

/// A collection of chip families.
#[derive(Debug, Clone)]
pub struct Registry {
    families: Vec<ChipFamily>,
}

impl Registry {
    /// A registry holding only the built-in description.
    pub fn from_builtin_families() -> Result<Self, RegistryError> {
        let mut family: ChipFamily = serde_yaml::from_str(BUILTIN_TARGETS)?;
        family.source = TargetDescriptionSource::BuiltIn;

        let mut registry = Registry {
            families: Vec::new(),
        };
        registry.add_family(family)?;
        Ok(registry)
    }

    pub fn families(&self) -> &[ChipFamily] {
        &self.families
    }

    /// Find a chip by name, ignoring case.
    pub fn get_chip(&self, name: &str) -> Result<Chip, RegistryError> {
        self.families
            .iter()
            .find_map(|family| family.variant(name))
            .cloned()
            .ok_or_else(|| RegistryError::ChipNotFound(name.to_string()))
    }

    /// Add a chip family from a YAML description, replacing a family of the same name.
    ///
    /// Returns the name of the added family.
    pub fn add_target_from_yaml<R: Read>(&mut self, reader: R) -> Result<String, RegistryError> {
        let mut family: ChipFamily = serde_yaml::from_reader(reader)?;
        family.source = TargetDescriptionSource::External;

        let name = family.name.clone();
        self.add_family(family)?;
        Ok(name)
    }

    pub fn add_target_from_file(&mut self, path: &Path) -> Result<String, RegistryError> {
        let file = std::fs::File::open(path)?;
        self.add_target_from_yaml(file)
    }

    fn add_family(&mut self, family: ChipFamily) -> Result<(), RegistryError> {
        family
            .validate()
            .map_err(|reason| RegistryError::InvalidChipFamilyDefinition {
                name: family.name.clone(),
                reason,
            })?;

        tracing::debug!(
            "Adding chip family {} ({:?}) with {} variants",
            family.name,
            family.source,
            family.variants.len()
        );
        self.families.retain(|old| old.name != family.name);
        self.families.push(family);
        Ok(())
    }
}

/// Get a chip from the built-in descriptions by name.
pub fn get_target_by_name(name: &str) -> Result<Chip, RegistryError> {
    Registry::from_builtin_families()?.get_chip(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn builtin_variants() {
        let registry = Registry::from_builtin_families().unwrap();

        let chip = registry.get_chip("mc56f8013").unwrap();
        assert_eq!(chip.name, "MC56F8013");
        assert_eq!(chip.sim_base, Some(0xF140));
        assert_eq!(chip.flash.module_base, 0xF400);
        assert_eq!(chip.flash.range, 0..0x2000);
        assert_eq!(chip.flash.stub_address, 0x8700);
        assert_eq!(chip.debug.resume.attempts, 20);
        assert_eq!(chip.flash.command.attempts, 100);

        let chip = registry.get_chip("MC56F8036").unwrap();
        assert_eq!(chip.sim_base, None);
        assert_eq!(registry.families()[0].source, TargetDescriptionSource::BuiltIn);
    }

    #[test]
    fn unknown_chip() {
        let error = get_target_by_name("STM32F103").unwrap_err();

        assert!(matches!(error, RegistryError::ChipNotFound(name) if name == "STM32F103"));
    }

    #[test]
    fn external_family_replaces_builtin() {
        let mut registry = Registry::from_builtin_families().unwrap();
        let yaml = "name: DSP5680xx\nvariants:\n  - name: MC56F8014\n    sim_base: 0xF140\n";

        let name = registry.add_target_from_yaml(yaml.as_bytes()).unwrap();

        assert_eq!(name, "DSP5680xx");
        assert_eq!(registry.families().len(), 1);
        assert!(registry.get_chip("MC56F8013").is_err());
        assert_eq!(registry.get_chip("MC56F8014").unwrap().sim_base, Some(0xF140));
    }

    #[test]
    fn family_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "name: MC56F802x\nvariants:\n  - name: MC56F8025\n    flash:\n      range:\n        start: 0x0\n        end: 0x4000\n"
        )
        .unwrap();
        let mut registry = Registry::from_builtin_families().unwrap();

        let name = registry.add_target_from_file(file.path()).unwrap();

        assert_eq!(name, "MC56F802x");
        assert_eq!(registry.families().len(), 2);
        assert_eq!(registry.families()[1].source, TargetDescriptionSource::External);
        assert_eq!(registry.get_chip("mc56f8025").unwrap().flash.range, 0..0x4000);
        assert!(registry.get_chip("MC56F8013").is_ok());
    }

    #[test]
    fn missing_file() {
        let directory = tempfile::tempdir().unwrap();
        let mut registry = Registry::from_builtin_families().unwrap();

        let error = registry
            .add_target_from_file(&directory.path().join("missing.yaml"))
            .unwrap_err();

        assert!(matches!(error, RegistryError::Io(_)));
    }

    #[test]
    fn invalid_family_is_rejected() {
        let mut registry = Registry::from_builtin_families().unwrap();
        let yaml = "name: Broken\nvariants:\n  - name: X\n    flash:\n      stub_address: 0x10\n";

        let error = registry.add_target_from_yaml(yaml.as_bytes()).unwrap_err();

        assert!(matches!(
            error,
            RegistryError::InvalidChipFamilyDefinition { name, .. } if name == "Broken"
        ));
    }
}
