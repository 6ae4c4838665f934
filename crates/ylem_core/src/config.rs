//! # Memory Configuration
//!
//! Storage capacities and the root datatype, loaded once at startup from
//! a TOML file:
//!
//! ```toml
//! root = "universe"
//! default_capacity = 256
//!
//! [capacities]
//! scene = 64
//! variable = 8192
//! ```
//!
//! Every key is optional. Datatypes without an explicit capacity use the
//! engine's built-in table; `default_capacity` covers tags outside the
//! [`Datatype`] enumeration.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::datatype::{Datatype, TypeTag};
use crate::error::{MemoryError, MemoryResult};

/// Capacity for tags the engine does not know about.
pub const DEFAULT_CAPACITY: u32 = 256;

/// On-disk layout of the configuration file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MemoryConfigFile {
    root: Option<String>,
    default_capacity: Option<u32>,
    capacities: HashMap<String, u32>,
}

/// Validated memory configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Type whose allocator is destroyed last.
    root: TypeTag,
    /// Capacity for unknown tags.
    default_capacity: u32,
    /// Per-type capacity overrides.
    capacities: HashMap<TypeTag, u32>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            root: Datatype::Universe.into(),
            default_capacity: DEFAULT_CAPACITY,
            capacities: HashMap::new(),
        }
    }
}

impl MemoryConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` on malformed TOML, unknown datatype names or zero
    /// capacities.
    pub fn from_toml_str(source: &str) -> MemoryResult<Self> {
        let file: MemoryConfigFile =
            toml::from_str(source).map_err(|err| MemoryError::InvalidConfig(err.to_string()))?;

        let mut config = Self::default();

        if let Some(root) = file.root {
            config.root = root.parse::<Datatype>()?.into();
        }

        if let Some(default_capacity) = file.default_capacity {
            config.default_capacity = nonzero("default_capacity", default_capacity)?;
        }

        for (name, capacity) in file.capacities {
            let datatype: Datatype = name.parse()?;
            config
                .capacities
                .insert(datatype.into(), nonzero(&name, capacity)?);
        }

        Ok(config)
    }

    /// Reads and validates a TOML file.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the file cannot be read or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|err| {
            MemoryError::InvalidConfig(format!("{}: {err}", path.display()))
        })?;
        tracing::info!("Loading memory configuration from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// Sets the root type.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<TypeTag>) -> Self {
        self.root = root.into();
        self
    }

    /// Overrides the storage capacity of one type.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn with_capacity(mut self, tag: impl Into<TypeTag>, capacity: u32) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        self.capacities.insert(tag.into(), capacity);
        self
    }

    /// The root type.
    #[inline]
    #[must_use]
    pub const fn root(&self) -> TypeTag {
        self.root
    }

    /// Number of instances per storage for `tag`.
    #[must_use]
    pub fn capacity_for(&self, tag: TypeTag) -> u32 {
        if let Some(capacity) = self.capacities.get(&tag) {
            return *capacity;
        }
        Datatype::from_tag(tag).map_or(self.default_capacity, Datatype::default_capacity)
    }
}

fn nonzero(key: &str, capacity: u32) -> MemoryResult<u32> {
    if capacity == 0 {
        return Err(MemoryError::InvalidConfig(format!(
            "capacity for {key} must be greater than zero"
        )));
    }
    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_builtin_table() {
        let config = MemoryConfig::default();
        assert_eq!(config.root(), Datatype::Universe.into());
        assert_eq!(config.capacity_for(Datatype::Variable.into()), 4096);
        assert_eq!(config.capacity_for(Datatype::Scene.into()), 256);
        assert_eq!(config.capacity_for(TypeTag(1000)), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_parse_full_config() {
        let config = MemoryConfig::from_toml_str(
            r#"
            root = "scene"
            default_capacity = 32

            [capacities]
            scene = 64
            variable = 8192
            "#,
        )
        .unwrap();

        assert_eq!(config.root(), Datatype::Scene.into());
        assert_eq!(config.capacity_for(Datatype::Scene.into()), 64);
        assert_eq!(config.capacity_for(Datatype::Variable.into()), 8192);
        assert_eq!(config.capacity_for(Datatype::Brain.into()), 16);
        assert_eq!(config.capacity_for(TypeTag(500)), 32);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(MemoryConfig::from_toml_str("").unwrap(), MemoryConfig::default());
    }

    #[test]
    fn test_rejects_bad_configs() {
        assert!(matches!(
            MemoryConfig::from_toml_str("[capacities]\ndragon = 4"),
            Err(MemoryError::InvalidConfig(_))
        ));
        assert!(matches!(
            MemoryConfig::from_toml_str("[capacities]\nscene = 0"),
            Err(MemoryError::InvalidConfig(_))
        ));
        assert!(matches!(
            MemoryConfig::from_toml_str("root = \"nowhere\""),
            Err(MemoryError::InvalidConfig(_))
        ));
        assert!(matches!(
            MemoryConfig::from_toml_str("slab_size = 3"),
            Err(MemoryError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_builder_overrides() {
        let config = MemoryConfig::default()
            .with_root(TypeTag(42))
            .with_capacity(Datatype::Object, 2);
        assert_eq!(config.root(), TypeTag(42));
        assert_eq!(config.capacity_for(Datatype::Object.into()), 2);
    }

    #[test]
    fn test_from_missing_file() {
        assert!(matches!(
            MemoryConfig::from_file("/nonexistent/memory.toml"),
            Err(MemoryError::InvalidConfig(_))
        ));
    }
}
