//! Bus contract configuration.
//!
//! The engine recognises a single bus interface by its fully qualified
//! name. The defaults match the event bus the tool was written for; a
//! project can override them with a `bus-indexer.toml` at its root.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_BUS_INTERFACE: &str = "com.nwpu.ucdp.util.IEventBus";
pub const DEFAULT_POST_METHOD: &str = "post";
pub const DEFAULT_OBSERVE_METHOD: &str = "observe";
/// Top-level Kotlin extension on the bus interface; its first type
/// argument is the observed event.
pub const DEFAULT_EXT_OBSERVE_FUNCTION: &str = "com.nwpu.ucdp.util.observe";

/// File names looked up at the project root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["bus-indexer.toml", ".bus-indexer.toml"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub bus_interface: String,
    pub post_method: String,
    pub observe_method: String,
    pub ext_observe_function: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            bus_interface: DEFAULT_BUS_INTERFACE.to_string(),
            post_method: DEFAULT_POST_METHOD.to_string(),
            observe_method: DEFAULT_OBSERVE_METHOD.to_string(),
            ext_observe_function: DEFAULT_EXT_OBSERVE_FUNCTION.to_string(),
        }
    }
}

impl BusConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Loads the config for a project: an explicit path wins, then a
    /// config file at the project root, then the defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!("Loading bus config from {}", path.display());
            return Self::from_file(path);
        }

        match Self::find_in(root) {
            Some(path) => {
                tracing::debug!("Loading bus config from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn find_in(root: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_file())
    }

    /// Simple name of the configured interface (`IEventBus`).
    pub fn interface_simple_name(&self) -> &str {
        self.bus_interface
            .rsplit('.')
            .next()
            .unwrap_or(&self.bus_interface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BusConfig::default();
        assert_eq!(config.bus_interface, "com.nwpu.ucdp.util.IEventBus");
        assert_eq!(config.post_method, "post");
        assert_eq!(config.observe_method, "observe");
        assert_eq!(config.ext_observe_function, "com.nwpu.ucdp.util.observe");
        assert_eq!(config.interface_simple_name(), "IEventBus");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BusConfig::from_toml_str(r#"bus_interface = "org.demo.Bus""#).unwrap();
        assert_eq!(config.bus_interface, "org.demo.Bus");
        assert_eq!(config.post_method, "post");
        assert_eq!(config.interface_simple_name(), "Bus");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = BusConfig::from_toml_str("bus_interface = [").unwrap_err();
        assert!(matches!(err, crate::error::BusError::Config(_)));
    }

    #[test]
    fn test_load_from_project_root() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("bus-indexer.toml"),
            "post_method = \"publish\"\n",
        )
        .unwrap();

        let config = BusConfig::load(temp_dir.path(), None).unwrap();
        assert_eq!(config.post_method, "publish");
        assert_eq!(config.observe_method, "observe");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = BusConfig::load(temp_dir.path(), None).unwrap();
        assert_eq!(config, BusConfig::default());
    }

    #[test]
    fn test_explicit_path_missing_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(BusConfig::load(temp_dir.path(), Some(&missing)).is_err());
    }
}
