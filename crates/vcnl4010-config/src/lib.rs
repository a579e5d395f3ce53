//! Configuration management for the VCNL4010 driver
//!
//! Holds the sensor family's identity (node name prefix, class name, compatible
//! strings, fixed bus address) and the default register values programmed on
//! every bind. Configuration is stored as TOML; a local override file is merged
//! on top of the system file.

mod device_config;
mod register_defaults;

pub use device_config::DeviceConfig;
pub use register_defaults::{DefaultsConfig, RegisterDefault};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/vcnl4010";
pub const OVERRIDE_DIR: &str = "/var/lib/vcnl4010";
pub const CONFIG_FILE: &str = "driver.toml";

/// Complete driver configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl DriverConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the system file and merge an optional override file on top of it
    pub fn load_layered(system: &Path, overlay: &Path) -> Result<Self, ConfigError> {
        let mut base: toml::Value = toml::from_str(&std::fs::read_to_string(system)?)?;

        if overlay.exists() {
            let overlay_value: toml::Value = toml::from_str(&std::fs::read_to_string(overlay)?)?;
            merge_toml(&mut base, overlay_value);
            tracing::debug!("Merged configuration override from {}", overlay.display());
        }

        let config: Self = base.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let system_config = Path::new(CONFIG_DIR).join(CONFIG_FILE);
        let override_config = Path::new(OVERRIDE_DIR).join(CONFIG_FILE);

        if system_config.exists() {
            return Self::load_layered(&system_config, &override_config);
        }

        if override_config.exists() {
            return Self::load(&override_config);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Check the configuration for values the driver cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.device.validate()?;
        self.defaults.validate()
    }
}

/// Helper function to merge TOML values
pub fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
