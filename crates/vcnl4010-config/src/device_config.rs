//! Sensor family identity
//!
//! Names under which the device is presented to the host and the bus
//! coordinates of the peripheral.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Highest valid 7-bit bus address (0x78..=0x7F are reserved)
const MAX_ADDRESS: u8 = 0x77;

/// Device identity and bus coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device family, used as the node name prefix ("vcnl4010" -> "vcnl40100")
    #[serde(default = "default_name")]
    pub name: String,
    /// Class/category the node is created under
    #[serde(default = "default_class_name")]
    pub class_name: String,
    /// Compatible strings accepted from device-tree matching
    #[serde(default = "default_compatible")]
    pub compatible: Vec<String>,
    /// Fixed 7-bit bus address of the sensor
    #[serde(default = "default_address")]
    pub address: u8,
    /// Bus adapter number (`/dev/i2c-<bus>`)
    #[serde(default = "default_bus")]
    pub bus: u32,
}

fn default_name() -> String {
    "vcnl4010".to_string()
}

fn default_class_name() -> String {
    "vcnl4010_class".to_string()
}

fn default_compatible() -> Vec<String> {
    vec!["vishay,vcnl4010".to_string()]
}

fn default_address() -> u8 {
    0x13
}

fn default_bus() -> u32 {
    2
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            class_name: default_class_name(),
            compatible: default_compatible(),
            address: default_address(),
            bus: default_bus(),
        }
    }
}

impl DeviceConfig {
    /// Whether a discovery id (device-tree compatible or bus id table name) names this family
    pub fn matches(&self, id: &str) -> bool {
        id == self.name || self.compatible.iter().any(|c| c == id)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("device name must not be empty".into()));
        }
        if self.class_name.trim().is_empty() {
            return Err(ConfigError::Invalid("class name must not be empty".into()));
        }
        if self.compatible.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one compatible string is required".into(),
            ));
        }
        if self.address > MAX_ADDRESS {
            return Err(ConfigError::Invalid(format!(
                "bus address 0x{:02x} is outside the 7-bit range",
                self.address
            )));
        }
        Ok(())
    }
}
