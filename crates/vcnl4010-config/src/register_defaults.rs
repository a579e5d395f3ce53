//! Default register programming
//!
//! Ordered list of register writes applied after the device node is created.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A single default register write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDefault {
    /// Register name as exposed on the attribute channel
    pub register: String,
    /// Raw value; masked by the register's write mask before transmission
    pub value: u8,
}

impl RegisterDefault {
    pub fn new(register: impl Into<String>, value: u8) -> Self {
        Self {
            register: register.into(),
            value,
        }
    }
}

/// Default register values, written in list order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_writes")]
    pub writes: Vec<RegisterDefault>,
}

/// Full operation enable, slowest proximity rate, continuous ambient-light
/// conversion with default averaging.
fn default_writes() -> Vec<RegisterDefault> {
    vec![
        RegisterDefault::new("command", 0xFF),
        RegisterDefault::new("proximity_rate", 0x00),
        RegisterDefault::new("ambient_light", 0x9D),
    ]
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            writes: default_writes(),
        }
    }
}

impl DefaultsConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if let Some(entry) = self.writes.iter().find(|w| w.register.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "default write of 0x{:02x} has no register name",
                entry.value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let defaults = DefaultsConfig::default();
        let names: Vec<&str> = defaults.writes.iter().map(|w| w.register.as_str()).collect();
        assert_eq!(names, ["command", "proximity_rate", "ambient_light"]);
        assert_eq!(defaults.writes[0].value, 0xFF);
        assert_eq!(defaults.writes[1].value, 0x00);
        assert_eq!(defaults.writes[2].value, 0x9D);
    }

    #[test]
    fn test_empty_register_name_rejected() {
        let defaults = DefaultsConfig {
            writes: vec![RegisterDefault::new("", 0x01)],
        };
        assert!(defaults.validate().is_err());
    }

    #[test]
    fn test_empty_list_is_valid() {
        let defaults = DefaultsConfig { writes: vec![] };
        assert!(defaults.validate().is_ok());
    }
}
