//! Device configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DEVICE_NAME: &str = "scull";
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("device name must not be empty")]
    EmptyName,

    #[error("capacity must be at least one byte")]
    ZeroCapacity,

    #[error("minor count must be at least one")]
    ZeroMinorCount,
}

/// Settings applied when the device is initialised
///
/// Every minor in the region maps to the same store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScullConfig {
    pub device_name: String,
    pub capacity: usize,
    pub first_minor: u32,
    pub minor_count: u32,
}

impl ScullConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.minor_count == 0 {
            return Err(ConfigError::ZeroMinorCount);
        }
        Ok(())
    }
}

impl Default for ScullConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            first_minor: 0,
            minor_count: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ScullConfig::default();
        assert_eq!(config.device_name, "scull");
        assert_eq!(config.capacity, 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        assert_eq!(
            ScullConfig::default().with_capacity(0).validate(),
            Err(ConfigError::ZeroCapacity)
        );

        let config = ScullConfig {
            minor_count: 0,
            ..ScullConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMinorCount));

        let config = ScullConfig {
            device_name: String::new(),
            ..ScullConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyName));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ScullConfig = serde_json::from_str(r#"{ "capacity": 64 }"#).unwrap();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.device_name, DEFAULT_DEVICE_NAME);
        assert_eq!(config.minor_count, 1);
    }
}
