// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration. Limits
//! may be lowered below the bus maxima, never raised above them.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::signature::{SignatureLimits, MAX_ARRAY_DEPTH, MAX_SIGNATURE_LEN, MAX_STRUCT_DEPTH};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Marshalling engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum struct and dict entry nesting.
    #[serde(default = "default_struct_depth")]
    pub max_struct_depth: usize,

    /// Maximum array nesting.
    #[serde(default = "default_array_depth")]
    pub max_array_depth: usize,

    /// Maximum signature length in bytes.
    #[serde(default = "default_signature_len")]
    pub max_signature_len: usize,

    /// Initial capacity of signature registries built from this config.
    #[serde(default = "default_registry_capacity")]
    pub registry_capacity_hint: usize,
}

fn default_struct_depth() -> usize {
    MAX_STRUCT_DEPTH
}

fn default_array_depth() -> usize {
    MAX_ARRAY_DEPTH
}

fn default_signature_len() -> usize {
    MAX_SIGNATURE_LEN
}

fn default_registry_capacity() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_struct_depth: MAX_STRUCT_DEPTH,
            max_array_depth: MAX_ARRAY_DEPTH,
            max_signature_len: MAX_SIGNATURE_LEN,
            registry_capacity_hint: 64,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_limit("max_struct_depth", self.max_struct_depth, MAX_STRUCT_DEPTH)?;
        check_limit("max_array_depth", self.max_array_depth, MAX_ARRAY_DEPTH)?;
        check_limit("max_signature_len", self.max_signature_len, MAX_SIGNATURE_LEN)?;
        Ok(())
    }

    pub fn limits(&self) -> SignatureLimits {
        SignatureLimits {
            max_len: self.max_signature_len,
            max_struct_depth: self.max_struct_depth,
            max_array_depth: self.max_array_depth,
        }
    }
}

fn check_limit(name: &str, value: usize, max: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
    }
    if value > max {
        return Err(ConfigError::Invalid(format!(
            "{} is {}, the bus allows at most {}",
            name, value, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.limits(), SignatureLimits::default());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("max_array_depth = 4\n").expect("valid");
        assert_eq!(config.max_array_depth, 4);
        assert_eq!(config.max_struct_depth, MAX_STRUCT_DEPTH);
        assert_eq!(config.registry_capacity_hint, 64);
    }

    #[test]
    fn test_limits_cannot_exceed_bus_maxima() {
        let err = EngineConfig::from_toml_str("max_signature_len = 1024\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("max_signature_len"));

        let err = EngineConfig::from_toml_str("max_struct_depth = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_config_from_file_round_trip() {
        let config = EngineConfig {
            max_struct_depth: 8,
            ..EngineConfig::default()
        };
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(config.to_toml().expect("render").as_bytes())
            .expect("write");
        let loaded = EngineConfig::from_file(file.path()).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_bad_toml_is_reported() {
        assert!(matches!(
            EngineConfig::from_toml_str("max_struct_depth = \"deep\""),
            Err(ConfigError::Toml(_))
        ));
    }
}
