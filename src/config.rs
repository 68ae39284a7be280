//! # Configuration Management Module
//!
//! Persistent application settings stored in platform-appropriate locations.
//! Handles loading, saving, and providing defaults for configuration options.
//!
//! ## Settings
//! - `max_concurrent_lookups`: Cap on location requests in flight at once
//! - `record_without_location`: Keep sightings whose location lookup failed
//! - `location`: Where fixes come from and how fresh they must be
//!
//! The device filter itself is fixed and has no setting.
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/beacon-scout/config.toml
//! - Linux: ~/.config/beacon-scout/config.toml
//! - Windows: %APPDATA%\beacon-scout\config.toml

use crate::error::ConfigError;
use crate::location::LocationRequest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub max_concurrent_lookups: usize,
    pub record_without_location: bool,
    pub location: LocationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: 4,
            record_without_location: false,
            location: LocationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub high_accuracy: bool,
    pub timeout_secs: u64,
    pub maximum_age_ms: u64,
    pub source: LocationSource,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_secs: 10,
            maximum_age_ms: 1000,
            source: LocationSource::default(),
        }
    }
}

impl LocationConfig {
    pub fn request(&self) -> LocationRequest {
        LocationRequest {
            high_accuracy: self.high_accuracy,
            timeout: Duration::from_secs(self.timeout_secs),
            maximum_age: Duration::from_millis(self.maximum_age_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LocationSource {
    /// A local gpsd daemon
    Gpsd { address: String },
    /// Coordinates entered by hand, for stationary setups
    Fixed { latitude: f64, longitude: f64 },
}

impl Default for LocationSource {
    fn default() -> Self {
        LocationSource::Gpsd {
            address: "127.0.0.1:2947".to_string(),
        }
    }
}

impl Config {
    /// Get the path to the config file
    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("beacon-scout")
            .join("config.toml")
    }

    /// Load config from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`, or write and return the defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let config = toml::from_str(&contents)
                    .map_err(ConfigError::ParseFailed)?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to `path`, creating parent directories as needed
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string)
            .map_err(ConfigError::WriteFailed)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_lookups, 4);
        assert!(!config.record_without_location);

        let request = config.location.request();
        assert!(request.high_accuracy);
        assert_eq!(request.timeout, Duration::from_secs(10));
        assert_eq!(request.maximum_age, Duration::from_secs(1));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            max_concurrent_lookups = 2
            record_without_location = true

            [location]
            timeout_secs = 5

            [location.source]
            provider = "fixed"
            latitude = 37.7749
            longitude = -122.4194
        "#;

        let config: Config = toml::from_str(toml_str).expect("Failed to deserialize");
        assert_eq!(config.max_concurrent_lookups, 2);
        assert!(config.record_without_location);
        assert_eq!(config.location.timeout_secs, 5);
        assert_eq!(config.location.maximum_age_ms, 1000);
        assert_eq!(
            config.location.source,
            LocationSource::Fixed { latitude: 37.7749, longitude: -122.4194 }
        );
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str("record_without_location = true")
            .expect("Failed to deserialize");
        assert!(config.record_without_location);
        assert_eq!(config.location, LocationConfig::default());
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).expect("Failed to load config");
        assert_eq!(config, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.max_concurrent_lookups = 8;
        config.location.source = LocationSource::Gpsd { address: "10.0.0.5:2947".to_string() };
        config.save_to(&path).expect("Failed to save config");

        let loaded = Config::load_from(&path).expect("Failed to load config");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_concurrent_lookups = \"many\"").expect("Failed to write");

        match Config::load_from(&path) {
            Err(ConfigError::ParseFailed(_)) => {}
            other => panic!("expected parse failure, got {:?}", other),
        }
    }
}
