//! # Error Types Module
//!
//! Centralized error handling for Beacon Scout.
//! Each concern gets its own error type so callers can match on what went wrong.
//!
//! ## Error Types
//! - `SessionError`: scan session bootstrap failures (runtime, permissions)
//! - `ScanError`: Bluetooth adapter and per-advertisement failures
//! - `LocationError`: geolocation fix failures and timeouts
//! - `ConfigError`: configuration file I/O and parsing errors
//!
//! None of these are fatal to the application. A `ScanError` or `LocationError`
//! drops the advertisement it belongs to; the next advertisement is a fresh attempt.

use crate::permissions::Permission;
use std::fmt;
use std::time::Duration;

/// Errors that prevent a scan session from starting
#[derive(Debug)]
pub enum SessionError {
    /// Failed to create Tokio runtime
    RuntimeCreation(String),
    /// One or more required permissions were not granted
    PermissionDenied(Vec<Permission>),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::RuntimeCreation(msg) => {
                write!(f, "Failed to create async runtime: {}", msg)
            }
            SessionError::PermissionDenied(denied) => {
                let names: Vec<String> = denied.iter().map(|p| p.to_string()).collect();
                write!(f, "Permissions required: {} not granted", names.join(", "))
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors that can occur during configuration operations
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read config file
    ReadFailed(std::io::Error),
    /// Failed to write config file
    WriteFailed(std::io::Error),
    /// Failed to parse config file
    ParseFailed(toml::de::Error),
    /// Failed to serialize config
    SerializeFailed(toml::ser::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ReadFailed(e) => {
                write!(f, "Failed to read config file: {}", e)
            }
            ConfigError::WriteFailed(e) => {
                write!(f, "Failed to write config file: {}", e)
            }
            ConfigError::ParseFailed(e) => {
                write!(f, "Failed to parse config file: {}", e)
            }
            ConfigError::SerializeFailed(e) => {
                write!(f, "Failed to serialize config: {}", e)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadFailed(e) => Some(e),
            ConfigError::WriteFailed(e) => Some(e),
            ConfigError::ParseFailed(e) => Some(e),
            ConfigError::SerializeFailed(e) => Some(e),
        }
    }
}

/// Errors reported by the Bluetooth discovery provider
#[derive(Debug, Clone)]
pub enum ScanError {
    /// Bluetooth manager initialization failed
    ManagerInit(String),
    /// No Bluetooth adapters available
    NoAdapters,
    /// Scan operation failed
    ScanFailed(String),
    /// A single advertisement event could not be read
    EventFailed { identity: String, reason: String },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::ManagerInit(msg) => {
                write!(f, "Failed to initialize Bluetooth manager: {}", msg)
            }
            ScanError::NoAdapters => {
                write!(f, "No Bluetooth adapters found")
            }
            ScanError::ScanFailed(msg) => {
                write!(f, "Scan operation failed: {}", msg)
            }
            ScanError::EventFailed { identity, reason } => {
                write!(f, "Failed to read advertisement from {}: {}", identity, reason)
            }
        }
    }
}

impl std::error::Error for ScanError {}

/// Errors that can occur while resolving the current position
#[derive(Debug)]
pub enum LocationError {
    /// No fix arrived within the request timeout
    Timeout(Duration),
    /// The provider could not be reached
    Io(std::io::Error),
    /// The provider answered with something we could not use
    Protocol(String),
    /// The provider has no fix to offer
    Unavailable(String),
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationError::Timeout(timeout) => {
                write!(f, "No location fix within {} ms", timeout.as_millis())
            }
            LocationError::Io(e) => {
                write!(f, "Location provider unreachable: {}", e)
            }
            LocationError::Protocol(msg) => {
                write!(f, "Invalid location report: {}", msg)
            }
            LocationError::Unavailable(msg) => {
                write!(f, "Location unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for LocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LocationError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LocationError {
    fn from(e: std::io::Error) -> Self {
        LocationError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_lists_permissions() {
        let err = SessionError::PermissionDenied(vec![
            Permission::BluetoothScan,
            Permission::FineLocation,
        ]);
        let message = err.to_string();
        assert!(message.starts_with("Permissions required"));
        assert!(message.contains("bluetooth scan"));
        assert!(message.contains("fine location"));
    }

    #[test]
    fn test_config_error_chain() {
        use std::error::Error;
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::ReadFailed(io_err);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_location_timeout_display() {
        let err = LocationError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "No location fix within 10000 ms");
    }

    #[test]
    fn test_location_io_error_chain() {
        use std::error::Error;
        let err: LocationError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("unreachable"));
    }
}
