//! # Configuration Management
//!
//! Centralized configuration for the relay server.
//!
//! This module provides structured configuration for the listener and for
//! logging, plus the port-file provider used at process startup.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Environment variables via `from_env()`
//! - Direct instantiation with defaults
//! - A port file holding a single integer (`read_port_file()`)
//!
//! ## Known Limitations
//! - Connections carry one request each and reads have no deadline; a client
//!   that stalls mid-request holds its worker until it disconnects.
//! - `max_connections` is advisory: it is logged when exceeded, not enforced.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::{warn, Level};

/// Protocol version written into every response header
pub const PROTOCOL_VERSION: u8 = 1;

/// Port used when the port file is missing or does not hold a valid port
pub const DEFAULT_PORT: u16 = 1234;

/// Port file read by the server binary when no other is given
pub const DEFAULT_PORT_FILE: &str = "myport.info";

/// Largest request payload the codec will buffer (1 MiB)
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Upper bound on `max_request_size` (256 MiB); one stored message always fits in a response
pub const MAX_REQUEST_SIZE_LIMIT: usize = 256 * 1024 * 1024;

/// How long a graceful shutdown waits for in-flight connections
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RelayConfig {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields from `MAILBOX_RELAY_*` environment variables.
    ///
    /// Unparseable numeric values are a configuration error rather than being ignored.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("MAILBOX_RELAY_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("MAILBOX_RELAY_PORT") {
            self.server.port = port.trim().parse::<u16>().map_err(|e| {
                ProtocolError::ConfigError(format!("Invalid MAILBOX_RELAY_PORT '{port}': {e}"))
            })?;
        }

        if let Ok(size) = std::env::var("MAILBOX_RELAY_MAX_REQUEST_SIZE") {
            self.server.max_request_size = size.trim().parse::<usize>().map_err(|e| {
                ProtocolError::ConfigError(format!(
                    "Invalid MAILBOX_RELAY_MAX_REQUEST_SIZE '{size}': {e}"
                ))
            })?;
        }

        if let Ok(level) = std::env::var("MAILBOX_RELAY_LOG_LEVEL") {
            self.logging.log_level = level.trim().parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid MAILBOX_RELAY_LOG_LEVEL '{level}'"))
            })?;
        }

        Ok(())
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.server.validate();
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "127.0.0.1")
    pub host: String,

    /// TCP port to listen on
    pub port: u16,

    /// Largest request payload, in bytes, accepted from a client
    pub max_request_size: usize,

    /// Timeout for graceful server shutdown
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,

    /// Connection count above which the server logs a warning
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("127.0.0.1"),
            port: DEFAULT_PORT,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            max_connections: 1000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate server configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.host.is_empty() {
            errors.push("Server host cannot be empty".to_string());
        } else if self.bind_address().parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "Invalid server host: '{}' (expected an IP address such as '0.0.0.0')",
                self.host
            ));
        }

        // The payload must at least fit the largest fixed layout: a send with empty content
        if self.max_request_size < crate::core::payload::MESSAGE_PREFIX_SIZE {
            errors.push(format!(
                "Max request size too small: {} bytes (minimum: {})",
                self.max_request_size,
                crate::core::payload::MESSAGE_PREFIX_SIZE
            ));
        } else if self.max_request_size > MAX_REQUEST_SIZE_LIMIT {
            errors.push(format!(
                "Max request size too large: {} bytes (maximum: {})",
                self.max_request_size, MAX_REQUEST_SIZE_LIMIT
            ));
        }

        if self.shutdown_timeout.as_secs() < 1 {
            errors.push("Shutdown timeout too short (minimum: 1s)".to_string());
        } else if self.shutdown_timeout.as_secs() > 60 {
            errors.push("Shutdown timeout too long (maximum: 60s)".to_string());
        }

        if self.max_connections == 0 {
            errors.push("Max connections must be greater than 0".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("mailbox-relay"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Read the listening port from a file holding a single integer.
///
/// A missing or unreadable file, or contents that are not a valid port, fall
/// back to [`DEFAULT_PORT`] with a warning.
pub fn read_port_file<P: AsRef<Path>>(path: P) -> u16 {
    let path = path.as_ref();
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(path = %path.display(), error = %e, default = DEFAULT_PORT, "Port file unreadable, using default port");
            return DEFAULT_PORT;
        }
    };

    match contents.trim().parse::<u16>() {
        Ok(port) if port != 0 => port,
        _ => {
            warn!(
                path = %path.display(),
                contents = %contents.trim(),
                default = DEFAULT_PORT,
                "Port file does not hold a valid port, using default port"
            );
            DEFAULT_PORT
        }
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
