//! Container configuration via `vessel.toml`
//!
//! Every field has a default, so an empty file is a valid configuration.
//! Configurations can also be built in code with the `with_*` methods.

use serde::{Deserialize, Serialize};
use std::path::Path;
use vessel_core::{DEFAULT_MESSAGE_TYPE, DEFAULT_VERSION};
use vessel_wire::Format;

/// Conventional config file name
pub const CONFIG_FILE_NAME: &str = "vessel.toml";

/// Container configuration
///
/// # Example
///
/// ```toml
/// default_message_type = "data_container"
/// default_version = "1.0"
/// default_format = "text"
/// retain_raw_buffer = true
/// max_document_bytes = 67108864
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerConfig {
    /// Message type given to new containers
    #[serde(default = "default_message_type")]
    pub default_message_type: String,
    /// Version given to new containers
    #[serde(default = "default_version")]
    pub default_version: String,
    /// Format used by `save` and `copy` when none is named
    #[serde(default = "default_format")]
    pub default_format: Format,
    /// Keep the raw text buffer after deserializing so zero-copy views work
    #[serde(default = "default_retain_raw_buffer")]
    pub retain_raw_buffer: bool,
    /// Largest input accepted by `deserialize` and `load`, in bytes
    #[serde(default = "default_max_document_bytes")]
    pub max_document_bytes: usize,
}

fn default_message_type() -> String {
    DEFAULT_MESSAGE_TYPE.to_string()
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_format() -> Format {
    Format::Text
}

fn default_retain_raw_buffer() -> bool {
    true
}

fn default_max_document_bytes() -> usize {
    64 * 1024 * 1024 // 64MB
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            default_message_type: default_message_type(),
            default_version: default_version(),
            default_format: default_format(),
            retain_raw_buffer: default_retain_raw_buffer(),
            max_document_bytes: default_max_document_bytes(),
        }
    }
}

impl ContainerConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the message type of new containers (builder pattern)
    pub fn with_default_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.default_message_type = message_type.into();
        self
    }

    /// Set the version of new containers (builder pattern)
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = version.into();
        self
    }

    /// Set the default output format (builder pattern)
    pub fn with_default_format(mut self, format: Format) -> Self {
        self.default_format = format;
        self
    }

    /// Keep or drop the raw buffer after deserializing (builder pattern)
    pub fn with_retain_raw_buffer(mut self, retain: bool) -> Self {
        self.retain_raw_buffer = retain;
        self
    }

    /// Set the input size limit (builder pattern)
    pub fn with_max_document_bytes(mut self, bytes: usize) -> Self {
        self.max_document_bytes = bytes;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_message_type.trim().is_empty() {
            return Err(ConfigError::EmptyMessageType);
        }
        if self.default_version.trim().is_empty() {
            return Err(ConfigError::EmptyVersion);
        }
        for value in [&self.default_message_type, &self.default_version] {
            if value.contains("];") {
                return Err(ConfigError::UnencodableHeader(value.clone()));
            }
        }
        if self.max_document_bytes < 16 {
            return Err(ConfigError::DocumentLimitTooSmall);
        }
        Ok(())
    }

    /// Returns the default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# Vessel container configuration
#
# Header given to new containers. "data_container" marks an untyped
# container; its routing ids are left out of every encoding.
default_message_type = "data_container"
default_version = "1.0"

# Format used by save/copy when none is named: "text", "json", "xml", "msgpack"
default_format = "text"

# Keep the raw text buffer after deserializing so zero-copy views work
retain_raw_buffer = true

# Largest accepted input, in bytes (default: 64MB)
max_document_bytes = 67108864
"#
    }

    /// Read, parse and validate config from a file path
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Io(format!("failed to read '{}': {}", path.display(), e))
        })?;
        let config: ContainerConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::Parse(format!("failed to parse '{}': {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize this config to TOML and write it to the given path
    pub fn write_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| {
            ConfigError::Io(format!("failed to write '{}': {}", path.display(), e))
        })
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Message type is blank
    #[error("default_message_type must not be empty")]
    EmptyMessageType,

    /// Version is blank
    #[error("default_version must not be empty")]
    EmptyVersion,

    /// A header default contains the text-format pair terminator
    #[error("header default '{0}' contains \"];\"")]
    UnencodableHeader(String),

    /// Size limit cannot hold even an empty document
    #[error("max_document_bytes must be at least 16")]
    DocumentLimitTooSmall,

    /// File could not be read or written
    #[error("config I/O error: {0}")]
    Io(String),

    /// File is not valid TOML for this configuration
    #[error("config parse error: {0}")]
    Parse(String),
}
