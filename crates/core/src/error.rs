//! Error types for vessel containers
//!
//! This module defines the error taxonomy shared by every layer: value
//! operations, wire codecs, and the resource collaborators (pool, files).
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Each error carries a stable numeric code and a coarse category so that
//! callers exchanging containers across process boundaries can report
//! failures without matching on Rust types.

use crate::value::ValueKind;
use thiserror::Error;

/// Result type alias for vessel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse grouping of error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Key lookup, typed extraction, key validation
    ValueOperation,
    /// Encoding and decoding in any wire format
    Serialization,
    /// Memory and file collaborators
    Resource,
}

impl ErrorCategory {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::ValueOperation => "value_operation",
            ErrorCategory::Serialization => "serialization",
            ErrorCategory::Resource => "resource",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for container operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// No value is stored under the key
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Keys must contain at least one character
    #[error("Key must not be empty")]
    EmptyKey,

    /// The stored kind cannot be converted to the requested type
    #[error("Type mismatch for '{key}': expected {expected}, found {actual}")]
    TypeMismatch {
        /// Key that was read
        key: String,
        /// Requested Rust type
        expected: &'static str,
        /// Kind actually stored
        actual: ValueKind,
    },

    /// Input does not look like any supported format, or the format is unusable here
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Encoding a container failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Decoding input failed; the target container is left untouched
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Text payload is not valid for the requested encoding
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// A buffer could not be reserved
    #[error("Memory allocation failed: {0}")]
    MemoryAllocationFailed(String),

    /// Path does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Path exists but could not be read
    #[error("File read error: {0}")]
    FileReadError(String),

    /// Path could not be written
    #[error("File write error: {0}")]
    FileWriteError(String),
}

impl Error {
    /// Numeric error code, stable across releases
    pub fn code(&self) -> u16 {
        match self {
            Error::KeyNotFound(_) => 100,
            Error::TypeMismatch { .. } => 101,
            Error::EmptyKey => 105,
            Error::SerializationFailed(_) => 200,
            Error::DeserializationFailed(_) => 201,
            Error::InvalidFormat(_) => 202,
            Error::EncodingError(_) => 207,
            Error::MemoryAllocationFailed(_) => 400,
            Error::FileNotFound(_) => 401,
            Error::FileReadError(_) => 402,
            Error::FileWriteError(_) => 403,
        }
    }

    /// Category the error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self.code() {
            100..=199 => ErrorCategory::ValueOperation,
            200..=299 => ErrorCategory::Serialization,
            _ => ErrorCategory::Resource,
        }
    }

    /// True for errors that a retry with the same input cannot fix
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidFormat(_)
                | Error::DeserializationFailed(_)
                | Error::EncodingError(_)
                | Error::EmptyKey
        )
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Error::MemoryAllocationFailed(e.to_string())
    }
}
