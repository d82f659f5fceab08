//! Validation error types

use std::fmt;
use thiserror::Error;

/// Kind of constraint that failed, with stable numeric codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationCode {
    /// A required field is absent
    MissingRequired,
    /// The stored kind differs from the declared kind
    TypeMismatch,
    /// A number falls outside its declared range
    OutOfRange,
    /// A string or byte length falls outside its declared bounds
    InvalidLength,
    /// A string does not match its pattern
    PatternMismatch,
    /// A string is not one of the allowed values
    NotAllowed,
    /// A custom validator returned a message
    CustomFailed,
    /// A nested container failed its own schema
    NestedFailed,
}

impl ValidationCode {
    /// Numeric code
    pub fn code(&self) -> u16 {
        match self {
            ValidationCode::MissingRequired => 310,
            ValidationCode::TypeMismatch => 311,
            ValidationCode::OutOfRange => 312,
            ValidationCode::InvalidLength => 313,
            ValidationCode::PatternMismatch => 314,
            ValidationCode::NotAllowed => 315,
            ValidationCode::CustomFailed => 316,
            ValidationCode::NestedFailed => 317,
        }
    }

    /// Generic description of the code
    pub fn description(&self) -> &'static str {
        match self {
            ValidationCode::MissingRequired => "Required field is missing",
            ValidationCode::TypeMismatch => "Field type mismatch",
            ValidationCode::OutOfRange => "Value is out of range",
            ValidationCode::InvalidLength => "Invalid length",
            ValidationCode::PatternMismatch => "Pattern mismatch",
            ValidationCode::NotAllowed => "Value not in allowed list",
            ValidationCode::CustomFailed => "Custom validation failed",
            ValidationCode::NestedFailed => "Nested schema validation failed",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// One failed constraint
///
/// `field` is a dot-separated path for fields inside nested containers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Field path
    pub field: String,
    /// Failed constraint
    pub code: ValidationCode,
    /// Human-readable message
    pub message: String,
}

impl ValidationError {
    pub(crate) fn new(field: &str, code: ValidationCode, message: String) -> Self {
        Self {
            field: field.to_string(),
            code,
            message,
        }
    }

    /// Prefix the field path with a parent field name
    pub(crate) fn nested_under(mut self, parent: &str) -> Self {
        self.field = format!("{}.{}", parent, self.field);
        self
    }
}

/// Failure of a schema-checked deserialize
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The input could not be decoded; the container is unchanged
    #[error(transparent)]
    Deserialize(#[from] vessel_core::Error),

    /// The input decoded but violates the schema; never empty
    #[error("schema validation failed with {} error(s)", .0.len())]
    Invalid(Vec<ValidationError>),
}

impl DecodeError {
    /// Numeric code: the decode error's code, or the first violation's
    pub fn code(&self) -> u16 {
        match self {
            DecodeError::Deserialize(e) => e.code(),
            DecodeError::Invalid(errors) => errors.first().map_or(0, |e| e.code.code()),
        }
    }

    /// Schema violations, empty for decode failures
    pub fn violations(&self) -> &[ValidationError] {
        match self {
            DecodeError::Deserialize(_) => &[],
            DecodeError::Invalid(errors) => errors,
        }
    }
}
