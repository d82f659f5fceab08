//! Core types for vessel containers
//!
//! This crate defines the foundational types used throughout the system:
//! - ValueKind: closed set of 16 value kinds, numbered by wire tag
//! - Value: tagged payload, kind derived from the active variant
//! - NamedValue: a named payload, the unit of container storage
//! - Header / HeaderField: routing and versioning fields
//! - Document: owned snapshot of a header and ordered values
//! - Error: error taxonomy with stable numeric codes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;
pub mod value;

pub use error::{Error, ErrorCategory, Result};
pub use types::{
    Document, Header, HeaderField, NamedValue, DEFAULT_MESSAGE_TYPE, DEFAULT_VERSION,
};
pub use value::{FromValue, Value, ValueKind};
