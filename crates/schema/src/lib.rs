//! Schema validation for vessel containers
//!
//! This crate checks container contents against declared field constraints:
//! - ContainerSchema: fluent builder of field definitions and constraints
//! - ValidationError: field path, code and message of one violation
//! - ValidationCode: the eight constraint kinds, codes 310..=317
//! - DecodeError: failure of `deserialize_validated`, decode or schema
//!
//! Validation never fails as an operation; `validate_all` returns every
//! violation and `validate` the first.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod schema;

pub use error::{DecodeError, ValidationCode, ValidationError};
pub use schema::{ContainerSchema, Validator};
