//! Storage policies for vessel containers
//!
//! This crate implements the interchangeable backing stores:
//! - StoragePolicy: uniform CRUD contract, chosen by type parameter
//! - LinearStorage: vector with linear scans, the default for small containers
//! - IndexedStorage: vector plus FxHashMap name index for large containers
//!
//! Both policies preserve insertion order, so switching policy never changes
//! what a codec writes.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod indexed;
pub mod linear;
pub mod policy;

pub use indexed::IndexedStorage;
pub use linear::LinearStorage;
pub use policy::StoragePolicy;
