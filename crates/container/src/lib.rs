//! The vessel value container
//!
//! This crate ties values, storage and codecs together:
//! - ValueContainer: locked, ordered key/value container with CRUD, batch
//!   and compare-and-swap operations
//! - ValueView: zero-copy access to a retained text buffer
//! - MemoryPool: injectable buffer pool (DirectAllocator, BlockPool)
//! - metrics: process-wide counters and latency histograms
//! - ContainerConfig: `vessel.toml` configuration
//! - load / save: whole-file I/O
//!
//! # Concurrency
//!
//! Each container owns one `parking_lot::RwLock`. Reads share it, writes
//! take it exclusively, and writers are serialized even on disjoint keys.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod container;
pub mod io;
pub mod metrics;
pub mod pool;
pub mod zero_copy;

pub use config::{ConfigError, ContainerConfig, CONFIG_FILE_NAME};
pub use container::{UpdateSpec, ValueContainer};
pub use io::{load, save};
pub use metrics::{LatencySummary, Metrics, MetricsSnapshot, Operation};
pub use pool::{BlockPool, DirectAllocator, MemoryPool, PoolStats};
pub use zero_copy::ValueView;
