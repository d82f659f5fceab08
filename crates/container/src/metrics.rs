//! Operation counters and latency histograms
//!
//! A single process-wide registry, disabled by default. When disabled,
//! containers skip clock reads entirely. Export as JSON or Prometheus text.
//!
//! # Usage
//!
//! ```ignore
//! vessel_container::metrics::set_enabled(true);
//! container.serialize(Format::Text)?;
//! println!("{}", vessel_container::metrics::global().to_prometheus());
//! ```

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

/// Samples kept per histogram for percentile estimates
pub const RESERVOIR_SIZE: usize = 1024;

static ENABLED: AtomicBool = AtomicBool::new(false);
static GLOBAL: Lazy<Metrics> = Lazy::new(Metrics::new);

/// Process-wide registry
pub fn global() -> &'static Metrics {
    &GLOBAL
}

/// Turn collection on or off for every container
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

/// True when collection is on
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Operation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Value lookups
    Read,
    /// Value mutations
    Write,
    /// Encoding
    Serialize,
    /// Decoding
    Deserialize,
    /// Deep copies
    Copy,
}

impl Operation {
    /// Label used in exports
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Serialize => "serialize",
            Operation::Deserialize => "deserialize",
            Operation::Copy => "copy",
        }
    }
}

// ============================================================================
// Histogram
// ============================================================================

/// Latency histogram over a ring of recent samples
///
/// Count, sum and max cover every sample ever recorded; percentiles cover
/// the most recent [`RESERVOIR_SIZE`] samples.
#[derive(Debug)]
pub struct LatencyHistogram {
    samples: Mutex<Vec<u64>>,
    next: AtomicU64,
    count: AtomicU64,
    sum_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self {
            samples: Mutex::new(Vec::with_capacity(RESERVOIR_SIZE)),
            next: AtomicU64::new(0),
            count: AtomicU64::new(0),
            sum_ns: AtomicU64::new(0),
            max_ns: AtomicU64::new(0),
        }
    }
}

impl LatencyHistogram {
    /// Record one sample
    pub fn record(&self, nanos: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum_ns.fetch_add(nanos, Ordering::Relaxed);
        self.max_ns.fetch_max(nanos, Ordering::Relaxed);

        let slot = (self.next.fetch_add(1, Ordering::Relaxed) as usize) % RESERVOIR_SIZE;
        let mut samples = self.samples.lock();
        if samples.len() < RESERVOIR_SIZE {
            samples.push(nanos);
        } else {
            samples[slot] = nanos;
        }
    }

    /// Value below which `q` (0.0..=1.0) of the kept samples fall
    pub fn percentile(&self, q: f64) -> u64 {
        let mut sorted = self.samples.lock().clone();
        if sorted.is_empty() {
            return 0;
        }
        sorted.sort_unstable();
        let rank = ((sorted.len() as f64) * q).ceil() as usize;
        sorted[rank.clamp(1, sorted.len()) - 1]
    }

    /// Number of samples ever recorded
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Largest sample ever recorded
    pub fn max(&self) -> u64 {
        self.max_ns.load(Ordering::Relaxed)
    }

    /// Mean of every sample ever recorded
    pub fn avg(&self) -> u64 {
        let count = self.count();
        if count == 0 {
            0
        } else {
            self.sum_ns.load(Ordering::Relaxed) / count
        }
    }

    /// Point-in-time summary
    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            p50_ns: self.percentile(0.5),
            p95_ns: self.percentile(0.95),
            p99_ns: self.percentile(0.99),
            p999_ns: self.percentile(0.999),
            max_ns: self.max(),
            avg_ns: self.avg(),
            count: self.count(),
        }
    }

    fn reset(&self) {
        self.samples.lock().clear();
        self.next.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
        self.sum_ns.store(0, Ordering::Relaxed);
        self.max_ns.store(0, Ordering::Relaxed);
    }
}

/// Percentiles of one histogram
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    /// Median
    pub p50_ns: u64,
    /// 95th percentile
    pub p95_ns: u64,
    /// 99th percentile
    pub p99_ns: u64,
    /// 99.9th percentile
    pub p999_ns: u64,
    /// Largest sample
    pub max_ns: u64,
    /// Mean sample
    pub avg_ns: u64,
    /// Sample count
    pub count: u64,
}

// ============================================================================
// Registry
// ============================================================================

/// Counters and histograms for every operation category
#[derive(Debug, Default)]
pub struct Metrics {
    reads: AtomicU64,
    writes: AtomicU64,
    serializations: AtomicU64,
    deserializations: AtomicU64,
    copies: AtomicU64,
    read_latency: LatencyHistogram,
    write_latency: LatencyHistogram,
    serialize_latency: LatencyHistogram,
    deserialize_latency: LatencyHistogram,
}

/// Operation totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationCounts {
    /// Value lookups
    pub reads: u64,
    /// Value mutations
    pub writes: u64,
    /// Encodings
    pub serializations: u64,
    /// Decodings
    pub deserializations: u64,
    /// Deep copies
    pub copies: u64,
}

/// Latency summaries per category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyReport {
    /// Encoding
    pub serialize: LatencySummary,
    /// Decoding
    pub deserialize: LatencySummary,
    /// Lookups
    pub read: LatencySummary,
    /// Mutations
    pub write: LatencySummary,
}

/// Point-in-time copy of the registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Operation totals
    pub operations: OperationCounts,
    /// Latency summaries
    pub latency: LatencyReport,
}

impl Metrics {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, op: Operation) -> &AtomicU64 {
        match op {
            Operation::Read => &self.reads,
            Operation::Write => &self.writes,
            Operation::Serialize => &self.serializations,
            Operation::Deserialize => &self.deserializations,
            Operation::Copy => &self.copies,
        }
    }

    /// Histogram for a category; copies have none
    pub fn histogram(&self, op: Operation) -> Option<&LatencyHistogram> {
        match op {
            Operation::Read => Some(&self.read_latency),
            Operation::Write => Some(&self.write_latency),
            Operation::Serialize => Some(&self.serialize_latency),
            Operation::Deserialize => Some(&self.deserialize_latency),
            Operation::Copy => None,
        }
    }

    /// Count one operation and its latency
    pub fn record(&self, op: Operation, nanos: u64) {
        self.counter(op).fetch_add(1, Ordering::Relaxed);
        if let Some(histogram) = self.histogram(op) {
            histogram.record(nanos);
        }
    }

    /// Total for a category
    pub fn count(&self, op: Operation) -> u64 {
        self.counter(op).load(Ordering::Relaxed)
    }

    /// Zero every counter and histogram
    pub fn reset(&self) {
        for op in [
            Operation::Read,
            Operation::Write,
            Operation::Serialize,
            Operation::Deserialize,
            Operation::Copy,
        ] {
            self.counter(op).store(0, Ordering::Relaxed);
            if let Some(histogram) = self.histogram(op) {
                histogram.reset();
            }
        }
    }

    /// Point-in-time copy
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            operations: OperationCounts {
                reads: self.count(Operation::Read),
                writes: self.count(Operation::Write),
                serializations: self.count(Operation::Serialize),
                deserializations: self.count(Operation::Deserialize),
                copies: self.count(Operation::Copy),
            },
            latency: LatencyReport {
                serialize: self.serialize_latency.summary(),
                deserialize: self.deserialize_latency.summary(),
                read: self.read_latency.summary(),
                write: self.write_latency.summary(),
            },
        }
    }

    /// Pretty-printed JSON export
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Prometheus text exposition
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::with_capacity(4096);

        out.push_str("# HELP container_operations_total Total number of container operations\n");
        out.push_str("# TYPE container_operations_total counter\n");
        let ops = snapshot.operations;
        for (label, value) in [
            ("read", ops.reads),
            ("write", ops.writes),
            ("serialize", ops.serializations),
            ("deserialize", ops.deserializations),
            ("copy", ops.copies),
        ] {
            let _ = writeln!(
                out,
                "container_operations_total{{operation=\"{}\"}} {}",
                label, value
            );
        }

        let latency = snapshot.latency;
        for (label, title, summary) in [
            ("serialize", "Serialize", latency.serialize),
            ("deserialize", "Deserialize", latency.deserialize),
            ("read", "Read", latency.read),
            ("write", "Write", latency.write),
        ] {
            let family = format!("container_{}_latency_nanoseconds", label);
            let _ = writeln!(
                out,
                "# HELP {} {} operation latency percentiles",
                family, title
            );
            let _ = writeln!(out, "# TYPE {} summary", family);
            for (quantile, value) in [
                ("0.5", summary.p50_ns),
                ("0.95", summary.p95_ns),
                ("0.99", summary.p99_ns),
                ("0.999", summary.p999_ns),
            ] {
                let _ = writeln!(out, "{}{{quantile=\"{}\"}} {}", family, quantile, value);
            }
            let _ = writeln!(out, "{}_max {}", family, summary.max_ns);
            let _ = writeln!(out, "{}_count {}", family, summary.count);
        }
        out
    }
}

/// Records one operation into the global registry when dropped
///
/// Reads the clock only when collection is enabled.
#[derive(Debug)]
pub(crate) struct OpTimer {
    op: Operation,
    start: Option<Instant>,
}

impl OpTimer {
    pub(crate) fn start(op: Operation) -> Self {
        Self {
            op,
            start: is_enabled().then(Instant::now),
        }
    }
}

impl Drop for OpTimer {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
            global().record(self.op, nanos);
        }
    }
}
