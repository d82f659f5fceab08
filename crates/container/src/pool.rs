//! Buffer pools for serialization
//!
//! Containers take their scratch buffers from an injected [`MemoryPool`].
//! The default [`DirectAllocator`] allocates every time and keeps nothing;
//! [`BlockPool`] recycles buffers by power-of-two size class. Each container
//! holds its own handle, so tests can observe isolated pool statistics.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use vessel_core::Result;

/// Pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquisitions served from a recycled buffer
    pub hits: u64,
    /// Acquisitions that needed a fresh allocation
    pub misses: u64,
    /// Buffers currently held for reuse
    pub available: usize,
}

/// Source of scratch byte buffers
pub trait MemoryPool: Send + Sync {
    /// Get an empty buffer with at least `capacity` bytes reserved
    ///
    /// # Errors
    /// Returns `MemoryAllocationFailed` if the reservation cannot be made.
    fn acquire(&self, capacity: usize) -> Result<Vec<u8>>;

    /// Hand a buffer back; the pool may keep it for reuse
    fn release(&self, buffer: Vec<u8>);

    /// Current counters
    fn stats(&self) -> PoolStats;

    /// Drop every held buffer and zero the counters
    fn reset(&self);
}

fn reserve(capacity: usize) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    buffer.try_reserve(capacity)?;
    Ok(buffer)
}

/// Pool that never retains buffers
#[derive(Debug, Default)]
pub struct DirectAllocator {
    misses: AtomicU64,
}

impl DirectAllocator {
    /// Create a direct allocator
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryPool for DirectAllocator {
    fn acquire(&self, capacity: usize) -> Result<Vec<u8>> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        reserve(capacity)
    }

    fn release(&self, _buffer: Vec<u8>) {}

    fn stats(&self) -> PoolStats {
        PoolStats {
            hits: 0,
            misses: self.misses.load(Ordering::Relaxed),
            available: 0,
        }
    }

    fn reset(&self) {
        self.misses.store(0, Ordering::Relaxed);
    }
}

const MIN_CLASS_SHIFT: u32 = 6; // 64B
const MAX_CLASS_SHIFT: u32 = 20; // 1MB
const CLASS_COUNT: usize = (MAX_CLASS_SHIFT - MIN_CLASS_SHIFT + 1) as usize;

/// Pool recycling buffers in power-of-two size classes from 64B to 1MB
///
/// Requests above the largest class bypass the pool. Each class keeps at
/// most `max_per_class` idle buffers.
#[derive(Debug)]
pub struct BlockPool {
    classes: Vec<Mutex<Vec<Vec<u8>>>>,
    max_per_class: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for BlockPool {
    fn default() -> Self {
        Self::new(16)
    }
}

impl BlockPool {
    /// Create a pool keeping up to `max_per_class` idle buffers per class
    pub fn new(max_per_class: usize) -> Self {
        Self {
            classes: (0..CLASS_COUNT).map(|_| Mutex::new(Vec::new())).collect(),
            max_per_class,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Smallest class that holds `capacity`
    fn class_for_request(capacity: usize) -> Option<usize> {
        let size = capacity.max(1 << MIN_CLASS_SHIFT).checked_next_power_of_two()?;
        let shift = size.trailing_zeros();
        (shift <= MAX_CLASS_SHIFT).then(|| (shift - MIN_CLASS_SHIFT) as usize)
    }

    /// Largest class a buffer of `capacity` can serve
    fn class_for_buffer(capacity: usize) -> Option<usize> {
        if capacity < (1 << MIN_CLASS_SHIFT) {
            return None;
        }
        let shift = (usize::BITS - 1 - capacity.leading_zeros()).min(MAX_CLASS_SHIFT);
        Some((shift - MIN_CLASS_SHIFT) as usize)
    }
}

impl MemoryPool for BlockPool {
    fn acquire(&self, capacity: usize) -> Result<Vec<u8>> {
        let Some(class) = Self::class_for_request(capacity) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return reserve(capacity);
        };

        if let Some(buffer) = self.classes[class].lock().pop() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(buffer);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        reserve(1 << (class as u32 + MIN_CLASS_SHIFT))
    }

    fn release(&self, mut buffer: Vec<u8>) {
        let Some(class) = Self::class_for_buffer(buffer.capacity()) else {
            return;
        };
        let mut idle = self.classes[class].lock();
        if idle.len() < self.max_per_class {
            buffer.clear();
            idle.push(buffer);
        }
    }

    fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            available: self.classes.iter().map(|c| c.lock().len()).sum(),
        }
    }

    fn reset(&self) {
        for class in &self.classes {
            class.lock().clear();
        }
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_allocator_never_hits() {
        let pool = DirectAllocator::new();
        let buf = pool.acquire(100).unwrap();
        assert!(buf.capacity() >= 100);
        pool.release(buf);
        let _ = pool.acquire(100).unwrap();

        assert_eq!(
            pool.stats(),
            PoolStats {
                hits: 0,
                misses: 2,
                available: 0
            }
        );
        pool.reset();
        assert_eq!(pool.stats().misses, 0);
    }

    #[test]
    fn test_block_pool_recycles() {
        let pool = BlockPool::new(4);
        let mut buf = pool.acquire(100).unwrap();
        assert_eq!(buf.capacity(), 128);
        buf.extend_from_slice(b"dirty");
        pool.release(buf);
        assert_eq!(pool.stats().available, 1);

        let buf = pool.acquire(70).unwrap();
        assert!(buf.is_empty());
        assert!(buf.capacity() >= 70);
        let stats = pool.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.available, 0);
    }

    #[test]
    fn test_block_pool_caps_idle_buffers() {
        let pool = BlockPool::new(2);
        for _ in 0..5 {
            pool.release(Vec::with_capacity(256));
        }
        assert_eq!(pool.stats().available, 2);
        pool.reset();
        assert_eq!(pool.stats(), PoolStats::default());
    }

    #[test]
    fn test_block_pool_bypasses_oversized() {
        let pool = BlockPool::new(2);
        let buf = pool.acquire(4 << 20).unwrap();
        assert!(buf.capacity() >= 4 << 20);
        assert_eq!(pool.stats().misses, 1);
        // oversized buffers land in the largest class
        pool.release(buf);
        assert_eq!(pool.stats().available, 1);
    }

    #[test]
    fn test_tiny_buffers_are_not_kept() {
        let pool = BlockPool::new(2);
        pool.release(Vec::with_capacity(8));
        assert_eq!(pool.stats().available, 0);
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        let pool = DirectAllocator::new();
        let err = pool.acquire(usize::MAX).unwrap_err();
        assert_eq!(err.code(), 400);
    }

    #[test]
    fn test_class_boundaries() {
        assert_eq!(BlockPool::class_for_request(0), Some(0));
        assert_eq!(BlockPool::class_for_request(64), Some(0));
        assert_eq!(BlockPool::class_for_request(65), Some(1));
        assert_eq!(BlockPool::class_for_request(1 << 20), Some(CLASS_COUNT - 1));
        assert_eq!(BlockPool::class_for_request((1 << 20) + 1), None);
        assert_eq!(BlockPool::class_for_buffer(127), Some(0));
        assert_eq!(BlockPool::class_for_buffer(128), Some(1));
    }
}
