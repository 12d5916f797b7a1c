//! # Pool Metrics
//!
//! Accumulator counters for the pool plus a plain snapshot struct.
//!
//! `Ordering::Relaxed` is enough everywhere: the counters are independent and
//! only need to be eventually consistent. The one counter with a reader that
//! acts on it, the tuner's wait accumulator, tolerates a lost update between
//! its reset and a concurrent addition.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Point-in-time view of a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Resources in existence (idle + lent out).
    pub live: usize,
    /// Resources currently waiting in the pool.
    pub idle: usize,
    /// Configured floor.
    pub min_size: usize,
    /// Configured ceiling.
    pub max_size: usize,
    /// Wait accumulated since the tuner last reset the counter.
    pub pending_wait: Duration,
    /// Successful acquisitions.
    pub acquires: u64,
    /// Acquisitions that had to block.
    pub waited_acquires: u64,
    /// Total time spent blocked in `acquire`, never reset.
    pub total_wait: Duration,
    /// Resources added by the tuner or to replace discarded ones.
    pub grown: u64,
    /// Resources dropped as broken.
    pub discarded: u64,
    /// Constructor failures after the initial fill.
    pub create_failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct PoolMetrics {
    // Reset by the tuner every interval.
    pending_wait_us: AtomicU64,
    total_wait_us: AtomicU64,
    acquires: AtomicU64,
    waited_acquires: AtomicU64,
    grown: AtomicU64,
    discarded: AtomicU64,
    create_failures: AtomicU64,
}

impl PoolMetrics {
    pub(crate) fn record_acquire(&self, waited: bool) {
        self.acquires.fetch_add(1, Ordering::Relaxed);
        if waited {
            self.waited_acquires.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Adds a slice of blocked time.
    ///
    /// Waiters report while they are still blocked, so a caller stuck for a
    /// whole interval is visible to the tuner before it gets a resource.
    pub(crate) fn record_wait(&self, waited: Duration) {
        let micros = u64::try_from(waited.as_micros()).unwrap_or(u64::MAX);
        self.pending_wait_us.fetch_add(micros, Ordering::Relaxed);
        self.total_wait_us.fetch_add(micros, Ordering::Relaxed);
    }

    pub(crate) fn pending_wait(&self) -> Duration {
        Duration::from_micros(self.pending_wait_us.load(Ordering::Relaxed))
    }

    pub(crate) fn reset_pending_wait(&self) {
        self.pending_wait_us.store(0, Ordering::Relaxed);
    }

    pub(crate) fn record_grown(&self) {
        self.grown.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_create_failure(&self) {
        self.create_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(
        &self,
        live: usize,
        idle: usize,
        min_size: usize,
        max_size: usize,
    ) -> PoolStats {
        PoolStats {
            live,
            idle,
            min_size,
            max_size,
            pending_wait: self.pending_wait(),
            acquires: self.acquires.load(Ordering::Relaxed),
            waited_acquires: self.waited_acquires.load(Ordering::Relaxed),
            total_wait: Duration::from_micros(self.total_wait_us.load(Ordering::Relaxed)),
            grown: self.grown.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            create_failures: self.create_failures.load(Ordering::Relaxed),
        }
    }
}
