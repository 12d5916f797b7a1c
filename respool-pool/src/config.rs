//! Pool sizing and tuning knobs.

use std::time::Duration;

use crate::error::{PoolError, PoolResult};

/// Default tuner period.
pub const DEFAULT_TUNE_INTERVAL: Duration = Duration::from_secs(1);

/// Default accumulated wait per interval that triggers growth.
pub const DEFAULT_WAIT_THRESHOLD: Duration = Duration::from_millis(5);

/// Configuration for a [`ResourcePool`](crate::ResourcePool).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Resources built up front. Zero is treated as one.
    pub min_size: usize,
    /// Upper bound on live resources (idle + lent out).
    pub max_size: usize,
    /// How often the tuner inspects the wait counter.
    pub tune_interval: Duration,
    /// Accumulated wait within one interval above which the pool grows.
    pub wait_threshold: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            min_size: 1,
            max_size: 8,
            tune_interval: DEFAULT_TUNE_INTERVAL,
            wait_threshold: DEFAULT_WAIT_THRESHOLD,
        }
    }
}

impl PoolConfig {
    /// Creates a config with the given bounds and default tuning.
    pub fn new(min_size: usize, max_size: usize) -> Self {
        PoolConfig {
            min_size,
            max_size,
            ..PoolConfig::default()
        }
    }

    /// Coerces a zero floor to one and checks the bounds.
    ///
    /// A zero tune interval is bumped to one millisecond so the tuner never
    /// spins.
    pub fn validate<E>(mut self) -> PoolResult<Self, E> {
        if self.min_size == 0 {
            self.min_size = 1;
        }
        if self.min_size > self.max_size {
            return Err(PoolError::InvalidSize {
                min: self.min_size,
                max: self.max_size,
            });
        }
        if self.tune_interval.is_zero() {
            self.tune_interval = Duration::from_millis(1);
        }
        Ok(self)
    }
}
