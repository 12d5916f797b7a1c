//! # respool Resource Pool
//!
//! Purpose: Lend a bounded set of expensive, long-lived resources (network
//! connections in practice) to many threads, and grow the set when callers
//! keep queueing for it.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Resources are built once and reused.
//! 2. **Minimal Locking**: The idle queue is the only locked state; counters
//!    are atomics.
//! 3. **Hill Climbing**: A background tuner adds one resource per interval
//!    while the accumulated wait stays above a threshold.
//! 4. **Never Recirculate Broken Resources**: Discarded resources free their
//!    slot and are replaced instead of being handed out again.

mod config;
mod error;
mod metrics;
mod pool;
mod tuner;

pub use config::PoolConfig;
pub use error::{PoolError, PoolResult};
pub use metrics::PoolStats;
pub use pool::{Pooled, ResourcePool};
pub use tuner::TuneOutcome;
