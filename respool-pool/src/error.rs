use std::io;

use thiserror::Error;

/// Result type for pool construction, generic over the constructor's error.
pub type PoolResult<T, E> = Result<T, PoolError<E>>;

/// Errors raised while building a pool.
///
/// Once a pool exists, no operation on it fails: `acquire` blocks instead,
/// and the tuner logs its own construction failures.
#[derive(Debug, Error)]
pub enum PoolError<E> {
    /// The floor is above the ceiling (after coercing a zero floor to one).
    #[error("min_size ({min}) must not exceed max_size ({max})")]
    InvalidSize { min: usize, max: usize },
    /// The resource constructor failed during the initial fill.
    #[error("failed to create resource: {0}")]
    Create(#[source] E),
    /// The background tuner thread could not be started.
    #[error("failed to start pool tuner: {0}")]
    Spawn(#[source] io::Error),
}
