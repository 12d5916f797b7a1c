//! # respool Client
//!
//! Purpose: Issue RESP commands against one server over a pool of reusable
//! TCP connections that grows under contention.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: [`Client`] hides pooling, handshakes and framing.
//! 2. **Command-at-a-Time**: One connection carries one request at a time;
//!    concurrency comes from holding several connections.
//! 3. **Never Reuse a Broken Connection**: Transport and framing failures
//!    discard the connection instead of returning it to the pool.
//! 4. **Typed Failures**: Configuration, connection, framing and auth
//!    problems are distinct error variants.

mod client;
mod config;
mod connection;
mod error;

pub use client::Client;
pub use config::{ClientConfig, DEFAULT_PORT, SCHEME};
pub use connection::Connection;
pub use error::{ClientError, ClientResult, ConfigError};
pub use respool_codec::{CodecError, Value, NIL};
pub use respool_pool::{PoolStats, TuneOutcome};
