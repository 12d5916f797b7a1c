//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing RESP commands over a
//! self-tuning connection pool.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `Client` hides pooling and protocol details.
//! 2. **Release on Every Path**: Connections are held by an RAII guard, so
//!    they return to the pool on success and on error alike.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors, and
//!    the connection that produced them is discarded.

use respool_codec::{encode, tokenize, Value};
use respool_pool::{PoolStats, ResourcePool};
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::{ClientError, ClientResult};

/// Synchronous client with connection pooling.
///
/// Each call borrows a connection, executes one command, and returns the
/// connection to the pool. `Client` is `Sync`; share it by reference or in
/// an `Arc` to issue commands from several threads at once.
pub struct Client {
    pool: ResourcePool<Connection, ClientError>,
}

impl Client {
    /// Parses `uri` and connects with the resulting configuration.
    pub fn connect(uri: &str) -> ClientResult<Self> {
        Self::with_config(ClientConfig::from_uri(uri)?)
    }

    /// Opens `min_connections` connections and starts the pool tuner.
    ///
    /// Fails if any initial connection cannot be dialed or rejects the
    /// handshake.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let pool_config = config.pool_config();
        let addr = config.addr();
        let pool = ResourcePool::with_config(pool_config, move || Connection::open(&config))?;

        let stats = pool.stats();
        info!(
            addr = %addr,
            connections = stats.live,
            max_connections = stats.max_size,
            "client connected"
        );
        Ok(Client { pool })
    }

    /// Issues a whitespace-separated command and renders the reply as text.
    ///
    /// Error replies from the server are rendered like any other text; use
    /// [`query`](Self::query) to tell them apart.
    pub fn issue(&self, command: &str) -> ClientResult<String> {
        Ok(self.query(command)?.to_string())
    }

    /// Issues a whitespace-separated command and returns the decoded reply.
    pub fn query(&self, command: &str) -> ClientResult<Value> {
        if tokenize(command).is_empty() {
            return Err(ClientError::EmptyCommand);
        }
        let request = encode(command);
        self.round_trip(|conn| conn.request(&request))
    }

    /// Issues a command given as separate arguments.
    ///
    /// Arguments may contain whitespace or any other bytes.
    pub fn query_args(&self, args: &[&[u8]]) -> ClientResult<Value> {
        if args.is_empty() {
            return Err(ClientError::EmptyCommand);
        }
        self.round_trip(|conn| conn.exec(args))
    }

    /// Pings the server and returns the rendered reply.
    pub fn ping(&self) -> ClientResult<String> {
        self.issue("PING")
    }

    /// Returns the connection pool's sizes and counters.
    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    fn round_trip<F>(&self, op: F) -> ClientResult<Value>
    where
        F: FnOnce(&mut Connection) -> ClientResult<Value>,
    {
        let mut conn = self.pool.get();
        let result = op(&mut *conn);
        if let Err(err) = &result {
            if err.is_connection() || err.is_protocol() {
                // If IO/protocol fails, do not return this connection to the pool.
                warn!(error = %err, "discarding broken connection");
                conn.mark_broken();
            }
        }
        result
    }
}
