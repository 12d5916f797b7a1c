//! # Client Configuration
//!
//! Connection target, credentials, database selection and pool sizing.
//! Usually built from a URI of the form
//! `redis://[username[:password]@]host[:port][/database]`.

use std::str::FromStr;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use respool_pool::PoolConfig;
use url::Url;

use crate::error::ConfigError;

/// Port used when the URI names none.
pub const DEFAULT_PORT: u16 = 6379;

/// The only accepted URI scheme.
pub const SCHEME: &str = "redis";

/// Configuration for the client and its connection pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name or address literal.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// ACL username sent with `AUTH`; requires `password`.
    pub username: Option<String>,
    /// Password; when set, every new connection authenticates once.
    pub password: Option<String>,
    /// Database index; when set, every new connection runs `SELECT` once.
    pub database: Option<u32>,
    /// Connections opened up front.
    pub min_connections: usize,
    /// Upper bound on open connections.
    pub max_connections: usize,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// How often the pool tuner checks for contention.
    pub tune_interval: Duration,
    /// Accumulated wait per interval that makes the pool open a connection.
    pub wait_threshold: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let pool = PoolConfig::default();
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            database: None,
            min_connections: pool.min_size,
            max_connections: pool.max_size,
            connect_timeout: None,
            read_timeout: None,
            write_timeout: None,
            tune_interval: pool.tune_interval,
            wait_threshold: pool.wait_threshold,
        }
    }
}

impl ClientConfig {
    /// Parses a `redis://` URI on top of the default configuration.
    ///
    /// Percent-encoded credentials are decoded. An empty path or `/` selects
    /// no database; anything else must be exactly one numeric segment.
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(uri).map_err(|source| ConfigError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;
        if url.scheme() != SCHEME {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(ConfigError::MissingHost),
        };

        let username = match url.username() {
            "" => None,
            raw => Some(decode_credential(raw)?),
        };
        let password = url.password().map(decode_credential).transpose()?;
        if username.is_some() && password.is_none() {
            return Err(ConfigError::UsernameWithoutPassword);
        }

        Ok(ClientConfig {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            username,
            password,
            database: parse_database(url.path())?,
            ..ClientConfig::default()
        })
    }

    /// Returns `host:port` suitable for address resolution.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings derived from this configuration.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            min_size: self.min_connections,
            max_size: self.max_connections,
            tune_interval: self.tune_interval,
            wait_threshold: self.wait_threshold,
        }
    }
}

impl FromStr for ClientConfig {
    type Err = ConfigError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        ClientConfig::from_uri(uri)
    }
}

fn decode_credential(raw: &str) -> Result<String, ConfigError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ConfigError::InvalidCredentials)
}

fn parse_database(path: &str) -> Result<Option<u32>, ConfigError> {
    let segment = match path {
        "" | "/" => return Ok(None),
        path => path.strip_prefix('/').unwrap_or(path),
    };
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::InvalidDatabase(path.to_string()));
    }
    segment
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidDatabase(path.to_string()))
}
