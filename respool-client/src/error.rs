use std::io;

use respool_codec::CodecError;
use respool_pool::PoolError;
use thiserror::Error;

/// Result type for the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Problems with the connection URI, raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The URI could not be parsed at all.
    #[error("invalid uri {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    /// The scheme is not `redis`.
    #[error("unsupported uri scheme {0:?}, expected \"redis\"")]
    UnsupportedScheme(String),
    /// The URI names no host.
    #[error("uri has no host")]
    MissingHost,
    /// The path is not a single numeric database index.
    #[error("path {0:?} must be a single numeric database index")]
    InvalidDatabase(String),
    /// Percent-decoded credentials are not valid UTF-8.
    #[error("credentials are not valid utf-8")]
    InvalidCredentials,
    /// A username was given without a password.
    #[error("username given without a password")]
    UsernameWithoutPassword,
}

/// Errors surfaced by the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Dial, read or write failure.
    #[error("connection error: {0}")]
    Io(#[from] io::Error),
    /// The server sent bytes that do not form a valid reply.
    #[error("protocol error: {0}")]
    Protocol(#[source] CodecError),
    /// The server rejected the credentials.
    #[error("authentication failed: expected {expected:?}, got {actual:?}")]
    Auth { expected: String, actual: String },
    /// The server rejected the database selection.
    #[error("failed to select database {database}: {reply}")]
    Select { database: u32, reply: String },
    /// The pool bounds are inverted.
    #[error("invalid pool size: min {min} exceeds max {max}")]
    PoolSize { min: usize, max: usize },
    /// The command line held no tokens.
    #[error("empty command")]
    EmptyCommand,
}

impl ClientError {
    /// True when the server could not be reached or the transport failed.
    pub fn is_connection(&self) -> bool {
        matches!(self, ClientError::Io(_))
    }

    /// True when the server's reply could not be understood.
    pub fn is_protocol(&self) -> bool {
        matches!(self, ClientError::Protocol(_))
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Io(err) => ClientError::Io(err),
            // A hang-up between replies means the server went away.
            CodecError::Closed => ClientError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )),
            other => ClientError::Protocol(other),
        }
    }
}

impl From<PoolError<ClientError>> for ClientError {
    fn from(err: PoolError<ClientError>) -> Self {
        match err {
            PoolError::InvalidSize { min, max } => ClientError::PoolSize { min, max },
            // Surface the connection's own failure (dial, auth, select).
            PoolError::Create(err) => err,
            PoolError::Spawn(err) => ClientError::Io(err),
        }
    }
}
