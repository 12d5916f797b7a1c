//! Codec error taxonomy.

use std::io;

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors surfaced while decoding a reply.
///
/// Everything except [`CodecError::Io`] and [`CodecError::Closed`] is a
/// framing error: the bytes on the wire did not form a valid message. The
/// other two mean the transport failed or the peer hung up between replies.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Transport failure other than a premature end of stream.
    #[error("io error: {0}")]
    Io(io::Error),
    /// The stream ended cleanly before the first byte of a reply.
    #[error("connection closed by peer")]
    Closed,
    /// The stream ended before the message was complete.
    #[error("stream ended in the middle of a message")]
    Truncated,
    /// The first byte of a message is not a known type tag.
    #[error("unknown type tag 0x{0:02x}")]
    UnknownTag(u8),
    /// A header line or payload was not terminated by CR LF.
    #[error("missing CR LF delimiter")]
    MissingCrlf,
    /// An integer or length field held something other than decimal digits.
    #[error("invalid integer field {0:?}")]
    InvalidInteger(String),
    /// A length field was negative where only -1 (or no negative) is allowed.
    #[error("invalid length {0}")]
    InvalidLength(i64),
    /// A bulk string declared more bytes than the decoder accepts.
    #[error("bulk length {0} exceeds limit")]
    BulkTooLarge(i64),
    /// A header line ran past the decoder's limit without a terminator.
    #[error("header line exceeds {0} bytes")]
    LineTooLong(usize),
    /// Aggregates nested deeper than the decoder accepts.
    #[error("nesting exceeds {0} levels")]
    TooDeep(usize),
}

impl CodecError {
    /// Returns true when the error came from malformed bytes rather than a
    /// failing transport.
    pub fn is_framing(&self) -> bool {
        !matches!(self, CodecError::Io(_) | CodecError::Closed)
    }
}

impl From<io::Error> for CodecError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::Truncated
        } else {
            CodecError::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_truncated() {
        let err = CodecError::from(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(err, CodecError::Truncated));
        assert!(err.is_framing());
    }

    #[test]
    fn hang_up_between_replies_is_not_framing() {
        assert!(!CodecError::Closed.is_framing());
        assert!(CodecError::LineTooLong(8).is_framing());
    }

    #[test]
    fn transport_errors_are_not_framing() {
        let err = CodecError::from(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        assert!(matches!(err, CodecError::Io(_)));
        assert!(!err.is_framing());
    }
}
