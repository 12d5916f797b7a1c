//! # Decoded Value
//!
//! One parsed reply. Aggregates own their children, so the type stays
//! finite-sized while allowing arbitrary nesting.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::encode::{put_decimal, put_signed, CRLF};

/// Text rendered for null and absent values.
///
/// Chosen so it cannot be confused with an empty bulk string, which renders
/// as nothing at all.
pub const NIL: &str = "(nil)";

/// RESP reply value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `_` null.
    Null,
    /// `#t` / `#f` booleans.
    Boolean(bool),
    /// `:123` integers.
    Integer(i64),
    /// `+OK` or `+PONG` style status replies.
    Status(String),
    /// `-ERR ...` error replies.
    Error(String),
    /// `$...` bulk strings, with None for the absent (`$-1`) form.
    Bulk(Option<Vec<u8>>),
    /// `*...` arrays, with None for the absent (`*-1`) form.
    Array(Option<Vec<Value>>),
    /// `%...` maps as ordered key/value pairs.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Builds a present bulk string.
    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        Value::Bulk(Some(data.into()))
    }

    /// Builds a status reply.
    pub fn status(text: impl Into<String>) -> Self {
        Value::Status(text.into())
    }

    /// True for `Null` and for the absent bulk/array forms.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Null | Value::Bulk(None) | Value::Array(None))
    }

    /// True when the server replied with an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    /// Returns the raw bytes of a status, error or present bulk string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Status(text) | Value::Error(text) => Some(text.as_bytes()),
            Value::Bulk(Some(data)) => Some(data),
            _ => None,
        }
    }

    /// Returns the elements of a present array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(Some(items)) => Some(items),
            _ => None,
        }
    }

    /// Serializes the value in reply form.
    ///
    /// Clients never send anything but arrays of bulk strings, so this is
    /// mostly useful for scripted servers and fixtures.
    pub fn encode(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(64);
        self.write_to(&mut out);
        out.freeze()
    }

    /// Appends the reply form of this value to `out`.
    pub fn write_to(&self, out: &mut BytesMut) {
        match self {
            Value::Null => out.put_slice(b"_\r\n"),
            Value::Boolean(flag) => out.put_slice(if *flag { b"#t\r\n" } else { b"#f\r\n" }),
            Value::Integer(value) => {
                out.put_u8(b':');
                put_signed(out, *value);
                out.put_slice(CRLF);
            }
            Value::Status(text) => {
                out.put_u8(b'+');
                out.put_slice(text.as_bytes());
                out.put_slice(CRLF);
            }
            Value::Error(text) => {
                out.put_u8(b'-');
                out.put_slice(text.as_bytes());
                out.put_slice(CRLF);
            }
            Value::Bulk(None) => out.put_slice(b"$-1\r\n"),
            Value::Bulk(Some(data)) => {
                out.put_u8(b'$');
                put_decimal(out, data.len());
                out.put_slice(CRLF);
                out.put_slice(data);
                out.put_slice(CRLF);
            }
            Value::Array(None) => out.put_slice(b"*-1\r\n"),
            Value::Array(Some(items)) => {
                out.put_u8(b'*');
                put_decimal(out, items.len());
                out.put_slice(CRLF);
                for item in items {
                    item.write_to(out);
                }
            }
            Value::Map(pairs) => {
                out.put_u8(b'%');
                put_decimal(out, pairs.len());
                out.put_slice(CRLF);
                for (key, value) in pairs {
                    key.write_to(out);
                    value.write_to(out);
                }
            }
        }
    }
}

/// Human-readable rendering used by the client façade.
///
/// Arrays render as `[a, b]`, maps as `{k: v}`, text payloads as their raw
/// (lossy UTF-8) contents and nil values as [`NIL`].
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Bulk(None) | Value::Array(None) => f.write_str(NIL),
            Value::Boolean(flag) => write!(f, "{}", flag),
            Value::Integer(value) => write!(f, "{}", value),
            Value::Status(text) | Value::Error(text) => f.write_str(text),
            Value::Bulk(Some(data)) => f.write_str(&String::from_utf8_lossy(data)),
            Value::Array(Some(items)) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(pairs) => {
                f.write_str("{")?;
                for (idx, (key, value)) in pairs.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
        }
    }
}
