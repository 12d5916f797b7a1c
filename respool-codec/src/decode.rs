//! # Reply Decoding
//!
//! Parse exactly one reply from a buffered stream, top-down.
//!
//! ## Framing Rules
//! - Every message starts with a one-byte type tag.
//! - Header lines (lengths, integers, simple strings) end with CR LF.
//! - Bulk payloads are read by declared length, then their CR LF is checked.
//! - Aggregates are followed directly by their elements; there is no extra
//!   delimiter after the last element.
//!
//! Nothing past the end of the message is consumed, so consecutive replies
//! can be decoded from the same reader.

use std::io::{BufRead, Read};

use crate::error::{CodecError, CodecResult};
use crate::value::Value;

/// Deepest aggregate nesting accepted before the decode is aborted.
pub const MAX_DEPTH: usize = 512;

/// Largest bulk payload accepted, matching the usual server default.
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Longest header line (type tag excluded, CR LF included) accepted.
pub const MAX_LINE_LEN: usize = 64 * 1024;

/// Upper bound on speculative preallocation for aggregates.
const MAX_PREALLOC: usize = 1024;

/// Decodes one reply from `reader`.
pub fn decode<R: BufRead>(reader: &mut R) -> CodecResult<Value> {
    let mut line_buf = Vec::with_capacity(64);
    decode_with(reader, &mut line_buf)
}

/// Decodes one reply, reusing `line_buf` for header lines.
///
/// Connections keep one line buffer alive across requests to avoid an
/// allocation per reply.
///
/// A stream that ends before the first byte yields [`CodecError::Closed`];
/// ending anywhere later yields [`CodecError::Truncated`].
pub fn decode_with<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> CodecResult<Value> {
    if reader.fill_buf()?.is_empty() {
        return Err(CodecError::Closed);
    }
    decode_value(reader, line_buf, 0)
}

fn decode_value<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    depth: usize,
) -> CodecResult<Value> {
    if depth > MAX_DEPTH {
        return Err(CodecError::TooDeep(MAX_DEPTH));
    }

    match read_byte(reader)? {
        b'_' => {
            expect_crlf(reader)?;
            Ok(Value::Null)
        }
        b'#' => {
            let flag = read_byte(reader)?;
            expect_crlf(reader)?;
            Ok(Value::Boolean(flag == b't'))
        }
        b':' => {
            read_line(reader, line_buf)?;
            Ok(Value::Integer(parse_i64(line_buf)?))
        }
        b'+' => {
            read_line(reader, line_buf)?;
            Ok(Value::Status(String::from_utf8_lossy(line_buf).into_owned()))
        }
        b'-' => {
            read_line(reader, line_buf)?;
            Ok(Value::Error(String::from_utf8_lossy(line_buf).into_owned()))
        }
        b'$' => {
            let len = read_length(reader, line_buf)?;
            decode_bulk(reader, len)
        }
        b'*' => {
            let len = read_length(reader, line_buf)?;
            decode_array(reader, line_buf, len, depth)
        }
        b'%' => {
            let len = read_length(reader, line_buf)?;
            decode_map(reader, line_buf, len, depth)
        }
        other => Err(CodecError::UnknownTag(other)),
    }
}

fn decode_bulk<R: BufRead>(reader: &mut R, len: i64) -> CodecResult<Value> {
    if len == -1 {
        return Ok(Value::Bulk(None));
    }
    if len < 0 {
        return Err(CodecError::InvalidLength(len));
    }
    if len > MAX_BULK_LEN {
        return Err(CodecError::BulkTooLarge(len));
    }

    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data)?;
    expect_crlf(reader)?;
    Ok(Value::Bulk(Some(data)))
}

fn decode_array<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    len: i64,
    depth: usize,
) -> CodecResult<Value> {
    if len < 0 {
        return Ok(Value::Array(None));
    }

    let len = len as usize;
    let mut items = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        items.push(decode_value(reader, line_buf, depth + 1)?);
    }
    Ok(Value::Array(Some(items)))
}

fn decode_map<R: BufRead>(
    reader: &mut R,
    line_buf: &mut Vec<u8>,
    len: i64,
    depth: usize,
) -> CodecResult<Value> {
    if len < 0 {
        return Err(CodecError::InvalidLength(len));
    }

    let len = len as usize;
    let mut pairs = Vec::with_capacity(len.min(MAX_PREALLOC));
    for _ in 0..len {
        let key = decode_value(reader, line_buf, depth + 1)?;
        let value = decode_value(reader, line_buf, depth + 1)?;
        pairs.push((key, value));
    }
    Ok(Value::Map(pairs))
}

fn read_byte<R: BufRead>(reader: &mut R) -> CodecResult<u8> {
    let byte = match reader.fill_buf()?.first() {
        Some(&byte) => byte,
        None => return Err(CodecError::Truncated),
    };
    reader.consume(1);
    Ok(byte)
}

fn expect_crlf<R: BufRead>(reader: &mut R) -> CodecResult<()> {
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf)?;
    if crlf != *b"\r\n" {
        return Err(CodecError::MissingCrlf);
    }
    Ok(())
}

fn read_length<R: BufRead>(reader: &mut R, line_buf: &mut Vec<u8>) -> CodecResult<i64> {
    read_line(reader, line_buf)?;
    parse_i64(line_buf)
}

/// Reads a header line into `buf` without its CR LF terminator.
fn read_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> CodecResult<()> {
    buf.clear();
    let bytes = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', buf)?;
    if buf.last() != Some(&b'\n') {
        if bytes == MAX_LINE_LEN {
            return Err(CodecError::LineTooLong(MAX_LINE_LEN));
        }
        return Err(CodecError::Truncated);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(CodecError::MissingCrlf);
    }
    buf.truncate(buf.len() - 2);
    Ok(())
}

fn parse_i64(data: &[u8]) -> CodecResult<i64> {
    let invalid = || CodecError::InvalidInteger(String::from_utf8_lossy(data).into_owned());

    let (negative, digits) = match data.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        Some(_) => (false, data),
        None => return Err(invalid()),
    };
    if digits.is_empty() {
        return Err(invalid());
    }

    // Accumulate toward the sign so i64::MIN parses without overflow.
    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return Err(invalid());
        }
        let digit = (b - b'0') as i64;
        value = value
            .checked_mul(10)
            .and_then(|v| if negative { v.checked_sub(digit) } else { v.checked_add(digit) })
            .ok_or_else(invalid)?;
    }
    Ok(value)
}
