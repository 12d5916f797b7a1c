//! # Command Encoding
//!
//! Requests are always an array of bulk strings. Tokens are written verbatim
//! after their length prefix, so no escaping is ever needed.

use bytes::{BufMut, Bytes, BytesMut};

pub(crate) const CRLF: &[u8] = b"\r\n";

/// Splits a command line into tokens on runs of whitespace.
///
/// Tokens cannot contain whitespace themselves; callers that need that must
/// build the argument list and use [`encode_args`].
pub fn tokenize(command: &str) -> Vec<&str> {
    command.split_whitespace().collect()
}

/// Encodes a whitespace-separated command line into request bytes.
///
/// `"GET key"` becomes `*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n`. An empty or
/// all-whitespace command encodes to an empty array (`*0\r\n`).
pub fn encode(command: &str) -> Bytes {
    let tokens = tokenize(command);
    let payload: usize = tokens.iter().map(|token| token.len() + 16).sum();
    let mut out = BytesMut::with_capacity(payload + 16);
    encode_args(&tokens, &mut out);
    out.freeze()
}

/// Encodes an already-tokenised argument list into the provided buffer.
pub fn encode_args<A: AsRef<[u8]>>(args: &[A], out: &mut BytesMut) {
    out.put_u8(b'*');
    put_decimal(out, args.len());
    out.put_slice(CRLF);
    for arg in args {
        let arg = arg.as_ref();
        out.put_u8(b'$');
        put_decimal(out, arg.len());
        out.put_slice(CRLF);
        out.put_slice(arg);
        out.put_slice(CRLF);
    }
}

pub(crate) fn put_decimal(out: &mut BytesMut, value: usize) {
    put_u64(out, value as u64);
}

/// Writes a signed integer; `i64::MIN` is handled through its magnitude.
pub(crate) fn put_signed(out: &mut BytesMut, value: i64) {
    if value < 0 {
        out.put_u8(b'-');
    }
    put_u64(out, value.unsigned_abs());
}

fn put_u64(out: &mut BytesMut, mut value: u64) {
    // Digits are produced least-significant first into a stack buffer.
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        len = 1;
    } else {
        while value > 0 {
            buf[len] = b'0' + (value % 10) as u8;
            value /= 10;
            len += 1;
        }
    }
    buf[..len].reverse();
    out.put_slice(&buf[..len]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_command() {
        let bytes = encode("GET key");
        assert_eq!(&bytes[..], b"*2\r\n$3\r\nGET\r\n$3\r\nkey\r\n");
    }

    #[test]
    fn collapses_whitespace_runs() {
        let bytes = encode("  set \t hello   world\n");
        assert_eq!(
            &bytes[..],
            b"*3\r\n$3\r\nset\r\n$5\r\nhello\r\n$5\r\nworld\r\n"
        );
    }

    #[test]
    fn empty_command_is_empty_array() {
        assert_eq!(&encode("   ")[..], b"*0\r\n");
        assert!(tokenize(" \t ").is_empty());
    }

    #[test]
    fn args_are_binary_safe() {
        let mut out = BytesMut::new();
        encode_args(&[&b"AUTH"[..], &b"p a\r\ns"[..]], &mut out);
        assert_eq!(&out[..], b"*2\r\n$4\r\nAUTH\r\n$6\r\np a\r\ns\r\n");
    }

    #[test]
    fn length_prefix_counts_bytes_not_chars() {
        let bytes = encode("héllo");
        assert_eq!(&bytes[..], "*1\r\n$6\r\nhéllo\r\n".as_bytes());
    }

    #[test]
    fn signed_decimals_cover_the_full_range() {
        for (value, text) in [
            (0i64, "0"),
            (-1, "-1"),
            (1234, "1234"),
            (i64::MAX, "9223372036854775807"),
            (i64::MIN, "-9223372036854775808"),
        ] {
            let mut out = BytesMut::new();
            put_signed(&mut out, value);
            assert_eq!(&out[..], text.as_bytes());
        }
    }

    #[test]
    fn writes_multi_digit_lengths() {
        let token = "x".repeat(1234);
        let bytes = encode(&token);
        assert!(bytes.starts_with(b"*1\r\n$1234\r\n"));
        assert_eq!(bytes.len(), 4 + 7 + 1234 + 2);
    }
}
