//! # respool Wire Codec
//!
//! Purpose: Encode commands into the RESP array-of-bulk-strings request
//! format and decode one server reply at a time from a buffered stream.
//!
//! ## Design Principles
//! 1. **Length Governs Framing**: Payloads are consumed by their declared
//!    length, never by scanning for a delimiter.
//! 2. **Stateless Functions**: Nothing is cached between calls; the caller
//!    owns the stream and any reusable buffers.
//! 3. **Binary-Safe**: Bulk payloads are raw bytes end to end.
//! 4. **Fail Fast**: Framing problems abort the decode with a typed error.

mod decode;
mod encode;
mod error;
mod value;

pub use decode::{decode, decode_with, MAX_BULK_LEN, MAX_DEPTH, MAX_LINE_LEN};
pub use encode::{encode, encode_args, tokenize};
pub use error::{CodecError, CodecResult};
pub use value::{Value, NIL};
