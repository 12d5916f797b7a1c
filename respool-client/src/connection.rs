//! # Pooled Connection
//!
//! One TCP connection with reusable buffers, authenticated and pointed at
//! the right database before the pool ever lends it out.

use std::io::{self, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::BytesMut;
use respool_codec::{decode_with, encode_args, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Acknowledgement expected from `AUTH` and `SELECT`.
const OK_REPLY: &str = "OK";

/// Single TCP connection with reusable buffers.
///
/// The buffers are stored on the connection to avoid per-call allocations.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
    line_buf: Vec<u8>,
    write_buf: BytesMut,
}

impl Connection {
    /// Dials the server and runs the handshake.
    ///
    /// Sends `AUTH` when a password is configured and `SELECT` when a
    /// database is, each exactly once for this connection.
    pub fn open(config: &ClientConfig) -> ClientResult<Self> {
        let stream = connect_stream(config)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            reader: BufReader::new(stream),
            line_buf: Vec::with_capacity(128),
            write_buf: BytesMut::with_capacity(256),
        };
        conn.handshake(config)?;
        debug!(addr = %config.addr(), db = ?config.database, "connection ready");
        Ok(conn)
    }

    fn handshake(&mut self, config: &ClientConfig) -> ClientResult<()> {
        if let Some(password) = &config.password {
            let reply = match &config.username {
                Some(username) => {
                    self.exec(&[b"AUTH", username.as_bytes(), password.as_bytes()])?
                }
                None => self.exec(&[b"AUTH", password.as_bytes()])?,
            };
            if !is_ok(&reply) {
                return Err(ClientError::Auth {
                    expected: OK_REPLY.to_string(),
                    actual: reply.to_string(),
                });
            }
        }

        if let Some(database) = config.database {
            let index = database.to_string();
            let reply = self.exec(&[b"SELECT", index.as_bytes()])?;
            if !is_ok(&reply) {
                return Err(ClientError::Select {
                    database,
                    reply: reply.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Sends one command given as separate arguments and reads its reply.
    pub fn exec(&mut self, args: &[&[u8]]) -> ClientResult<Value> {
        self.write_buf.clear();
        encode_args(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        self.read_reply()
    }

    /// Sends an already-encoded request and reads its reply.
    pub fn request(&mut self, encoded: &[u8]) -> ClientResult<Value> {
        let stream = self.reader.get_mut();
        stream.write_all(encoded)?;
        stream.flush()?;

        self.read_reply()
    }

    fn read_reply(&mut self) -> ClientResult<Value> {
        Ok(decode_with(&mut self.reader, &mut self.line_buf)?)
    }
}

fn is_ok(reply: &Value) -> bool {
    matches!(reply, Value::Status(text) if text == OK_REPLY)
}

/// Connects to the first resolved address that accepts.
fn connect_stream(config: &ClientConfig) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in config.addr().to_socket_addrs()? {
        let attempt = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "host resolved to no addresses")
    }))
}
