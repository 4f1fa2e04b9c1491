//! RESP Data Types
//!
//! This module defines the two value shapes that cross the wire:
//!
//! - [`Frame`]: one decoded client request (command name + arguments)
//! - [`RespValue`]: a typed reply that the server encodes back to the client
//!
//! ## Reply Format
//!
//! Each reply starts with a type prefix byte and ends with CRLF (`\r\n`):
//!
//! Status: `+OK\r\n`
//! Error: `-ERR unknown command 'FOO'\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Null Bulk String: `$-1\r\n`
//! Array: `*2\r\n$3\r\ndir\r\n$4\r\n/tmp\r\n`

use bytes::Bytes;
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// A typed reply produced by the command layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Status reply. Cannot contain CRLF.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Command error. The `ERR` tag is added during encoding.
    /// Format: `-ERR <message>\r\n`
    Error(String),

    /// Binary-safe string.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Null bulk string, used for missing keys.
    /// Format: `$-1\r\n`
    Null,

    /// Flat array of bulk strings.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<Bytes>),
}

impl RespValue {
    /// Creates a new status reply.
    ///
    /// # Example
    /// ```
    /// use sparkkv::protocol::types::RespValue;
    /// let ok = RespValue::simple_string("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error reply from a bare message.
    ///
    /// # Example
    /// ```
    /// use sparkkv::protocol::types::RespValue;
    /// let err = RespValue::error("unknown command 'FOO'");
    /// assert_eq!(err.serialize(), b"-ERR unknown command 'FOO'\r\n");
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    /// Creates a new bulk string reply.
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    /// Creates a null bulk string reply.
    pub fn null() -> Self {
        RespValue::Null
    }

    /// Creates an array reply.
    pub fn array(values: Vec<Bytes>) -> Self {
        RespValue::Array(values)
    }

    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn pong() -> Self {
        RespValue::SimpleString("PONG".to_string())
    }

    /// Serializes the value to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(prefix::SIMPLE_STRING);
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::Error(msg) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(b"ERR ");
                buf.extend_from_slice(msg.as_bytes());
                buf.extend_from_slice(CRLF);
            }
            RespValue::BulkString(data) => write_bulk(buf, data),
            RespValue::Null => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            RespValue::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    write_bulk(buf, value);
                }
            }
        }
    }

    /// Returns true if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    /// Returns true if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }
}

#[inline]
fn write_bulk(buf: &mut Vec<u8>, data: &[u8]) {
    buf.push(prefix::BULK_STRING);
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(CRLF);
    buf.extend_from_slice(data);
    buf.extend_from_slice(CRLF);
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error(s) => write!(f, "(error) ERR {}", s),
            RespValue::BulkString(data) => write_display_bulk(f, data),
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) => {
                if values.is_empty() {
                    return write!(f, "(empty array)");
                }
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}) ", i + 1)?;
                    write_display_bulk(f, v)?;
                }
                Ok(())
            }
        }
    }
}

fn write_display_bulk(f: &mut fmt::Formatter<'_>, data: &[u8]) -> fmt::Result {
    match std::str::from_utf8(data) {
        Ok(s) => write!(f, "\"{}\"", s),
        Err(_) => write!(f, "(binary data, {} bytes)", data.len()),
    }
}

/// One fully decoded client request.
///
/// The command name is normalized to upper case; arguments keep their
/// original bytes (and therefore their case).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub name: String,
    pub args: Vec<Bytes>,
}

impl Frame {
    /// Builds a frame, uppercasing the command name.
    pub fn new(name: &str, args: Vec<Bytes>) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            args,
        }
    }

    /// Encodes the frame as a multi-bulk request, name first.
    pub fn to_resp(&self) -> RespValue {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(Bytes::from(self.name.clone()));
        parts.extend(self.args.iter().cloned());
        RespValue::Array(parts)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}
