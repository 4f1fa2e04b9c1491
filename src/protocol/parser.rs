//! Incremental Multi-Bulk Request Parser
//!
//! Clients send every command as a multi-bulk request:
//!
//! ```text
//! *<N>\r\n            N = number of arguments, command name included
//! $<L>\r\n            L = exact byte length of the next argument
//! <L bytes>\r\n
//! ... repeated N times
//! ```
//!
//! ## How the Parser Works
//!
//! The parser reads from a buffer and returns either:
//! - `Ok(Some((frame, consumed)))` - A full request was decoded from the first `consumed` bytes
//! - `Ok(None)` - Need more data, the request is incomplete
//! - `Err(ParseError)` - Malformed framing; the connection cannot be resynchronized
//!
//! Nothing is retained between calls, so a caller can:
//! 1. Append incoming network data to a buffer
//! 2. Call `parse()` to attempt parsing
//! 3. If successful, advance the buffer by `consumed` bytes and try again
//! 4. If incomplete, wait for more data and retry from the start of the buffer
//! 5. If error, close the connection

use crate::protocol::types::{prefix, Frame, CRLF};
use bytes::Bytes;
use std::ops::Range;
use thiserror::Error;

/// Errors that can occur while decoding a request.
///
/// Every variant is a framing error: the byte stream is no longer
/// trustworthy and the connection has to be dropped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A line started with something other than the expected prefix
    #[error("expected '{expected}', got {found:?}")]
    UnexpectedByte { expected: char, found: char },

    /// An array count or bulk length that is not a non-negative integer
    #[error("invalid {what}: {value:?}")]
    InvalidInteger { what: &'static str, value: String },

    /// A bulk payload not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    /// The command name is not valid UTF-8
    #[error("command name is not valid UTF-8")]
    InvalidUtf8,

    /// A request with zero arguments has no command name
    #[error("empty multi-bulk request")]
    EmptyCommand,

    /// A single argument exceeds the maximum allowed size
    #[error("bulk string too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// A `*` or `$` header line runs past its length limit without a CRLF
    #[error("header line too long (max: {max} bytes)")]
    HeaderTooLong { max: usize },
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Upper bound on the argument count of one request
pub const MAX_ARGS: usize = 1024 * 1024;

/// Longest digit run accepted between a header prefix and its CRLF.
///
/// Any `usize` fits in 20 digits, so a longer line can never be valid.
pub const MAX_HEADER_LEN: usize = 32;

/// A multi-bulk request parser.
///
/// # Example
///
/// ```
/// use sparkkv::protocol::FrameParser;
///
/// let parser = FrameParser::new();
/// let buf = b"*2\r\n$4\r\nECHO\r\n$3\r\nfoo\r\n";
///
/// let (frame, consumed) = parser.parse(buf).unwrap().unwrap();
/// assert_eq!(frame.name, "ECHO");
/// assert_eq!(consumed, buf.len());
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameParser;

impl FrameParser {
    /// Creates a new parser instance.
    pub fn new() -> Self {
        Self
    }

    /// Attempts to decode one request from the front of `buf`.
    pub fn parse(&self, buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
        let (count, mut consumed) = match read_header(buf, prefix::ARRAY, "argument count")? {
            Some(header) => header,
            None => return Ok(None),
        };

        if count == 0 {
            return Err(ParseError::EmptyCommand);
        }
        if count > MAX_ARGS {
            return Err(ParseError::InvalidInteger {
                what: "argument count",
                value: count.to_string(),
            });
        }

        // Locate every argument before copying any, so a request that is
        // still arriving costs one header scan per retry and no copies.
        let mut spans: Vec<Range<usize>> = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            match read_bulk(&buf[consumed..])? {
                Some((span, used)) => {
                    spans.push(consumed + span.start..consumed + span.end);
                    consumed += used;
                }
                None => return Ok(None),
            }
        }

        let mut spans = spans.into_iter();
        let name = match spans.next() {
            Some(span) => &buf[span],
            None => return Err(ParseError::EmptyCommand),
        };
        let name = std::str::from_utf8(name).map_err(|_| ParseError::InvalidUtf8)?;
        let args = spans.map(|span| Bytes::copy_from_slice(&buf[span])).collect();

        Ok(Some((Frame::new(name, args), consumed)))
    }
}

/// Reads `<prefix><non-negative integer>\r\n`.
///
/// Returns the integer and the number of bytes used, or `None` when the
/// line is not complete yet. Only the first `MAX_HEADER_LEN + 2` bytes after
/// the prefix are searched; a line with no CRLF in that window is rejected.
fn read_header(
    buf: &[u8],
    expected: u8,
    what: &'static str,
) -> ParseResult<Option<(usize, usize)>> {
    let first = match buf.first() {
        Some(&b) => b,
        None => return Ok(None),
    };

    if first != expected {
        return Err(ParseError::UnexpectedByte {
            expected: expected as char,
            found: first as char,
        });
    }

    let window = &buf[1..buf.len().min(1 + MAX_HEADER_LEN + CRLF.len())];
    let line_end = match find_crlf(window) {
        Some(pos) => pos,
        None if window.len() < MAX_HEADER_LEN + CRLF.len() => return Ok(None),
        None => return Err(ParseError::HeaderTooLong { max: MAX_HEADER_LEN }),
    };

    let digits = &buf[1..1 + line_end];
    let value = parse_decimal(digits).ok_or_else(|| ParseError::InvalidInteger {
        what,
        value: String::from_utf8_lossy(digits).into_owned(),
    })?;

    Ok(Some((value, 1 + line_end + 2)))
}

/// Reads one `$<L>\r\n<L bytes>\r\n` argument.
///
/// Returns where the payload sits in `buf` and the total bytes used.
fn read_bulk(buf: &[u8]) -> ParseResult<Option<(Range<usize>, usize)>> {
    let (length, data_start) = match read_header(buf, prefix::BULK_STRING, "bulk length")? {
        Some(header) => header,
        None => return Ok(None),
    };

    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total_needed = data_start + length + 2;
    if buf.len() < total_needed {
        return Ok(None);
    }

    if &buf[data_start + length..total_needed] != CRLF {
        return Err(ParseError::MissingCrlf);
    }

    Ok(Some((data_start..data_start + length, total_needed)))
}

/// Parses ASCII digits into a `usize`. Signs, blanks and overflow are rejected.
fn parse_decimal(digits: &[u8]) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    digits.iter().try_fold(0usize, |acc, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        acc.checked_mul(10)?.checked_add((b - b'0') as usize)
    })
}

/// Finds the position of CRLF in the buffer.
///
/// Returns the position of `\r` if found, or None if CRLF is not present.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Decodes a single request from bytes.
pub fn parse_frame(buf: &[u8]) -> ParseResult<Option<(Frame, usize)>> {
    FrameParser::new().parse(buf)
}
