//! RESP Protocol Implementation
//!
//! This module is the wire codec for SparkKV: it decodes multi-bulk requests
//! into [`Frame`]s and encodes typed [`RespValue`] replies into bytes.
//!
//! ## Modules
//!
//! - `types`: Defines `Frame`, the `RespValue` enum and serialization
//! - `parser`: Incremental parser for incoming multi-bulk requests
//!
//! ## Example
//!
//! ```
//! use sparkkv::protocol::{parse_frame, RespValue};
//! use bytes::Bytes;
//!
//! // Parsing incoming data
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (frame, consumed) = parse_frame(data).unwrap().unwrap();
//! assert_eq!(frame.name, "GET");
//! assert_eq!(consumed, data.len());
//!
//! // Creating responses
//! let response = RespValue::bulk_string(Bytes::from("Ada"));
//! assert_eq!(response.serialize(), b"$3\r\nAda\r\n");
//! ```

pub mod parser;
pub mod types;

pub use parser::{parse_frame, FrameParser, ParseError, ParseResult};
pub use types::{Frame, RespValue};
