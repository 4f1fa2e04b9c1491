//! Command Handler Module
//!
//! This module implements the command processing layer for SparkKV.
//! It receives decoded frames, executes them against the keyspace and the
//! runtime configuration, and returns the reply to encode.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Frame Parser   │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ StorageEngine / │  (storage, config modules)
//! │ RuntimeConfig   │
//! └─────────────────┘
//! ```

pub mod handler;

pub use handler::{CommandError, CommandHandler};
