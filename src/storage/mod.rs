//! Storage Engine Module
//!
//! This module provides the keyspace for SparkKV: a thread-safe, sharded
//! key-value store with TTL support and a background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use sparkkv::storage::StorageEngine;
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = StorageEngine::new();
//!
//! engine.set(Bytes::from("name"), Bytes::from("Ada"), None);
//! assert_eq!(engine.get(&Bytes::from("name")), Some(Bytes::from("Ada")));
//!
//! engine.set(
//!     Bytes::from("session"),
//!     Bytes::from("token123"),
//!     Some(Duration::from_secs(3600)),
//! );
//! ```

pub mod engine;
pub mod expiry;

pub use engine::{Entry, StorageEngine, StorageStats};
pub use expiry::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};
