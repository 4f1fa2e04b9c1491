//! # SparkKV - A Small Redis-Compatible In-Memory Key-Value Server
//!
//! SparkKV speaks the RESP multi-bulk request protocol over TCP and serves
//! a shared, expiring keyspace to any number of concurrent clients.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              SparkKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │   Server    │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐   ┌───────────────┬──────────────┐  │
//! │                     │   Frame     │   │ StorageEngine │ RuntimeConfig│  │
//! │                     │   Parser    │   │  (64 shards)  │ dir/dbfile.. │  │
//! │                     └─────────────┘   └───────▲───────┴──────────────┘  │
//! │                                               │                         │
//! │                                    ┌──────────┴──────────┐              │
//! │                                    │    ExpirySweeper    │              │
//! │                                    └─────────────────────┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use sparkkv::config::RuntimeConfig;
//! use sparkkv::server::Server;
//! use sparkkv::storage::{start_expiry_sweeper, StorageEngine};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let storage = Arc::new(StorageEngine::new());
//!     let _sweeper = start_expiry_sweeper(Arc::clone(&storage));
//!     let config = Arc::new(RuntimeConfig::new("/tmp", "dump.rdb"));
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!     Server::new(storage, config)
//!         .run(listener, async { let _ = tokio::signal::ctrl_c().await; })
//!         .await;
//!     Ok(())
//! }
//! ```
//!
//! ## Supported Commands
//!
//! - `PING [message]`
//! - `ECHO message`
//! - `SET key value [PX milliseconds]`
//! - `GET key`
//! - `CONFIG GET dir|dbfilename`
//! - `CONFIG SET dir|dbfilename value`
//!
//! ## Module Overview
//!
//! - [`protocol`]: Request parser and reply encoder
//! - [`storage`]: Thread-safe keyspace with TTL support
//! - [`config`]: Runtime configuration parameters
//! - [`commands`]: Command dispatch and validation
//! - [`connection`]: Per-client read/dispatch/write loop
//! - [`server`]: Accept loop
//!
//! ## Expiry
//!
//! Keys with a TTL are expired in two ways:
//! 1. **Lazy**: When a key is read after its deadline, it is reported missing and removed
//! 2. **Active**: A background task periodically removes expired keys
//!
//! Both re-check the deadline under the shard's write lock, so a key
//! overwritten after its old deadline is never removed by mistake.

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

pub use commands::CommandHandler;
pub use config::{ConfigParam, RuntimeConfig};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Frame, FrameParser, ParseError, RespValue};
pub use server::Server;
pub use storage::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, StorageEngine};

/// The default port SparkKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host SparkKV binds to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of SparkKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
