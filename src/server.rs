//! TCP Server
//!
//! Accepts client connections and spawns one task per connection. The
//! keyspace and runtime configuration are shared with every task through
//! the [`CommandHandler`]; tasks never see each other.

use crate::commands::CommandHandler;
use crate::config::RuntimeConfig;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::StorageEngine;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The listener side of SparkKV.
#[derive(Debug, Clone)]
pub struct Server {
    storage: Arc<StorageEngine>,
    config: Arc<RuntimeConfig>,
    stats: Arc<ConnectionStats>,
}

impl Server {
    pub fn new(storage: Arc<StorageEngine>, config: Arc<RuntimeConfig>) -> Self {
        Self {
            storage,
            config,
            stats: Arc::new(ConnectionStats::new()),
        }
    }

    /// Connection statistics shared by all sessions of this server.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts connections until `shutdown` resolves.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run(&self, listener: TcpListener, shutdown: impl Future<Output = ()>) {
        tokio::select! {
            _ = self.accept_loop(listener) => {}
            _ = shutdown => {
                info!(
                    active_connections = self.stats.active_connections.load(Ordering::Relaxed),
                    total_commands = self.stats.commands_processed.load(Ordering::Relaxed),
                    "Shutdown signal received, no longer accepting connections"
                );
            }
        }
    }

    async fn accept_loop(&self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        error!(client = %addr, error = %e, "Failed to set TCP_NODELAY");
                    }

                    let handler =
                        CommandHandler::new(Arc::clone(&self.storage), Arc::clone(&self.config));
                    let stats = Arc::clone(&self.stats);

                    tokio::spawn(handle_connection(stream, addr, handler, stats));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
