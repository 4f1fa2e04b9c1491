//! SparkKV - A Small Redis-Compatible In-Memory Key-Value Server
//!
//! This is the main entry point for the SparkKV server.
//! It parses flags, sets up logging, binds the listener and serves clients
//! until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use sparkkv::config::RuntimeConfig;
use sparkkv::server::Server;
use sparkkv::storage::{start_expiry_sweeper, StorageEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// SparkKV server
#[derive(Parser, Debug)]
#[command(name = "sparkkv")]
#[command(about = "A small Redis-compatible in-memory key-value server")]
struct Args {
    /// Directory for snapshot files (reported by CONFIG GET dir)
    #[arg(long, default_value = "")]
    dir: String,

    /// Snapshot file name (reported by CONFIG GET dbfilename)
    #[arg(long, default_value = "")]
    dbfilename: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let bind_address = format!("{}:{}", sparkkv::DEFAULT_HOST, sparkkv::DEFAULT_PORT);
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to port {}", sparkkv::DEFAULT_PORT))?;

    info!(version = sparkkv::VERSION, address = %bind_address, "SparkKV listening");
    info!(dir = %args.dir, dbfilename = %args.dbfilename, "Runtime configuration loaded");

    let storage = Arc::new(StorageEngine::new());
    let _sweeper = start_expiry_sweeper(Arc::clone(&storage));

    let config = Arc::new(RuntimeConfig::new(args.dir, args.dbfilename));

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    Server::new(storage, config).run(listener, shutdown).await;

    info!("Server shutdown complete");
    Ok(())
}
