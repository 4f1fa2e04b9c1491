//! Background Expiry Sweeper
//!
//! This module implements a background task that periodically removes
//! expired keys ("active expiry"), complementing the lazy check done on
//! every read.
//!
//! Lazy expiry alone never frees a key that is not read again after its
//! deadline. The sweeper reclaims those.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Sleeps for a configurable interval (default: 100ms)
//! 2. Wakes up and removes expired keys via [`StorageEngine::cleanup_expired`]
//! 3. Speeds up when many keys are expiring and backs off when few are
//!
//! ## Adaptive Frequency
//!
//! A sweep locks every shard in turn, so its cost grows with the keyspace
//! rather than with the number of expired keys. When a large share of keys
//! is expiring the interval halves (down to `min_interval`) to keep dead
//! entries from piling up. When a sweep finds nothing it doubles (up to
//! `max_interval`), leaving the shard locks to client traffic.
//!
//! Removal always re-checks the deadline under the shard lock, so a key
//! rewritten after its old deadline is never swept.

use crate::storage::StorageEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// If this fraction of stored keys expired in one sweep, speed up
    pub speedup_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// ```ignore
    /// use sparkkv::storage::{StorageEngine, ExpirySweeper, ExpiryConfig};
    /// use std::sync::Arc;
    ///
    /// let engine = Arc::new(StorageEngine::new());
    /// let sweeper = ExpirySweeper::start(engine, ExpiryConfig::default());
    ///
    /// // Dropping the sweeper will stop it
    /// drop(sweeper);
    /// ```
    pub fn start(engine: Arc<StorageEngine>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(engine, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Self { shutdown_tx }
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if !*self.shutdown_tx.borrow() {
            let _ = self.shutdown_tx.send(true);
            debug!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    engine: Arc<StorageEngine>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;

    loop {
        // Wait for the interval or shutdown signal
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    trace!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let keys_before = engine.len();
        let expired = engine.cleanup_expired();

        // Empty keyspace: nothing to learn, keep the current pace
        if keys_before == 0 {
            continue;
        }

        // Mostly-expired keyspaces get swept more often, idle ones less
        let expiry_rate = expired as f64 / keys_before as f64;
        if expiry_rate > config.speedup_threshold {
            current_interval = (current_interval / 2).max(config.min_interval);
            debug!(
                expired = expired,
                rate = %format!("{:.2}%", expiry_rate * 100.0),
                new_interval_ms = current_interval.as_millis(),
                "High expiry rate, speeding up sweeper"
            );
        } else if expired == 0 {
            current_interval = (current_interval * 2).min(config.max_interval);
            trace!(
                new_interval_ms = current_interval.as_millis(),
                "No expired keys, slowing down sweeper"
            );
        }

        if expired > 0 {
            debug!(
                expired = expired,
                keys_remaining = engine.len(),
                "Expired keys cleaned up"
            );
        }
    }
}

/// Starts the expiry sweeper with default configuration.
pub fn start_expiry_sweeper(engine: Arc<StorageEngine>) -> ExpirySweeper {
    ExpirySweeper::start(engine, ExpiryConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_sweeper_cleans_expired_keys() {
        let engine = Arc::new(StorageEngine::new());

        for i in 0..10 {
            engine.set(
                Bytes::from(format!("key{}", i)),
                Bytes::from("value"),
                Some(Duration::from_millis(50)),
            );
        }
        engine.set(Bytes::from("persistent"), Bytes::from("value"), None);

        assert_eq!(engine.len(), 11);

        let config = ExpiryConfig {
            base_interval: Duration::from_millis(10),
            max_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let _sweeper = ExpirySweeper::start(Arc::clone(&engine), config);

        tokio::time::sleep(Duration::from_millis(200)).await;

        // Only the persistent key should remain, without any reads
        assert_eq!(engine.len(), 1);
        assert!(engine.exists(&Bytes::from("persistent")));
    }

    #[tokio::test]
    async fn test_sweeper_stops_on_drop() {
        let engine = Arc::new(StorageEngine::new());

        let config = ExpiryConfig {
            base_interval: Duration::from_millis(10),
            ..Default::default()
        };

        {
            let _sweeper = ExpirySweeper::start(Arc::clone(&engine), config);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        engine.set(
            Bytes::from("key"),
            Bytes::from("value"),
            Some(Duration::from_millis(10)),
        );

        tokio::time::sleep(Duration::from_millis(100)).await;

        // Nothing swept it, but it is still stored
        assert_eq!(engine.len(), 1);
        // ...and a read still treats it as gone
        assert!(engine.get(&Bytes::from("key")).is_none());
    }

    #[tokio::test]
    async fn test_sweeper_keeps_rewritten_keys() {
        let engine = Arc::new(StorageEngine::new());

        let config = ExpiryConfig {
            base_interval: Duration::from_millis(5),
            min_interval: Duration::from_millis(5),
            max_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let _sweeper = ExpirySweeper::start(Arc::clone(&engine), config);

        for _ in 0..20 {
            engine.set(
                Bytes::from("key"),
                Bytes::from("short"),
                Some(Duration::from_millis(1)),
            );
            engine.set(Bytes::from("key"), Bytes::from("long"), None);
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(engine.get(&Bytes::from("key")), Some(Bytes::from("long")));
    }
}
