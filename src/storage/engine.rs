//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the keyspace for SparkKV: a concurrent map from
//! key to value with an optional absolute expiry instant per entry.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Instead of one big lock, keys are spread over 64 shards.
//! 2. **Lazy Expiry**: Keys are checked for expiry on access, plus background cleanup.
//! 3. **RwLock**: Multiple concurrent readers with exclusive writers per shard.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A key always maps to the same shard, so every operation on one key is
//! serialized by that shard's lock. Operations on different keys in
//! different shards never block each other.
//!
//! Any removal of an expired entry (lazy or by the sweeper) re-checks the
//! deadline while holding the write lock. A `SET` that raced in between
//! replaces the entry with a fresh deadline, and the re-check leaves it alone.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// Represents a stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The actual value stored
    pub value: Bytes,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    /// Creates a new entry without expiry.
    pub fn new(value: Bytes) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates a new entry with TTL.
    ///
    /// A zero TTL yields an entry that is already expired.
    pub fn with_ttl(value: Bytes, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    #[inline]
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now >= exp)
    }
}

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug, Default)]
struct Shard {
    data: RwLock<HashMap<Bytes, Entry>>,
}

/// The keyspace shared by every client connection.
///
/// Wrap it in an `Arc` and hand a clone to each connection task; all
/// operations take `&self` and are thread-safe.
///
/// # Example
///
/// ```
/// use sparkkv::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("Ada"), None);
/// assert_eq!(engine.get(&Bytes::from("name")), Some(Bytes::from("Ada")));
///
/// // A zero TTL expires immediately
/// engine.set(Bytes::from("gone"), Bytes::from("x"), Some(Duration::ZERO));
/// assert_eq!(engine.get(&Bytes::from("gone")), None);
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,

    /// Statistics: total number of keys (approximate, may include expired keys)
    key_count: AtomicU64,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: number of expired keys cleaned up
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty storage engine.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Inserts or overwrites a key.
    ///
    /// With `ttl` the key becomes unreadable once `ttl` has elapsed. Without
    /// it the key never expires, and any deadline from a previous value is
    /// dropped along with that value.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was updated.
    pub fn set(&self, key: Bytes, value: Bytes, ttl: Option<Duration>) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = match ttl {
            Some(ttl) => Entry::with_ttl(value, ttl),
            None => Entry::new(value),
        };

        let shard = self.get_shard(&key);
        let mut data = shard.data.write();
        let is_new = data.insert(key, entry).is_none();

        // Counted under the lock so a racing removal never decrements first
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }

        is_new
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expired keys
    /// found here are removed on the spot.
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Gets the full entry for a key, including its deadline.
    pub fn get_entry(&self, key: &Bytes) -> Option<Entry> {
        let shard = self.get_shard(key);

        // Fast path under the read lock
        {
            let data = shard.data.read();
            match data.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: upgrade to the write lock and re-check before removing
        let mut data = shard.data.write();
        match data.get(key) {
            Some(entry) if entry.is_expired() => {
                data.remove(key);
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                self.expired_count.fetch_add(1, Ordering::Relaxed);
                None
            }
            // Overwritten by a concurrent SET between the two locks
            Some(entry) => Some(entry.clone()),
            None => None,
        }
    }

    /// Deletes a key.
    ///
    /// # Returns
    ///
    /// Returns `true` if a live key was deleted, `false` if it didn't exist or had expired.
    pub fn delete(&self, key: &Bytes) -> bool {
        let shard = self.get_shard(key);
        let mut data = shard.data.write();

        match data.remove(key) {
            Some(entry) => {
                self.key_count.fetch_sub(1, Ordering::Relaxed);
                !entry.is_expired()
            }
            None => false,
        }
    }

    /// Checks if a key exists and has not expired.
    pub fn exists(&self, key: &Bytes) -> bool {
        self.get_entry(key).is_some()
    }

    /// Returns the number of stored keys, including expired keys not yet cleaned up.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns operation statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Removes every expired entry.
    ///
    /// Each shard is scanned under its write lock, so an entry replaced by a
    /// concurrent `SET` is judged by its new deadline, never the old one.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub fn cleanup_expired(&self) -> u64 {
        let mut cleaned = 0u64;

        for shard in &self.shards {
            let mut data = shard.data.write();
            let now = Instant::now();
            let before = data.len();

            data.retain(|_, entry| !entry.is_expired_at(now));

            let removed = (before - data.len()) as u64;
            if removed > 0 {
                self.key_count.fetch_sub(removed, Ordering::Relaxed);
                self.expired_count.fetch_add(removed, Ordering::Relaxed);
                cleaned += removed;
            }
        }

        cleaned
    }
}

/// Keyspace statistics.
#[derive(Debug, Clone, Copy)]
pub struct StorageStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total expired keys cleaned up
    pub expired: u64,
}
