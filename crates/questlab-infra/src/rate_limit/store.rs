use chrono::{DateTime, TimeDelta, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard};

type Bucket = VecDeque<DateTime<Utc>>;

/// Backing store for rate-limit buckets
///
/// Every method prunes the key's bucket to `[now - window, now]` before doing
/// anything else, and the prune plus the read or append happen as one atomic step
/// per key. A shared external store can stand in for [`InMemoryStore`] as long as
/// it keeps that guarantee.
pub trait RateLimitStore: Send + Sync {
    /// Append `now` if fewer than `limit` entries remain after pruning.
    /// Returns whether the attempt was recorded.
    fn try_acquire(&self, key: &str, limit: u32, window_secs: u64, now: DateTime<Utc>) -> bool;

    /// Append `now` unconditionally; returns the in-window count afterwards.
    fn append(&self, key: &str, window_secs: u64, now: DateTime<Utc>) -> u32;

    /// In-window count after pruning.
    fn count(&self, key: &str, window_secs: u64, now: DateTime<Utc>) -> u32;
}

/// Sharded in-memory store
///
/// Keys are hashed onto a fixed number of shards, each behind its own mutex, so
/// concurrent requests for different clients rarely contend. Buckets are created
/// on first use and live for the process lifetime.
pub struct InMemoryStore {
    shards: Vec<Mutex<HashMap<String, Bucket>>>,
}

impl InMemoryStore {
    /// Create a store with the default shard count (16 shards)
    pub fn new() -> Self {
        Self::with_shards(16)
    }

    pub fn with_shards(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| Mutex::new(HashMap::new()))
            .collect();
        Self { shards }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Number of buckets currently held across all shards.
    pub fn bucket_count(&self) -> usize {
        (0..self.shards.len())
            .map(|index| self.lock_shard(index).len())
            .sum()
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    // A panic while holding a shard leaves plain timestamps behind, which are
    // still consistent, so poisoning is ignored rather than surfaced.
    fn lock_shard(&self, index: usize) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.shards[index]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_bucket<R>(&self, key: &str, f: impl FnOnce(&mut Bucket) -> R) -> R {
        let mut shard = self.lock_shard(self.shard_index(key));
        let bucket = shard.entry(key.to_string()).or_default();
        f(bucket)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn window_start(now: DateTime<Utc>, window_secs: u64) -> DateTime<Utc> {
    let window = i64::try_from(window_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn prune(bucket: &mut Bucket, now: DateTime<Utc>, window_secs: u64) {
    let cutoff = window_start(now, window_secs);
    bucket.retain(|attempt| *attempt >= cutoff);
}

fn len_u32(bucket: &Bucket) -> u32 {
    u32::try_from(bucket.len()).unwrap_or(u32::MAX)
}

impl RateLimitStore for InMemoryStore {
    fn try_acquire(&self, key: &str, limit: u32, window_secs: u64, now: DateTime<Utc>) -> bool {
        self.with_bucket(key, |bucket| {
            prune(bucket, now, window_secs);
            if len_u32(bucket) >= limit {
                return false;
            }
            bucket.push_back(now);
            true
        })
    }

    fn append(&self, key: &str, window_secs: u64, now: DateTime<Utc>) -> u32 {
        self.with_bucket(key, |bucket| {
            prune(bucket, now, window_secs);
            bucket.push_back(now);
            len_u32(bucket)
        })
    }

    fn count(&self, key: &str, window_secs: u64, now: DateTime<Utc>) -> u32 {
        self.with_bucket(key, |bucket| {
            prune(bucket, now, window_secs);
            len_u32(bucket)
        })
    }
}
