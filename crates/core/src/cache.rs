//! Time-to-live cache for provider candidates.
//!
//! The cache is an injected collaborator so callers can swap the in-process
//! map for a shared store. Expiry is decided by [`is_expired`], a pure
//! function of insertion time, current time and TTL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::sources::RawCandidate;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 1800;

const MAX_TTL_SECS: i64 = i64::MAX / 1000;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn is_expired(inserted_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(inserted_at) >= ttl
}

#[async_trait]
pub trait CandidateCache: Send + Sync {
    /// Returns a live entry; an expired entry is evicted and reported as a miss.
    async fn get(&self, key: &str) -> Option<Vec<RawCandidate>>;
    async fn set(&self, key: String, candidates: Vec<RawCandidate>);
}

#[derive(Clone, Debug)]
struct CacheEntry {
    candidates: Vec<RawCandidate>,
    inserted_at: DateTime<Utc>,
}

pub struct InMemoryCandidateCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl InMemoryCandidateCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_clock(ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        // Larger TTLs saturate at the longest duration chrono represents.
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(MAX_TTL_SECS);
        let ttl = Duration::seconds(secs);
        Self { ttl, clock, entries: Mutex::new(HashMap::new()) }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryCandidateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL_SECS)
    }
}

#[async_trait]
impl CandidateCache for InMemoryCandidateCache {
    async fn get(&self, key: &str) -> Option<Vec<RawCandidate>> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let expired = is_expired(entries.get(key)?.inserted_at, now, self.ttl);
        if expired {
            entries.remove(key);
            debug!(event_name = "cache.entry.expired", cache_key = key, "evicted expired entry");
            return None;
        }
        entries.get(key).map(|entry| entry.candidates.clone())
    }

    async fn set(&self, key: String, candidates: Vec<RawCandidate>) {
        let inserted_at = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, CacheEntry { candidates, inserted_at });
    }
}
