/// Short-lived response cache for resolver results
///
/// Maps a deterministic request fingerprint to a cached result with an
/// absolute expiry. Entries share one fixed TTL; expiry is checked on every
/// read and stale entries are deleted the moment a read finds them - there
/// is no background sweep.
///
/// The map sits behind a mutex so overlapping resolutions on a preemptive
/// runtime stay safe; a race between two misses degrades to a duplicate
/// upstream call and a harmless second write of an equivalent value.
use crate::logger::{self, LogTag};
use crate::types::{PriceMap, TokenRecord};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// =============================================================================
// CLOCK - injectable time source so TTL behavior is testable
// =============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source used outside of tests
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// =============================================================================
// CACHED VALUES - closed set of payload kinds stored by the resolvers
// =============================================================================

#[derive(Debug, Clone)]
pub enum CachedValue {
    Prices(PriceMap),
    Price(f64),
    Token(TokenRecord),
}

impl CachedValue {
    pub fn as_prices(&self) -> Option<&PriceMap> {
        match self {
            CachedValue::Prices(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&TokenRecord> {
        match self {
            CachedValue::Token(record) => Some(record),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    stored_at: DateTime<Utc>,
}

// =============================================================================
// RESPONSE CACHE
// =============================================================================

pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self::with_clock(ttl_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
            clock,
        }
    }

    /// Fetch a live entry; deletes and misses when the entry has expired
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let mut entries = self.entries.lock().unwrap();

        if let Some(entry) = entries.get(key) {
            let age = self.clock.now() - entry.stored_at;
            if age <= self.ttl {
                return Some(entry.value.clone());
            }
            entries.remove(key);
            logger::debug(LogTag::Cache, &format!("Evicted stale entry: {}", key));
        }

        None
    }

    /// Store a value, unconditionally overwriting with a fresh timestamp
    pub fn put(&self, key: &str, value: CachedValue) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: self.clock.now(),
            },
        );
    }

    /// Remove every entry
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap();
        let removed = entries.len();
        entries.clear();
        if removed > 0 {
            logger::debug(LogTag::Cache, &format!("Cleared {} cache entries", removed));
        }
    }

    /// (total, live, expired) entry counts
    pub fn stats(&self) -> (usize, usize, usize) {
        let entries = self.entries.lock().unwrap();
        let now = self.clock.now();
        let total = entries.len();
        let expired = entries
            .values()
            .filter(|entry| now - entry.stored_at > self.ttl)
            .count();
        (total, total - expired, expired)
    }
}

// =============================================================================
// TEST CLOCK - manually advanced time source shared by resolver tests
// =============================================================================
