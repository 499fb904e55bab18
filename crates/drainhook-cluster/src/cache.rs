//! Fleet node → cluster membership cache.
//!
//! Finding a node's membership id means scanning the whole cluster, so
//! successful lookups are remembered for the life of the process. Only
//! hits are stored: a node that has not joined yet is looked up again on
//! every call.
//!
//! The cache is internally synchronized and meant to be shared through an
//! `Arc` by every resolver in the process. Entries never expire unless a
//! TTL is configured.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

struct CacheEntry {
    instance_arn: String,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Option<Duration>) -> bool {
        ttl.is_some_and(|ttl| self.inserted_at.elapsed() > ttl)
    }
}

#[derive(Default)]
struct Inner {
    /// (cluster, fleet node id) → entry.
    entries: HashMap<(String, String), CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Shared, unbounded identity cache with optional expiry.
#[derive(Default)]
pub struct IdentityCache {
    inner: Mutex<Inner>,
    ttl: Option<Duration>,
}

impl IdentityCache {
    /// A cache whose entries live as long as the process.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache whose entries expire `ttl` after insertion.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Mutex::default(),
            ttl: Some(ttl),
        }
    }

    /// Build from an optional TTL, as carried in configuration.
    pub fn with_optional_ttl(ttl: Option<Duration>) -> Self {
        ttl.map_or_else(Self::new, Self::with_ttl)
    }

    /// Cached membership id for `ec2_instance_id` in `cluster`.
    ///
    /// Expired entries are dropped and reported as misses.
    pub fn get(&self, cluster: &str, ec2_instance_id: &str) -> Option<String> {
        let mut inner = self.lock();
        let key = (cluster.to_string(), ec2_instance_id.to_string());

        let expired = match inner.entries.get(&key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                let arn = entry.instance_arn.clone();
                inner.hits += 1;
                debug!(
                    %cluster,
                    %ec2_instance_id,
                    cache_hits = inner.hits,
                    cache_misses = inner.misses,
                    "identity cache hit"
                );
                return Some(arn);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.remove(&key);
        }
        inner.misses += 1;
        debug!(
            %cluster,
            %ec2_instance_id,
            expired,
            cache_hits = inner.hits,
            cache_misses = inner.misses,
            "identity cache miss"
        );
        None
    }

    /// Remember a successful resolution.
    pub fn insert(&self, cluster: &str, ec2_instance_id: &str, instance_arn: &str) {
        self.lock().entries.insert(
            (cluster.to_string(), ec2_instance_id.to_string()),
            CacheEntry {
                instance_arn: instance_arn.to_string(),
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (hits, misses) since the cache was created.
    pub fn stats(&self) -> (u64, u64) {
        let inner = self.lock();
        (inner.hits, inner.misses)
    }

    // A panic while holding the lock cannot leave a half-written entry,
    // so a poisoned map is still usable.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
