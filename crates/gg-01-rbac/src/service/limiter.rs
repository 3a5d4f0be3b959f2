//! Token buckets for rate limiting.
//!
//! One bucket per key. The bucket is rebuilt when the limit it was built
//! for changes (e.g. a stricter role was assigned), which also refills it.

use crate::domain::RateLimit;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    RateLimiter,
};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

struct Bucket {
    limit: RateLimit,
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    /// Last access time (for cleanup)
    last_access: Instant,
}

impl Bucket {
    fn new(limit: RateLimit) -> Option<Self> {
        Some(Self {
            limit,
            limiter: RateLimiter::direct(limit.quota()?),
            last_access: Instant::now(),
        })
    }
}

/// Keyed token buckets.
#[derive(Default)]
pub struct RateLimiterTable {
    buckets: DashMap<String, Bucket>,
}

impl RateLimiterTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take one token from the bucket for `key` under `limit`.
    ///
    /// An unusable limit admits nothing.
    pub fn admit(&self, key: &str, limit: RateLimit) -> bool {
        let Some(fresh) = Bucket::new(limit) else {
            warn!(key = %key, ?limit, "Unusable rate limit, denying");
            return false;
        };

        let mut bucket = match self.buckets.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                if slot.get().limit != limit {
                    debug!(key = %key, old = ?slot.get().limit, new = ?limit, "Rebuilding rate limit bucket");
                    slot.insert(fresh);
                }
                slot.into_ref()
            }
            Entry::Vacant(slot) => {
                debug!(key = %key, ?limit, "Creating new rate limit bucket");
                slot.insert(fresh)
            }
        };

        bucket.last_access = Instant::now();
        bucket.limiter.check().is_ok()
    }

    /// Drop buckets idle for longer than `max_age`.
    pub fn cleanup(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets.retain(|key, bucket| {
            let age = now.duration_since(bucket.last_access);
            if age > max_age {
                debug!(key = %key, age_secs = age.as_secs(), "Removing stale rate limit bucket");
                false
            } else {
                true
            }
        });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
