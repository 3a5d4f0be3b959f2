//! Request rate limits.
//!
//! A limit is `requests` per `per`. Limits are a policy dimension separate
//! from grants: a role may carry one, and when a principal holds several
//! roles in a guild the most restrictive limit applies.

use governor::Quota;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::num::NonZeroU32;
use std::time::Duration;

/// `requests` allowed per `per`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub per: Duration,
}

impl RateLimit {
    #[must_use]
    pub const fn new(requests: u32, per: Duration) -> Self {
        Self { requests, per }
    }

    #[must_use]
    pub const fn per_minute(requests: u32) -> Self {
        Self::new(requests, Duration::from_secs(60))
    }

    /// A limit admits at least one request over a non-zero window.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.requests > 0 && !self.per.is_zero() && self.quota().is_some()
    }

    /// Token-bucket quota: `requests` burst, refilled evenly over `per`.
    #[must_use]
    pub fn quota(&self) -> Option<Quota> {
        let burst = NonZeroU32::new(self.requests)?;
        let period = self.per.checked_div(self.requests)?;
        Quota::with_period(period).map(|q| q.allow_burst(burst))
    }

    /// Compare sustained rates. `Less` means `self` is more restrictive.
    #[must_use]
    pub fn cmp_rate(&self, other: &Self) -> Ordering {
        // requests/per, compared by cross-multiplication
        let lhs = u128::from(self.requests) * other.per.as_nanos();
        let rhs = u128::from(other.requests) * self.per.as_nanos();
        lhs.cmp(&rhs)
    }

    /// The most restrictive of the given limits.
    pub fn strongest<'a>(limits: impl IntoIterator<Item = &'a RateLimit>) -> Option<RateLimit> {
        limits
            .into_iter()
            .copied()
            .min_by(|a, b| a.cmp_rate(b).then_with(|| a.requests.cmp(&b.requests)))
    }
}
