//! Enforcer configuration.

use super::rate_limit::RateLimit;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default key prefix of permission grant hashes.
pub const DEFAULT_KEY_PREFIX: &str = "gg:perms:";

/// Enforcer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcerConfig {
    /// Prepended to a target's canonical string to form its grant key.
    pub key_prefix: String,

    /// Upper bound for a single store round trip.
    pub store_timeout: Duration,

    /// Per-user limit across all guilds.
    pub global_rate_limit: RateLimit,

    /// Per-guild limit when none of the principal's roles defines one.
    pub default_guild_rate_limit: RateLimit,

    /// Users resolved to the `$owner` special target.
    pub bot_owners: Vec<String>,

    /// Maximum depth of nested role assignments followed during resolution.
    pub max_role_depth: usize,

    /// How often idle rate-limit buckets are swept.
    pub bucket_cleanup_interval: Duration,

    /// Buckets untouched for longer than this are dropped by the sweep.
    pub bucket_max_age: Duration,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            store_timeout: Duration::from_secs(2),
            global_rate_limit: RateLimit::per_minute(300),
            default_guild_rate_limit: RateLimit::per_minute(120),
            bot_owners: Vec::new(),
            max_role_depth: 8,
            bucket_cleanup_interval: Duration::from_secs(60),
            bucket_max_age: Duration::from_secs(600),
        }
    }
}

impl EnforcerConfig {
    #[must_use]
    pub fn is_bot_owner(&self, user_id: &str) -> bool {
        self.bot_owners.iter().any(|owner| owner == user_id)
    }
}
