//! # Gate Configuration
//!
//! Unified configuration for the enforcer, the realm, the grant store and
//! telemetry.
//!
//! Sources, later wins:
//!
//! 1. built-in defaults;
//! 2. a JSON file named by `GG_CONFIG`;
//! 3. `GG_*` environment variables.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GG_PERMS_KEY_PREFIX` | `enforcer.key_prefix` |
//! | `GG_STORE_TIMEOUT_MS` | `enforcer.store_timeout` |
//! | `GG_GLOBAL_RATE_LIMIT` | `enforcer.global_rate_limit` (per minute) |
//! | `GG_GUILD_RATE_LIMIT` | `enforcer.default_guild_rate_limit` (per minute) |
//! | `GG_BOT_OWNERS` | `enforcer.bot_owners` (comma separated) |
//! | `GG_MAX_ROLE_DEPTH` | `enforcer.max_role_depth` |
//! | `GG_BUCKET_CLEANUP_SECS` | `enforcer.bucket_cleanup_interval` |
//! | `GG_BUCKET_MAX_AGE_SECS` | `enforcer.bucket_max_age` |
//! | `GG_GUILD_OWNERS` | `guilds.owners` (`guild:user`, comma separated) |
//! | `GG_REALM_URI` | `realm.uri` |
//! | `GG_SUBSCRIBER_CAPACITY` | `realm.subscriber_capacity` |
//! | `GG_REDIS_URL` | `redis.url` |
//!
//! Telemetry settings always come from the environment, see
//! [`TelemetryConfig::from_env`].

use gg_01_rbac::{EnforcerConfig, RateLimit};
use gg_telemetry::TelemetryConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Variable naming an optional JSON configuration file.
pub const CONFIG_PATH_VAR: &str = "GG_CONFIG";

/// Default realm URI. Procedure names are namespaced under it.
pub const DEFAULT_REALM_URI: &str = "io.guild-gate";

/// Complete gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub enforcer: EnforcerConfig,
    pub realm: RealmSettings,
    pub redis: RedisSettings,
    pub guilds: GuildSettings,
    pub telemetry: TelemetryConfig,
}

/// Realm settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmSettings {
    pub uri: String,
    /// Events buffered per subscriber before new ones are dropped.
    pub subscriber_capacity: usize,
}

impl Default for RealmSettings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_REALM_URI.to_string(),
            subscriber_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Grant store location. Grants are kept in memory when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisSettings {
    pub url: Option<String>,
}

/// Known guild owners, resolved to `guild:$guild_owner`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    /// Owner user id keyed by guild id.
    pub owners: BTreeMap<String, String>,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidVar { key: &'static str, value: String },

    #[error("{0} must not be zero")]
    Zero(&'static str),

    #[error("permission key prefix must not be empty")]
    EmptyKeyPrefix,

    #[error("realm uri must not be empty")]
    EmptyRealmUri,

    #[error("redis url configured but gate-runtime was built without the redis feature")]
    RedisDisabled,
}

fn parse_owners(key: &'static str, value: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(':') {
            Some((guild, user)) if !guild.is_empty() && !user.is_empty() => {
                Ok((guild.to_string(), user.to_string()))
            }
            _ => Err(ConfigError::InvalidVar {
                key,
                value: value.to_string(),
            }),
        })
        .collect()
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { key, value }),
    }
}

impl GateConfig {
    /// Load defaults, the optional config file and environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let base = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Read a JSON configuration file. Missing sections take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `GG_*` overrides read through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(prefix) = lookup("GG_PERMS_KEY_PREFIX") {
            self.enforcer.key_prefix = prefix;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "GG_STORE_TIMEOUT_MS")? {
            self.enforcer.store_timeout = Duration::from_millis(ms);
        }
        if let Some(n) = parse_var::<u32>(&lookup, "GG_GLOBAL_RATE_LIMIT")? {
            self.enforcer.global_rate_limit = RateLimit::per_minute(n);
        }
        if let Some(n) = parse_var::<u32>(&lookup, "GG_GUILD_RATE_LIMIT")? {
            self.enforcer.default_guild_rate_limit = RateLimit::per_minute(n);
        }
        if let Some(owners) = lookup("GG_BOT_OWNERS") {
            self.enforcer.bot_owners = owners
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(depth) = parse_var::<usize>(&lookup, "GG_MAX_ROLE_DEPTH")? {
            self.enforcer.max_role_depth = depth;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "GG_BUCKET_CLEANUP_SECS")? {
            self.enforcer.bucket_cleanup_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "GG_BUCKET_MAX_AGE_SECS")? {
            self.enforcer.bucket_max_age = Duration::from_secs(secs);
        }
        if let Some(owners) = lookup("GG_GUILD_OWNERS") {
            self.guilds.owners = parse_owners("GG_GUILD_OWNERS", &owners)?;
        }
        if let Some(uri) = lookup("GG_REALM_URI") {
            self.realm.uri = uri;
        }
        if let Some(capacity) = parse_var::<usize>(&lookup, "GG_SUBSCRIBER_CAPACITY")? {
            self.realm.subscriber_capacity = capacity;
        }
        if let Some(url) = lookup("GG_REDIS_URL") {
            self.redis.url = Some(url).filter(|u| !u.is_empty());
        }
        self.telemetry = TelemetryConfig::from_lookup(&lookup);
        Ok(self)
    }

    /// Reject settings the gate cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enforcer.key_prefix.is_empty() {
            return Err(ConfigError::EmptyKeyPrefix);
        }
        if self.enforcer.store_timeout.is_zero() {
            return Err(ConfigError::Zero("store timeout"));
        }
        if !self.enforcer.global_rate_limit.is_valid() {
            return Err(ConfigError::Zero("global rate limit"));
        }
        if !self.enforcer.default_guild_rate_limit.is_valid() {
            return Err(ConfigError::Zero("guild rate limit"));
        }
        if self.enforcer.max_role_depth == 0 {
            return Err(ConfigError::Zero("max role depth"));
        }
        if self.enforcer.bucket_cleanup_interval.is_zero() {
            return Err(ConfigError::Zero("bucket cleanup interval"));
        }
        if self.realm.uri.is_empty() {
            return Err(ConfigError::EmptyRealmUri);
        }
        if self.realm.subscriber_capacity == 0 {
            return Err(ConfigError::Zero("subscriber capacity"));
        }
        if self.redis.url.is_some() && !cfg!(feature = "redis") {
            return Err(ConfigError::RedisDisabled);
        }
        Ok(())
    }
}
