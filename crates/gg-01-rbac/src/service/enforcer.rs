//! # Enforcer
//!
//! Answers "may this principal do X" and "is this principal within its
//! request rate" against the permission and role stores.
//!
//! ## Target resolution
//!
//! ```text
//! (guild 55, user 68)
//!   ├─ $owner            configured bot owner
//!   ├─ 68                the user
//!   ├─ 55:68             the member
//!   ├─ 55:$guild_owner   guild directory says 68 owns 55
//!   ├─ 55:@7, 55:@9 ...  roles held, breadth first through nested assignments
//!   ├─ 55:$everyone
//!   └─ $everyone
//! ```
//!
//! Every store round trip is bounded by the configured store timeout. Store
//! failures abort the check; they are never read as a grant or a denial.

use crate::domain::{
    EnforcerConfig, EnforcerError, RateLimit, Role, RoleId, StoreError, Target, TargetType,
    SPECIAL_EVERYONE, SPECIAL_GUILD_OWNER, SPECIAL_OWNER,
};
use crate::ports::{GuildDirectory, PermissionEnforcer, PermissionStore, RoleStore};
use crate::service::limiter::RateLimiterTable;
use async_trait::async_trait;
use shared_types::Permission;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Permission and rate-limit enforcer.
pub struct Enforcer {
    config: EnforcerConfig,
    permissions: Arc<dyn PermissionStore>,
    roles: Arc<dyn RoleStore>,
    guilds: Option<Arc<dyn GuildDirectory>>,
    limiter: RateLimiterTable,
}

impl Enforcer {
    pub fn new(
        config: EnforcerConfig,
        permissions: Arc<dyn PermissionStore>,
        roles: Arc<dyn RoleStore>,
    ) -> Self {
        Self {
            config,
            permissions,
            roles,
            guilds: None,
            limiter: RateLimiterTable::new(),
        }
    }

    /// Enable `$guild_owner` resolution.
    #[must_use]
    pub fn with_guild_directory(mut self, guilds: Arc<dyn GuildDirectory>) -> Self {
        self.guilds = Some(guilds);
        self
    }

    pub fn config(&self) -> &EnforcerConfig {
        &self.config
    }

    /// Token buckets, exposed for periodic cleanup.
    pub fn limiter(&self) -> &RateLimiterTable {
        &self.limiter
    }

    /// Store key of a target's grant hash.
    #[must_use]
    pub fn grant_key(&self, target: &Target) -> String {
        format!("{}{}", self.config.key_prefix, target)
    }

    async fn timed<T>(
        &self,
        op: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.config.store_timeout, op)
            .await
            .map_err(|_| StoreError::Timeout(self.config.store_timeout))?
    }

    async fn target_has_permission(
        &self,
        target: &Target,
        fields: &[String],
    ) -> Result<bool, StoreError> {
        let key = self.grant_key(target);
        self.timed(self.permissions.has_any_field(&key, fields))
            .await
            .inspect_err(|e| warn!(grant_target = %target, error = %e, "Permission store read failed"))
    }

    /// Roles the principal holds in `guild`, with the target each resolves
    /// to. Breadth first over assignments; cycles and overly deep chains are
    /// cut off.
    async fn held_roles(
        &self,
        guild: Option<&str>,
        start: &[&Target],
    ) -> Result<Vec<(Role, Target)>, StoreError> {
        let mut held = Vec::new();
        let Some(guild) = guild else {
            // Roles never apply outside a guild.
            return Ok(held);
        };

        let mut queue: VecDeque<(String, usize)> =
            start.iter().map(|t| (t.to_string(), 0)).collect();
        let mut visited: HashSet<String> = HashSet::new();
        let mut seen_roles: HashSet<RoleId> = HashSet::new();

        while let Some((target, depth)) = queue.pop_front() {
            if !visited.insert(target.clone()) {
                continue;
            }

            let assignments = self
                .timed(self.roles.get_role_targets_for_target(&target))
                .await?;

            for assignment in assignments {
                let role = assignment.role;
                if role.guild_id.as_deref().is_some_and(|g| g != guild) {
                    continue;
                }
                let Some(role_target) = role.target_in(Some(guild)) else {
                    continue;
                };
                if !seen_roles.insert(role.id) {
                    continue;
                }

                if depth + 1 < self.config.max_role_depth {
                    queue.push_back((role_target.to_string(), depth + 1));
                } else {
                    debug!(role_id = role.id, depth, "Role nesting depth reached");
                }
                held.push((role, role_target));
            }
        }

        Ok(held)
    }

    fn identity(
        guild: Option<&str>,
        user_id: &str,
    ) -> Result<(Target, Option<Target>), EnforcerError> {
        let user = Target::new(None, TargetType::User, user_id)?;
        let member = guild
            .map(|g| Target::new(Some(g), TargetType::User, user_id))
            .transpose()?;
        Ok((user, member))
    }

    async fn is_guild_owner(&self, guild: &str, user_id: &str) -> Result<bool, StoreError> {
        let Some(directory) = &self.guilds else {
            return Ok(false);
        };
        let owner = self.timed(directory.guild_owner(guild)).await?;
        Ok(owner.as_deref() == Some(user_id))
    }

    /// Effective per-guild limit: the strongest limit among held roles,
    /// otherwise the configured default.
    pub async fn guild_rate_limit(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<RateLimit, EnforcerError> {
        let (user, member) = Self::identity(Some(guild_id), user_id)?;
        let start: Vec<&Target> = std::iter::once(&user).chain(member.as_ref()).collect();
        let held = self.held_roles(Some(guild_id), &start).await?;

        Ok(
            RateLimit::strongest(held.iter().filter_map(|(role, _)| role.rate_limit.as_ref()))
                .unwrap_or(self.config.default_guild_rate_limit),
        )
    }
}

/// Background task dropping idle rate-limit buckets.
///
/// Runs until aborted. The interval must be non-zero.
pub async fn bucket_cleanup_task(enforcer: Arc<Enforcer>) {
    let mut cleanup_interval = tokio::time::interval(enforcer.config.bucket_cleanup_interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        enforcer.limiter.cleanup(enforcer.config.bucket_max_age);
    }
}

fn push_unique(targets: &mut Vec<Target>, target: Target) {
    if !targets.contains(&target) {
        targets.push(target);
    }
}

#[async_trait]
impl PermissionEnforcer for Enforcer {
    async fn has_permission(
        &self,
        guild_id: Option<&str>,
        user_id: &str,
        permissions: &[Permission],
    ) -> Result<bool, EnforcerError> {
        if permissions.is_empty() {
            return Ok(true);
        }

        let fields: Vec<String> = permissions.iter().map(|p| p.field()).collect();
        for target in self.resolve_targets(guild_id, user_id).await? {
            if self.target_has_permission(&target, &fields).await? {
                debug!(grant_target = %target, user_id = %user_id, "Permission granted");
                return Ok(true);
            }
        }

        debug!(guild_id = ?guild_id, user_id = %user_id, ?permissions, "No target holds permission");
        Ok(false)
    }

    async fn has_rate_limit(
        &self,
        guild_id: Option<&str>,
        user_id: &str,
    ) -> Result<bool, EnforcerError> {
        let guild = guild_id.filter(|g| !g.is_empty());
        let (user, member) = Self::identity(guild, user_id)?;

        if let (Some(guild), Some(member)) = (guild, &member) {
            let limit = self.guild_rate_limit(guild, user_id).await?;
            if !self.limiter.admit(&member.to_string(), limit) {
                debug!(guild_id = %guild, user_id = %user_id, ?limit, "Guild rate limit exceeded");
                return Ok(false);
            }
        }

        if !self
            .limiter
            .admit(&user.to_string(), self.config.global_rate_limit)
        {
            debug!(user_id = %user_id, "Global rate limit exceeded");
            return Ok(false);
        }
        Ok(true)
    }

    async fn resolve_targets(
        &self,
        guild_id: Option<&str>,
        user_id: &str,
    ) -> Result<Vec<Target>, EnforcerError> {
        let guild = guild_id.filter(|g| !g.is_empty());
        let (user, member) = Self::identity(guild, user_id)?;
        let mut targets = Vec::new();

        if self.config.is_bot_owner(user_id) {
            push_unique(&mut targets, Target::special(None, SPECIAL_OWNER));
        }
        push_unique(&mut targets, user.clone());
        if let Some(member) = &member {
            push_unique(&mut targets, member.clone());
        }

        if let Some(guild) = guild {
            if self.is_guild_owner(guild, user_id).await? {
                push_unique(&mut targets, Target::special(Some(guild), SPECIAL_GUILD_OWNER));
            }
        }

        let start: Vec<&Target> = std::iter::once(&user).chain(member.as_ref()).collect();
        for (_, role_target) in self.held_roles(guild, &start).await? {
            push_unique(&mut targets, role_target);
        }

        if let Some(guild) = guild {
            push_unique(&mut targets, Target::special(Some(guild), SPECIAL_EVERYONE));
        }
        push_unique(&mut targets, Target::special(None, SPECIAL_EVERYONE));

        Ok(targets)
    }
}
