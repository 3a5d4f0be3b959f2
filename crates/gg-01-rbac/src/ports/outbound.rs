//! # Outbound Ports (Driven Ports)
//!
//! Stores the enforcer reads from. Every implementation must be safe for
//! concurrent use; the enforcer never takes a lock around them.

use crate::domain::{NewRole, Role, RoleId, RoleStoreError, RoleTarget, StoreError, Target};
use async_trait::async_trait;

/// Key-value store holding permission grants.
///
/// A grant is the presence of field `<code>` in the hash at
/// `<prefix><target>`. The value is irrelevant.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Whether the hash at `key` has at least one of `fields`.
    async fn has_any_field(&self, key: &str, fields: &[String]) -> Result<bool, StoreError>;
}

/// Relational store of role definitions and role assignments.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Validate and persist a role. Nothing is stored on validation failure.
    async fn create_role(&self, role: NewRole) -> Result<Role, RoleStoreError>;

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, StoreError>;

    /// `guild_id == None` selects global roles only.
    async fn get_role_by_name(
        &self,
        guild_id: Option<&str>,
        name: &str,
    ) -> Result<Option<Role>, StoreError>;

    /// Every assignment addressing `target`, with its role loaded.
    async fn get_role_targets_for_target(&self, target: &str)
        -> Result<Vec<RoleTarget>, StoreError>;

    /// Assign a role to a target.
    async fn assign_role(&self, target: &Target, role: RoleId)
        -> Result<RoleTarget, RoleStoreError>;
}

/// Guild metadata lookups.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// Owner of a guild, if known.
    async fn guild_owner(&self, guild_id: &str) -> Result<Option<String>, StoreError>;
}
