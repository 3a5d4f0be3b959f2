//! In-memory store adapters.
//!
//! Used by tests and single-process deployments. Each store can be switched
//! into a failing mode to exercise fail-closed paths.

use crate::domain::{NewRole, Role, RoleId, RoleStoreError, RoleTarget, StoreError, Target};
use crate::ports::{GuildDirectory, PermissionStore, RoleStore};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use shared_types::Permission;
use std::collections::{BTreeMap, HashSet};

/// Grant hashes keyed by their full store key.
#[derive(Debug, Default)]
pub struct InMemoryPermissionStore {
    prefix: String,
    grants: DashMap<String, HashSet<String>>,
    failure: RwLock<Option<StoreError>>,
}

impl InMemoryPermissionStore {
    /// Store whose [`grant`](Self::grant) helper writes under `prefix`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Grant `permission` to `target`.
    pub fn grant(&self, target: &Target, permission: Permission) {
        self.grants
            .entry(format!("{}{}", self.prefix, target))
            .or_default()
            .insert(permission.field());
    }

    pub fn revoke(&self, target: &Target, permission: Permission) {
        if let Some(mut fields) = self.grants.get_mut(&format!("{}{}", self.prefix, target)) {
            fields.remove(&permission.field());
        }
    }

    /// Make every subsequent read fail with `error` (`None` to recover).
    pub fn set_failure(&self, error: Option<StoreError>) {
        *self.failure.write() = error;
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissionStore {
    async fn has_any_field(&self, key: &str, fields: &[String]) -> Result<bool, StoreError> {
        if let Some(err) = self.failure.read().clone() {
            return Err(err);
        }
        Ok(self
            .grants
            .get(key)
            .is_some_and(|present| fields.iter().any(|f| present.contains(f))))
    }
}

#[derive(Debug, Default)]
struct RoleTables {
    next_id: RoleId,
    roles: BTreeMap<RoleId, Role>,
    /// (target string, role id), in insertion order.
    assignments: Vec<(String, RoleId)>,
}

/// Role definitions and assignments behind a single lock.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    tables: RwLock<RoleTables>,
    failure: RwLock<Option<StoreError>>,
}

impl InMemoryRoleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `error` (`None` to recover).
    pub fn set_failure(&self, error: Option<StoreError>) {
        *self.failure.write() = error;
    }

    fn check(&self) -> Result<(), StoreError> {
        match self.failure.read().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn create_role(&self, role: NewRole) -> Result<Role, RoleStoreError> {
        let role = role.validate()?;
        self.check()?;

        let mut tables = self.tables.write();
        tables.next_id += 1;
        let stored = Role {
            id: tables.next_id,
            guild_id: role.guild_id,
            name: role.name,
            permissions: role.permissions,
            rate_limit: role.rate_limit,
        };
        tables.roles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_role(&self, id: RoleId) -> Result<Option<Role>, StoreError> {
        self.check()?;
        Ok(self.tables.read().roles.get(&id).cloned())
    }

    async fn get_role_by_name(
        &self,
        guild_id: Option<&str>,
        name: &str,
    ) -> Result<Option<Role>, StoreError> {
        self.check()?;
        let guild_id = guild_id.filter(|g| !g.is_empty());
        Ok(self
            .tables
            .read()
            .roles
            .values()
            .find(|r| r.guild_id.as_deref() == guild_id && r.name == name)
            .cloned())
    }

    async fn get_role_targets_for_target(
        &self,
        target: &str,
    ) -> Result<Vec<RoleTarget>, StoreError> {
        self.check()?;
        let tables = self.tables.read();
        Ok(tables
            .assignments
            .iter()
            .filter(|(t, _)| t == target)
            .filter_map(|(t, id)| {
                tables.roles.get(id).map(|role| RoleTarget {
                    target: t.clone(),
                    role: role.clone(),
                })
            })
            .collect())
    }

    async fn assign_role(
        &self,
        target: &Target,
        role: RoleId,
    ) -> Result<RoleTarget, RoleStoreError> {
        self.check()?;
        let mut tables = self.tables.write();
        let stored = tables
            .roles
            .get(&role)
            .cloned()
            .ok_or(RoleStoreError::UnknownRole(role))?;

        let target = target.to_string();
        if !tables
            .assignments
            .iter()
            .any(|(t, id)| *t == target && *id == role)
        {
            tables.assignments.push((target.clone(), role));
        }
        Ok(RoleTarget {
            target,
            role: stored,
        })
    }
}

/// Guild owners keyed by guild id.
#[derive(Debug, Default)]
pub struct InMemoryGuildDirectory {
    owners: DashMap<String, String>,
}

impl InMemoryGuildDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_owner(&self, guild_id: impl Into<String>, user_id: impl Into<String>) {
        self.owners.insert(guild_id.into(), user_id.into());
    }
}

#[async_trait]
impl GuildDirectory for InMemoryGuildDirectory {
    async fn guild_owner(&self, guild_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.owners.get(guild_id).map(|o| o.value().clone()))
    }
}
