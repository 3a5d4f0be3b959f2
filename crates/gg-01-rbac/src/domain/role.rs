//! Role definitions and role assignments.

use super::rate_limit::RateLimit;
use super::target::Target;
use serde::{Deserialize, Serialize};
use shared_types::Permission;
use thiserror::Error;

/// Role identifier assigned by the role store.
pub type RoleId = i64;

/// Role definition validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleValidationError {
    #[error("roles must have a name")]
    EmptyName,

    #[error("roles must specify at least one permission")]
    NoPermissions,

    #[error("invalid rate limit: {requests} per {per:?}")]
    InvalidRateLimit {
        requests: u32,
        per: std::time::Duration,
    },
}

/// A stored role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// `None` for global roles.
    pub guild_id: Option<String>,
    pub name: String,
    pub permissions: Vec<Permission>,
    pub rate_limit: Option<RateLimit>,
}

impl Role {
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.guild_id.is_none()
    }

    /// Target this role is addressed by inside `context_guild`.
    ///
    /// Guild roles always resolve in their own guild. Global roles take the
    /// guild they are evaluated in and have no target outside one.
    #[must_use]
    pub fn target_in(&self, context_guild: Option<&str>) -> Option<Target> {
        let guild = self.guild_id.as_deref().or(context_guild)?;
        Target::new(Some(guild), super::TargetType::Role, self.id.to_string()).ok()
    }
}

/// Role definition prior to creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub guild_id: Option<String>,
    pub name: String,
    pub permissions: Vec<Permission>,
    pub rate_limit: Option<RateLimit>,
}

impl NewRole {
    #[must_use]
    pub fn new(name: impl Into<String>, permissions: Vec<Permission>) -> Self {
        Self {
            name: name.into(),
            permissions,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    /// Check the definition and normalize it for storage.
    ///
    /// Permission codes keep their first-seen order with duplicates removed.
    /// An empty guild id means global.
    pub fn validate(mut self) -> Result<Self, RoleValidationError> {
        if self.name.is_empty() {
            return Err(RoleValidationError::EmptyName);
        }
        if self.permissions.is_empty() {
            return Err(RoleValidationError::NoPermissions);
        }
        if let Some(limit) = self.rate_limit {
            if !limit.is_valid() {
                return Err(RoleValidationError::InvalidRateLimit {
                    requests: limit.requests,
                    per: limit.per,
                });
            }
        }

        let mut seen = Vec::with_capacity(self.permissions.len());
        self.permissions.retain(|p| {
            if seen.contains(p) {
                false
            } else {
                seen.push(*p);
                true
            }
        });
        self.guild_id = self.guild_id.filter(|g| !g.is_empty());
        Ok(self)
    }
}

/// Assignment of a role to a target string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTarget {
    pub target: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_validation() {
        assert_eq!(
            NewRole::new("", vec![Permission::new(5)]).validate(),
            Err(RoleValidationError::EmptyName)
        );
        assert_eq!(
            NewRole::new("mod", vec![]).validate(),
            Err(RoleValidationError::NoPermissions)
        );
        assert!(NewRole::new("mod", vec![Permission::new(5)]).validate().is_ok());
    }

    #[test]
    fn test_validation_normalizes() {
        let role = NewRole::new("dj", vec![Permission::new(3), Permission::new(1), Permission::new(3)])
            .in_guild("")
            .validate()
            .unwrap();
        assert_eq!(role.permissions, vec![Permission::new(3), Permission::new(1)]);
        assert_eq!(role.guild_id, None);
    }

    #[test]
    fn test_invalid_rate_limit_rejected() {
        let err = NewRole::new("dj", vec![Permission::new(3)])
            .with_rate_limit(RateLimit::new(0, Duration::from_secs(1)))
            .validate()
            .unwrap_err();
        assert!(matches!(err, RoleValidationError::InvalidRateLimit { .. }));
    }

    #[test]
    fn test_role_target_in_context() {
        let guild_role = Role {
            id: 7,
            guild_id: Some("55".into()),
            name: "dj".into(),
            permissions: vec![Permission::new(3)],
            rate_limit: None,
        };
        assert_eq!(guild_role.target_in(None), Some(Target::role("55", "7")));
        assert_eq!(guild_role.target_in(Some("66")), Some(Target::role("55", "7")));

        let global_role = Role {
            guild_id: None,
            ..guild_role
        };
        assert_eq!(global_role.target_in(None), None);
        assert_eq!(global_role.target_in(Some("66")), Some(Target::role("66", "7")));
    }
}
