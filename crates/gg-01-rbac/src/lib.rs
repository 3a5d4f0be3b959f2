//! # RBAC Subsystem (gg-01)
//!
//! Who may do what on the bus, and how often.
//!
//! ## Components
//!
//! - **Target Address Model** ([`Target`]): canonical principal/role
//!   addresses such as `55:68` or `55:@7`.
//! - **Role Store** ([`RoleStore`]): role definitions and role-to-target
//!   assignments.
//! - **Permission Store** ([`PermissionStore`]): additive grants, one hash per
//!   target with one field per permission code.
//! - **Enforcer** ([`Enforcer`]): resolves a principal to its targets and
//!   checks grants and rate limits.
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): targets, roles, rate limits. No I/O.
//! - **Ports Layer** (`ports/`): [`PermissionEnforcer`] inbound, store SPIs
//!   outbound.
//! - **Adapters Layer** (`adapters/`): in-memory stores, Redis grants
//!   (feature `redis`).
//! - **Service Layer** (`service/`): the enforcer.
//!
//! ## Failure Semantics
//!
//! | Situation | Result |
//! |-----------|--------|
//! | No permissions requested | `Ok(true)`, no store read |
//! | Some target holds some requested permission | `Ok(true)` |
//! | Store unreachable / timed out | `Err(EnforcerError::Store)` |
//! | Identity is not a valid target | `Err(EnforcerError::InvalidIdentity)` |

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryGuildDirectory, InMemoryPermissionStore, InMemoryRoleStore};
#[cfg(feature = "redis")]
pub use adapters::RedisPermissionStore;
pub use domain::{
    EnforcerConfig, EnforcerError, NewRole, RateLimit, Role, RoleId, RoleStoreError,
    RoleTarget, RoleValidationError, StoreError, Target, TargetParseError, TargetType,
    DEFAULT_KEY_PREFIX, SPECIAL_EVERYONE, SPECIAL_GUILD_ADMIN, SPECIAL_GUILD_OWNER,
    SPECIAL_OWNER,
};
pub use ports::{GuildDirectory, PermissionEnforcer, PermissionStore, RoleStore};
pub use service::{bucket_cleanup_task, Enforcer, RateLimiterTable};
