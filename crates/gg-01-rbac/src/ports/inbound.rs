//! # Inbound Ports (Driving Ports)
//!
//! The questions the authorization pipeline asks.

use crate::domain::{EnforcerError, Target};
use async_trait::async_trait;
use shared_types::Permission;

/// Permission and rate-limit checks for a principal.
///
/// `guild_id == None` checks the user globally.
#[async_trait]
pub trait PermissionEnforcer: Send + Sync {
    /// Whether any target of the principal holds any of `permissions`.
    ///
    /// An empty permission set is trivially granted without a store read.
    async fn has_permission(
        &self,
        guild_id: Option<&str>,
        user_id: &str,
        permissions: &[Permission],
    ) -> Result<bool, EnforcerError>;

    /// Whether the principal is still within its request rate.
    ///
    /// Admitting a request consumes from the principal's budget.
    async fn has_rate_limit(
        &self,
        guild_id: Option<&str>,
        user_id: &str,
    ) -> Result<bool, EnforcerError>;

    /// Every target whose grants apply to the principal.
    async fn resolve_targets(
        &self,
        guild_id: Option<&str>,
        user_id: &str,
    ) -> Result<Vec<Target>, EnforcerError>;
}
