//! Callee-side user guard.
//!
//! Re-checks the identity the gate wrote into the invocation details before
//! a procedure runs: rate limit first, then permissions.
//!
//! A rate-limit check consumes a token. Calls the gate already charged carry
//! `rate_admitted` in their details and are not charged again, so a served
//! procedure costs one token per call.

use crate::boundary::Procedure;
use crate::errors::InvocationError;
use async_trait::async_trait;
use gg_01_rbac::PermissionEnforcer;
use shared_bus::{codes, Invocation, InvokeResult, KEY_GUILD_ID, KEY_RATE_ADMITTED, KEY_USER_ID};
use shared_types::{get_dict_value, permissions_to_value, Dict, Permission, Value};
use std::sync::Arc;
use tracing::debug;

/// Stage name of the rate-limit step in error traces.
pub const STAGE_RATE_LIMIT: &str = "rate_limit_check";
/// Stage name of the permission step in error traces.
pub const STAGE_PERMISSION: &str = "permission_check";

/// Procedure wrapper produced by [`guard_user`].
pub struct UserGuard {
    enforcer: Arc<dyn PermissionEnforcer>,
    procedure: Arc<dyn Procedure>,
    permissions: Vec<Permission>,
}

/// Run `procedure` only for identities within their rate limit and holding
/// one of `permissions`.
pub fn guard_user(
    enforcer: Arc<dyn PermissionEnforcer>,
    procedure: Arc<dyn Procedure>,
    permissions: Vec<Permission>,
) -> UserGuard {
    UserGuard {
        enforcer,
        procedure,
        permissions,
    }
}

fn identity(details: &Dict) -> Result<(String, String), InvocationError> {
    let field = |key: &str| {
        get_dict_value(details, key)
            .and_then(|v| v.as_snowflake().ok())
            .ok_or_else(|| {
                InvocationError::application(
                    codes::IDENTITY_MISSING,
                    vec![format!("{key} missing").into()],
                )
            })
    };
    Ok((field(KEY_GUILD_ID)?, field(KEY_USER_ID)?))
}

fn rate_admitted(details: &Dict) -> bool {
    matches!(get_dict_value(details, KEY_RATE_ADMITTED), Some(Value::Bool(true)))
}

#[async_trait]
impl Procedure for UserGuard {
    async fn call(&self, invocation: Invocation) -> Result<InvokeResult, InvocationError> {
        let (guild_id, user_id) = identity(&invocation.details)?;

        let within_limit = rate_admitted(&invocation.details)
            || self
                .enforcer
                .has_rate_limit(Some(&guild_id), &user_id)
                .await
                .map_err(|e| InvocationError::internal_at(STAGE_RATE_LIMIT, e))?;
        if !within_limit {
            debug!(guild_id = %guild_id, user_id = %user_id, "Guard: rate limited");
            return Err(InvocationError::application(codes::RATE_LIMITED, vec![]));
        }

        let permitted = self
            .enforcer
            .has_permission(Some(&guild_id), &user_id, &self.permissions)
            .await
            .map_err(|e| InvocationError::internal_at(STAGE_PERMISSION, e))?;
        if !permitted {
            debug!(guild_id = %guild_id, user_id = %user_id, "Guard: forbidden");
            let mut kwargs = Dict::new();
            kwargs.insert("permissions".into(), permissions_to_value(&self.permissions));
            return Err(InvocationError::Application {
                code: codes::FORBIDDEN.to_string(),
                args: vec![],
                kwargs,
            });
        }

        self.procedure.call(invocation).await
    }
}
