//! Role administration procedures served by the gate itself.
//!
//! | Procedure | Arguments | Result |
//! |-----------|-----------|--------|
//! | `<realm>.roles.create` | `name, [permission codes]` | `[role id]` |
//! | `<realm>.roles.assign` | `target, role id` | `[target]` |
//!
//! Both operate within the caller's guild and need `ROLES_MANAGE`.

use crate::realm::GateRealm;
use async_trait::async_trait;
use gg_01_rbac::{NewRole, RoleStore, RoleStoreError, Target};
use gg_03_invocation::{InvocationError, Procedure};
use shared_bus::{codes, Invocation, InvokeResult, KEY_GUILD_ID};
use shared_types::{get_dict_value, get_list_value, Dict, Permission, Value};
use std::sync::Arc;
use tracing::info;

pub const PROC_CREATE_ROLE: &str = "roles.create";
pub const PROC_ASSIGN_ROLE: &str = "roles.assign";

fn invalid(message: impl Into<String>) -> InvocationError {
    InvocationError::application(codes::INVALID_ARGUMENT, vec![Value::from(message.into())])
}

fn caller_guild(invocation: &Invocation) -> Result<String, InvocationError> {
    get_dict_value(&invocation.details, KEY_GUILD_ID)
        .and_then(|v| v.as_snowflake().ok())
        .ok_or_else(|| invalid("guild_id missing"))
}

fn store_error(err: RoleStoreError) -> InvocationError {
    match err {
        RoleStoreError::Store(e) => InvocationError::internal(e),
        other => invalid(other.to_string()),
    }
}

struct CreateRole {
    roles: Arc<dyn RoleStore>,
}

#[async_trait]
impl Procedure for CreateRole {
    async fn call(&self, invocation: Invocation) -> Result<InvokeResult, InvocationError> {
        let guild = caller_guild(&invocation)?;
        let name = get_list_value(&invocation.arguments, 0)
            .and_then(|v| v.as_str().ok())
            .ok_or_else(|| invalid("name missing"))?;
        let permissions = match get_list_value(&invocation.arguments, 1) {
            Some(value) => value.as_permissions().map_err(|e| invalid(e.to_string()))?,
            None => Vec::new(),
        };

        let role = self
            .roles
            .create_role(NewRole::new(name, permissions).in_guild(guild))
            .await
            .map_err(store_error)?;
        info!(role_id = role.id, guild_id = ?role.guild_id, name = %role.name, "Role created");
        Ok(InvokeResult::ok(vec![Value::from(role.id)], Dict::new()))
    }
}

struct AssignRole {
    roles: Arc<dyn RoleStore>,
}

#[async_trait]
impl Procedure for AssignRole {
    async fn call(&self, invocation: Invocation) -> Result<InvokeResult, InvocationError> {
        let guild = caller_guild(&invocation)?;
        let target: Target = get_list_value(&invocation.arguments, 0)
            .and_then(|v| v.as_str().ok())
            .ok_or_else(|| invalid("target missing"))?
            .parse()
            .map_err(|e: gg_01_rbac::TargetParseError| invalid(e.to_string()))?;
        let role_id = get_list_value(&invocation.arguments, 1)
            .and_then(|v| v.as_i64().ok())
            .ok_or_else(|| invalid("role id missing"))?;

        if target.guild_id() != Some(guild.as_str()) {
            return Err(invalid("target outside caller guild"));
        }
        let role = self
            .roles
            .get_role(role_id)
            .await
            .map_err(InvocationError::internal)?
            .ok_or_else(|| invalid(format!("role {role_id} does not exist")))?;
        if role.guild_id.as_deref().is_some_and(|g| g != guild) {
            return Err(invalid("role belongs to another guild"));
        }

        let assignment = self
            .roles
            .assign_role(&target, role_id)
            .await
            .map_err(store_error)?;
        info!(role_id, assignee = %assignment.target, "Role assigned");
        Ok(InvokeResult::ok(
            vec![Value::from(assignment.target)],
            Dict::new(),
        ))
    }
}

/// Serve the role administration procedures on `realm`.
pub async fn serve_role_procedures(
    realm: &GateRealm,
    roles: Arc<dyn RoleStore>,
) -> Result<(), InvokeResult> {
    let manage = vec![Permission::ROLES_MANAGE];
    realm
        .serve(
            PROC_CREATE_ROLE,
            manage.clone(),
            Arc::new(CreateRole {
                roles: Arc::clone(&roles),
            }),
        )
        .await?;
    realm
        .serve(PROC_ASSIGN_ROLE, manage, Arc::new(AssignRole { roles }))
        .await?;
    Ok(())
}
