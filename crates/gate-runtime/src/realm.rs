//! # Realm
//!
//! The router with the gate attached, plus an internal service session the
//! gate's own procedures are registered under.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!   sessions ────→│ GateAuthorizer ──→ Router    │──→ callees
//!                 │                 ↘ publish    │
//!                 │      GatePublishFilter (per  │──→ subscribers
//!                 │      subscriber)             │
//!                 └──────────────────────────────┘
//! ```

use crate::container::GateContext;
use gg_01_rbac::PermissionEnforcer;
use gg_02_authorization::{declared_permissions, ProcedureRegistry, KEY_PERMISSIONS};
use gg_03_invocation::{guard_user, FaultBoundary, Procedure};
use gg_telemetry::ErrorSink;
use shared_bus::{
    InvocationHandler, InvokeResult, Register, Router, Session, SessionHandle, SessionRole,
};
use shared_types::{permissions_to_value, Dict, Permission, RegistrationId, RequestId};
use std::sync::Arc;
use tracing::info;

/// An open realm.
pub struct GateRealm {
    uri: String,
    router: Arc<Router>,
    registry: Arc<ProcedureRegistry>,
    enforcer: Arc<dyn PermissionEnforcer>,
    sink: Arc<dyn ErrorSink>,
    internal: Session,
    _internal_handle: SessionHandle,
}

impl GateRealm {
    pub fn open(ctx: &GateContext) -> Self {
        let settings = &ctx.config().realm;
        let router = Arc::new(Router::with_capacity(
            ctx.authorizer(),
            ctx.publish_filters(),
            settings.subscriber_capacity,
        ));
        let (internal, handle) = router.open_session(SessionRole::Api, Dict::new());
        info!(realm = %settings.uri, "Realm opened");

        Self {
            uri: settings.uri.clone(),
            router,
            registry: ctx.registry(),
            enforcer: ctx.enforcer(),
            sink: ctx.sink(),
            internal,
            _internal_handle: handle,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Full procedure URI for `name` within this realm.
    pub fn procedure_uri(&self, name: &str) -> String {
        format!("{}.{name}", self.uri)
    }

    /// Register a procedure on behalf of `session` and record the permissions
    /// its `perms` option declares. The handler runs inside a
    /// [`FaultBoundary`], so a panic only fails the invocation that hit it.
    pub async fn register(
        &self,
        session: &Session,
        register: Register,
        handler: Arc<dyn InvocationHandler>,
    ) -> Result<RegistrationId, InvokeResult> {
        let contained = FaultBoundary::for_handler(handler, Arc::clone(&self.sink));
        self.register_contained(session, register, Arc::new(contained))
            .await
    }

    async fn register_contained(
        &self,
        session: &Session,
        register: Register,
        handler: Arc<dyn InvocationHandler>,
    ) -> Result<RegistrationId, InvokeResult> {
        let procedure = register.procedure.clone();
        // Malformed declarations are refused by the authorizer.
        let required = declared_permissions(&register.options).unwrap_or_default();
        let id = self.router.register(session, register, handler).await?;
        self.registry.declare(procedure, required);
        Ok(id)
    }

    /// Serve `procedure` under this realm's namespace from the internal
    /// session. Callers need one of `permissions`, checked by the gate and
    /// again right before the procedure runs.
    pub async fn serve(
        &self,
        name: &str,
        permissions: Vec<Permission>,
        procedure: Arc<dyn Procedure>,
    ) -> Result<RegistrationId, InvokeResult> {
        let mut options = Dict::new();
        options.insert(KEY_PERMISSIONS.into(), permissions_to_value(&permissions));
        let register = Register {
            request: RequestId::default(),
            procedure: self.procedure_uri(name),
            options,
        };
        let guarded = guard_user(Arc::clone(&self.enforcer), procedure, permissions);
        let handler = FaultBoundary::new(Arc::new(guarded), Arc::clone(&self.sink));
        self.register_contained(&self.internal, register, Arc::new(handler))
            .await
    }

    /// Detach `session`, dropping its registrations and their declarations.
    pub fn leave(&self, session: &Session) {
        for procedure in self.router.leave(session) {
            self.registry.remove(&procedure);
        }
    }
}
