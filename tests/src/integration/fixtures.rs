//! Shared realm fixture.

use gate_runtime::{GateConfig, GateContext, GateRealm};
use gg_01_rbac::{InMemoryPermissionStore, InMemoryRoleStore, PermissionStore};
use gg_telemetry::MemoryErrorSink;
use shared_bus::{Session, SessionHandle, SessionRole, KEY_GUILD_ID, KEY_USER_ID};
use shared_types::Dict;
use std::sync::Arc;

pub struct Fixture {
    pub grants: Arc<InMemoryPermissionStore>,
    pub sink: Arc<MemoryErrorSink>,
    pub ctx: GateContext,
    pub realm: GateRealm,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        let grants = Arc::new(InMemoryPermissionStore::new(
            config.enforcer.key_prefix.clone(),
        ));
        let (sink, ctx, realm) = build(config, grants.clone());
        Self {
            grants,
            sink,
            ctx,
            realm,
        }
    }

    pub fn user(&self, guild: &str, user: &str) -> (Session, SessionHandle) {
        user_session(&self.realm, guild, user)
    }

    pub fn service(&self) -> (Session, SessionHandle) {
        self.realm
            .router()
            .open_session(SessionRole::Api, Dict::new())
    }
}

/// Realm over an arbitrary grant store.
pub fn build(
    config: GateConfig,
    grants: Arc<dyn PermissionStore>,
) -> (Arc<MemoryErrorSink>, GateContext, GateRealm) {
    let sink = Arc::new(MemoryErrorSink::new());
    let ctx = GateContext::new(
        config,
        grants,
        Arc::new(InMemoryRoleStore::new()),
        sink.clone(),
    );
    let realm = GateRealm::open(&ctx);
    (sink, ctx, realm)
}

pub fn user_session(realm: &GateRealm, guild: &str, user: &str) -> (Session, SessionHandle) {
    let mut details = Dict::new();
    details.insert(KEY_GUILD_ID.into(), guild.into());
    details.insert(KEY_USER_ID.into(), user.into());
    realm.router().open_session(SessionRole::User, details)
}
