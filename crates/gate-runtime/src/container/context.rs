//! # Gate Context
//!
//! Everything the gate shares, built once at startup and passed by reference.
//! There are no process-wide singletons: tests build as many contexts as
//! they like.

use super::config::GateConfig;
use gg_01_rbac::{
    bucket_cleanup_task, Enforcer, InMemoryGuildDirectory, InMemoryPermissionStore,
    InMemoryRoleStore, PermissionEnforcer, PermissionStore, RoleStore, StoreError,
};
use gg_02_authorization::{GateAuthorizer, GatePublishFilterFactory, ProcedureRegistry};
use gg_telemetry::ErrorSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Shared gate state.
pub struct GateContext {
    config: GateConfig,
    enforcer: Arc<Enforcer>,
    roles: Arc<dyn RoleStore>,
    guilds: Arc<InMemoryGuildDirectory>,
    registry: Arc<ProcedureRegistry>,
    sink: Arc<dyn ErrorSink>,
}

impl GateContext {
    /// Assemble a context from already-built stores.
    pub fn new(
        config: GateConfig,
        grants: Arc<dyn PermissionStore>,
        roles: Arc<dyn RoleStore>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        let guilds = Arc::new(InMemoryGuildDirectory::new());
        for (guild_id, user_id) in &config.guilds.owners {
            guilds.set_owner(guild_id.as_str(), user_id.as_str());
        }
        let enforcer = Arc::new(
            Enforcer::new(config.enforcer.clone(), grants, Arc::clone(&roles))
                .with_guild_directory(guilds.clone()),
        );
        Self {
            config,
            enforcer,
            roles,
            guilds,
            registry: Arc::new(ProcedureRegistry::new()),
            sink,
        }
    }

    /// Connect the configured stores and build the context.
    pub async fn connect(config: GateConfig, sink: Arc<dyn ErrorSink>) -> Result<Self, StoreError> {
        let grants = grant_store(&config).await?;
        Ok(Self::new(config, grants, Arc::new(InMemoryRoleStore::new()), sink))
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn enforcer(&self) -> Arc<dyn PermissionEnforcer> {
        self.enforcer.clone()
    }

    pub fn roles(&self) -> Arc<dyn RoleStore> {
        Arc::clone(&self.roles)
    }

    /// Guild owners, seeded from configuration and updatable at runtime.
    pub fn guilds(&self) -> Arc<InMemoryGuildDirectory> {
        Arc::clone(&self.guilds)
    }

    pub fn registry(&self) -> Arc<ProcedureRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn sink(&self) -> Arc<dyn ErrorSink> {
        Arc::clone(&self.sink)
    }

    pub fn authorizer(&self) -> Arc<GateAuthorizer> {
        Arc::new(GateAuthorizer::new(
            self.enforcer(),
            self.registry(),
            self.sink(),
        ))
    }

    pub fn publish_filters(&self) -> Arc<GatePublishFilterFactory> {
        Arc::new(GatePublishFilterFactory::new(self.enforcer(), self.sink()))
    }

    /// Start the background sweep of idle rate-limit buckets.
    pub fn spawn_maintenance(&self) -> JoinHandle<()> {
        debug!(
            interval = ?self.config.enforcer.bucket_cleanup_interval,
            max_age = ?self.config.enforcer.bucket_max_age,
            "Starting rate limit bucket cleanup"
        );
        tokio::spawn(bucket_cleanup_task(Arc::clone(&self.enforcer)))
    }
}

#[cfg(feature = "redis")]
async fn grant_store(config: &GateConfig) -> Result<Arc<dyn PermissionStore>, StoreError> {
    match &config.redis.url {
        Some(url) => {
            let store = gg_01_rbac::RedisPermissionStore::connect(url).await?;
            tracing::info!("Connected permission store to redis");
            Ok(Arc::new(store))
        }
        None => Ok(in_memory_grants(config)),
    }
}

#[cfg(not(feature = "redis"))]
async fn grant_store(config: &GateConfig) -> Result<Arc<dyn PermissionStore>, StoreError> {
    if config.redis.url.is_some() {
        return Err(StoreError::Unavailable(
            "redis support not compiled in".to_string(),
        ));
    }
    Ok(in_memory_grants(config))
}

fn in_memory_grants(config: &GateConfig) -> Arc<dyn PermissionStore> {
    warn!("No redis url configured, permission grants are kept in memory");
    Arc::new(InMemoryPermissionStore::new(
        config.enforcer.key_prefix.clone(),
    ))
}
