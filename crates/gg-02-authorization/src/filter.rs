//! # Publish Filtering
//!
//! Delivery of one publication is decided per subscriber, at delivery time:
//!
//! 1. service sessions always receive it;
//! 2. a user session needs a resolvable identity;
//! 3. a `guild_id` constraint must match the subscriber's guild;
//! 4. a `user_id` constraint must match the subscriber's user;
//! 5. a non-empty `perms` constraint needs one of the permissions.
//!
//! A store failure while checking one subscriber is reported and denies only
//! that subscriber.

use crate::identity::Identity;
use crate::registry::declared_permissions;
use async_trait::async_trait;
use gg_01_rbac::PermissionEnforcer;
use gg_03_invocation::STAGE_PERMISSION;
use gg_telemetry::{ErrorReport, ErrorSink, TAG_SESSION_ID, TAG_STAGE};
use shared_bus::{Publish, PublishFilter, PublishFilterFactory, Session, SessionRole, KEY_GUILD_ID, KEY_USER_ID};
use shared_types::{get_dict_value, Dict, Permission, Value, ValueError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tag naming the publication topic on error reports.
pub const TAG_TOPIC: &str = "topic";

/// Delivery constraints a publisher placed on an event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraints {
    pub guild_id: Option<String>,
    pub user_id: Option<String>,
    pub permissions: Vec<Permission>,
}

impl Constraints {
    /// Read from a publication's option bag.
    pub fn from_options(options: &Dict) -> Result<Self, ValueError> {
        let snowflake = |key: &str| match get_dict_value(options, key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_snowflake().map(Some),
        };
        Ok(Self {
            guild_id: snowflake(KEY_GUILD_ID)?,
            user_id: snowflake(KEY_USER_ID)?,
            permissions: declared_permissions(options)?,
        })
    }

    fn admits(&self, identity: &Identity) -> bool {
        self.guild_id
            .as_deref()
            .map_or(true, |guild| guild == identity.guild_id)
            && self
                .user_id
                .as_deref()
                .map_or(true, |user| user == identity.user_id)
    }
}

/// Filter for one publication.
pub struct GatePublishFilter {
    enforcer: Arc<dyn PermissionEnforcer>,
    sink: Arc<dyn ErrorSink>,
    topic: String,
    /// `None` when the constraints were malformed: no user session receives
    /// such an event.
    constraints: Option<Constraints>,
}

#[async_trait]
impl PublishFilter for GatePublishFilter {
    async fn allowed(&self, session: &Session) -> bool {
        if !session.has_role(SessionRole::User) {
            return true;
        }
        let Some(constraints) = &self.constraints else {
            return false;
        };
        let Some(identity) = Identity::from_details(session.details()) else {
            return false;
        };
        if !constraints.admits(&identity) {
            return false;
        }
        if constraints.permissions.is_empty() {
            return true;
        }

        match self
            .enforcer
            .has_permission(
                Some(&identity.guild_id),
                &identity.user_id,
                &constraints.permissions,
            )
            .await
        {
            Ok(permitted) => {
                if !permitted {
                    debug!(session_id = %session.id(), topic = %self.topic, "Event withheld");
                }
                permitted
            }
            Err(e) => {
                warn!(session_id = %session.id(), topic = %self.topic, error = %e, "Publish permission check failed");
                self.sink.capture(
                    ErrorReport::new(e.to_string())
                        .with_tag(TAG_SESSION_ID, session.id())
                        .with_tag(TAG_TOPIC, &self.topic)
                        .with_tag(TAG_STAGE, STAGE_PERMISSION),
                );
                false
            }
        }
    }
}

/// Builds a [`GatePublishFilter`] per publication.
pub struct GatePublishFilterFactory {
    enforcer: Arc<dyn PermissionEnforcer>,
    sink: Arc<dyn ErrorSink>,
}

impl GatePublishFilterFactory {
    pub fn new(enforcer: Arc<dyn PermissionEnforcer>, sink: Arc<dyn ErrorSink>) -> Self {
        Self { enforcer, sink }
    }
}

impl PublishFilterFactory for GatePublishFilterFactory {
    fn publish_filter(&self, publish: &Publish) -> Arc<dyn PublishFilter> {
        let constraints = match Constraints::from_options(&publish.options) {
            Ok(constraints) => Some(constraints),
            Err(e) => {
                warn!(topic = %publish.topic, error = %e, "Malformed publication constraints");
                self.sink.capture(
                    ErrorReport::new(format!("malformed publication constraints: {e}"))
                        .with_tag(TAG_TOPIC, &publish.topic),
                );
                None
            }
        };
        Arc::new(GatePublishFilter {
            enforcer: self.enforcer.clone(),
            sink: self.sink.clone(),
            topic: publish.topic.clone(),
            constraints,
        })
    }
}
