//! # Message Gate
//!
//! Decides, per inbound message, whether the router may process it.
//!
//! ```text
//!             ┌────────── user session ──────────┐
//!  Call ──────┤ identity from session details    ├──┐
//!             └───────── service session ────────┘  │
//!               identity = pop(args[0]), pop(args[0])│
//!                                                    ▼
//!                       rate limit ──► permissions ──► identity and
//!                                                      `rate_admitted` written
//!                                                      into call options
//! ```
//!
//! | Message | User session | Service session |
//! |---------|--------------|-----------------|
//! | Call | identity, rate limit, permissions | same, identity from arguments |
//! | Subscribe | identity must resolve | allowed |
//! | Publish | denied | allowed, filtered per subscriber |
//! | Register | denied | allowed if `perms` is well formed |
//! | Cancel / Unsubscribe | allowed | allowed |
//! | Other | denied | denied |

use crate::denial::Denial;
use crate::identity::Identity;
use crate::registry::{declared_permissions, ProcedureRegistry};
use async_trait::async_trait;
use gg_01_rbac::PermissionEnforcer;
use gg_03_invocation::{STAGE_PERMISSION, STAGE_RATE_LIMIT};
use gg_telemetry::{ErrorReport, ErrorSink, TAG_REQUEST_ID, TAG_SESSION_ID};
use shared_bus::{
    Authorizer, BusMessage, Call, InvokeResult, Register, Session, SessionRole, KEY_RATE_ADMITTED,
};
use shared_types::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// The bus authorizer.
pub struct GateAuthorizer {
    enforcer: Arc<dyn PermissionEnforcer>,
    registry: Arc<ProcedureRegistry>,
    sink: Arc<dyn ErrorSink>,
}

impl GateAuthorizer {
    pub fn new(
        enforcer: Arc<dyn PermissionEnforcer>,
        registry: Arc<ProcedureRegistry>,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        Self {
            enforcer,
            registry,
            sink,
        }
    }

    /// Decide on `message` without rendering the denial.
    pub async fn decide(&self, session: &Session, message: &mut BusMessage) -> Result<(), Denial> {
        match message {
            BusMessage::Call(call) => self.authorize_call(session, call).await,
            BusMessage::Subscribe(_) => {
                if session.has_role(SessionRole::User) {
                    self.session_identity(session)?;
                }
                Ok(())
            }
            BusMessage::Publish(_) => {
                if session.has_role(SessionRole::User) {
                    return Err(Denial::NotAllowed);
                }
                Ok(())
            }
            BusMessage::Register(register) => authorize_register(session, register),
            BusMessage::Cancel(_) | BusMessage::Unsubscribe(_) => Ok(()),
            BusMessage::Other { .. } => Err(Denial::NotAllowed),
        }
    }

    async fn authorize_call(&self, session: &Session, call: &mut Call) -> Result<(), Denial> {
        let identity = if session.has_role(SessionRole::User) {
            self.session_identity(session)?
        } else {
            Identity::take_from_arguments(&mut call.arguments).map_err(Denial::IdentityMissing)?
        };

        let within_limit = self
            .enforcer
            .has_rate_limit(Some(&identity.guild_id), &identity.user_id)
            .await
            .map_err(|e| Denial::internal(STAGE_RATE_LIMIT, e))?;
        if !within_limit {
            return Err(Denial::RateLimited);
        }

        let required = self.registry.required(&call.procedure);
        let permitted = self
            .enforcer
            .has_permission(Some(&identity.guild_id), &identity.user_id, &required)
            .await
            .map_err(|e| Denial::internal(STAGE_PERMISSION, e))?;
        if !permitted {
            return Err(Denial::Forbidden(required));
        }

        identity.write_to(&mut call.options);
        call.options.insert(KEY_RATE_ADMITTED.to_string(), Value::Bool(true));
        Ok(())
    }

    /// Identity authentication attached to a user session. Its absence is a
    /// deployment fault and gets reported.
    fn session_identity(&self, session: &Session) -> Result<Identity, Denial> {
        Identity::from_details(session.details()).ok_or_else(|| {
            warn!(session_id = %session.id(), "User session without identity");
            self.sink.capture(
                ErrorReport::new("user session with no user identification")
                    .with_tag(TAG_SESSION_ID, session.id()),
            );
            Denial::NotAllowed
        })
    }
}

fn authorize_register(session: &Session, register: &Register) -> Result<(), Denial> {
    if session.has_role(SessionRole::User) {
        return Err(Denial::NotAllowed);
    }
    declared_permissions(&register.options)
        .map(|_| ())
        .map_err(|e| Denial::InvalidArgument(format!("perms: {e}")))
}

#[async_trait]
impl Authorizer for GateAuthorizer {
    async fn authorize(
        &self,
        session: &Session,
        message: &mut BusMessage,
    ) -> Result<(), InvokeResult> {
        let kind = message.kind();
        match self.decide(session, message).await {
            Ok(()) => Ok(()),
            Err(denial) => {
                debug!(
                    session_id = %session.id(),
                    role = %session.role(),
                    kind = %kind,
                    uri = message.uri().unwrap_or_default(),
                    reason = %denial,
                    "Message denied"
                );
                let mut tags = vec![(TAG_SESSION_ID, session.id().to_string())];
                if let Some(request) = message.request() {
                    tags.push((TAG_REQUEST_ID, request.to_string()));
                }
                Err(denial.into_result(session.role(), self.sink.as_ref(), &tags))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MissingIdentity;
    use gg_01_rbac::{
        Enforcer, EnforcerConfig, InMemoryPermissionStore, InMemoryRoleStore, RateLimit,
        StoreError, Target,
    };
    use gg_telemetry::MemoryErrorSink;
    use shared_bus::{codes, Cancel, Publish, Subscribe, KEY_GUILD_ID, KEY_USER_ID};
    use shared_types::{Dict, Permission, RequestId, SessionId, Value};

    struct Fixture {
        grants: Arc<InMemoryPermissionStore>,
        registry: Arc<ProcedureRegistry>,
        sink: Arc<MemoryErrorSink>,
        gate: GateAuthorizer,
    }

    fn fixture(config: EnforcerConfig) -> Fixture {
        let grants = Arc::new(InMemoryPermissionStore::new(config.key_prefix.clone()));
        let enforcer = Arc::new(Enforcer::new(
            config,
            grants.clone(),
            Arc::new(InMemoryRoleStore::new()),
        ));
        let registry = Arc::new(ProcedureRegistry::new());
        let sink = Arc::new(MemoryErrorSink::new());
        let gate = GateAuthorizer::new(enforcer, registry.clone(), sink.clone());
        Fixture {
            grants,
            registry,
            sink,
            gate,
        }
    }

    fn user_session(guild: &str, user: &str) -> Session {
        let mut details = Dict::new();
        details.insert(KEY_GUILD_ID.into(), guild.into());
        details.insert(KEY_USER_ID.into(), user.into());
        Session::open(SessionId(1), SessionRole::User, details).0
    }

    fn service_session() -> Session {
        Session::open(SessionId(2), SessionRole::Api, Dict::new()).0
    }

    fn call(procedure: &str, arguments: Vec<Value>) -> BusMessage {
        BusMessage::Call(Call {
            request: RequestId(9),
            procedure: procedure.into(),
            arguments,
            ..Call::default()
        })
    }

    #[tokio::test]
    async fn test_service_call_consumes_identity_arguments() {
        let f = fixture(EnforcerConfig::default());
        f.registry.declare("queue.add", vec![Permission::QUEUE_MODIFY]);
        f.grants.grant(&Target::member("10", "20"), Permission::QUEUE_MODIFY);

        let mut message = call("queue.add", vec!["10".into(), "20".into(), "rest".into()]);
        f.gate
            .authorize(&service_session(), &mut message)
            .await
            .unwrap();

        let BusMessage::Call(call) = message else {
            panic!("expected call");
        };
        assert_eq!(call.arguments, vec![Value::from("rest")]);
        assert_eq!(call.options.get(KEY_GUILD_ID), Some(&Value::from("10")));
        assert_eq!(call.options.get(KEY_USER_ID), Some(&Value::from("20")));
        assert_eq!(call.options.get(KEY_RATE_ADMITTED), Some(&Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_service_call_missing_identity_is_diagnosable() {
        let f = fixture(EnforcerConfig::default());
        let mut message = call("queue.add", vec!["10".into()]);
        let denial = f.gate.decide(&service_session(), &mut message).await;
        assert_eq!(denial, Err(Denial::IdentityMissing(MissingIdentity::UserId)));

        let mut message = call("queue.add", vec![]);
        let res = f
            .gate
            .authorize(&service_session(), &mut message)
            .await
            .unwrap_err();
        assert_eq!(res.error_code(), Some(codes::IDENTITY_MISSING));
        assert_eq!(res.args, vec![Value::from("guild_id missing")]);
    }

    #[tokio::test]
    async fn test_service_forbidden_lists_required() {
        let f = fixture(EnforcerConfig::default());
        f.registry.declare("queue.add", vec![Permission::QUEUE_MODIFY]);

        let mut message = call("queue.add", vec!["10".into(), "20".into()]);
        let res = f
            .gate
            .authorize(&service_session(), &mut message)
            .await
            .unwrap_err();
        assert_eq!(res.error_code(), Some(codes::FORBIDDEN));
        assert_eq!(res.kwargs.get("permissions"), Some(&Value::List(vec![Value::Int(2)])));
    }

    #[tokio::test]
    async fn test_user_call_uses_session_identity() {
        let f = fixture(EnforcerConfig::default());
        f.registry.declare("player.skip", vec![Permission::PLAYER_CONTROL]);
        f.grants.grant(&Target::member("55", "68"), Permission::PLAYER_CONTROL);

        // Spoofed identity in the call options is overwritten.
        let mut options = Dict::new();
        options.insert(KEY_USER_ID.into(), "1".into());
        let mut message = BusMessage::Call(Call {
            procedure: "player.skip".into(),
            options,
            arguments: vec!["10".into()],
            ..Call::default()
        });
        f.gate
            .authorize(&user_session("55", "68"), &mut message)
            .await
            .unwrap();

        let BusMessage::Call(call) = message else {
            panic!("expected call");
        };
        assert_eq!(call.arguments, vec![Value::from("10")]);
        assert_eq!(call.options.get(KEY_USER_ID), Some(&Value::from("68")));
    }

    #[tokio::test]
    async fn test_user_denials_are_silent() {
        let f = fixture(EnforcerConfig::default());
        f.registry.declare("player.skip", vec![Permission::PLAYER_CONTROL]);

        let mut message = call("player.skip", vec![]);
        let res = f
            .gate
            .authorize(&user_session("55", "68"), &mut message)
            .await
            .unwrap_err();
        assert_eq!(res, InvokeResult::error(codes::NOT_AUTHORIZED));

        let anonymous = Session::open(SessionId(3), SessionRole::User, Dict::new()).0;
        let mut message = call("player.skip", vec![]);
        let res = f.gate.authorize(&anonymous, &mut message).await.unwrap_err();
        assert_eq!(res, InvokeResult::error(codes::NOT_AUTHORIZED));
        assert_eq!(f.sink.len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_checked_first() {
        let f = fixture(EnforcerConfig {
            global_rate_limit: RateLimit::per_minute(1),
            ..EnforcerConfig::default()
        });
        let session = service_session();

        let mut first = call("queue.list", vec!["10".into(), "20".into()]);
        assert!(f.gate.authorize(&session, &mut first).await.is_ok());

        let mut second = call("queue.list", vec!["10".into(), "20".into()]);
        let res = f.gate.authorize(&session, &mut second).await.unwrap_err();
        assert_eq!(res.error_code(), Some(codes::RATE_LIMITED));
    }

    #[tokio::test]
    async fn test_store_failure_is_internal_not_forbidden() {
        let f = fixture(EnforcerConfig::default());
        f.registry.declare("queue.add", vec![Permission::QUEUE_MODIFY]);
        f.grants
            .set_failure(Some(StoreError::Unavailable("connection refused".into())));

        let mut message = call("queue.add", vec!["10".into(), "20".into()]);
        let res = f
            .gate
            .authorize(&service_session(), &mut message)
            .await
            .unwrap_err();
        assert_eq!(res.error_code(), Some(codes::INTERNAL));
        assert_eq!(f.sink.len(), 1);
        assert_eq!(f.sink.reports()[0].1.tag(TAG_REQUEST_ID), Some("9"));
    }

    #[tokio::test]
    async fn test_subscribe_requires_user_identity() {
        let f = fixture(EnforcerConfig::default());
        let subscribe = || BusMessage::Subscribe(Subscribe {
            topic: "queue.updated".into(),
            ..Subscribe::default()
        });

        assert!(f.gate.decide(&user_session("55", "68"), &mut subscribe()).await.is_ok());
        assert!(f.gate.decide(&service_session(), &mut subscribe()).await.is_ok());

        let anonymous = Session::open(SessionId(3), SessionRole::User, Dict::new()).0;
        assert_eq!(
            f.gate.decide(&anonymous, &mut subscribe()).await,
            Err(Denial::NotAllowed)
        );

        let reports = f.sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1.tag(TAG_SESSION_ID), Some("3"));
        assert!(reports[0].1.message.contains("no user identification"));
    }

    #[tokio::test]
    async fn test_other_message_kinds() {
        let f = fixture(EnforcerConfig::default());
        let user = user_session("55", "68");
        let service = service_session();

        let mut publish = BusMessage::Publish(Publish::default());
        assert_eq!(f.gate.decide(&user, &mut publish).await, Err(Denial::NotAllowed));
        assert!(f.gate.decide(&service, &mut publish).await.is_ok());

        let mut register = BusMessage::Register(Register {
            procedure: "queue.add".into(),
            ..Register::default()
        });
        assert_eq!(f.gate.decide(&user, &mut register).await, Err(Denial::NotAllowed));
        assert!(f.gate.decide(&service, &mut register).await.is_ok());

        let mut options = Dict::new();
        options.insert("perms".into(), Value::Bool(true));
        let mut bad_register = BusMessage::Register(Register {
            procedure: "queue.add".into(),
            options,
            ..Register::default()
        });
        assert!(matches!(
            f.gate.decide(&service, &mut bad_register).await,
            Err(Denial::InvalidArgument(_))
        ));

        let mut cancel = BusMessage::Cancel(Cancel::default());
        assert!(f.gate.decide(&user, &mut cancel).await.is_ok());

        let mut other = BusMessage::Other {
            name: "yield".into(),
        };
        assert_eq!(f.gate.decide(&service, &mut other).await, Err(Denial::NotAllowed));
    }
}
