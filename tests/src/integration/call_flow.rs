//! # Call Flow
//!
//! Calls from user and service sessions through the gate to a callee.

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use gate_runtime::GateConfig;
    use gg_01_rbac::{NewRole, RateLimit, Target, SPECIAL_EVERYONE};
    use gg_02_authorization::KEY_PERMISSIONS;
    use shared_bus::{
        codes, handler_fn, Call, Invocation, InvokeResult, Register, Session, KEY_GUILD_ID,
        KEY_USER_ID,
    };
    use shared_types::{permissions_to_value, Dict, Permission, RequestId, Value};
    use std::sync::Arc;

    // =========================================================================
    // FIXTURES
    // =========================================================================

    /// Register `queue.add` (requires QUEUE_MODIFY) echoing what it receives.
    async fn register_echo(fixture: &Fixture, callee: &Session) {
        let mut options = Dict::new();
        options.insert(
            KEY_PERMISSIONS.into(),
            permissions_to_value(&[Permission::QUEUE_MODIFY]),
        );
        fixture
            .realm
            .register(
                callee,
                Register {
                    procedure: "queue.add".into(),
                    options,
                    ..Register::default()
                },
                Arc::new(handler_fn(|inv: Invocation| async move {
                    InvokeResult::ok(inv.arguments, inv.details)
                })),
            )
            .await
            .unwrap();
    }

    fn queue_add(request: u64, arguments: Vec<Value>) -> Call {
        Call {
            request: RequestId(request),
            procedure: "queue.add".into(),
            arguments,
            ..Call::default()
        }
    }

    // =========================================================================
    // SERVICE CALLERS
    // =========================================================================

    #[tokio::test]
    async fn test_service_call_strips_identity_arguments() {
        let fixture = Fixture::new();
        let (callee, _callee_handle) = fixture.service();
        register_echo(&fixture, &callee).await;
        fixture
            .grants
            .grant(&Target::member("10", "20"), Permission::QUEUE_MODIFY);

        let (caller, _handle) = fixture.service();
        let res = fixture
            .realm
            .router()
            .call(
                &caller,
                queue_add(1, vec!["10".into(), "20".into(), "rest".into()]),
            )
            .await;

        assert!(!res.is_error(), "{res:?}");
        assert_eq!(res.args, vec![Value::from("rest")]);
        assert_eq!(res.kwargs.get(KEY_GUILD_ID), Some(&Value::from("10")));
        assert_eq!(res.kwargs.get(KEY_USER_ID), Some(&Value::from("20")));
    }

    #[tokio::test]
    async fn test_concurrent_calls_keep_their_own_identity() {
        let fixture = Fixture::new();
        let (callee, _callee_handle) = fixture.service();
        register_echo(&fixture, &callee).await;
        for user in ["20", "21"] {
            fixture
                .grants
                .grant(&Target::member("10", user), Permission::QUEUE_MODIFY);
        }

        let (caller, _handle) = fixture.service();
        let router = fixture.realm.router();
        let (first, second) = tokio::join!(
            router.call(&caller, queue_add(1, vec!["10".into(), "20".into()])),
            router.call(&caller, queue_add(2, vec!["10".into(), "21".into()])),
        );

        assert_eq!(first.kwargs.get(KEY_USER_ID), Some(&Value::from("20")));
        assert_eq!(second.kwargs.get(KEY_USER_ID), Some(&Value::from("21")));
    }

    #[tokio::test]
    async fn test_service_denials_are_classified() {
        let fixture = Fixture::new();
        let (callee, _callee_handle) = fixture.service();
        register_echo(&fixture, &callee).await;
        let (caller, _handle) = fixture.service();
        let router = fixture.realm.router();

        let res = router.call(&caller, queue_add(1, vec!["10".into()])).await;
        assert_eq!(res.error_code(), Some(codes::IDENTITY_MISSING));
        assert_eq!(res.args, vec![Value::from("user_id missing")]);

        let res = router
            .call(&caller, queue_add(2, vec!["10".into(), "20".into()]))
            .await;
        assert_eq!(res.error_code(), Some(codes::FORBIDDEN));
        assert_eq!(
            res.kwargs.get("permissions"),
            Some(&permissions_to_value(&[Permission::QUEUE_MODIFY]))
        );
    }

    // =========================================================================
    // USER CALLERS
    // =========================================================================

    #[tokio::test]
    async fn test_user_call_uses_session_identity() {
        let fixture = Fixture::new();
        let (callee, _callee_handle) = fixture.service();
        register_echo(&fixture, &callee).await;
        fixture
            .grants
            .grant(&Target::member("55", "68"), Permission::QUEUE_MODIFY);

        let (user, _handle) = fixture.user("55", "68");
        let res = fixture
            .realm
            .router()
            .call(&user, queue_add(1, vec!["song".into()]))
            .await;

        assert_eq!(res.args, vec![Value::from("song")]);
        assert_eq!(res.kwargs.get(KEY_GUILD_ID), Some(&Value::from("55")));
    }

    #[tokio::test]
    async fn test_user_denials_are_silent() {
        let fixture = Fixture::new();
        let (callee, _callee_handle) = fixture.service();
        register_echo(&fixture, &callee).await;

        let (user, _handle) = fixture.user("55", "68");
        let res = fixture
            .realm
            .router()
            .call(&user, queue_add(1, vec![]))
            .await;
        assert_eq!(res, InvokeResult::error(codes::NOT_AUTHORIZED));
    }

    #[tokio::test]
    async fn test_role_grant_applies_to_member() {
        let fixture = Fixture::new();
        let (callee, _callee_handle) = fixture.service();
        register_echo(&fixture, &callee).await;

        let roles = fixture.ctx.roles();
        let dj = roles
            .create_role(NewRole::new("dj", vec![Permission::QUEUE_MODIFY]).in_guild("55"))
            .await
            .unwrap();
        roles
            .assign_role(&Target::member("55", "68"), dj.id)
            .await
            .unwrap();
        fixture.grants.grant(
            &Target::role("55", &dj.id.to_string()),
            Permission::QUEUE_MODIFY,
        );

        let router = fixture.realm.router();
        let (member, _h1) = fixture.user("55", "68");
        assert!(!router.call(&member, queue_add(1, vec![])).await.is_error());

        // Same user in another guild does not hold the guild role.
        let (elsewhere, _h2) = fixture.user("66", "68");
        assert!(router.call(&elsewhere, queue_add(2, vec![])).await.is_error());
    }

    #[tokio::test]
    async fn test_everyone_grant_applies_to_any_member() {
        let fixture = Fixture::new();
        let (callee, _callee_handle) = fixture.service();
        register_echo(&fixture, &callee).await;
        fixture.grants.grant(
            &Target::special(Some("55"), SPECIAL_EVERYONE),
            Permission::QUEUE_MODIFY,
        );

        let (user, _handle) = fixture.user("55", "1234");
        let res = fixture
            .realm
            .router()
            .call(&user, queue_add(1, vec![]))
            .await;
        assert!(!res.is_error());
    }

    #[tokio::test]
    async fn test_guild_rate_limit() {
        let mut config = GateConfig::default();
        config.enforcer.default_guild_rate_limit = RateLimit::per_minute(2);
        let fixture = Fixture::with_config(config);
        let (callee, _callee_handle) = fixture.service();
        register_echo(&fixture, &callee).await;
        fixture
            .grants
            .grant(&Target::member("55", "68"), Permission::QUEUE_MODIFY);

        let (user, _handle) = fixture.user("55", "68");
        let router = fixture.realm.router();
        assert!(!router.call(&user, queue_add(1, vec![])).await.is_error());
        assert!(!router.call(&user, queue_add(2, vec![])).await.is_error());
        let res = router.call(&user, queue_add(3, vec![])).await;
        assert_eq!(res, InvokeResult::error(codes::NOT_AUTHORIZED));

        // Another guild has its own bucket.
        fixture
            .grants
            .grant(&Target::member("66", "68"), Permission::QUEUE_MODIFY);
        let (other, _other_handle) = fixture.user("66", "68");
        assert!(!router.call(&other, queue_add(4, vec![])).await.is_error());
    }
}
