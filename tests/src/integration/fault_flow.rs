//! # Fault Flow
//!
//! Store failures, slow stores, disconnects and crashing procedures.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{build, user_session, Fixture};
    use async_trait::async_trait;
    use gate_runtime::GateConfig;
    use gg_01_rbac::{PermissionStore, StoreError};
    use gg_03_invocation::{procedure_fn, InvocationError, KWARG_EVENT_ID, KWARG_TRACE};
    use gg_telemetry::{TAG_REQUEST_ID, TAG_STAGE};
    use shared_bus::{codes, Call, Invocation, InvokeResult};
    use shared_types::{Dict, Permission, RequestId, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    /// Grant store that never answers for targets of `stuck_user`, and
    /// grants everything else.
    struct StuckStore {
        stuck_user: &'static str,
    }

    #[async_trait]
    impl PermissionStore for StuckStore {
        async fn has_any_field(&self, key: &str, _fields: &[String]) -> Result<bool, StoreError> {
            if key.ends_with(&format!(":{}", self.stuck_user)) {
                futures::future::pending::<()>().await;
            }
            Ok(true)
        }
    }

    fn stuck_config() -> GateConfig {
        let mut config = GateConfig::default();
        config.enforcer.store_timeout = Duration::from_secs(30);
        config
    }

    async fn serve_skip(realm: &gate_runtime::GateRealm) {
        realm
            .serve(
                "player.skip",
                vec![Permission::PLAYER_CONTROL],
                Arc::new(procedure_fn(|_inv: Invocation| async move {
                    Ok(InvokeResult::ok(vec![Value::from("skipped")], Dict::new()))
                })),
            )
            .await
            .unwrap();
    }

    fn skip(realm: &gate_runtime::GateRealm, request: u64) -> Call {
        Call {
            request: RequestId(request),
            procedure: realm.procedure_uri("player.skip"),
            ..Call::default()
        }
    }

    // =========================================================================
    // STORE FAILURES
    // =========================================================================

    #[tokio::test]
    async fn test_store_failure_is_internal_with_event_id() {
        let fixture = Fixture::new();
        serve_skip(&fixture.realm).await;
        fixture
            .grants
            .set_failure(Some(StoreError::Unavailable("connection refused".into())));

        let (service, _handle) = fixture.service();
        let mut call = skip(&fixture.realm, 77);
        call.arguments = vec!["55".into(), "68".into()];
        let res = fixture.realm.router().call(&service, call).await;

        assert_eq!(res.error_code(), Some(codes::INTERNAL));
        assert_ne!(res.error_code(), Some(codes::FORBIDDEN));
        assert_eq!(res.kwargs.get(KWARG_TRACE), Some(&Value::from("permission_check")));

        let reports = fixture.sink.reports();
        assert_eq!(reports.len(), 1);
        let (id, report) = &reports[0];
        assert_eq!(res.kwargs.get(KWARG_EVENT_ID), Some(&Value::from(id.to_string())));
        assert_eq!(report.tag(TAG_REQUEST_ID), Some("77"));
        assert_eq!(report.tag(TAG_STAGE), Some("permission_check"));
    }

    // =========================================================================
    // SLOW STORES AND DISCONNECTS
    // =========================================================================

    #[tokio::test]
    async fn test_disconnect_cancels_pending_check() {
        let (_sink, _ctx, realm) = build(stuck_config(), Arc::new(StuckStore { stuck_user: "1" }));
        serve_skip(&realm).await;

        let (user, handle) = user_session(&realm, "55", "1");
        let router = Arc::clone(realm.router());
        let call = skip(&realm, 1);
        let pending = tokio::spawn(async move { router.call(&user, call).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());
        handle.close();

        let res = timeout(Duration::from_secs(1), pending)
            .await
            .expect("cancelled check must finish")
            .expect("join");
        assert_eq!(res.error_code(), Some(codes::CANCELED));
    }

    #[tokio::test]
    async fn test_slow_check_does_not_block_other_sessions() {
        let (_sink, _ctx, realm) = build(stuck_config(), Arc::new(StuckStore { stuck_user: "1" }));
        serve_skip(&realm).await;

        let (stuck_user, _h1) = user_session(&realm, "55", "1");
        let router = Arc::clone(realm.router());
        let call = skip(&realm, 1);
        let stuck = tokio::spawn(async move { router.call(&stuck_user, call).await });

        let (other, _h2) = user_session(&realm, "55", "2");
        let res = timeout(
            Duration::from_secs(1),
            realm.router().call(&other, skip(&realm, 2)),
        )
        .await
        .expect("unrelated check must not wait");
        assert_eq!(res.args, vec![Value::from("skipped")]);

        stuck.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_timeout_fails_closed() {
        let mut config = GateConfig::default();
        config.enforcer.store_timeout = Duration::from_millis(100);
        let (sink, _ctx, realm) = build(config, Arc::new(StuckStore { stuck_user: "1" }));
        serve_skip(&realm).await;

        let (user, _handle) = user_session(&realm, "55", "1");
        let res = realm.router().call(&user, skip(&realm, 1)).await;
        assert_eq!(res.error_code(), Some(codes::INTERNAL));
        assert_eq!(sink.len(), 1);
    }

    // =========================================================================
    // CRASH CONTAINMENT
    // =========================================================================

    #[tokio::test]
    async fn test_panicking_procedure_does_not_stop_dispatch() {
        let fixture = Fixture::new();
        fixture
            .realm
            .serve(
                "player.crash",
                vec![],
                Arc::new(procedure_fn(|inv: Invocation| async move {
                    if inv.arguments.is_empty() {
                        panic!("index out of range");
                    }
                    Err(InvocationError::application(
                        "player.error.no_voice",
                        inv.arguments,
                    ))
                })),
            )
            .await
            .unwrap();

        let (service, _handle) = fixture.service();
        let router = fixture.realm.router();
        let crash = |request: u64, extra: Vec<Value>| {
            let mut arguments: Vec<Value> = vec!["55".into(), "68".into()];
            arguments.extend(extra);
            Call {
                request: RequestId(request),
                procedure: fixture.realm.procedure_uri("player.crash"),
                arguments,
                ..Call::default()
            }
        };

        let (panicked, classified) = tokio::join!(
            router.call(&service, crash(1, vec![])),
            router.call(&service, crash(2, vec![Value::Int(3)])),
        );

        assert_eq!(panicked.error_code(), Some(codes::INTERNAL));
        assert!(panicked.kwargs.contains_key(KWARG_EVENT_ID));
        assert_eq!(classified.error_code(), Some("player.error.no_voice"));
        assert_eq!(classified.args, vec![Value::Int(3)]);
        assert_eq!(fixture.sink.len(), 1);
    }
}
