//! # Publish Flow
//!
//! Delivery decided per subscriber at publish time.

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use gg_01_rbac::{StoreError, Target};
    use gg_02_authorization::{KEY_PERMISSIONS, TAG_TOPIC};
    use shared_bus::{codes, Publish, Session, Subscribe, Subscription, KEY_GUILD_ID, KEY_USER_ID};
    use shared_types::{permissions_to_value, Dict, Permission, Value};

    const TOPIC: &str = "queue.updated";

    // =========================================================================
    // FIXTURES
    // =========================================================================

    async fn subscribe(fixture: &Fixture, session: &Session) -> Subscription {
        fixture
            .realm
            .router()
            .subscribe(
                session,
                Subscribe {
                    topic: TOPIC.into(),
                    ..Subscribe::default()
                },
            )
            .await
            .unwrap()
    }

    fn publication(options: Dict) -> Publish {
        Publish {
            topic: TOPIC.into(),
            options,
            arguments: vec![Value::from("track-42")],
            ..Publish::default()
        }
    }

    fn guild_and_permission(guild: &str, permission: Permission) -> Dict {
        let mut options = Dict::new();
        options.insert(KEY_GUILD_ID.into(), guild.into());
        options.insert(KEY_PERMISSIONS.into(), permissions_to_value(&[permission]));
        options
    }

    fn delivered(subscription: &mut Subscription) -> bool {
        matches!(subscription.try_recv(), Ok(Some(_)))
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    #[tokio::test]
    async fn test_guild_and_permission_constraints() {
        let fixture = Fixture::new();
        fixture
            .grants
            .grant(&Target::member("55", "1"), Permission::QUEUE_READ);

        let (a, _ha) = fixture.user("55", "1");
        let (b, _hb) = fixture.user("66", "2");
        let (c, _hc) = fixture.service();
        let mut sub_a = subscribe(&fixture, &a).await;
        let mut sub_b = subscribe(&fixture, &b).await;
        let mut sub_c = subscribe(&fixture, &c).await;

        let (publisher, _hp) = fixture.service();
        let count = fixture
            .realm
            .router()
            .publish(
                &publisher,
                publication(guild_and_permission("55", Permission::QUEUE_READ)),
            )
            .await
            .unwrap();

        assert_eq!(count, 2);
        assert!(delivered(&mut sub_a));
        assert!(!delivered(&mut sub_b));
        assert!(delivered(&mut sub_c));
    }

    #[tokio::test]
    async fn test_user_constraint_targets_one_member() {
        let fixture = Fixture::new();
        let (a, _ha) = fixture.user("55", "1");
        let (b, _hb) = fixture.user("55", "2");
        let mut sub_a = subscribe(&fixture, &a).await;
        let mut sub_b = subscribe(&fixture, &b).await;

        let mut options = Dict::new();
        options.insert(KEY_USER_ID.into(), Value::Int(2));
        let (publisher, _hp) = fixture.service();
        fixture
            .realm
            .router()
            .publish(&publisher, publication(options))
            .await
            .unwrap();

        assert!(!delivered(&mut sub_a));
        assert!(delivered(&mut sub_b));
    }

    #[tokio::test]
    async fn test_grant_change_visible_to_next_publication() {
        let fixture = Fixture::new();
        let (a, _ha) = fixture.user("55", "1");
        let mut sub_a = subscribe(&fixture, &a).await;
        let (publisher, _hp) = fixture.service();
        let router = fixture.realm.router();

        let options = guild_and_permission("55", Permission::QUEUE_READ);
        router
            .publish(&publisher, publication(options.clone()))
            .await
            .unwrap();
        assert!(!delivered(&mut sub_a));

        fixture
            .grants
            .grant(&Target::member("55", "1"), Permission::QUEUE_READ);
        router
            .publish(&publisher, publication(options))
            .await
            .unwrap();
        assert!(delivered(&mut sub_a));
    }

    #[tokio::test]
    async fn test_store_failure_isolated_per_subscriber() {
        let fixture = Fixture::new();
        fixture
            .grants
            .set_failure(Some(StoreError::Unavailable("connection reset".into())));

        let (a, _ha) = fixture.user("55", "1");
        let (c, _hc) = fixture.service();
        let mut sub_a = subscribe(&fixture, &a).await;
        let mut sub_c = subscribe(&fixture, &c).await;

        let (publisher, _hp) = fixture.service();
        let count = fixture
            .realm
            .router()
            .publish(
                &publisher,
                publication(guild_and_permission("55", Permission::QUEUE_READ)),
            )
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert!(!delivered(&mut sub_a));
        assert!(delivered(&mut sub_c));

        let reports = fixture.sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1.tag(TAG_TOPIC), Some(TOPIC));
    }

    // =========================================================================
    // GATE
    // =========================================================================

    #[tokio::test]
    async fn test_users_cannot_publish() {
        let fixture = Fixture::new();
        let (user, _handle) = fixture.user("55", "1");
        let res = fixture
            .realm
            .router()
            .publish(&user, publication(Dict::new()))
            .await
            .unwrap_err();
        assert_eq!(res.error_code(), Some(codes::NOT_AUTHORIZED));
    }

    #[tokio::test]
    async fn test_anonymous_user_cannot_subscribe() {
        let fixture = Fixture::new();
        let (anonymous, _handle) = fixture
            .realm
            .router()
            .open_session(shared_bus::SessionRole::User, Dict::new());
        let res = fixture
            .realm
            .router()
            .subscribe(
                &anonymous,
                Subscribe {
                    topic: TOPIC.into(),
                    ..Subscribe::default()
                },
            )
            .await;
        assert!(res.is_err());
        assert_eq!(fixture.realm.router().subscriber_count(TOPIC), 0);
    }
}
