use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use portal_core::NewCard;
use portal_db::repo::{CardRepo, LayerRepo, RepoError};
use portal_db::{ExecutorOptions, RlsError};
use tokio::sync::Barrier;

mod support;

use support::{USER_A, USER_B, USER_C};

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn three_owner_scenario() {
    let pool = support::setup_db(4).await;
    let executor = support::executor(&pool);
    let [(_, card_a), _, _] = support::seed_three_owners(&executor).await;

    let cards = executor
        .run_as_user(USER_A, |tx| {
            Box::pin(async move { CardRepo::new(tx).list_all().await })
        })
        .await
        .expect("list as A");
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].id, card_a);
    assert_eq!(cards[0].title, "Card A");

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let err = executor
        .run_as_user("not-a-uuid", move |tx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { CardRepo::new(tx).list_all().await })
        })
        .await
        .expect_err("malformed id");
    assert!(matches!(err, RlsError::InvalidIdentity));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let all = executor
        .run_as_admin(|tx| Box::pin(async move { CardRepo::new(tx).list_all().await }))
        .await
        .expect("list as admin");
    assert_eq!(all.len(), 3);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn explicit_lookup_of_foreign_row_returns_nothing() {
    let pool = support::setup_db(2).await;
    let executor = support::executor(&pool);
    let [_, (layer_b, card_b), _] = support::seed_three_owners(&executor).await;

    let (card, role, layers) = executor
        .run_as_user(USER_A, move |tx| {
            Box::pin(async move {
                let card = CardRepo::new(tx).get(card_b).await?;
                let role = LayerRepo::new(tx).role_of(layer_b).await?;
                let layers = LayerRepo::new(tx).list().await?;
                Ok::<_, RepoError>((card, role, layers))
            })
        })
        .await
        .expect("lookup as A");
    assert!(card.is_none());
    assert!(role.is_none());
    assert_eq!(layers.len(), 1);

    let deleted = executor
        .run_as_user(USER_A, move |tx| {
            Box::pin(async move { CardRepo::new(tx).delete(card_b).await })
        })
        .await
        .expect("delete as A");
    assert!(!deleted);
    assert_eq!(support::admin_card_count(&executor).await, 3);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn failed_operation_leaves_no_partial_writes() {
    let pool = support::setup_db(2).await;
    let executor = support::executor(&pool);
    let [(layer_a, _), _, _] = support::seed_three_owners(&executor).await;
    let before = support::admin_card_count(&executor).await;

    let err = executor
        .run_as_user(USER_A, move |tx| {
            Box::pin(async move {
                CardRepo::new(tx)
                    .create_in_layer(&NewCard::new("Never committed", 1200), layer_a)
                    .await
                    .map_err(|err| err.to_string())?;
                Err::<(), _>("abort after write".to_string())
            })
        })
        .await
        .expect_err("operation fails");
    match err {
        RlsError::OperationFailed(message) => assert_eq!(message, "abort after write"),
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(support::admin_card_count(&executor).await, before);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn sequential_reuse_of_single_connection_clears_context() {
    let pool = support::setup_db(1).await;
    let executor = support::executor(&pool);

    let seen_a = executor
        .run_as_user(USER_A, |tx| Box::pin(async move { support::read_context(tx).await }))
        .await
        .expect("context A");
    assert_eq!(seen_a.user_id.as_deref(), Some(USER_A));
    assert_eq!(seen_a.is_admin.as_deref(), Some("false"));
    assert_eq!(seen_a.role_name, support::APP_ROLE);

    assert!(support::read_pool_context(&pool).await.is_clear());

    let seen_b = executor
        .run_as_user(USER_B, |tx| Box::pin(async move { support::read_context(tx).await }))
        .await
        .expect("context B");
    assert_eq!(seen_b.user_id.as_deref(), Some(USER_B));

    assert!(support::read_pool_context(&pool).await.is_clear());
    assert_eq!(pool.size(), 1);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn concurrent_calls_on_pool_of_one_are_serialized_and_isolated() {
    let pool = support::setup_db(1).await;
    let executor = support::executor(&pool);

    let scoped_read = |user: &'static str| {
        let executor = executor.clone();
        async move {
            executor
                .run_as_user(user, |tx| {
                    Box::pin(async move {
                        let first = support::read_context(tx).await?;
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        let second = support::read_context(tx).await?;
                        Ok::<_, sqlx_core::Error>((first, second))
                    })
                })
                .await
        }
    };

    let (a, b) = tokio::join!(scoped_read(USER_A), scoped_read(USER_B));
    let (a_first, a_second) = a.expect("A");
    let (b_first, b_second) = b.expect("B");
    assert_eq!(a_first.user_id.as_deref(), Some(USER_A));
    assert_eq!(a_second.user_id.as_deref(), Some(USER_A));
    assert_eq!(b_first.user_id.as_deref(), Some(USER_B));
    assert_eq!(b_second.user_id.as_deref(), Some(USER_B));
    assert!(support::read_pool_context(&pool).await.is_clear());
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn overlapping_transactions_keep_their_own_context() {
    let pool = support::setup_db(2).await;
    let executor = support::executor(&pool);
    support::seed_three_owners(&executor).await;
    let barrier = Arc::new(Barrier::new(2));

    let interleaved = |user: &'static str| {
        let executor = executor.clone();
        let barrier = barrier.clone();
        async move {
            executor
                .run_as_user(user, move |tx| {
                    Box::pin(async move {
                        let before = support::read_context(tx).await?;
                        barrier.wait().await;
                        let cards = CardRepo::new(tx)
                            .list_all()
                            .await
                            .map_err(|err| err.to_string())
                            .map_err(sqlx_core::Error::Protocol)?;
                        barrier.wait().await;
                        let after = support::read_context(tx).await?;
                        Ok::<_, sqlx_core::Error>((before, cards, after))
                    })
                })
                .await
        }
    };

    let (a, b) = tokio::join!(interleaved(USER_A), interleaved(USER_B));
    let (a_before, a_cards, a_after) = a.expect("A");
    let (b_before, b_cards, b_after) = b.expect("B");

    assert_eq!(a_before.user_id.as_deref(), Some(USER_A));
    assert_eq!(a_after.user_id.as_deref(), Some(USER_A));
    assert_eq!(b_before.user_id.as_deref(), Some(USER_B));
    assert_eq!(b_after.user_id.as_deref(), Some(USER_B));
    assert_eq!(a_cards.len(), 1);
    assert_eq!(a_cards[0].title, "Card A");
    assert_eq!(b_cards.len(), 1);
    assert_eq!(b_cards[0].title, "Card B");
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn admin_scope_does_not_leak_into_next_user_scope() {
    let pool = support::setup_db(1).await;
    let executor = support::executor(&pool);
    support::seed_three_owners(&executor).await;
    support::create_users(&executor, &["eeeeeeee-eeee-eeee-eeee-eeeeeeeeeeee"]).await;

    let admin_seen = executor
        .run_as_admin(|tx| Box::pin(async move { support::read_context(tx).await }))
        .await
        .expect("admin context");
    assert_eq!(admin_seen.is_admin.as_deref(), Some("true"));
    assert_eq!(admin_seen.user_id.as_deref(), Some(""));

    let (seen, count) = executor
        .run_as_user("eeeeeeee-eeee-eeee-eeee-eeeeeeeeeeee", |tx| {
            Box::pin(async move {
                let seen = support::read_context(tx).await.map_err(RepoError::Db)?;
                let count = CardRepo::new(tx).count().await?;
                Ok::<_, RepoError>((seen, count))
            })
        })
        .await
        .expect("user after admin");
    assert_eq!(seen.is_admin.as_deref(), Some("false"));
    assert_eq!(count, 0);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn cancelled_call_rolls_back_and_releases_connection() {
    let pool = support::setup_db(1).await;
    let executor = support::executor(&pool);
    let [(layer_a, _), _, _] = support::seed_three_owners(&executor).await;
    let before = support::admin_card_count(&executor).await;

    let call = executor.run_as_user(USER_A, move |tx| {
        Box::pin(async move {
            CardRepo::new(tx)
                .create_in_layer(&NewCard::new("Abandoned", 1500), layer_a)
                .await?;
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, RepoError>(())
        })
    });
    let outcome = tokio::time::timeout(Duration::from_millis(300), call).await;
    assert!(outcome.is_err(), "call should have been cancelled");

    assert!(support::read_pool_context(&pool).await.is_clear());
    assert_eq!(support::admin_card_count(&executor).await, before);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn operation_timeout_rolls_back() {
    let pool = support::setup_db(1).await;
    let executor = support::executor(&pool);
    let [(layer_a, _), _, _] = support::seed_three_owners(&executor).await;
    let before = support::admin_card_count(&executor).await;

    let limited = support::executor_with(
        &pool,
        ExecutorOptions {
            operation_timeout: Some(Duration::from_millis(200)),
            ..ExecutorOptions::default()
        },
    );
    let err = limited
        .run_as_user(USER_A, move |tx| {
            Box::pin(async move {
                CardRepo::new(tx)
                    .create_in_layer(&NewCard::new("Too slow", 1600), layer_a)
                    .await?;
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok::<_, RepoError>(())
            })
        })
        .await
        .expect_err("timed out");
    assert!(matches!(err, RlsError::TimedOut));

    assert!(support::read_pool_context(&pool).await.is_clear());
    assert_eq!(support::admin_card_count(&executor).await, before);
}

#[tokio::test]
#[cfg_attr(not(feature = "postgres-tests"), ignore = "requires TEST_DATABASE_URL")]
async fn carol_without_layers_sees_nothing() {
    let pool = support::setup_db(2).await;
    let executor = support::executor(&pool);
    support::create_users(&executor, &[USER_A, USER_C]).await;
    support::create_layer_with_card(&executor, USER_A, "Only A").await;

    let (cards, accessible) = executor
        .run_as_user(USER_C, |tx| {
            Box::pin(async move {
                let cards = CardRepo::new(tx).list_all().await?;
                let accessible = CardRepo::new(tx).list_accessible(&[]).await?;
                Ok::<_, RepoError>((cards, accessible))
            })
        })
        .await
        .expect("list as C");
    assert!(cards.is_empty());
    assert!(accessible.is_empty());
}
