#![allow(dead_code)]

use sqlx_core::pool::PoolOptions;
use sqlx_core::query::query;
use sqlx_core::raw_sql::raw_sql;
use sqlx_core::row::Row;
use sqlx_postgres::{PgConnectOptions, Postgres};
use std::env;
use std::str::FromStr;
use uuid::Uuid;

use portal_db::repo::{CardRepo, LayerRepo, UserRepo};
use portal_db::{
    grant_app_role, migrate, AppRole, ExecutorOptions, PgPool, RlsExecutor, ScopedTx,
};
use portal_core::{NewCard, User, UserRole};

pub const APP_ROLE: &str = "portal_test_app";

pub const USER_A: &str = "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa";
pub const USER_B: &str = "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb";
pub const USER_C: &str = "cccccccc-cccc-cccc-cccc-cccccccccccc";

const CONTEXT_SQL: &str = r#"
    SELECT
        current_setting('app.user_id', true) AS user_id,
        current_setting('app.is_admin', true) AS is_admin,
        current_user::text AS role_name
"#;

pub fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("portal_db=debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Migrates into a fresh schema and grants the test role on it.
pub async fn setup_db(max_connections: u32) -> PgPool {
    init_tracing();
    let db_url =
        env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for Postgres tests");
    let schema = format!("portal_db_test_{}", Uuid::now_v7().simple());
    let admin_options =
        PgConnectOptions::from_str(&db_url).expect("failed to parse TEST_DATABASE_URL");
    let admin_pool = PoolOptions::<Postgres>::new()
        .max_connections(1)
        .connect_with(admin_options.clone())
        .await
        .expect("connect admin pool");
    raw_sql(&format!("CREATE SCHEMA \"{}\"", schema))
        .execute(&admin_pool)
        .await
        .expect("create schema");
    raw_sql(&format!(
        r#"
        DO $$
        BEGIN
            CREATE ROLE {role} NOLOGIN;
        EXCEPTION WHEN duplicate_object OR unique_violation THEN
            NULL;
        END
        $$;
        DO $$
        BEGIN
            GRANT {role} TO CURRENT_USER;
        EXCEPTION WHEN OTHERS THEN
            NULL;
        END
        $$;
        "#,
        role = APP_ROLE
    ))
    .execute(&admin_pool)
    .await
    .expect("ensure app role");
    admin_pool.close().await;

    let options = admin_options.options([("search_path", schema.as_str())]);
    let pool = PoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .expect("connect test pool");
    migrate(&pool).await.expect("migrate");
    let role = AppRole::parse(APP_ROLE).expect("valid role");
    grant_app_role(&pool, &role).await.expect("grant app role");
    pool
}

pub fn executor(pool: &PgPool) -> RlsExecutor {
    executor_with(pool, ExecutorOptions::default())
}

pub fn executor_with(pool: &PgPool, options: ExecutorOptions) -> RlsExecutor {
    let options = ExecutorOptions {
        app_role: Some(APP_ROLE.to_string()),
        ..options
    };
    RlsExecutor::new(pool.clone(), options).expect("executor")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedContext {
    pub user_id: Option<String>,
    pub is_admin: Option<String>,
    pub role_name: String,
}

impl ObservedContext {
    /// True when no scope is active: the settings are unset or reset to
    /// empty and the connection runs as its login role.
    pub fn is_clear(&self) -> bool {
        self.user_id.as_deref().unwrap_or("").is_empty()
            && self.is_admin.as_deref().unwrap_or("").is_empty()
            && self.role_name != APP_ROLE
    }
}

fn decode_context(row: &sqlx_postgres::PgRow) -> Result<ObservedContext, sqlx_core::Error> {
    Ok(ObservedContext {
        user_id: row.try_get("user_id")?,
        is_admin: row.try_get("is_admin")?,
        role_name: row.try_get("role_name")?,
    })
}

pub async fn read_context(tx: &mut ScopedTx<'_>) -> Result<ObservedContext, sqlx_core::Error> {
    let row = tx.fetch_one(query::<Postgres>(CONTEXT_SQL)).await?;
    decode_context(&row)
}

/// Context of whatever pooled connection is handed out next, outside any
/// scoped transaction.
pub async fn read_pool_context(pool: &PgPool) -> ObservedContext {
    let row = query::<Postgres>(CONTEXT_SQL)
        .fetch_one(pool)
        .await
        .expect("read pool context");
    decode_context(&row).expect("decode context")
}

pub async fn create_users(executor: &RlsExecutor, ids: &[&str]) {
    let users: Vec<User> = ids
        .iter()
        .map(|id| User {
            id: Uuid::parse_str(id).expect("valid uuid"),
            email: format!("{id}@test.local"),
            name: format!("User {id}"),
            role: UserRole::User,
            created_at: chrono::Utc::now(),
        })
        .collect();
    executor
        .run_as_admin(move |tx| {
            Box::pin(async move {
                for user in &users {
                    UserRepo::new(tx).upsert(user).await?;
                }
                Ok::<_, portal_db::repo::RepoError>(())
            })
        })
        .await
        .expect("create users");
}

/// Creates a personal layer for `owner` holding one card titled `title`.
pub async fn create_layer_with_card(executor: &RlsExecutor, owner: &str, title: &str) -> (Uuid, Uuid) {
    let title = title.to_string();
    executor
        .run_as_user(owner, move |tx| {
            Box::pin(async move {
                let layer_id = LayerRepo::new(tx).create(&format!("{title} layer")).await?;
                let card_id = CardRepo::new(tx)
                    .create_in_layer(&NewCard::new(title.as_str(), 1900), layer_id)
                    .await?;
                Ok::<_, portal_db::repo::RepoError>((layer_id, card_id))
            })
        })
        .await
        .expect("create layer with card")
}

/// Seeds one card for each of A, B and C.
pub async fn seed_three_owners(executor: &RlsExecutor) -> [(Uuid, Uuid); 3] {
    create_users(executor, &[USER_A, USER_B, USER_C]).await;
    [
        create_layer_with_card(executor, USER_A, "Card A").await,
        create_layer_with_card(executor, USER_B, "Card B").await,
        create_layer_with_card(executor, USER_C, "Card C").await,
    ]
}

pub async fn admin_card_count(executor: &RlsExecutor) -> i64 {
    executor
        .run_as_admin(|tx| Box::pin(async move { CardRepo::new(tx).count().await }))
        .await
        .expect("admin count")
}
