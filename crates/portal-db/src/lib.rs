#![allow(clippy::pedantic)]
#![allow(clippy::nursery)]
#![deny(clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_raw_string_hashes)]
#![allow(clippy::uninlined_format_args)]

extern crate sqlx_core as sqlx;

use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::{PgConnectOptions, Postgres};
use std::time::Duration;

pub mod maintenance;
pub mod repo;
pub mod rls;
pub mod seed;

pub use maintenance::{grant_app_role, health_check, DbHealth};
pub use rls::{
    AppRole, ConfigError, ExecutorOptions, OperationFuture, RlsError, RlsExecutor, ScopedTx,
    SessionContext, TxIsolation,
};

pub type PgPool = Pool<Postgres>;

pub const DEFAULT_POOL_MAX: u32 = 10;
const APPLICATION_NAME: &str = "portal";
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect_postgres(url: &str) -> Result<PgPool, sqlx_core::Error> {
    connect_postgres_with_max(url, DEFAULT_POOL_MAX).await
}

/// Opens a pool tagged with the `portal` application name. Context for row
/// security is never set on the session here; see [`RlsExecutor`].
pub async fn connect_postgres_with_max(
    url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx_core::Error> {
    let connect_options = url
        .parse::<PgConnectOptions>()?
        .application_name(APPLICATION_NAME);
    let pool = PoolOptions::<Postgres>::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(connect_options)
        .await?;
    tracing::debug!(event = "db_pool_ready", max_connections, "Postgres pool ready");
    Ok(pool)
}

/// Applies the bundled schema and row-security policies.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx_core::migrate::MigrateError> {
    sqlx_macros::migrate!("./migrations").run(pool).await
}
