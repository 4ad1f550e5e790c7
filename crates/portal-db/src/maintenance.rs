use chrono::{DateTime, Utc};
use sqlx_core::query::query;
use sqlx_core::raw_sql::raw_sql;
use sqlx_core::row::Row;
use sqlx_postgres::Postgres;

use crate::rls::AppRole;
use crate::PgPool;

#[derive(Debug, Clone)]
pub struct DbHealth {
    pub server_time: DateTime<Utc>,
}

/// Round trip that needs no tables; used by the health command.
pub async fn health_check(pool: &PgPool) -> Result<DbHealth, sqlx_core::Error> {
    let row = query::<Postgres>("SELECT NOW() AS server_time")
        .fetch_one(pool)
        .await?;
    Ok(DbHealth {
        server_time: row.try_get("server_time")?,
    })
}

/// Grants the least-privilege role what scoped transactions need on the
/// current schema. The role itself, and membership of the connecting user
/// in it, are provisioned outside the application.
pub async fn grant_app_role(pool: &PgPool, role: &AppRole) -> Result<(), sqlx_core::Error> {
    let schema: Option<String> = query::<Postgres>("SELECT current_schema()")
        .fetch_one(pool)
        .await?
        .try_get(0)?;
    let Some(schema) = schema else {
        return Err(sqlx_core::Error::Configuration(
            "search_path has no current schema".into(),
        ));
    };
    let schema = quote_ident(&schema);
    let role = role.quoted();
    let batch = format!(
        "GRANT USAGE ON SCHEMA {schema} TO {role};\n\
         GRANT SELECT, INSERT, UPDATE, DELETE ON ALL TABLES IN SCHEMA {schema} TO {role};\n\
         GRANT EXECUTE ON ALL FUNCTIONS IN SCHEMA {schema} TO {role}"
    );
    raw_sql(&batch).execute(pool).await?;
    tracing::info!(event = "app_role_granted", role = role.as_str(), schema = schema.as_str());
    Ok(())
}

fn quote_ident(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
