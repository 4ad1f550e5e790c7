//! Command bodies. Each prints JSON on stdout and returns a stable error code.

use portal_db::repo::{CardRepo, RepoError};
use portal_db::seed as fixtures;
use portal_db::{AppRole, PgPool, RlsError, RlsExecutor};
use serde_json::json;

use crate::cli::{CardsArgs, GrantRoleArgs};
use crate::settings::Settings;

pub type CommandResult = Result<(), String>;

pub async fn migrate(pool: &PgPool) -> CommandResult {
    portal_db::migrate(pool).await.map_err(|err| {
        tracing::error!(event = "migration_failed", error = %err);
        "migration_failed".to_string()
    })?;
    tracing::info!(event = "migrations_applied", "Migrations applied");
    print_json(&json!({ "status": "migrated" }))
}

pub async fn grant_role(settings: &Settings, pool: &PgPool, args: &GrantRoleArgs) -> CommandResult {
    let Some(name) = args
        .role
        .clone()
        .or_else(|| settings.config.db.app_role.clone())
    else {
        return Err("app_role_missing".to_string());
    };
    let role = AppRole::parse(&name).map_err(|err| {
        tracing::error!(event = "app_role_invalid", error = %err);
        "app_role_invalid".to_string()
    })?;
    portal_db::grant_app_role(pool, &role).await.map_err(|err| {
        tracing::error!(event = "app_role_grant_failed", role = role.as_str(), error = %err);
        "app_role_grant_failed".to_string()
    })?;
    print_json(&json!({ "status": "granted", "role": role.as_str() }))
}

pub async fn seed(executor: &RlsExecutor) -> CommandResult {
    let summary = fixtures::seed(executor).await.map_err(|err| {
        tracing::error!(event = "seed_failed", error = %err);
        rls_error_code(&err)
    })?;
    print_json(&json!({
        "users_created": summary.users_created,
        "layers_created": summary.layers_created,
        "cards_created": summary.cards_created,
    }))
}

pub async fn health(pool: &PgPool) -> CommandResult {
    let health = portal_db::health_check(pool).await.map_err(|err| {
        tracing::error!(event = "health_check_failed", error = %err);
        "db_unavailable".to_string()
    })?;
    print_json(&json!({
        "status": "ok",
        "server_time": health.server_time.to_rfc3339(),
    }))
}

pub async fn cards(executor: &RlsExecutor, args: &CardsArgs) -> CommandResult {
    let output = if args.admin {
        if !args.layers.is_empty() {
            tracing::warn!(event = "layer_filter_ignored", "--layer applies to user scope only");
        }
        let cards = executor
            .run_as_admin(|tx| Box::pin(async move { CardRepo::new(tx).list_all().await }))
            .await
            .map_err(|err| report_rls_error("cards_list_failed", &err))?;
        serde_json::to_value(cards)
    } else {
        let user = args.user.as_deref().unwrap_or_default();
        let layers = args.layers.clone();
        let cards = executor
            .run_as_user(user, move |tx| {
                Box::pin(async move { CardRepo::new(tx).list_accessible(&layers).await })
            })
            .await
            .map_err(|err| report_rls_error("cards_list_failed", &err))?;
        serde_json::to_value(cards)
    };
    let output = output.map_err(|err| {
        tracing::error!(event = "output_encode_failed", error = %err);
        "output_encode_failed".to_string()
    })?;
    print_json(&output)
}

fn report_rls_error(event: &'static str, err: &RlsError<RepoError>) -> String {
    if err.is_authorization_failure() {
        tracing::warn!(event, error = %err);
    } else {
        tracing::error!(event, error = %err);
    }
    rls_error_code(err)
}

pub(crate) fn rls_error_code(err: &RlsError<RepoError>) -> String {
    let code = match err {
        RlsError::InvalidIdentity => "unauthorized",
        RlsError::TransactionAcquisitionFailed(_) => "db_unavailable",
        RlsError::ContextFailed(_) => "session_context_failed",
        RlsError::CommitFailed(_) => "commit_failed",
        RlsError::TimedOut => "timed_out",
        RlsError::OperationFailed(RepoError::Forbidden) => "forbidden",
        RlsError::OperationFailed(RepoError::InvalidCard(_) | RepoError::InvalidLayerTitle) => {
            "invalid_input"
        }
        RlsError::OperationFailed(RepoError::UserScopeRequired) => "user_scope_required",
        RlsError::OperationFailed(RepoError::Db(_)) => "db_error",
    };
    code.to_string()
}

fn print_json(value: &serde_json::Value) -> CommandResult {
    let text = serde_json::to_string_pretty(value).map_err(|err| {
        tracing::error!(event = "output_encode_failed", error = %err);
        "output_encode_failed".to_string()
    })?;
    println!("{text}");
    Ok(())
}
