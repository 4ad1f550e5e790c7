//! Transactions scoped to an acting identity for Postgres row-level security.
//!
//! Every call opens its own transaction, writes the session context with
//! `SET LOCAL` (optionally switching to a least-privilege role first), runs
//! the caller's operation and commits or rolls back. Because nothing is set
//! at session level, a pooled connection carries no context once the
//! transaction ends, whichever way it ends.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use portal_core::{ActingIdentity, UserId};
use sqlx_core::raw_sql::raw_sql;
use sqlx_core::transaction::Transaction;
use sqlx_postgres::Postgres;

use crate::PgPool;

mod context;
mod error;
mod handle;

pub use context::{AppRole, SessionContext, TxIsolation, IS_ADMIN_SETTING, USER_ID_SETTING};
pub use error::{ConfigError, RlsError};
pub use handle::ScopedTx;

/// Future returned by a scoped operation; borrows the handle for `'c`.
pub type OperationFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    pub app_role: Option<String>,
    pub isolation: TxIsolation,
    pub operation_timeout: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    AcquiringTransaction,
    SettingContext,
    RunningOperation,
    Committing,
    RollingBack,
    Closed,
}

impl TxState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::AcquiringTransaction => "acquiring_transaction",
            Self::SettingContext => "setting_context",
            Self::RunningOperation => "running_operation",
            Self::Committing => "committing",
            Self::RollingBack => "rolling_back",
            Self::Closed => "closed",
        }
    }
}

fn trace_state(context: &SessionContext, state: TxState) {
    tracing::debug!(
        event = "rls_tx_state",
        scope = context.identity().kind(),
        state = state.as_str()
    );
}

#[derive(Debug, Clone)]
pub struct RlsExecutor {
    pool: PgPool,
    role: Option<AppRole>,
    isolation: TxIsolation,
    operation_timeout: Option<Duration>,
}

impl RlsExecutor {
    pub fn new(pool: PgPool, options: ExecutorOptions) -> Result<Self, ConfigError> {
        let role = options
            .app_role
            .as_deref()
            .map(AppRole::parse)
            .transpose()?;
        Ok(Self {
            pool,
            role,
            isolation: options.isolation,
            operation_timeout: options.operation_timeout,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn app_role(&self) -> Option<&AppRole> {
        self.role.as_ref()
    }

    /// Runs `operation` with `app.user_id` set to `user_id`. Malformed ids
    /// fail with [`RlsError::InvalidIdentity`] before the pool is touched.
    pub async fn run_as_user<T, E, F>(&self, user_id: &str, operation: F) -> Result<T, RlsError<E>>
    where
        F: for<'c> FnOnce(&'c mut ScopedTx<'_>) -> OperationFuture<'c, T, E> + Send,
        T: Send,
        E: Send,
    {
        let user_id = match UserId::parse(user_id) {
            Ok(user_id) => user_id,
            Err(_) => {
                tracing::warn!(event = "rls_identity_rejected", "Malformed user id");
                return Err(RlsError::InvalidIdentity);
            }
        };
        self.run(ActingIdentity::User(user_id), operation).await
    }

    pub async fn run_as_user_id<T, E, F>(
        &self,
        user_id: UserId,
        operation: F,
    ) -> Result<T, RlsError<E>>
    where
        F: for<'c> FnOnce(&'c mut ScopedTx<'_>) -> OperationFuture<'c, T, E> + Send,
        T: Send,
        E: Send,
    {
        self.run(ActingIdentity::User(user_id), operation).await
    }

    /// Runs `operation` with `app.is_admin` set. The executor does not check
    /// that the caller is allowed to do this.
    pub async fn run_as_admin<T, E, F>(&self, operation: F) -> Result<T, RlsError<E>>
    where
        F: for<'c> FnOnce(&'c mut ScopedTx<'_>) -> OperationFuture<'c, T, E> + Send,
        T: Send,
        E: Send,
    {
        self.run(ActingIdentity::Admin, operation).await
    }

    pub async fn run<T, E, F>(
        &self,
        identity: ActingIdentity,
        operation: F,
    ) -> Result<T, RlsError<E>>
    where
        F: for<'c> FnOnce(&'c mut ScopedTx<'_>) -> OperationFuture<'c, T, E> + Send,
        T: Send,
        E: Send,
    {
        let context = SessionContext::new(identity);
        if let Some(user_id) = identity.user_id() {
            tracing::debug!(event = "rls_scope_open", user_id = %user_id);
        } else {
            tracing::debug!(event = "rls_scope_open", admin = true);
        }

        trace_state(&context, TxState::AcquiringTransaction);
        let mut tx = match self.pool.begin().await {
            Ok(tx) => tx,
            Err(err) => {
                tracing::error!(event = "rls_begin_failed", error = %err, "DB begin failed");
                return Err(RlsError::TransactionAcquisitionFailed(err));
            }
        };

        trace_state(&context, TxState::SettingContext);
        let batch = context.render(self.role.as_ref(), self.isolation);
        if let Err(err) = raw_sql(&batch).execute(&mut *tx).await {
            tracing::error!(event = "rls_context_failed", error = %err, "Session context failed");
            rollback(&context, tx).await;
            return Err(RlsError::ContextFailed(err));
        }

        trace_state(&context, TxState::RunningOperation);
        let outcome = {
            let mut scoped = ScopedTx::new(&mut *tx, identity);
            let pending = operation(&mut scoped);
            match self.operation_timeout {
                Some(limit) => tokio::time::timeout(limit, pending).await.ok(),
                None => Some(pending.await),
            }
        };

        match outcome {
            Some(Ok(value)) => {
                trace_state(&context, TxState::Committing);
                if let Err(err) = tx.commit().await {
                    tracing::error!(event = "rls_commit_failed", error = %err, "DB commit failed");
                    return Err(RlsError::CommitFailed(err));
                }
                trace_state(&context, TxState::Closed);
                Ok(value)
            }
            Some(Err(err)) => {
                rollback(&context, tx).await;
                Err(RlsError::OperationFailed(err))
            }
            None => {
                tracing::warn!(
                    event = "rls_operation_timeout",
                    scope = identity.kind(),
                    "Scoped operation timed out"
                );
                rollback(&context, tx).await;
                Err(RlsError::TimedOut)
            }
        }
    }
}

async fn rollback(context: &SessionContext, tx: Transaction<'static, Postgres>) {
    trace_state(context, TxState::RollingBack);
    if let Err(err) = tx.rollback().await {
        tracing::error!(event = "rls_rollback_failed", error = %err, "DB rollback failed");
    }
    trace_state(context, TxState::Closed);
}
