//! Queries that only ever run on a [`ScopedTx`](crate::rls::ScopedTx), so
//! every read and write is filtered by the row-security policies.

macro_rules! query {
    ($sql:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut q = sqlx_core::query::query::<sqlx_postgres::Postgres>($sql);
        $(q = q.bind($arg);)*
        q
    }};
}

macro_rules! query_as {
    ($ty:ty, $sql:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut q = sqlx_core::query_as::query_as::<sqlx_postgres::Postgres, $ty>($sql);
        $(q = q.bind($arg);)*
        q
    }};
}

pub(crate) mod prelude {
    pub(crate) use super::RepoError;
    pub(crate) use crate::rls::ScopedTx;
    pub(crate) use sqlx_core::row::Row;
    pub(crate) use uuid::Uuid;
}

mod cards;
mod layers;
mod users;

pub use cards::CardRepo;
pub use layers::LayerRepo;
pub use users::UserRepo;

use portal_core::CardValidationError;
use thiserror::Error;

/// Postgres reports a row-security `WITH CHECK` violation as
/// insufficient_privilege.
const SQLSTATE_INSUFFICIENT_PRIVILEGE: &str = "42501";

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("invalid card: {0}")]
    InvalidCard(#[from] CardValidationError),
    #[error("invalid layer title")]
    InvalidLayerTitle,
    #[error("operation requires a user scope")]
    UserScopeRequired,
    #[error("forbidden by row-level security")]
    Forbidden,
    #[error("db error: {0}")]
    Db(#[source] sqlx_core::Error),
}

fn map_db_error(err: sqlx_core::Error) -> RepoError {
    let denied = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == SQLSTATE_INSUFFICIENT_PRIVILEGE);
    if denied {
        RepoError::Forbidden
    } else {
        RepoError::Db(err)
    }
}

impl From<sqlx_core::Error> for RepoError {
    fn from(err: sqlx_core::Error) -> Self {
        map_db_error(err)
    }
}
