use portal_core::{ActingIdentity, UserId};
use sqlx_core::from_row::FromRow;
use sqlx_core::query::Query;
use sqlx_core::query_as::QueryAs;
use sqlx_postgres::{PgArguments, PgConnection, PgQueryResult, PgRow, Postgres};

/// Query access to a scoped transaction. Commit and rollback stay with the
/// executor that opened it.
pub struct ScopedTx<'t> {
    conn: &'t mut PgConnection,
    identity: ActingIdentity,
}

impl<'t> ScopedTx<'t> {
    pub(crate) fn new(conn: &'t mut PgConnection, identity: ActingIdentity) -> Self {
        Self { conn, identity }
    }

    pub fn identity(&self) -> ActingIdentity {
        self.identity
    }

    /// The acting user, or `None` inside an admin scope.
    pub fn user_id(&self) -> Option<UserId> {
        self.identity.user_id()
    }

    pub async fn execute<'q>(
        &mut self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<PgQueryResult, sqlx_core::Error> {
        query.execute(&mut *self.conn).await
    }

    pub async fn fetch_all<'q>(
        &mut self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<Vec<PgRow>, sqlx_core::Error> {
        query.fetch_all(&mut *self.conn).await
    }

    pub async fn fetch_one<'q>(
        &mut self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<PgRow, sqlx_core::Error> {
        query.fetch_one(&mut *self.conn).await
    }

    pub async fn fetch_optional<'q>(
        &mut self,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<Option<PgRow>, sqlx_core::Error> {
        query.fetch_optional(&mut *self.conn).await
    }

    pub async fn fetch_all_as<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Vec<O>, sqlx_core::Error>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        query.fetch_all(&mut *self.conn).await
    }

    pub async fn fetch_one_as<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<O, sqlx_core::Error>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        query.fetch_one(&mut *self.conn).await
    }

    pub async fn fetch_optional_as<'q, O>(
        &mut self,
        query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> Result<Option<O>, sqlx_core::Error>
    where
        O: Send + Unpin + for<'r> FromRow<'r, PgRow>,
    {
        query.fetch_optional(&mut *self.conn).await
    }
}
