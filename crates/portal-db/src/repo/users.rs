use super::prelude::*;
use portal_core::User;

pub struct UserRepo<'a, 't> {
    tx: &'a mut ScopedTx<'t>,
}

impl<'a, 't> UserRepo<'a, 't> {
    pub fn new(tx: &'a mut ScopedTx<'t>) -> Self {
        Self { tx }
    }

    /// Inserts the user unless the id already exists. Only an admin scope
    /// passes the insert policy.
    pub async fn upsert(&mut self, user: &User) -> Result<bool, RepoError> {
        let result = self
            .tx
            .execute(query!(
                r#"
                INSERT INTO users (id, email, name, role, created_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (id) DO NOTHING
                "#,
                user.id,
                user.email.as_str(),
                user.name.as_str(),
                user.role.as_str(),
                user.created_at
            ))
            .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn get(&mut self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = self
            .tx
            .fetch_optional_as(query_as!(
                User,
                r#"
                SELECT id, email, name, role, created_at
                FROM users
                WHERE id = $1
                "#,
                id
            ))
            .await?;
        Ok(user)
    }
}
