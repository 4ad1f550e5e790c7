use super::prelude::*;
use portal_core::{Layer, LayerRole, LayerWithRole, UserId, LAYER_TITLE_MAX};

pub struct LayerRepo<'a, 't> {
    tx: &'a mut ScopedTx<'t>,
}

impl<'a, 't> LayerRepo<'a, 't> {
    pub fn new(tx: &'a mut ScopedTx<'t>) -> Self {
        Self { tx }
    }

    /// Layers the acting user belongs to, with their role on each.
    pub async fn list(&mut self) -> Result<Vec<LayerWithRole>, RepoError> {
        let layers = self
            .tx
            .fetch_all_as(query_as!(
                LayerWithRole,
                r#"
                SELECT l.id, l.title, ul.role::text AS role, l.created_at
                FROM layer l
                JOIN user_layer ul ON ul.layer_id = l.id
                WHERE ul.user_id = current_app_user_id()
                ORDER BY l.title, l.id
                "#
            ))
            .await?;
        Ok(layers)
    }

    pub async fn list_all(&mut self) -> Result<Vec<Layer>, RepoError> {
        let layers = self
            .tx
            .fetch_all_as(query_as!(
                Layer,
                r#"
                SELECT id, title, created_at, updated_at
                FROM layer
                ORDER BY title, id
                "#
            ))
            .await?;
        Ok(layers)
    }

    /// Creates a layer owned by the acting user. Layer and owner membership
    /// are written by `app_create_layer`; user scopes cannot insert either
    /// row directly.
    pub async fn create(&mut self, title: &str) -> Result<Uuid, RepoError> {
        if self.tx.user_id().is_none() {
            return Err(RepoError::UserScopeRequired);
        }
        let title = title.trim();
        if title.is_empty() || title.chars().count() > LAYER_TITLE_MAX {
            return Err(RepoError::InvalidLayerTitle);
        }
        let row = self
            .tx
            .fetch_one(query!(
                "SELECT app_create_layer($1, $2) AS id",
                Uuid::now_v7(),
                title
            ))
            .await?;
        Ok(row.try_get("id")?)
    }

    /// Adds `user_id` to the layer or changes their role. Only owners pass
    /// the policies.
    pub async fn share(
        &mut self,
        layer_id: Uuid,
        user_id: UserId,
        role: LayerRole,
    ) -> Result<(), RepoError> {
        self.tx
            .execute(query!(
                r#"
                INSERT INTO user_layer (user_id, layer_id, role)
                VALUES ($1, $2, $3::layer_role)
                ON CONFLICT (user_id, layer_id)
                DO UPDATE SET role = EXCLUDED.role, updated_at = now()
                "#,
                user_id.as_uuid(),
                layer_id,
                role.as_str()
            ))
            .await?;
        Ok(())
    }

    /// The acting user's role on the layer, `None` when not a member.
    pub async fn role_of(&mut self, layer_id: Uuid) -> Result<Option<LayerRole>, RepoError> {
        let row = self
            .tx
            .fetch_one(query!(
                "SELECT app_layer_role($1)::text AS role",
                layer_id
            ))
            .await?;
        let role: Option<String> = row.try_get("role")?;
        match role {
            Some(value) => value
                .parse::<LayerRole>()
                .map(Some)
                .map_err(|err| RepoError::Db(sqlx_core::Error::Decode(Box::new(err)))),
            None => Ok(None),
        }
    }
}
