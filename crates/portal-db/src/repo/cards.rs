use super::prelude::*;
use portal_core::{Card, CardWithLayer, NewCard};

const CARD_COLUMNS: &str = r#"
    c.id,
    c.title,
    c.summary,
    c.article,
    c.start_year,
    c.start_month,
    c.start_day,
    c.end_year,
    c.end_month,
    c.end_day,
    c.created_at,
    c.updated_at
"#;

pub struct CardRepo<'a, 't> {
    tx: &'a mut ScopedTx<'t>,
}

impl<'a, 't> CardRepo<'a, 't> {
    pub fn new(tx: &'a mut ScopedTx<'t>) -> Self {
        Self { tx }
    }

    /// Cards on layers the acting user belongs to, with the layer and the
    /// user's role on it. An empty `layer_ids` means every such layer. A card
    /// on two of the user's layers appears once per layer.
    pub async fn list_accessible(
        &mut self,
        layer_ids: &[Uuid],
    ) -> Result<Vec<CardWithLayer>, RepoError> {
        let cards = self
            .tx
            .fetch_all_as(query_as!(
                CardWithLayer,
                r#"
                SELECT
                    c.id,
                    c.title,
                    c.summary,
                    c.start_year,
                    c.start_month,
                    c.start_day,
                    c.end_year,
                    c.end_month,
                    c.end_day,
                    c.created_at,
                    l.id AS layer_id,
                    l.title AS layer_title,
                    ul.role::text AS role
                FROM card c
                JOIN card_layer cl ON cl.card_id = c.id
                JOIN layer l ON l.id = cl.layer_id
                JOIN user_layer ul ON ul.layer_id = l.id
                WHERE ul.user_id = current_app_user_id()
                  AND (cardinality($1::uuid[]) = 0 OR l.id = ANY($1::uuid[]))
                ORDER BY
                    c.start_year,
                    c.start_month NULLS FIRST,
                    c.start_day NULLS FIRST,
                    c.title,
                    l.title
                "#,
                layer_ids.to_vec()
            ))
            .await?;
        Ok(cards)
    }

    /// Every card visible in the current scope.
    pub async fn list_all(&mut self) -> Result<Vec<Card>, RepoError> {
        let sql = format!(
            "SELECT {CARD_COLUMNS} FROM card c \
             ORDER BY c.start_year, c.start_month NULLS FIRST, c.start_day NULLS FIRST, c.title"
        );
        let cards = self.tx.fetch_all_as(query_as!(Card, &sql)).await?;
        Ok(cards)
    }

    pub async fn count(&mut self) -> Result<i64, RepoError> {
        let row = self
            .tx
            .fetch_one(query!("SELECT count(*) AS total FROM card"))
            .await?;
        Ok(row.try_get("total")?)
    }

    pub async fn get(&mut self, id: Uuid) -> Result<Option<Card>, RepoError> {
        let sql = format!("SELECT {CARD_COLUMNS} FROM card c WHERE c.id = $1");
        let card = self.tx.fetch_optional_as(query_as!(Card, &sql, id)).await?;
        Ok(card)
    }

    /// Inserts the card and attaches it to `layer_id`. The attach step is
    /// what the policies check against the caller's role on the layer, so a
    /// guest gets [`RepoError::Forbidden`] and nothing is written.
    pub async fn create_in_layer(
        &mut self,
        card: &NewCard,
        layer_id: Uuid,
    ) -> Result<Uuid, RepoError> {
        card.validate()?;
        let id = Uuid::now_v7();
        self.tx
            .execute(query!(
                r#"
                INSERT INTO card (
                    id,
                    title,
                    summary,
                    article,
                    start_year,
                    start_month,
                    start_day,
                    end_year,
                    end_month,
                    end_day
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
                id,
                card.title.trim(),
                card.summary.as_deref(),
                card.article.as_deref(),
                card.start_year,
                card.start_month,
                card.start_day,
                card.end_year,
                card.end_month,
                card.end_day
            ))
            .await?;
        self.attach(id, layer_id).await?;
        Ok(id)
    }

    pub async fn attach(&mut self, card_id: Uuid, layer_id: Uuid) -> Result<(), RepoError> {
        self.tx
            .execute(query!(
                r#"
                INSERT INTO card_layer (card_id, layer_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
                card_id,
                layer_id
            ))
            .await?;
        Ok(())
    }

    /// Returns false when the card does not exist or the scope may not
    /// delete it; the policies filter rows silently on DELETE.
    pub async fn delete(&mut self, id: Uuid) -> Result<bool, RepoError> {
        let result = self
            .tx
            .execute(query!("DELETE FROM card WHERE id = $1", id))
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
