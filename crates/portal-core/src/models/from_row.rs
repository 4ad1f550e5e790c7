#[cfg(feature = "postgres")]
use sqlx_core::from_row::FromRow;
#[cfg(feature = "postgres")]
use sqlx_core::row::Row;
#[cfg(feature = "postgres")]
use sqlx_postgres::PgRow;

#[cfg(feature = "postgres")]
use super::*;

// Enum columns are selected as `::text` so rows decode without a custom
// Postgres type mapping.
#[cfg(feature = "postgres")]
fn parse_enum<T>(value: &str) -> Result<T, sqlx_core::Error>
where
    T: std::str::FromStr<Err = EnumParseError>,
{
    value
        .parse::<T>()
        .map_err(|err| sqlx_core::Error::Decode(Box::new(err)))
}

macro_rules! impl_from_row {
    ($ty:ty, $row:ident => $body:block) => {
        #[cfg(feature = "postgres")]
        impl FromRow<'_, PgRow> for $ty {
            fn from_row($row: &PgRow) -> Result<Self, sqlx_core::Error> {
                $body
            }
        }
    };
}

impl_from_row!(User, row => {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            role: parse_enum(&role)?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(Layer, row => {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
);

impl_from_row!(LayerWithRole, row => {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            role: parse_enum(&role)?,
            created_at: row.try_get("created_at")?,
        })
    }
);

impl_from_row!(Card, row => {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            summary: row.try_get("summary")?,
            article: row.try_get("article")?,
            start_year: row.try_get("start_year")?,
            start_month: row.try_get("start_month")?,
            start_day: row.try_get("start_day")?,
            end_year: row.try_get("end_year")?,
            end_month: row.try_get("end_month")?,
            end_day: row.try_get("end_day")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
);

impl_from_row!(CardWithLayer, row => {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            summary: row.try_get("summary")?,
            start_year: row.try_get("start_year")?,
            start_month: row.try_get("start_month")?,
            start_day: row.try_get("start_day")?,
            end_year: row.try_get("end_year")?,
            end_month: row.try_get("end_month")?,
            end_day: row.try_get("end_day")?,
            created_at: row.try_get("created_at")?,
            layer_id: row.try_get("layer_id")?,
            layer_title: row.try_get("layer_title")?,
            role: parse_enum(&role)?,
        })
    }
);
