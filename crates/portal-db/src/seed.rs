//! Idempotent fixture data: four users, a personal layer each for Alice
//! (15 cards) and Bob (10 cards). Carol and the admin own nothing.

use chrono::Utc;
use portal_core::{User, UserRole};
use sqlx_core::query::query;
use sqlx_postgres::Postgres;
use uuid::Uuid;

use crate::repo::{RepoError, UserRepo};
use crate::rls::{RlsError, RlsExecutor, ScopedTx};

#[derive(Debug, Clone, Copy)]
pub struct FixtureUser {
    pub id: Uuid,
    pub email: &'static str,
    pub name: &'static str,
    pub role: UserRole,
    pub layer: Option<FixtureLayer>,
}

#[derive(Debug, Clone, Copy)]
pub struct FixtureLayer {
    pub id: Uuid,
    pub title: &'static str,
    pub cards: usize,
}

pub const ALICE_ID: Uuid = Uuid::from_u128(0xaaaaaaaa_aaaa_aaaa_aaaa_aaaaaaaaaaaa);
pub const BOB_ID: Uuid = Uuid::from_u128(0xbbbbbbbb_bbbb_bbbb_bbbb_bbbbbbbbbbbb);
pub const CAROL_ID: Uuid = Uuid::from_u128(0xcccccccc_cccc_cccc_cccc_cccccccccccc);
pub const ADMIN_ID: Uuid = Uuid::from_u128(0xdddddddd_dddd_dddd_dddd_dddddddddddd);

pub const FIXTURE_USERS: [FixtureUser; 4] = [
    FixtureUser {
        id: ALICE_ID,
        email: "alice@test.local",
        name: "Alice Test",
        role: UserRole::User,
        layer: Some(FixtureLayer {
            id: Uuid::from_u128(0x1a000000_0000_4000_8000_000000000000),
            title: "Alice's Timeline",
            cards: 15,
        }),
    },
    FixtureUser {
        id: BOB_ID,
        email: "bob@test.local",
        name: "Bob Test",
        role: UserRole::User,
        layer: Some(FixtureLayer {
            id: Uuid::from_u128(0x1b000000_0000_4000_8000_000000000000),
            title: "Bob's Timeline",
            cards: 10,
        }),
    },
    FixtureUser {
        id: CAROL_ID,
        email: "carol@test.local",
        name: "Carol Test",
        role: UserRole::User,
        layer: None,
    },
    FixtureUser {
        id: ADMIN_ID,
        email: "admin@test.local",
        name: "Admin Test",
        role: UserRole::Admin,
        layer: None,
    },
];

const EVENTS: [(&str, i32); 25] = [
    ("Sumerian cuneiform appears", -3200),
    ("Great Pyramid of Giza completed", -2560),
    ("Code of Hammurabi", -1754),
    ("Reign of Ramesses II begins", -1279),
    ("First Olympic Games", -776),
    ("Founding of Rome", -753),
    ("Battle of Marathon", -490),
    ("Death of Alexander the Great", -323),
    ("Qin unifies China", -221),
    ("Assassination of Julius Caesar", -44),
    ("Eruption of Vesuvius", 79),
    ("Fall of the Western Roman Empire", 476),
    ("Hijra to Medina", 622),
    ("Coronation of Charlemagne", 800),
    ("Battle of Hastings", 1066),
    ("Magna Carta sealed", 1215),
    ("Black Death reaches Europe", 1347),
    ("Fall of Constantinople", 1453),
    ("Gutenberg Bible printed", 1455),
    ("Columbus reaches the Americas", 1492),
    ("Ninety-five Theses", 1517),
    ("Peace of Westphalia", 1648),
    ("Storming of the Bastille", 1789),
    ("Meiji Restoration", 1868),
    ("Moon landing", 1969),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub users_created: usize,
    pub layers_created: usize,
    pub cards_created: usize,
}

/// Card ids follow the layer id so reseeding finds the same rows.
pub fn fixture_card_id(layer: &FixtureLayer, index: usize) -> Uuid {
    Uuid::from_u128(layer.id.as_u128() + index as u128 + 1)
}

pub async fn seed(executor: &RlsExecutor) -> Result<SeedSummary, RlsError<RepoError>> {
    let summary = executor
        .run_as_admin(|tx| Box::pin(async move { seed_fixtures(tx).await }))
        .await?;
    tracing::info!(
        event = "seed_applied",
        users_created = summary.users_created,
        layers_created = summary.layers_created,
        cards_created = summary.cards_created,
        "Fixture data seeded"
    );
    Ok(summary)
}

async fn seed_fixtures(tx: &mut ScopedTx<'_>) -> Result<SeedSummary, RepoError> {
    let now = Utc::now();
    let mut summary = SeedSummary::default();
    let mut events = EVENTS.iter().cycle();

    for fixture in &FIXTURE_USERS {
        let user = User {
            id: fixture.id,
            email: fixture.email.to_string(),
            name: fixture.name.to_string(),
            role: fixture.role,
            created_at: now,
        };
        if UserRepo::new(tx).upsert(&user).await? {
            summary.users_created += 1;
        }

        let Some(layer) = fixture.layer else {
            continue;
        };
        let inserted = tx
            .execute(
                query::<Postgres>(
                    "INSERT INTO layer (id, title) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
                )
                .bind(layer.id)
                .bind(layer.title),
            )
            .await?;
        summary.layers_created += inserted.rows_affected() as usize;
        tx.execute(
            query::<Postgres>(
                r#"
                INSERT INTO user_layer (user_id, layer_id, role)
                VALUES ($1, $2, 'owner')
                ON CONFLICT (user_id, layer_id) DO NOTHING
                "#,
            )
            .bind(fixture.id)
            .bind(layer.id),
        )
        .await?;

        for index in 0..layer.cards {
            let (title, year) = events.next().copied().unwrap_or(("Untitled", 0));
            let card_id = fixture_card_id(&layer, index);
            let inserted = tx
                .execute(
                    query::<Postgres>(
                        r#"
                        INSERT INTO card (id, title, start_year)
                        VALUES ($1, $2, $3)
                        ON CONFLICT (id) DO NOTHING
                        "#,
                    )
                    .bind(card_id)
                    .bind(title)
                    .bind(year),
                )
                .await?;
            summary.cards_created += inserted.rows_affected() as usize;
            tx.execute(
                query::<Postgres>(
                    r#"
                    INSERT INTO card_layer (card_id, layer_id)
                    VALUES ($1, $2)
                    ON CONFLICT DO NOTHING
                    "#,
                )
                .bind(card_id)
                .bind(layer.id),
            )
            .await?;
        }
    }

    Ok(summary)
}
