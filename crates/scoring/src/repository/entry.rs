use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{Result, ScoringError};
use crate::models::{Entry, Rebuy, RebuyType};

#[derive(Debug, FromRow)]
struct EntryRow {
    entry_id: Uuid,
    tournament_id: Uuid,
    participant_name: String,
    player_ids: Vec<String>,
    rebuys: Json<Vec<Rebuy>>,
    rebuy_type: Option<String>,
    weekend_bonus_earned: bool,
    weekend_bonus_forfeited: bool,
}

impl TryFrom<EntryRow> for Entry {
    type Error = ScoringError;

    fn try_from(row: EntryRow) -> Result<Self> {
        let rebuy_type = row
            .rebuy_type
            .as_deref()
            .map(str::parse::<RebuyType>)
            .transpose()
            .map_err(ScoringError::ConstraintViolation)?;

        Ok(Entry {
            entry_id: row.entry_id,
            tournament_id: row.tournament_id,
            participant_name: row.participant_name,
            player_ids: row.player_ids,
            rebuys: row.rebuys.0,
            rebuy_type,
            weekend_bonus_earned: row.weekend_bonus_earned,
            weekend_bonus_forfeited: row.weekend_bonus_forfeited,
        })
    }
}

const ENTRY_COLUMNS: &str = "entry_id, tournament_id, participant_name, player_ids, rebuys, \
     rebuy_type, weekend_bonus_earned, weekend_bonus_forfeited";

pub struct EntryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EntryRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_by_tournament(&self, tournament_id: Uuid) -> Result<Vec<Entry>> {
        let sql = format!(
            "SELECT {} FROM entries WHERE tournament_id = $1 ORDER BY created_at, entry_id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(tournament_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(Entry::try_from).collect()
    }

    pub async fn get_by_id(&self, entry_id: Uuid) -> Result<Entry> {
        let sql = format!("SELECT {} FROM entries WHERE entry_id = $1", ENTRY_COLUMNS);
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(entry_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(ScoringError::NotFound)?;

        Entry::try_from(row)
    }

    pub async fn upsert(&self, entry: &Entry) -> Result<()> {
        entry.validate()?;

        sqlx::query(
            r#"
            INSERT INTO entries (entry_id, tournament_id, participant_name, player_ids, rebuys,
                                 rebuy_type, weekend_bonus_earned, weekend_bonus_forfeited)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (entry_id)
            DO UPDATE SET
                participant_name = EXCLUDED.participant_name,
                player_ids = EXCLUDED.player_ids,
                rebuys = EXCLUDED.rebuys,
                rebuy_type = EXCLUDED.rebuy_type,
                weekend_bonus_earned = entries.weekend_bonus_earned OR EXCLUDED.weekend_bonus_earned,
                weekend_bonus_forfeited = EXCLUDED.weekend_bonus_forfeited
            "#,
        )
        .bind(entry.entry_id)
        .bind(entry.tournament_id)
        .bind(&entry.participant_name)
        .bind(&entry.player_ids)
        .bind(Json(&entry.rebuys))
        .bind(entry.rebuy_type.map(|t| t.as_str()))
        .bind(entry.weekend_bonus_earned)
        .bind(entry.weekend_bonus_forfeited)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Sets the flag once; a forfeited entry is never marked.
    pub async fn mark_weekend_bonus_earned(&self, entry_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE entries
            SET weekend_bonus_earned = TRUE
            WHERE entry_id = $1 AND NOT weekend_bonus_earned AND NOT weekend_bonus_forfeited
            "#,
        )
        .bind(entry_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
