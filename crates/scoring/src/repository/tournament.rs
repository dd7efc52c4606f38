use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Result, ScoringError};
use crate::models::Tournament;

pub struct TournamentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TournamentRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, tournament_id: Uuid) -> Result<Tournament> {
        sqlx::query_as::<_, Tournament>(
            r#"
            SELECT tournament_id, name, org_id, tourn_id, year, start_date, end_date, current_round
            FROM tournaments
            WHERE tournament_id = $1
            "#,
        )
        .bind(tournament_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(ScoringError::NotFound)
    }

    pub async fn upsert(&self, tournament: &Tournament) -> Result<Tournament> {
        let stored = sqlx::query_as::<_, Tournament>(
            r#"
            INSERT INTO tournaments (tournament_id, name, org_id, tourn_id, year, start_date, end_date, current_round)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (org_id, tourn_id, year)
            DO UPDATE SET
                name = EXCLUDED.name,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                current_round = EXCLUDED.current_round
            RETURNING tournament_id, name, org_id, tourn_id, year, start_date, end_date, current_round
            "#,
        )
        .bind(tournament.tournament_id)
        .bind(&tournament.name)
        .bind(&tournament.org_id)
        .bind(&tournament.tourn_id)
        .bind(tournament.year)
        .bind(tournament.start_date)
        .bind(tournament.end_date)
        .bind(tournament.current_round)
        .fetch_one(self.pool)
        .await?;

        Ok(stored)
    }

    pub async fn set_current_round(&self, tournament_id: Uuid, round_id: i32) -> Result<()> {
        let result = sqlx::query("UPDATE tournaments SET current_round = $2 WHERE tournament_id = $1")
            .bind(tournament_id)
            .bind(round_id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ScoringError::NotFound);
        }

        Ok(())
    }
}
