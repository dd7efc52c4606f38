use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{DailyScore, NewDailyScore};

const DAILY_SCORE_COLUMNS: &str = "daily_score_id, entry_id, round_id, score_date, base_points, \
     bonus_points, total_points, breakdown, calculated_at";

pub struct DailyScoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DailyScoreRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Last write wins on (entry, round). An identical result leaves the row,
    /// including `calculated_at`, untouched.
    pub async fn upsert(
        tx: &mut Transaction<'_, Postgres>,
        score: &NewDailyScore,
    ) -> Result<DailyScore> {
        let updated = sqlx::query_as::<_, DailyScore>(
            r#"
            INSERT INTO daily_scores (daily_score_id, entry_id, round_id, score_date,
                                      base_points, bonus_points, total_points, breakdown, calculated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (entry_id, round_id)
            DO UPDATE SET
                score_date = EXCLUDED.score_date,
                base_points = EXCLUDED.base_points,
                bonus_points = EXCLUDED.bonus_points,
                total_points = EXCLUDED.total_points,
                breakdown = EXCLUDED.breakdown,
                calculated_at = EXCLUDED.calculated_at
            WHERE (daily_scores.score_date, daily_scores.base_points, daily_scores.bonus_points,
                   daily_scores.total_points, daily_scores.breakdown)
                IS DISTINCT FROM
                  (EXCLUDED.score_date, EXCLUDED.base_points, EXCLUDED.bonus_points,
                   EXCLUDED.total_points, EXCLUDED.breakdown)
            RETURNING daily_score_id, entry_id, round_id, score_date, base_points,
                      bonus_points, total_points, breakdown, calculated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(score.entry_id)
        .bind(score.round_id)
        .bind(score.score_date)
        .bind(score.base_points)
        .bind(score.bonus_points)
        .bind(score.total_points)
        .bind(Json(&score.breakdown))
        .fetch_optional(&mut **tx)
        .await?;

        if let Some(row) = updated {
            return Ok(row);
        }

        // Unchanged: the conflict clause skipped the update.
        let sql = format!(
            "SELECT {} FROM daily_scores WHERE entry_id = $1 AND round_id = $2",
            DAILY_SCORE_COLUMNS
        );
        let existing = sqlx::query_as::<_, DailyScore>(&sql)
            .bind(score.entry_id)
            .bind(score.round_id)
            .fetch_one(&mut **tx)
            .await?;

        Ok(existing)
    }

    pub async fn get(&self, entry_id: Uuid, round_id: i32) -> Result<Option<DailyScore>> {
        let sql = format!(
            "SELECT {} FROM daily_scores WHERE entry_id = $1 AND round_id = $2",
            DAILY_SCORE_COLUMNS
        );
        let score = sqlx::query_as::<_, DailyScore>(&sql)
            .bind(entry_id)
            .bind(round_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(score)
    }

    pub async fn list_by_tournament(&self, tournament_id: Uuid) -> Result<Vec<DailyScore>> {
        let scores = sqlx::query_as::<_, DailyScore>(
            r#"
            SELECT ds.daily_score_id, ds.entry_id, ds.round_id, ds.score_date, ds.base_points,
                   ds.bonus_points, ds.total_points, ds.breakdown, ds.calculated_at
            FROM daily_scores ds
            JOIN entries e ON e.entry_id = ds.entry_id
            WHERE e.tournament_id = $1
            ORDER BY e.created_at, ds.entry_id, ds.round_id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(self.pool)
        .await?;

        Ok(scores)
    }
}
