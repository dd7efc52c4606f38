use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::ScoreSnapshot;

pub struct ScoreSnapshotRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ScoreSnapshotRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn latest_for_round(
        &self,
        tournament_id: Uuid,
        round_id: i32,
    ) -> Result<Option<ScoreSnapshot>> {
        let snapshot = sqlx::query_as::<_, ScoreSnapshot>(
            r#"
            SELECT snapshot_id, tournament_id, round_id, captured_at, leaderboard, scorecards
            FROM score_snapshots
            WHERE tournament_id = $1 AND round_id = $2
            ORDER BY captured_at DESC
            LIMIT 1
            "#,
        )
        .bind(tournament_id)
        .bind(round_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(snapshot)
    }

    pub async fn insert(&self, snapshot: &ScoreSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO score_snapshots (snapshot_id, tournament_id, round_id, captured_at, leaderboard, scorecards)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(snapshot.snapshot_id)
        .bind(snapshot.tournament_id)
        .bind(snapshot.round_id)
        .bind(snapshot.captured_at)
        .bind(&snapshot.leaderboard)
        .bind(&snapshot.scorecards)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
