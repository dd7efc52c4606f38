use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewRankingSnapshot, RankingSnapshot};

const RANKING_COLUMNS: &str = "ranking_snapshot_id, capture_id, tournament_id, entry_id, round_id, \
     position, total_points, points_behind_leader, captured_at";

pub struct RankingSnapshotRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RankingSnapshotRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Appends one capture atomically. Rows are never updated afterwards.
    pub async fn append(&self, rows: &[NewRankingSnapshot]) -> Result<Vec<RankingSnapshot>> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            INSERT INTO ranking_snapshots (ranking_snapshot_id, capture_id, tournament_id, entry_id,
                                           round_id, position, total_points, points_behind_leader, captured_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            RANKING_COLUMNS
        );

        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let snapshot = sqlx::query_as::<_, RankingSnapshot>(&sql)
                .bind(Uuid::new_v4())
                .bind(row.capture_id)
                .bind(row.tournament_id)
                .bind(row.entry_id)
                .bind(row.round_id)
                .bind(row.position)
                .bind(row.total_points)
                .bind(row.points_behind_leader)
                .bind(row.captured_at)
                .fetch_one(&mut *tx)
                .await?;
            inserted.push(snapshot);
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn latest_capture(&self, tournament_id: Uuid) -> Result<Vec<RankingSnapshot>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM ranking_snapshots
            WHERE capture_id = (
                SELECT capture_id FROM ranking_snapshots
                WHERE tournament_id = $1
                ORDER BY captured_at DESC
                LIMIT 1
            )
            ORDER BY position
            "#,
            RANKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, RankingSnapshot>(&sql)
            .bind(tournament_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn list_by_tournament(&self, tournament_id: Uuid) -> Result<Vec<RankingSnapshot>> {
        let sql = format!(
            "SELECT {} FROM ranking_snapshots WHERE tournament_id = $1 ORDER BY captured_at, position",
            RANKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, RankingSnapshot>(&sql)
            .bind(tournament_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }
}
