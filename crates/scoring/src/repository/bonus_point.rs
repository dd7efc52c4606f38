use std::collections::HashSet;

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{BonusAward, BonusKey, BonusPoint, BonusPointRow};

const BONUS_POINT_COLUMNS: &str =
    "bonus_point_id, entry_id, round_id, bonus_type, player_id, hole, points, created_at";

pub struct BonusPointRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BonusPointRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_round(&self, entry_id: Uuid, round_id: i32) -> Result<Vec<BonusPoint>> {
        let sql = format!(
            "SELECT {} FROM bonus_points WHERE entry_id = $1 AND round_id = $2 ORDER BY created_at, bonus_point_id",
            BONUS_POINT_COLUMNS
        );
        let rows = sqlx::query_as::<_, BonusPointRow>(&sql)
            .bind(entry_id)
            .bind(round_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(BonusPoint::try_from).collect()
    }

    pub async fn insert(&self, entry_id: Uuid, round_id: i32, award: &BonusAward) -> Result<BonusPoint> {
        let sql = format!(
            r#"
            INSERT INTO bonus_points (bonus_point_id, entry_id, round_id, bonus_type, player_id, hole, points)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            BONUS_POINT_COLUMNS
        );
        let row = sqlx::query_as::<_, BonusPointRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry_id)
            .bind(round_id)
            .bind(award.bonus_type.as_str())
            .bind(&award.player_id)
            .bind(award.hole)
            .bind(award.points)
            .fetch_one(self.pool)
            .await?;

        BonusPoint::try_from(row)
    }

    /// Brings the automatic bonus rows of (entry, round) in line with `awards`:
    /// stale rows are deleted, missing ones inserted, matching rows kept as is.
    pub async fn reconcile_automatic(
        tx: &mut Transaction<'_, Postgres>,
        entry_id: Uuid,
        round_id: i32,
        awards: &[BonusAward],
    ) -> Result<()> {
        let sql = format!(
            "SELECT {} FROM bonus_points WHERE entry_id = $1 AND round_id = $2",
            BONUS_POINT_COLUMNS
        );
        let existing = sqlx::query_as::<_, BonusPointRow>(&sql)
            .bind(entry_id)
            .bind(round_id)
            .fetch_all(&mut **tx)
            .await?
            .into_iter()
            .map(BonusPoint::try_from)
            .collect::<Result<Vec<_>>>()?;

        let wanted: HashSet<(BonusKey, i32)> = awards
            .iter()
            .filter(|award| !award.bonus_type.is_manual())
            .map(|award| (award.key(), award.points))
            .collect();

        let stale: Vec<Uuid> = existing
            .iter()
            .filter(|bonus| !bonus.bonus_type.is_manual())
            .filter(|bonus| !wanted.contains(&(bonus.key(), bonus.points)))
            .map(|bonus| bonus.bonus_point_id)
            .collect();

        if !stale.is_empty() {
            sqlx::query("DELETE FROM bonus_points WHERE bonus_point_id = ANY($1)")
                .bind(&stale)
                .execute(&mut **tx)
                .await?;
        }

        for award in awards.iter().filter(|award| !award.bonus_type.is_manual()) {
            sqlx::query(
                r#"
                INSERT INTO bonus_points (bonus_point_id, entry_id, round_id, bonus_type, player_id, hole, points)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (entry_id, round_id, bonus_type, (COALESCE(player_id, '')), (COALESCE(hole, 0)))
                DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(entry_id)
            .bind(round_id)
            .bind(award.bonus_type.as_str())
            .bind(&award.player_id)
            .bind(award.hole)
            .bind(award.points)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}
