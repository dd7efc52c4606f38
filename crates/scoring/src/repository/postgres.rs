use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    BonusPointRepository, DailyScoreRepository, EntryRepository, RankingSnapshotRepository,
    ScoreSnapshotRepository, ScoreStore, TournamentRepository,
};
use crate::error::{Result, ScoringError};
use crate::models::{
    BonusAward, BonusPoint, DailyScore, Entry, NewDailyScore, NewRankingSnapshot,
    RankingSnapshot, ScoreSnapshot, Tournament,
};

/// [`ScoreStore`] over a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ScoreStore for PgStore {
    async fn tournament(&self, tournament_id: Uuid) -> Result<Tournament> {
        TournamentRepository::new(&self.pool)
            .get_by_id(tournament_id)
            .await
    }

    async fn save_tournament(&self, tournament: &Tournament) -> Result<Tournament> {
        TournamentRepository::new(&self.pool).upsert(tournament).await
    }

    async fn set_current_round(&self, tournament_id: Uuid, round_id: i32) -> Result<()> {
        TournamentRepository::new(&self.pool)
            .set_current_round(tournament_id, round_id)
            .await
    }

    async fn entries(&self, tournament_id: Uuid) -> Result<Vec<Entry>> {
        EntryRepository::new(&self.pool)
            .list_by_tournament(tournament_id)
            .await
    }

    async fn entry(&self, entry_id: Uuid) -> Result<Entry> {
        EntryRepository::new(&self.pool).get_by_id(entry_id).await
    }

    async fn save_entry(&self, entry: &Entry) -> Result<()> {
        EntryRepository::new(&self.pool).upsert(entry).await
    }

    async fn set_weekend_bonus_earned(&self, entry_id: Uuid) -> Result<()> {
        EntryRepository::new(&self.pool)
            .mark_weekend_bonus_earned(entry_id)
            .await
    }

    async fn latest_score_snapshot(
        &self,
        tournament_id: Uuid,
        round_id: i32,
    ) -> Result<Option<ScoreSnapshot>> {
        ScoreSnapshotRepository::new(&self.pool)
            .latest_for_round(tournament_id, round_id)
            .await
    }

    async fn save_score_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<()> {
        ScoreSnapshotRepository::new(&self.pool).insert(snapshot).await
    }

    async fn bonus_points(&self, entry_id: Uuid, round_id: i32) -> Result<Vec<BonusPoint>> {
        BonusPointRepository::new(&self.pool)
            .list_for_round(entry_id, round_id)
            .await
    }

    async fn insert_manual_bonus(
        &self,
        entry_id: Uuid,
        round_id: i32,
        award: &BonusAward,
    ) -> Result<BonusPoint> {
        BonusPointRepository::new(&self.pool)
            .insert(entry_id, round_id, award)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    ScoringError::ConstraintViolation(format!(
                        "{} already awarded for round {}",
                        award.bonus_type, round_id
                    ))
                } else {
                    e
                }
            })
    }

    async fn save_daily_score(
        &self,
        score: &NewDailyScore,
        awards: &[BonusAward],
    ) -> Result<DailyScore> {
        let mut tx = self.pool.begin().await?;
        let saved = DailyScoreRepository::upsert(&mut tx, score).await?;
        BonusPointRepository::reconcile_automatic(&mut tx, score.entry_id, score.round_id, awards)
            .await?;
        tx.commit().await?;
        Ok(saved)
    }

    async fn daily_score(&self, entry_id: Uuid, round_id: i32) -> Result<Option<DailyScore>> {
        DailyScoreRepository::new(&self.pool)
            .get(entry_id, round_id)
            .await
    }

    async fn daily_scores_for_tournament(&self, tournament_id: Uuid) -> Result<Vec<DailyScore>> {
        DailyScoreRepository::new(&self.pool)
            .list_by_tournament(tournament_id)
            .await
    }

    async fn append_ranking_snapshots(
        &self,
        rows: &[NewRankingSnapshot],
    ) -> Result<Vec<RankingSnapshot>> {
        RankingSnapshotRepository::new(&self.pool).append(rows).await
    }

    async fn latest_ranking_capture(&self, tournament_id: Uuid) -> Result<Vec<RankingSnapshot>> {
        RankingSnapshotRepository::new(&self.pool)
            .latest_capture(tournament_id)
            .await
    }

    async fn ranking_snapshots(&self, tournament_id: Uuid) -> Result<Vec<RankingSnapshot>> {
        RankingSnapshotRepository::new(&self.pool)
            .list_by_tournament(tournament_id)
            .await
    }
}
