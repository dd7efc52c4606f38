//! Persistence for the pool: one repository per table over Postgres, plus an
//! in-process store with the same behaviour for tests and dry runs.

pub mod bonus_point;
pub mod daily_score;
pub mod entry;
pub mod memory;
pub mod postgres;
pub mod ranking_snapshot;
pub mod score_snapshot;
pub mod tournament;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    BonusAward, BonusPoint, DailyScore, Entry, NewDailyScore, NewRankingSnapshot,
    RankingSnapshot, ScoreSnapshot, Tournament,
};

pub use bonus_point::BonusPointRepository;
pub use daily_score::DailyScoreRepository;
pub use entry::EntryRepository;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use ranking_snapshot::RankingSnapshotRepository;
pub use score_snapshot::ScoreSnapshotRepository;
pub use tournament::TournamentRepository;

#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn tournament(&self, tournament_id: Uuid) -> Result<Tournament>;

    /// Upserts on (org_id, tourn_id, year) and returns the stored row.
    async fn save_tournament(&self, tournament: &Tournament) -> Result<Tournament>;

    async fn set_current_round(&self, tournament_id: Uuid, round_id: i32) -> Result<()>;

    /// Entries of a tournament in the order they were created.
    async fn entries(&self, tournament_id: Uuid) -> Result<Vec<Entry>>;

    async fn entry(&self, entry_id: Uuid) -> Result<Entry>;

    async fn save_entry(&self, entry: &Entry) -> Result<()>;

    async fn set_weekend_bonus_earned(&self, entry_id: Uuid) -> Result<()>;

    async fn latest_score_snapshot(
        &self,
        tournament_id: Uuid,
        round_id: i32,
    ) -> Result<Option<ScoreSnapshot>>;

    async fn save_score_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<()>;

    async fn bonus_points(&self, entry_id: Uuid, round_id: i32) -> Result<Vec<BonusPoint>>;

    /// Fails with a unique violation when the same manual bonus already exists.
    async fn insert_manual_bonus(
        &self,
        entry_id: Uuid,
        round_id: i32,
        award: &BonusAward,
    ) -> Result<BonusPoint>;

    /// Upserts the (entry, round) score and reconciles its automatic bonus rows
    /// against `awards`. Manual bonus rows are never touched.
    async fn save_daily_score(
        &self,
        score: &NewDailyScore,
        awards: &[BonusAward],
    ) -> Result<DailyScore>;

    async fn daily_score(&self, entry_id: Uuid, round_id: i32) -> Result<Option<DailyScore>>;

    async fn daily_scores_for_tournament(&self, tournament_id: Uuid) -> Result<Vec<DailyScore>>;

    async fn append_ranking_snapshots(
        &self,
        rows: &[NewRankingSnapshot],
    ) -> Result<Vec<RankingSnapshot>>;

    /// The rows of the most recent capture, by position.
    async fn latest_ranking_capture(&self, tournament_id: Uuid) -> Result<Vec<RankingSnapshot>>;

    /// Full history ordered by capture time, then position.
    async fn ranking_snapshots(&self, tournament_id: Uuid) -> Result<Vec<RankingSnapshot>>;
}
