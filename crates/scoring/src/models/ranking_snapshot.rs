use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Append-only record of an entry's standing at one capture.
///
/// Every row written by the same capture shares `capture_id` and `captured_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RankingSnapshot {
    pub ranking_snapshot_id: Uuid,
    pub capture_id: Uuid,
    pub tournament_id: Uuid,
    pub entry_id: Uuid,
    pub round_id: i32,
    pub position: i32,
    pub total_points: i32,
    pub points_behind_leader: i32,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRankingSnapshot {
    pub capture_id: Uuid,
    pub tournament_id: Uuid,
    pub entry_id: Uuid,
    pub round_id: i32,
    pub position: i32,
    pub total_points: i32,
    pub points_behind_leader: i32,
    pub captured_at: DateTime<Utc>,
}

impl NewRankingSnapshot {
    pub fn into_snapshot(self) -> RankingSnapshot {
        RankingSnapshot {
            ranking_snapshot_id: Uuid::new_v4(),
            capture_id: self.capture_id,
            tournament_id: self.tournament_id,
            entry_id: self.entry_id,
            round_id: self.round_id,
            position: self.position,
            total_points: self.total_points,
            points_behind_leader: self.points_behind_leader,
            captured_at: self.captured_at,
        }
    }
}
