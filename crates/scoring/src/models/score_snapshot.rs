use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::leaderboard::Leaderboard;
use super::scorecard::ScorecardSet;

/// A stored poll of the provider for one (tournament, round).
/// Several may exist per round; the latest is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ScoreSnapshot {
    pub snapshot_id: Uuid,
    pub tournament_id: Uuid,
    pub round_id: i32,
    pub captured_at: DateTime<Utc>,
    pub leaderboard: Json<Leaderboard>,
    pub scorecards: Json<ScorecardSet>,
}

impl ScoreSnapshot {
    pub fn new(
        tournament_id: Uuid,
        round_id: i32,
        leaderboard: Leaderboard,
        scorecards: ScorecardSet,
    ) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            tournament_id,
            round_id,
            captured_at: Utc::now(),
            leaderboard: Json(leaderboard),
            scorecards: Json(scorecards),
        }
    }
}
