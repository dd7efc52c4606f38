use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use super::bonus_point::BonusAward;
use super::leaderboard::PlayerStatus;

/// One entry's score for one round. Unique per (entry, round).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DailyScore {
    pub daily_score_id: Uuid,
    pub entry_id: Uuid,
    pub round_id: i32,
    pub score_date: NaiveDate,
    pub base_points: i32,
    pub bonus_points: i32,
    pub total_points: i32,
    pub breakdown: Json<ScoreBreakdown>,
    pub calculated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDailyScore {
    pub entry_id: Uuid,
    pub round_id: i32,
    pub score_date: NaiveDate,
    pub base_points: i32,
    pub bonus_points: i32,
    pub total_points: i32,
    pub breakdown: ScoreBreakdown,
}

impl NewDailyScore {
    /// True when `existing` already holds exactly this result.
    pub fn matches(&self, existing: &DailyScore) -> bool {
        existing.entry_id == self.entry_id
            && existing.round_id == self.round_id
            && existing.score_date == self.score_date
            && existing.base_points == self.base_points
            && existing.bonus_points == self.bonus_points
            && existing.total_points == self.total_points
            && existing.breakdown.0 == self.breakdown
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub slots: Vec<SlotBreakdown>,
    #[serde(default)]
    pub bonuses: Vec<BonusAward>,
}

impl ScoreBreakdown {
    pub fn base_points(&self) -> i32 {
        self.slots.iter().map(|slot| slot.outcome.points()).sum()
    }

    pub fn bonus_points(&self) -> i32 {
        self.bonuses.iter().map(|bonus| bonus.points).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotBreakdown {
    /// 1-based slot in the entry's original pick order.
    pub slot: u8,
    #[serde(flatten)]
    pub outcome: SlotOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SlotOutcome {
    Scored {
        player_id: String,
        position: Option<String>,
        status: PlayerStatus,
        points: i32,
    },
    Eliminated {
        player_id: String,
        position: Option<String>,
        status: PlayerStatus,
    },
    Substituted {
        original_player_id: String,
        player_id: String,
        position: Option<String>,
        status: PlayerStatus,
        points: i32,
    },
    /// The player does not appear on the leaderboard.
    NotListed { player_id: String },
}

impl SlotOutcome {
    pub fn points(&self) -> i32 {
        match self {
            Self::Scored { points, .. } | Self::Substituted { points, .. } => *points,
            Self::Eliminated { .. } | Self::NotListed { .. } => 0,
        }
    }

    pub fn player_id(&self) -> &str {
        match self {
            Self::Scored { player_id, .. }
            | Self::Eliminated { player_id, .. }
            | Self::Substituted { player_id, .. }
            | Self::NotListed { player_id } => player_id,
        }
    }
}
