use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusType {
    LowScore,
    HoleInOne,
    DoubleEagle,
    Eagle,
    GirLeader,
    FairwaysLeader,
    AllMakeCut,
}

impl BonusType {
    pub const ALL: [BonusType; 7] = [
        Self::LowScore,
        Self::HoleInOne,
        Self::DoubleEagle,
        Self::Eagle,
        Self::GirLeader,
        Self::FairwaysLeader,
        Self::AllMakeCut,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowScore => "low_score",
            Self::HoleInOne => "hole_in_one",
            Self::DoubleEagle => "double_eagle",
            Self::Eagle => "eagle",
            Self::GirLeader => "gir_leader",
            Self::FairwaysLeader => "fairways_leader",
            Self::AllMakeCut => "all_make_cut",
        }
    }

    /// Entered by an administrator; recalculation never creates or deletes these.
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::GirLeader | Self::FairwaysLeader)
    }

    /// Hole-level achievements worth a notification.
    pub fn is_special(&self) -> bool {
        matches!(self, Self::HoleInOne | Self::DoubleEagle | Self::Eagle)
    }

    pub fn default_points(&self) -> i32 {
        match self {
            Self::LowScore => 1,
            Self::HoleInOne => 3,
            Self::DoubleEagle => 3,
            Self::Eagle => 2,
            Self::GirLeader => 1,
            Self::FairwaysLeader => 1,
            Self::AllMakeCut => 5,
        }
    }
}

impl fmt::Display for BonusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BonusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| format!("unknown bonus type '{}'", s))
    }
}

/// A persisted bonus for one entry and round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPoint {
    pub bonus_point_id: Uuid,
    pub entry_id: Uuid,
    pub round_id: i32,
    pub bonus_type: BonusType,
    pub player_id: Option<String>,
    pub hole: Option<i32>,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

/// Column layout of `bonus_points`; the type is stored as text.
#[derive(Debug, FromRow)]
pub struct BonusPointRow {
    pub bonus_point_id: Uuid,
    pub entry_id: Uuid,
    pub round_id: i32,
    pub bonus_type: String,
    pub player_id: Option<String>,
    pub hole: Option<i32>,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<BonusPointRow> for BonusPoint {
    type Error = ScoringError;

    fn try_from(row: BonusPointRow) -> Result<Self, Self::Error> {
        let bonus_type = row
            .bonus_type
            .parse::<BonusType>()
            .map_err(ScoringError::ConstraintViolation)?;
        Ok(Self {
            bonus_point_id: row.bonus_point_id,
            entry_id: row.entry_id,
            round_id: row.round_id,
            bonus_type,
            player_id: row.player_id,
            hole: row.hole,
            points: row.points,
            created_at: row.created_at,
        })
    }
}

impl BonusPoint {
    pub fn key(&self) -> BonusKey {
        BonusKey {
            bonus_type: self.bonus_type,
            player_id: self.player_id.clone(),
            hole: self.hole,
        }
    }

    pub fn award(&self) -> BonusAward {
        BonusAward {
            bonus_type: self.bonus_type,
            player_id: self.player_id.clone(),
            points: self.points,
            hole: self.hole,
        }
    }
}

/// A bonus produced by detection, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusAward {
    pub bonus_type: BonusType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hole: Option<i32>,
}

impl BonusAward {
    pub fn new(bonus_type: BonusType, player_id: Option<&str>, hole: Option<i32>) -> Self {
        Self {
            bonus_type,
            player_id: player_id.map(str::to_string),
            points: bonus_type.default_points(),
            hole,
        }
    }

    pub fn key(&self) -> BonusKey {
        BonusKey {
            bonus_type: self.bonus_type,
            player_id: self.player_id.clone(),
            hole: self.hole,
        }
    }
}

/// Deduplication key within one (entry, round).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BonusKey {
    pub bonus_type: BonusType,
    pub player_id: Option<String>,
    pub hole: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bonus_type_round_trips_through_text() {
        for bonus_type in BonusType::ALL {
            assert_eq!(bonus_type.as_str().parse::<BonusType>(), Ok(bonus_type));
        }
        assert!("birdie".parse::<BonusType>().is_err());
    }

    #[test]
    fn test_manual_and_special_types() {
        assert!(BonusType::GirLeader.is_manual());
        assert!(BonusType::FairwaysLeader.is_manual());
        assert!(!BonusType::AllMakeCut.is_manual());
        assert!(BonusType::Eagle.is_special());
        assert!(!BonusType::LowScore.is_special());
    }

    #[test]
    fn test_award_uses_default_points() {
        let award = BonusAward::new(BonusType::Eagle, Some("50525"), Some(13));
        assert_eq!(award.points, 2);
        assert_eq!(award.key().hole, Some(13));
        assert_eq!(
            serde_json::to_value(&award).unwrap(),
            serde_json::json!({"bonus_type": "eagle", "player_id": "50525", "points": 2, "hole": 13})
        );
    }

    #[test]
    fn test_row_with_unknown_type_is_rejected() {
        let row = BonusPointRow {
            bonus_point_id: Uuid::new_v4(),
            entry_id: Uuid::new_v4(),
            round_id: 1,
            bonus_type: "birdie".to_string(),
            player_id: None,
            hole: None,
            points: 1,
            created_at: Utc::now(),
        };
        assert!(matches!(
            BonusPoint::try_from(row),
            Err(ScoringError::ConstraintViolation(_))
        ));
    }
}
