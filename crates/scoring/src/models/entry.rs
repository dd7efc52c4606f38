use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

pub const SLOTS_PER_ENTRY: usize = 6;

/// One participant's picks for a tournament.
///
/// `player_ids` holds the six nominal slots in display order. Substitutions
/// are kept as explicit pairs and only take effect from round 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_rebuy_pairs", skip_on_field_errors = true))]
pub struct Entry {
    pub entry_id: Uuid,
    pub tournament_id: Uuid,
    #[validate(length(min = 1, message = "participant name is required"))]
    pub participant_name: String,
    #[validate(length(equal = 6, message = "an entry picks exactly six players"))]
    pub player_ids: Vec<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_unique_originals"))]
    pub rebuys: Vec<Rebuy>,
    #[serde(default)]
    pub rebuy_type: Option<RebuyType>,
    #[serde(default)]
    pub weekend_bonus_earned: bool,
    #[serde(default)]
    pub weekend_bonus_forfeited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebuy {
    pub original_player_id: String,
    pub replacement_player_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuyType {
    MissedCut,
    Underperformer,
}

impl Entry {
    pub fn new(
        tournament_id: Uuid,
        participant_name: impl Into<String>,
        player_ids: Vec<String>,
    ) -> Self {
        Self {
            entry_id: Uuid::new_v4(),
            tournament_id,
            participant_name: participant_name.into(),
            player_ids,
            rebuys: Vec::new(),
            rebuy_type: None,
            weekend_bonus_earned: false,
            weekend_bonus_forfeited: false,
        }
    }

    /// Adds substitutions to those already recorded and returns how many were
    /// new. A pick that already has a replacement keeps it. An underperformer
    /// rebuy forfeits the weekend bonus.
    pub fn apply_rebuys(&mut self, rebuy_type: RebuyType, rebuys: Vec<Rebuy>) -> usize {
        let mut added = 0;
        for rebuy in rebuys {
            let already_replaced = self
                .rebuys
                .iter()
                .any(|r| r.original_player_id == rebuy.original_player_id);
            if already_replaced {
                continue;
            }
            self.rebuys.push(rebuy);
            added += 1;
        }

        if added > 0 {
            if rebuy_type == RebuyType::Underperformer {
                self.weekend_bonus_forfeited = true;
            }
            self.rebuy_type = Some(rebuy_type);
        }
        added
    }

    pub fn has_rebuys(&self) -> bool {
        !self.rebuys.is_empty()
    }

    /// Every player this entry may field across the tournament, nominal and
    /// replacement, without duplicates.
    pub fn all_player_ids(&self) -> BTreeSet<&str> {
        self.player_ids
            .iter()
            .map(String::as_str)
            .chain(self.rebuys.iter().map(|r| r.replacement_player_id.as_str()))
            .collect()
    }
}

impl RebuyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissedCut => "missed_cut",
            Self::Underperformer => "underperformer",
        }
    }
}

impl fmt::Display for RebuyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RebuyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "missed_cut" | "missed cut" => Ok(Self::MissedCut),
            "underperformer" => Ok(Self::Underperformer),
            other => Err(format!("unknown rebuy type '{}'", other)),
        }
    }
}

fn validate_unique_originals(rebuys: &[Rebuy]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for rebuy in rebuys {
        if !seen.insert(rebuy.original_player_id.as_str()) {
            let mut error = ValidationError::new("duplicate_rebuy_original");
            error.message = Some(
                format!(
                    "player {} is replaced more than once",
                    rebuy.original_player_id
                )
                .into(),
            );
            return Err(error);
        }
    }
    Ok(())
}

fn validate_rebuy_pairs(entry: &Entry) -> Result<(), ValidationError> {
    if entry.has_rebuys() && entry.rebuy_type.is_none() {
        let mut error = ValidationError::new("missing_rebuy_type");
        error.message = Some("rebuys need a rebuy type".into());
        return Err(error);
    }

    for rebuy in &entry.rebuys {
        if !entry.player_ids.contains(&rebuy.original_player_id) {
            let mut error = ValidationError::new("unknown_rebuy_original");
            error.message = Some(
                format!(
                    "player {} is not one of the entry's picks",
                    rebuy.original_player_id
                )
                .into(),
            );
            return Err(error);
        }
    }

    Ok(())
}
