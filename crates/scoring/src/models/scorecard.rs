use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode::{DecodeError, ProviderValue};

/// Hole-by-hole scorecards keyed by player id.
///
/// Only players whose scorecards were fetched appear here; a missing player
/// simply contributes no hole bonuses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScorecardSet {
    pub players: BTreeMap<String, Vec<ScorecardRound>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorecardRound {
    #[serde(rename = "roundId", default)]
    pub round_id: Value,
    #[serde(default)]
    pub holes: BTreeMap<String, HoleResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoleResult {
    #[serde(rename = "holeScore", default)]
    pub hole_score: Value,
    #[serde(default)]
    pub par: Value,
}

impl ScorecardSet {
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn insert(&mut self, player_id: impl Into<String>, rounds: Vec<ScorecardRound>) {
        self.players.insert(player_id.into(), rounds);
    }

    /// Overlays `newer` on top of `self`; newer scorecards replace older ones per player.
    pub fn merge(&mut self, newer: ScorecardSet) {
        self.players.extend(newer.players);
    }

    /// Rounds of `player_id` whose round id decodes to `round_id`.
    pub fn rounds_for<'a>(
        &'a self,
        player_id: &str,
        round_id: i32,
    ) -> impl Iterator<Item = &'a ScorecardRound> + 'a {
        self.players
            .get(player_id)
            .into_iter()
            .flatten()
            .filter(move |round| round.round() == Ok(round_id))
    }
}

impl ScorecardRound {
    pub fn round(&self) -> Result<i32, DecodeError> {
        ProviderValue::decode(&self.round_id)?.as_i32()
    }

    /// Holes in playing order with their decoded hole number.
    pub fn numbered_holes(&self) -> Vec<(i32, &HoleResult)> {
        let mut holes: Vec<(i32, &HoleResult)> = self
            .holes
            .iter()
            .filter_map(|(number, hole)| number.trim().parse::<i32>().ok().map(|n| (n, hole)))
            .collect();
        holes.sort_by_key(|(number, _)| *number);
        holes
    }
}

impl HoleResult {
    /// Strokes and par, or `None` when the hole has not been played yet.
    pub fn strokes_and_par(&self) -> Result<Option<(i64, i64)>, DecodeError> {
        if self.hole_score.is_null() || self.par.is_null() {
            return Ok(None);
        }
        let strokes = ProviderValue::decode(&self.hole_score)?.as_i64()?;
        let par = ProviderValue::decode(&self.par)?.as_i64()?;
        if strokes <= 0 || par <= 0 {
            return Ok(None);
        }
        Ok(Some((strokes, par)))
    }
}
