//! Leaderboard data source. The live implementation talks to the Slash Golf
//! API; [`FixtureProvider`] serves recorded documents.

mod fixture;
mod slash_golf;

pub use fixture::{Fixture, FixtureProvider};
pub use slash_golf::SlashGolfClient;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use scoring::decode::ProviderValue;
use scoring::models::{FIRST_ROUND, Leaderboard, ScorecardRound, Tournament};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

/// Provider-side identity of a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentKey {
    pub org_id: String,
    pub tourn_id: String,
    pub year: i32,
}

#[async_trait]
pub trait LeaderboardProvider: Send + Sync {
    async fn tournament(&self, key: &TournamentKey) -> Result<ProviderTournament>;

    async fn leaderboard(&self, key: &TournamentKey) -> Result<ProviderLeaderboard>;

    /// Every round of one player's scorecard.
    async fn scorecards(&self, key: &TournamentKey, player_id: &str) -> Result<Vec<ScorecardRound>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderTournament {
    pub name: String,
    #[serde(rename = "orgId")]
    pub org_id: String,
    #[serde(rename = "tournId")]
    pub tourn_id: String,
    pub year: Value,
    pub date: ProviderDates,
    #[serde(rename = "currentRound", default)]
    pub current_round: Value,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDates {
    pub start: Value,
    pub end: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderLeaderboard {
    #[serde(rename = "roundId", default)]
    pub round_id: Value,
    #[serde(flatten)]
    pub leaderboard: Leaderboard,
}

impl TournamentKey {
    pub fn new(org_id: impl Into<String>, tourn_id: impl Into<String>, year: i32) -> Self {
        Self {
            org_id: org_id.into(),
            tourn_id: tourn_id.into(),
            year,
        }
    }
}

impl From<&Tournament> for TournamentKey {
    fn from(tournament: &Tournament) -> Self {
        Self::new(
            tournament.org_id.clone(),
            tournament.tourn_id.clone(),
            tournament.year,
        )
    }
}

impl ProviderTournament {
    /// Builds a tournament row. The id is fresh; storing it upserts on the
    /// provider key, so an existing row keeps its own id.
    pub fn to_tournament(&self) -> Result<Tournament> {
        let current_round = if self.current_round.is_null() {
            FIRST_ROUND
        } else {
            ProviderValue::decode(&self.current_round)?.as_i32()?
        };

        Ok(Tournament {
            tournament_id: Uuid::new_v4(),
            name: self.name.clone(),
            org_id: self.org_id.clone(),
            tourn_id: self.tourn_id.clone(),
            year: ProviderValue::decode(&self.year)?.as_i32()?,
            start_date: provider_date(&self.date.start)?,
            end_date: provider_date(&self.date.end)?,
            current_round,
        })
    }
}

impl ProviderLeaderboard {
    pub fn round(&self) -> Option<i32> {
        ProviderValue::decode(&self.round_id)
            .and_then(|value| value.as_i32())
            .ok()
    }
}

/// Accepts ISO-8601 strings, plain dates and extended-JSON `$date` values.
fn provider_date(value: &Value) -> Result<NaiveDate> {
    if let Value::String(raw) = value {
        let raw = raw.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Ok(date.with_timezone(&Utc).date_naive());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(date);
        }
    }
    Ok(ProviderValue::decode(value)?.as_date()?.date_naive())
}

/// A fixture for a tournament in progress today, round 1.
#[cfg(test)]
pub(crate) fn provider_fixture(leaderboard: ProviderLeaderboard) -> Fixture {
    let today = chrono::Local::now().date_naive();
    Fixture {
        tournament: ProviderTournament {
            name: "Masters Tournament".to_string(),
            org_id: "1".to_string(),
            tourn_id: "014".to_string(),
            year: Value::from(2025),
            date: ProviderDates {
                start: Value::from(today.pred_opt().unwrap_or(today).to_string()),
                end: Value::from(today.succ_opt().unwrap_or(today).to_string()),
            },
            current_round: Value::from(1),
            status: Some("In Progress".to_string()),
        },
        leaderboard,
        scorecards: Default::default(),
        entries: Vec::new(),
    }
}
