use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::decode::ProviderValue;

/// One poll of the provider leaderboard for a round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(rename = "leaderboardRows", default)]
    pub rows: Vec<LeaderboardRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    #[serde(rename = "playerId", deserialize_with = "player_id_from_json")]
    pub player_id: String,
    #[serde(rename = "firstName", default)]
    pub first_name: String,
    #[serde(rename = "lastName", default)]
    pub last_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub status: PlayerStatus,
    #[serde(rename = "currentRoundScore", default)]
    pub current_round_score: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlayerStatus {
    Complete,
    Active,
    Cut,
    Withdrawn,
    Disqualified,
    #[default]
    Unknown,
    Other(String),
}

impl Leaderboard {
    pub fn row(&self, player_id: &str) -> Option<&LeaderboardRow> {
        self.rows.iter().find(|row| row.player_id == player_id)
    }

    /// The confirmed winner: position "1" with a completed final round.
    pub fn winner(&self) -> Option<&LeaderboardRow> {
        self.rows.iter().find(|row| {
            row.status == PlayerStatus::Complete
                && row.position.as_deref().map(str::trim) == Some("1")
        })
    }
}

impl LeaderboardRow {
    pub fn round_score(&self) -> Option<i32> {
        self.current_round_score
            .as_deref()
            .and_then(parse_round_score)
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

impl PlayerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Complete => "complete",
            Self::Active => "active",
            Self::Cut => "cut",
            Self::Withdrawn => "wd",
            Self::Disqualified => "dq",
            Self::Unknown => "unknown",
            Self::Other(raw) => raw,
        }
    }

    /// Out of the tournament: cut, withdrawn or disqualified.
    pub fn is_eliminated(&self) -> bool {
        matches!(self, Self::Cut | Self::Withdrawn | Self::Disqualified)
    }
}

impl From<String> for PlayerStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "complete" => Self::Complete,
            "active" | "in progress" | "in_progress" => Self::Active,
            "cut" => Self::Cut,
            "wd" => Self::Withdrawn,
            "dq" => Self::Disqualified,
            "" | "unknown" => Self::Unknown,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for PlayerStatus {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<PlayerStatus> for String {
    fn from(status: PlayerStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses score-to-par notation: "-5", "+2", "E", or a bare integer.
pub fn parse_round_score(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("e") {
        return Some(0);
    }
    raw.parse::<i32>().ok()
}

fn player_id_from_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id),
        other => ProviderValue::decode(&other)
            .and_then(|value| value.as_i64())
            .map(|id| id.to_string())
            .map_err(serde::de::Error::custom),
    }
}
