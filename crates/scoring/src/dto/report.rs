use serde::Serialize;
use uuid::Uuid;

/// Outcome of calculating one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RoundCalculation {
    Completed(RoundReport),
    /// No stored leaderboard for the round yet.
    MissingSnapshot {
        tournament_id: Uuid,
        round_id: i32,
        message: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    pub tournament_id: Uuid,
    pub round_id: i32,
    pub entries_processed: usize,
    pub entries_updated: usize,
    pub rankings_captured: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub round_id: i32,
    pub entries_processed: usize,
    pub entries_updated: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TournamentReport {
    pub tournament_id: Uuid,
    pub rounds_processed: Vec<RoundSummary>,
    pub total_entries_processed: usize,
    pub errors: Vec<String>,
}

impl RoundCalculation {
    pub fn missing_snapshot(tournament_id: Uuid, round_id: i32) -> Self {
        Self::MissingSnapshot {
            tournament_id,
            round_id,
            message: format!("No score snapshot for round {}. Sync tournament data first.", round_id),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn report(&self) -> Option<&RoundReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::MissingSnapshot { .. } => None,
        }
    }
}
