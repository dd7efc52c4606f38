use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::models::Leaderboard;

/// Strokes a player must gain between polls before their scorecard is fetched.
pub const MIN_IMPROVEMENT: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreImprovement {
    pub player_id: String,
    pub previous_score: i32,
    pub current_score: i32,
    pub improvement: i32,
}

/// Players whose round score dropped by at least [`MIN_IMPROVEMENT`] since the
/// previous poll of the same round, in current leaderboard order.
///
/// This only bounds scorecard fetches. Improvements that happened before the
/// previous poll are not seen here.
pub fn detect_scorecard_changes(
    previous: Option<&Leaderboard>,
    current: &Leaderboard,
) -> Vec<ScoreImprovement> {
    let Some(previous) = previous else {
        debug!("No previous snapshot for round, nothing to compare");
        return Vec::new();
    };

    let previous_scores: HashMap<&str, i32> = previous
        .rows
        .iter()
        .filter_map(|row| row.round_score().map(|score| (row.player_id.as_str(), score)))
        .collect();

    let flagged: Vec<ScoreImprovement> = current
        .rows
        .iter()
        .filter(|row| !row.status.is_eliminated())
        .filter_map(|row| {
            let current_score = row.round_score()?;
            let previous_score = *previous_scores.get(row.player_id.as_str())?;
            let improvement = previous_score - current_score;
            (improvement >= MIN_IMPROVEMENT).then(|| ScoreImprovement {
                player_id: row.player_id.clone(),
                previous_score,
                current_score,
                improvement,
            })
        })
        .collect();

    for change in &flagged {
        info!(
            player_id = %change.player_id,
            previous = change.previous_score,
            current = change.current_score,
            "Score improved by {} strokes",
            change.improvement
        );
    }
    flagged
}
