use std::collections::HashSet;

use tracing::debug;

use super::bonus_detection::{BonusContext, detect_bonuses};
use super::position_points::{ScoringRules, is_elimination_marker};
use super::rebuy::resolve_players;
use crate::error::Result;
use crate::models::{
    BonusAward, BonusKey, DailyScore, Entry, FINAL_ROUND, Leaderboard, NewDailyScore,
    ScoreBreakdown, ScoreSnapshot, SlotBreakdown, SlotOutcome, Tournament, validate_round,
};
use crate::repository::ScoreStore;

/// Result of scoring one entry for one round.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredEntry {
    pub daily_score: DailyScore,
    /// Awards that were not persisted before this pass.
    pub new_bonuses: Vec<BonusAward>,
}

/// Per-slot outcome for the players who count in `round_id`.
pub fn score_slots(
    rules: &ScoringRules,
    entry: &Entry,
    round_id: i32,
    leaderboard: &Leaderboard,
) -> Vec<SlotBreakdown> {
    let winner = if round_id == FINAL_ROUND {
        leaderboard.winner().map(|row| row.player_id.as_str())
    } else {
        None
    };

    resolve_players(entry, round_id)
        .into_iter()
        .map(|resolved| {
            let player_id = resolved.player_id.to_string();
            let Some(row) = leaderboard.row(resolved.player_id) else {
                return SlotBreakdown {
                    slot: resolved.slot,
                    outcome: SlotOutcome::NotListed { player_id },
                };
            };

            let points = rules.position_points(
                row.position.as_deref(),
                round_id,
                winner == Some(resolved.player_id),
                &row.status,
            );
            let eliminated = row.status.is_eliminated()
                || row.position.as_deref().is_some_and(is_elimination_marker);

            let outcome = match resolved.original_player_id {
                Some(original) => SlotOutcome::Substituted {
                    original_player_id: original.to_string(),
                    player_id,
                    position: row.position.clone(),
                    status: row.status.clone(),
                    points,
                },
                None if eliminated => SlotOutcome::Eliminated {
                    player_id,
                    position: row.position.clone(),
                    status: row.status.clone(),
                },
                None => SlotOutcome::Scored {
                    player_id,
                    position: row.position.clone(),
                    status: row.status.clone(),
                    points,
                },
            };

            SlotBreakdown {
                slot: resolved.slot,
                outcome,
            }
        })
        .collect()
}

/// Scores `entry` against the snapshot's round and upserts the result.
///
/// Running it again on the same snapshot leaves the stored score and bonus
/// rows unchanged. May set `weekend_bonus_earned` on the entry.
pub async fn calculate_and_save_daily_score(
    store: &dyn ScoreStore,
    rules: &ScoringRules,
    tournament: &Tournament,
    entry: &mut Entry,
    snapshot: &ScoreSnapshot,
) -> Result<ScoredEntry> {
    let round_id = validate_round(snapshot.round_id)?;
    let leaderboard = &snapshot.leaderboard.0;

    let slots = score_slots(rules, entry, round_id, leaderboard);
    let existing = store.bonus_points(entry.entry_id, round_id).await?;

    let was_earned = entry.weekend_bonus_earned;
    let awards = detect_bonuses(
        entry,
        &BonusContext {
            round_id,
            leaderboard,
            scorecards: &snapshot.scorecards.0,
            existing: &existing,
        },
    );

    let breakdown = ScoreBreakdown {
        slots,
        bonuses: awards.clone(),
    };
    let base_points = breakdown.base_points();
    let bonus_points = breakdown.bonus_points();

    let score = NewDailyScore {
        entry_id: entry.entry_id,
        round_id,
        score_date: tournament.round_date(round_id),
        base_points,
        bonus_points,
        total_points: base_points + bonus_points,
        breakdown,
    };
    let daily_score = store.save_daily_score(&score, &awards).await?;

    if entry.weekend_bonus_earned && !was_earned {
        store.set_weekend_bonus_earned(entry.entry_id).await?;
    }

    let persisted: HashSet<BonusKey> = existing.iter().map(|bonus| bonus.key()).collect();
    let new_bonuses: Vec<BonusAward> = awards
        .into_iter()
        .filter(|award| !persisted.contains(&award.key()))
        .collect();

    debug!(
        entry_id = %entry.entry_id,
        round_id,
        base_points,
        bonus_points,
        "Saved daily score"
    );

    Ok(ScoredEntry {
        daily_score,
        new_bonuses,
    })
}
