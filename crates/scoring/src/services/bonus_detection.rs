use std::collections::HashSet;

use tracing::{debug, warn};

use super::rebuy::effective_player_ids;
use crate::models::{
    BonusAward, BonusPoint, BonusType, Entry, Leaderboard, PlayerStatus, ScorecardSet,
};

/// Round to which the all-six-make-the-cut bonus belongs.
pub const WEEKEND_BONUS_ROUND: i32 = 3;

/// Everything detection reads for one entry and round.
pub struct BonusContext<'a> {
    pub round_id: i32,
    pub leaderboard: &'a Leaderboard,
    pub scorecards: &'a ScorecardSet,
    /// Bonus rows already persisted for this entry and round.
    pub existing: &'a [BonusPoint],
}

/// Produces the bonus awards for `entry` in one round, deduplicated by
/// (type, player, hole).
///
/// Marks `weekend_bonus_earned` on the entry the first time the team bonus
/// is awarded.
pub fn detect_bonuses(entry: &mut Entry, ctx: &BonusContext<'_>) -> Vec<BonusAward> {
    let players: Vec<String> = effective_player_ids(entry, ctx.round_id)
        .into_iter()
        .map(str::to_string)
        .collect();

    let mut awards = Vec::new();
    awards.extend(manual_bonuses(&players, ctx.existing));

    if let Some(low) = low_score_player(ctx.leaderboard)
        && players.iter().any(|p| p == low)
    {
        awards.push(BonusAward::new(BonusType::LowScore, Some(low), None));
    }

    for player_id in &players {
        awards.extend(hole_bonuses(player_id, ctx.round_id, ctx.scorecards));
    }

    if let Some(award) = weekend_bonus(entry, ctx) {
        awards.push(award);
    }

    let mut seen = HashSet::new();
    awards.retain(|award| seen.insert(award.key()));

    debug!(
        entry_id = %entry.entry_id,
        round_id = ctx.round_id,
        bonuses = awards.len(),
        "Detected bonuses"
    );
    awards
}

/// Manual rows survive only while their player still counts for the entry.
fn manual_bonuses(players: &[String], existing: &[BonusPoint]) -> Vec<BonusAward> {
    existing
        .iter()
        .filter(|bonus| bonus.bonus_type.is_manual())
        .filter(|bonus| {
            bonus
                .player_id
                .as_ref()
                .is_some_and(|id| players.contains(id))
        })
        .map(BonusPoint::award)
        .collect()
}

/// The completed player with the lowest round score. The first one scanned
/// wins a tie, so the result follows the provider's row order.
pub fn low_score_player(leaderboard: &Leaderboard) -> Option<&str> {
    let mut best: Option<(i32, &str)> = None;
    for row in &leaderboard.rows {
        if row.status != PlayerStatus::Complete {
            continue;
        }
        let Some(score) = row.round_score() else {
            continue;
        };
        if best.is_none_or(|(low, _)| score < low) {
            best = Some((score, row.player_id.as_str()));
        }
    }
    best.map(|(_, player_id)| player_id)
}

fn hole_bonuses(player_id: &str, round_id: i32, scorecards: &ScorecardSet) -> Vec<BonusAward> {
    let mut awards = Vec::new();
    for round in scorecards.rounds_for(player_id, round_id) {
        for (hole, result) in round.numbered_holes() {
            let (strokes, par) = match result.strokes_and_par() {
                Ok(Some(played)) => played,
                Ok(None) => continue,
                Err(e) => {
                    warn!(player_id, hole, error = %e, "Skipping unreadable hole");
                    continue;
                }
            };

            let bonus_type = if strokes == 1 && par == 3 {
                BonusType::HoleInOne
            } else if strokes - par == -3 {
                BonusType::DoubleEagle
            } else if strokes - par == -2 {
                BonusType::Eagle
            } else {
                continue;
            };
            awards.push(BonusAward::new(bonus_type, Some(player_id), Some(hole)));
        }
    }
    awards
}

/// Team bonus: all six original picks still in the field after the cut.
/// Rebuys do not count, and an underperformer rebuy forfeits it.
fn weekend_bonus(entry: &mut Entry, ctx: &BonusContext<'_>) -> Option<BonusAward> {
    if ctx.round_id != WEEKEND_BONUS_ROUND || entry.weekend_bonus_forfeited {
        return None;
    }

    if entry.weekend_bonus_earned {
        // Once earned it stays, whatever later polls say about the field.
        let award = ctx
            .existing
            .iter()
            .find(|bonus| bonus.bonus_type == BonusType::AllMakeCut)
            .map(BonusPoint::award)
            .unwrap_or_else(|| BonusAward::new(BonusType::AllMakeCut, None, None));
        return Some(award);
    }

    let all_made_cut = entry.player_ids.iter().all(|player_id| {
        ctx.leaderboard
            .row(player_id)
            .is_none_or(|row| !row.status.is_eliminated())
    });
    if !all_made_cut {
        return None;
    }

    entry.weekend_bonus_earned = true;
    Some(BonusAward::new(BonusType::AllMakeCut, None, None))
}
