use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::daily_score::{ScoredEntry, calculate_and_save_daily_score};
use super::notifications::{Notifier, PoolEvent};
use super::position_points::ScoringRules;
use super::ranking_capture::capture_ranking_snapshot;
use crate::dto::{RoundCalculation, RoundReport, RoundSummary, TournamentReport};
use crate::error::Result;
use crate::models::{Entry, FIRST_ROUND, ScoreSnapshot, validate_round};
use crate::repository::ScoreStore;

/// Drives the daily score calculation over every entry of a tournament.
pub struct ScoreCalculator<'a> {
    store: &'a dyn ScoreStore,
    rules: &'a ScoringRules,
    notifier: &'a dyn Notifier,
}

impl<'a> ScoreCalculator<'a> {
    pub fn new(
        store: &'a dyn ScoreStore,
        rules: &'a ScoringRules,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            store,
            rules,
            notifier,
        }
    }

    /// Scores every entry for `round_id` (the tournament's current round when
    /// `None`) from the latest stored snapshot, then captures the rankings.
    ///
    /// A failing entry is logged and reported without stopping the others.
    pub async fn calculate_scores_for_tournament(
        &self,
        tournament_id: Uuid,
        round_id: Option<i32>,
    ) -> Result<RoundCalculation> {
        let tournament = self.store.tournament(tournament_id).await?;
        let round_id = validate_round(round_id.unwrap_or_else(|| tournament.current_round()))?;

        let Some(snapshot) = self
            .store
            .latest_score_snapshot(tournament_id, round_id)
            .await?
        else {
            warn!(%tournament_id, round_id, "No score snapshot for round");
            return Ok(RoundCalculation::missing_snapshot(tournament_id, round_id));
        };

        let mut report = RoundReport {
            tournament_id,
            round_id,
            ..Default::default()
        };

        let entries = self.store.entries(tournament_id).await?;
        for mut entry in entries {
            report.entries_processed += 1;
            match calculate_and_save_daily_score(
                self.store,
                self.rules,
                &tournament,
                &mut entry,
                &snapshot,
            )
            .await
            {
                Ok(scored) => {
                    report.entries_updated += 1;
                    debug!(
                        entry_id = %entry.entry_id,
                        total_points = scored.daily_score.total_points,
                        "Calculated entry score"
                    );
                    self.announce_special_bonuses(&entry, &snapshot, &scored)
                        .await;
                }
                Err(e) => {
                    let message =
                        format!("Error calculating score for entry {}: {}", entry.entry_id, e);
                    error!("{}", message);
                    report.errors.push(message);
                }
            }
        }

        info!(
            %tournament_id,
            round_id,
            updated = report.entries_updated,
            failed = report.errors.len(),
            "Calculated round scores"
        );

        if report.entries_updated > 0 {
            match capture_ranking_snapshot(self.store, self.notifier, tournament_id, round_id).await
            {
                Ok(rows) => report.rankings_captured = rows.len(),
                Err(e) => {
                    warn!(%tournament_id, round_id, error = %e, "Ranking snapshot failed");
                    report
                        .errors
                        .push(format!("Warning: Ranking snapshot failed: {}", e));
                }
            }
        }

        Ok(RoundCalculation::Completed(report))
    }

    /// Recalculates rounds 1 through the current round in order. A failed
    /// round is recorded and the next one still runs.
    pub async fn calculate_all_rounds(&self, tournament_id: Uuid) -> Result<TournamentReport> {
        let tournament = self.store.tournament(tournament_id).await?;
        let mut report = TournamentReport {
            tournament_id,
            ..Default::default()
        };

        for round_id in FIRST_ROUND..=tournament.current_round() {
            match self
                .calculate_scores_for_tournament(tournament_id, Some(round_id))
                .await
            {
                Ok(RoundCalculation::Completed(round)) => {
                    report.total_entries_processed += round.entries_processed;
                    report.rounds_processed.push(RoundSummary {
                        round_id,
                        entries_processed: round.entries_processed,
                        entries_updated: round.entries_updated,
                    });
                    report.errors.extend(
                        round
                            .errors
                            .into_iter()
                            .map(|e| format!("Round {}: {}", round_id, e)),
                    );
                }
                Ok(RoundCalculation::MissingSnapshot { message, .. }) => {
                    report.errors.push(format!("Round {}: {}", round_id, message));
                }
                Err(e) => {
                    let message = format!("Error calculating round {}: {}", round_id, e);
                    error!("{}", message);
                    report.errors.push(message);
                }
            }
        }

        Ok(report)
    }

    async fn announce_special_bonuses(
        &self,
        entry: &Entry,
        snapshot: &ScoreSnapshot,
        scored: &ScoredEntry,
    ) {
        for award in scored
            .new_bonuses
            .iter()
            .filter(|award| award.bonus_type.is_special())
        {
            let player_id = award.player_id.clone().unwrap_or_default();
            let player_name = snapshot
                .leaderboard
                .0
                .row(&player_id)
                .map(|row| row.display_name())
                .unwrap_or_else(|| player_id.clone());

            let event = PoolEvent::SpecialBonus {
                tournament_id: snapshot.tournament_id,
                round_id: snapshot.round_id,
                participant_name: entry.participant_name.clone(),
                player_id,
                player_name,
                bonus_type: award.bonus_type,
                hole: award.hole,
                points: award.points,
            };
            self.notifier.notify(&event).await;
        }
    }
}
