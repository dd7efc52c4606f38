use std::collections::BTreeSet;

use scoring::ScoreStore;
use scoring::dto::RoundCalculation;
use scoring::models::{ScoreSnapshot, ScorecardSet, Tournament, validate_round};
use scoring::services::{ScoreCalculator, ScoreImprovement, detect_scorecard_changes};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::provider::{LeaderboardProvider, TournamentKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub tournament_id: Uuid,
    pub round_id: i32,
    pub snapshot_id: Uuid,
    pub players_on_leaderboard: usize,
    pub improvements: Vec<ScoreImprovement>,
    pub scorecards_fetched: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecheckReport {
    pub sync: SyncReport,
    pub calculation: RoundCalculation,
}

/// Pulls provider data into score snapshots.
pub struct SyncService<'a> {
    store: &'a dyn ScoreStore,
    provider: &'a dyn LeaderboardProvider,
}

impl<'a> SyncService<'a> {
    pub fn new(store: &'a dyn ScoreStore, provider: &'a dyn LeaderboardProvider) -> Self {
        Self { store, provider }
    }

    /// Refreshes the tournament row (name, dates, current round).
    pub async fn sync_tournament(&self, key: &TournamentKey) -> Result<Tournament> {
        let fetched = self.provider.tournament(key).await?.to_tournament()?;
        let stored = self.store.save_tournament(&fetched).await?;
        info!(
            "Synced tournament {} ({}) - round {}",
            stored.name, stored.year, stored.current_round
        );
        Ok(stored)
    }

    /// Tournament then the current round.
    pub async fn sync(&self, key: &TournamentKey) -> Result<SyncReport> {
        let tournament = self.sync_tournament(key).await?;
        self.sync_round(&tournament, tournament.current_round()).await
    }

    /// Stores a new snapshot of the round. Scorecards are fetched only for
    /// players who gained at least two strokes since the previous snapshot;
    /// everyone else keeps the scorecards carried forward from it.
    pub async fn sync_round(&self, tournament: &Tournament, round_id: i32) -> Result<SyncReport> {
        let round_id = validate_round(round_id)?;
        let key = TournamentKey::from(tournament);
        let current = self.provider.leaderboard(&key).await?;
        if let Some(reported) = current.round()
            && reported != round_id
        {
            warn!(
                "Provider leaderboard is for round {}, storing it as round {}",
                reported, round_id
            );
        }

        let previous = self
            .store
            .latest_score_snapshot(tournament.tournament_id, round_id)
            .await?;
        let improvements = detect_scorecard_changes(
            previous.as_ref().map(|snapshot| &snapshot.leaderboard.0),
            &current.leaderboard,
        );

        let mut scorecards = previous
            .map(|snapshot| snapshot.scorecards.0)
            .unwrap_or_default();
        let players = improvements.iter().map(|i| i.player_id.as_str());
        let (fetched, errors) = self.fetch_scorecards(&key, players).await;
        let scorecards_fetched = fetched.len();
        scorecards.merge(fetched);

        let snapshot = ScoreSnapshot::new(
            tournament.tournament_id,
            round_id,
            current.leaderboard,
            scorecards,
        );
        self.store.save_score_snapshot(&snapshot).await?;

        info!(
            "Synced {} round {}: {} players, {} scorecards fetched",
            tournament.name,
            round_id,
            snapshot.leaderboard.rows.len(),
            scorecards_fetched
        );

        Ok(SyncReport {
            tournament_id: tournament.tournament_id,
            round_id,
            snapshot_id: snapshot.snapshot_id,
            players_on_leaderboard: snapshot.leaderboard.rows.len(),
            improvements,
            scorecards_fetched,
            errors,
        })
    }

    /// Backstop for missed bonuses: fetches the scorecards of every player
    /// any entry fields, stores a snapshot and recalculates the round.
    pub async fn recheck_entry_players(
        &self,
        calculator: &ScoreCalculator<'_>,
        tournament_id: Uuid,
        round_id: Option<i32>,
    ) -> Result<RecheckReport> {
        let tournament = self.store.tournament(tournament_id).await?;
        let round_id = validate_round(round_id.unwrap_or_else(|| tournament.current_round()))?;
        let key = TournamentKey::from(&tournament);

        let entries = self.store.entries(tournament_id).await?;
        let players: BTreeSet<&str> = entries
            .iter()
            .flat_map(|entry| entry.all_player_ids())
            .collect();

        let previous = self
            .store
            .latest_score_snapshot(tournament_id, round_id)
            .await?;
        let (leaderboard, mut scorecards) = match previous {
            Some(snapshot) => (snapshot.leaderboard.0, snapshot.scorecards.0),
            None => (
                self.provider.leaderboard(&key).await?.leaderboard,
                ScorecardSet::default(),
            ),
        };

        let (fetched, errors) = self
            .fetch_scorecards(&key, players.iter().copied())
            .await;
        let scorecards_fetched = fetched.len();
        scorecards.merge(fetched);

        let snapshot = ScoreSnapshot::new(tournament_id, round_id, leaderboard, scorecards);
        self.store.save_score_snapshot(&snapshot).await?;
        info!(
            "Rechecked {} entry players for round {} ({} failed)",
            players.len(),
            round_id,
            errors.len()
        );

        let calculation = calculator
            .calculate_scores_for_tournament(tournament_id, Some(round_id))
            .await?;

        Ok(RecheckReport {
            sync: SyncReport {
                tournament_id,
                round_id,
                snapshot_id: snapshot.snapshot_id,
                players_on_leaderboard: snapshot.leaderboard.rows.len(),
                improvements: Vec::new(),
                scorecards_fetched,
                errors,
            },
            calculation,
        })
    }

    /// A failed player is reported and skipped.
    async fn fetch_scorecards<'p>(
        &self,
        key: &TournamentKey,
        players: impl Iterator<Item = &'p str>,
    ) -> (ScorecardSet, Vec<String>) {
        let mut fetched = ScorecardSet::default();
        let mut errors = Vec::new();

        for player_id in players {
            if fetched.players.contains_key(player_id) {
                continue;
            }
            match self.provider.scorecards(key, player_id).await {
                Ok(rounds) => fetched.insert(player_id, rounds),
                Err(e) => {
                    let message = format!("Failed to fetch scorecard for player {}: {}", player_id, e);
                    warn!("{}", message);
                    errors.push(message);
                }
            }
        }

        (fetched, errors)
    }
}

#[cfg(test)]
mod tests {
    use scoring::MemoryStore;
    use scoring::services::{LogNotifier, ScoringRules};
    use serde_json::json;

    use super::*;
    use crate::entries::{EntryImport, import_entries};
    use crate::provider::{FixtureProvider, ProviderLeaderboard, provider_fixture};

    fn leaderboard(scores: &[(&str, &str, &str)]) -> ProviderLeaderboard {
        let rows: Vec<_> = scores
            .iter()
            .map(|(id, position, score)| {
                json!({"playerId": id, "position": position, "status": "active", "currentRoundScore": score})
            })
            .collect();
        serde_json::from_value(json!({"roundId": 1, "leaderboardRows": rows})).unwrap()
    }

    fn hole_in_one_card() -> Vec<scoring::models::ScorecardRound> {
        serde_json::from_value(json!([
            {"roundId": {"$numberInt": "1"}, "holes": {"16": {"holeScore": 1, "par": 3}}}
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_sync_fetches_no_scorecards() {
        let store = MemoryStore::new();
        let provider = FixtureProvider::new(&provider_fixture(leaderboard(&[("p1", "1", "-3")])));
        let sync = SyncService::new(&store, &provider);

        let report = sync.sync(&TournamentKey::new("1", "014", 2025)).await.unwrap();
        assert_eq!(report.round_id, 1);
        assert_eq!(report.players_on_leaderboard, 1);
        assert_eq!(report.scorecards_fetched, 0);
        assert!(provider.scorecard_requests().is_empty());
    }

    #[tokio::test]
    async fn test_improvement_fetches_and_carries_scorecards() {
        let store = MemoryStore::new();
        let provider = FixtureProvider::new(&provider_fixture(leaderboard(&[
            ("p1", "1", "-3"),
            ("p2", "2", "-2"),
            ("p3", "3", "E"),
        ])));
        let sync = SyncService::new(&store, &provider);
        let key = TournamentKey::new("1", "014", 2025);
        let tournament = sync.sync_tournament(&key).await.unwrap();
        sync.sync_round(&tournament, 1).await.unwrap();

        provider.set_leaderboard(leaderboard(&[("p1", "1", "-5"), ("p2", "2", "-3"), ("p3", "3", "-2")]));
        provider.set_scorecards("p1", hole_in_one_card());
        provider.fail_player("p3");
        let report = sync.sync_round(&tournament, 1).await.unwrap();

        let flagged: Vec<&str> = report.improvements.iter().map(|i| i.player_id.as_str()).collect();
        assert_eq!(flagged, vec!["p1", "p3"]);
        assert_eq!(report.scorecards_fetched, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("p3"));

        // Nothing moved: no fetch, but the earlier scorecard is kept.
        let report = sync.sync_round(&tournament, 1).await.unwrap();
        assert_eq!(report.scorecards_fetched, 0);
        let latest = store
            .latest_score_snapshot(tournament.tournament_id, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.snapshot_id, report.snapshot_id);
        assert_eq!(latest.scorecards.rounds_for("p1", 1).count(), 1);
    }

    #[tokio::test]
    async fn test_recheck_fetches_entry_players_and_scores() {
        let store = MemoryStore::new();
        let provider = FixtureProvider::new(&provider_fixture(leaderboard(&[
            ("p1", "1", "-4"),
            ("p2", "T2", "-2"),
        ])));
        provider.set_scorecards("p1", hole_in_one_card());
        let sync = SyncService::new(&store, &provider);
        let tournament = sync
            .sync_tournament(&TournamentKey::new("1", "014", 2025))
            .await
            .unwrap();
        import_entries(
            &store,
            tournament.tournament_id,
            vec![EntryImport {
                participant_name: "Alice".to_string(),
                player_ids: (1..=6).map(|n| format!("p{}", n)).collect(),
                rebuy_type: None,
                rebuys: Vec::new(),
            }],
        )
        .await
        .unwrap();

        let rules = ScoringRules::default();
        let calculator = ScoreCalculator::new(&store, &rules, &LogNotifier);
        let report = sync
            .recheck_entry_players(&calculator, tournament.tournament_id, None)
            .await
            .unwrap();

        assert_eq!(provider.scorecard_requests().len(), 6);
        assert_eq!(report.sync.scorecards_fetched, 6);
        let round = report.calculation.report().unwrap();
        assert_eq!(round.entries_updated, 1);

        let entry = &store.entries(tournament.tournament_id).await.unwrap()[0];
        let score = store.daily_score(entry.entry_id, 1).await.unwrap().unwrap();
        // Leader 8, top-5 5, hole-in-one 3. Nobody has finished, so no low score.
        assert_eq!(score.total_points, 16);
    }
}
