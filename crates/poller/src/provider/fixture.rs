use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use scoring::models::ScorecardRound;
use serde::Deserialize;

use super::{LeaderboardProvider, ProviderLeaderboard, ProviderTournament, TournamentKey};
use crate::entries::EntryImport;
use crate::error::{PollerError, Result};

/// Recorded provider documents plus the entries to score against them.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub tournament: ProviderTournament,
    pub leaderboard: ProviderLeaderboard,
    #[serde(default)]
    pub scorecards: BTreeMap<String, Vec<ScorecardRound>>,
    #[serde(default)]
    pub entries: Vec<EntryImport>,
}

/// Serves a [`Fixture`] instead of calling the network. The leaderboard can
/// be swapped between polls and players can be made to fail.
pub struct FixtureProvider {
    state: Mutex<State>,
}

struct State {
    tournament: ProviderTournament,
    leaderboard: ProviderLeaderboard,
    scorecards: BTreeMap<String, Vec<ScorecardRound>>,
    failing_players: BTreeSet<String>,
    unavailable: bool,
    scorecard_requests: Vec<String>,
}

impl FixtureProvider {
    pub fn new(fixture: &Fixture) -> Self {
        Self {
            state: Mutex::new(State {
                tournament: fixture.tournament.clone(),
                leaderboard: fixture.leaderboard.clone(),
                scorecards: fixture.scorecards.clone(),
                failing_players: BTreeSet::new(),
                unavailable: false,
                scorecard_requests: Vec::new(),
            }),
        }
    }

    pub async fn load(path: &Path) -> Result<(Self, Fixture)> {
        let raw = tokio::fs::read_to_string(path).await?;
        let fixture: Fixture = serde_json::from_str(&raw)?;
        Ok((Self::new(&fixture), fixture))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_leaderboard(&self, leaderboard: ProviderLeaderboard) {
        self.state().leaderboard = leaderboard;
    }

    pub fn set_scorecards(&self, player_id: &str, rounds: Vec<ScorecardRound>) {
        self.state().scorecards.insert(player_id.to_string(), rounds);
    }

    pub fn fail_player(&self, player_id: &str) {
        self.state().failing_players.insert(player_id.to_string());
    }

    /// Makes every request fail until called again with `false`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// Player ids whose scorecards were requested, in request order.
    pub fn scorecard_requests(&self) -> Vec<String> {
        self.state().scorecard_requests.clone()
    }

    fn check_available(state: &State) -> Result<()> {
        if state.unavailable {
            return Err(PollerError::ProviderDataError(
                "provider unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LeaderboardProvider for FixtureProvider {
    async fn tournament(&self, _key: &TournamentKey) -> Result<ProviderTournament> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.tournament.clone())
    }

    async fn leaderboard(&self, _key: &TournamentKey) -> Result<ProviderLeaderboard> {
        let state = self.state();
        Self::check_available(&state)?;
        Ok(state.leaderboard.clone())
    }

    async fn scorecards(&self, _key: &TournamentKey, player_id: &str) -> Result<Vec<ScorecardRound>> {
        let mut state = self.state();
        Self::check_available(&state)?;
        state.scorecard_requests.push(player_id.to_string());
        if state.failing_players.contains(player_id) {
            return Err(PollerError::ProviderDataError(format!(
                "no scorecard for player {}",
                player_id
            )));
        }
        Ok(state.scorecards.get(player_id).cloned().unwrap_or_default())
    }
}
