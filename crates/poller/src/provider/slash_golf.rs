use std::time::Duration;

use async_trait::async_trait;
use scoring::models::ScorecardRound;
use serde::de::DeserializeOwned;

use super::{LeaderboardProvider, ProviderLeaderboard, ProviderTournament, TournamentKey};
use crate::error::{PollerError, Result};

/// Client for the Slash Golf live data API on RapidAPI.
pub struct SlashGolfClient {
    base_url: String,
    api_host: String,
    api_key: String,
    client: reqwest::Client,
}

impl SlashGolfClient {
    pub fn new(api_host: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let api_host = api_host.into();
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PollerError::ProviderDataError(
                "SLASH_GOLF_API_KEY is not set".to_string(),
            ));
        }

        Ok(Self {
            base_url: format!("https://{}", api_host),
            api_host,
            api_key,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()?,
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .header("x-rapidapi-host", &self.api_host)
            .header("x-rapidapi-key", &self.api_key)
            .query(params)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<T>().await?)
    }
}

fn tournament_params<'a>(key: &'a TournamentKey, year: &'a str) -> [(&'static str, &'a str); 3] {
    [
        ("orgId", key.org_id.as_str()),
        ("tournId", key.tourn_id.as_str()),
        ("year", year),
    ]
}

#[async_trait]
impl LeaderboardProvider for SlashGolfClient {
    async fn tournament(&self, key: &TournamentKey) -> Result<ProviderTournament> {
        let year = key.year.to_string();
        tracing::info!("Fetching tournament info for {} ({})", key.tourn_id, year);
        self.get("/tournament", &tournament_params(key, &year)).await
    }

    async fn leaderboard(&self, key: &TournamentKey) -> Result<ProviderLeaderboard> {
        let year = key.year.to_string();
        tracing::info!("Fetching leaderboard for {} ({})", key.tourn_id, year);
        self.get("/leaderboard", &tournament_params(key, &year)).await
    }

    async fn scorecards(&self, key: &TournamentKey, player_id: &str) -> Result<Vec<ScorecardRound>> {
        let year = key.year.to_string();
        let mut params = tournament_params(key, &year).to_vec();
        params.push(("playerId", player_id));
        self.get("/scorecard", &params).await
    }
}
