use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_HOST: &str = "live-golf-data.p.rapidapi.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub slash_golf_api_key: String,
    pub slash_golf_api_host: String,
    pub db_max_connections: u32,
    pub poll: PollSettings,
}

/// Hours of the local day, inclusive at both ends, during which the driver
/// polls. A start after the stop wraps past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveHours {
    pub start: u32,
    pub stop: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub active_hours: ActiveHours,
    pub max_consecutive_failures: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let start = env_or("ACTIVE_START_HOUR", 6)?;
        let stop = env_or("ACTIVE_STOP_HOUR", 23)?;

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .context("Cannot load DATABASE_URL env variable")?,
            slash_golf_api_key: std::env::var("SLASH_GOLF_API_KEY").unwrap_or_default(),
            slash_golf_api_host: std::env::var("SLASH_GOLF_API_HOST")
                .unwrap_or_else(|_| DEFAULT_API_HOST.to_string()),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5)?,
            poll: PollSettings {
                interval: Duration::from_secs(env_or("POLL_INTERVAL_SECS", 60)?),
                active_hours: ActiveHours::new(start, stop)
                    .context("ACTIVE_START_HOUR and ACTIVE_STOP_HOUR must be 0-23")?,
                max_consecutive_failures: env_or("MAX_CONSECUTIVE_FAILURES", 5)?,
            },
        })
    }
}

impl ActiveHours {
    pub const ALL_DAY: ActiveHours = ActiveHours { start: 0, stop: 23 };

    pub fn new(start: u32, stop: u32) -> Option<Self> {
        (start < 24 && stop < 24).then_some(Self { start, stop })
    }

    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.stop {
            self.start <= hour && hour <= self.stop
        } else {
            hour >= self.start || hour <= self.stop
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            active_hours: ActiveHours { start: 6, stop: 23 },
            max_consecutive_failures: 5,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number", key)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daytime_window() {
        let hours = ActiveHours::new(6, 23).unwrap();
        assert!(hours.contains(6));
        assert!(hours.contains(23));
        assert!(!hours.contains(5));
        assert!(!hours.contains(0));
    }

    #[test]
    fn test_window_wraps_past_midnight() {
        let hours = ActiveHours::new(22, 6).unwrap();
        assert!(hours.contains(22));
        assert!(hours.contains(0));
        assert!(hours.contains(6));
        assert!(!hours.contains(12));
    }

    #[test]
    fn test_hours_must_exist() {
        assert!(ActiveHours::new(24, 3).is_none());
        assert!(ActiveHours::ALL_DAY.contains(13));
    }
}
