use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Result, ScoringError};

pub const FIRST_ROUND: i32 = 1;
pub const FINAL_ROUND: i32 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tournament {
    pub tournament_id: Uuid,
    pub name: String,
    /// Provider organisation id (PGA Tour is "1").
    pub org_id: String,
    /// Provider tournament id.
    pub tourn_id: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub current_round: i32,
}

impl Tournament {
    /// Day a round is played, one round per day starting at `start_date`.
    pub fn round_date(&self, round_id: i32) -> NaiveDate {
        let offset = u64::try_from(round_id - FIRST_ROUND).unwrap_or(0);
        self.start_date
            .checked_add_days(Days::new(offset))
            .unwrap_or(self.end_date)
    }

    pub fn is_active_on(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    pub fn current_round(&self) -> i32 {
        self.current_round.clamp(FIRST_ROUND, FINAL_ROUND)
    }
}

pub fn validate_round(round_id: i32) -> Result<i32> {
    if (FIRST_ROUND..=FINAL_ROUND).contains(&round_id) {
        Ok(round_id)
    } else {
        Err(ScoringError::InvalidRound(round_id))
    }
}
