use thiserror::Error;

use crate::decode::DecodeError;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Round {0} is outside 1-4")]
    InvalidRound(i32),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScoringError>;

impl ScoringError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            ScoringError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23505")
        )
    }

    /// Transient pool pressure; worth retrying after a pause.
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, ScoringError::Database(sqlx::Error::PoolTimedOut))
    }
}
