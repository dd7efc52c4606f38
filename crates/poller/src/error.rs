use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, PollerError>;

#[derive(Error, Debug)]
pub enum PollerError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Scoring error: {0}")]
    ScoringError(#[from] scoring::ScoringError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid provider data: {0}")]
    ProviderDataError(String),

    #[error("No entry for participant '{0}'")]
    EntryNotFound(String),

    #[error("A poll job is already running for tournament {0}")]
    JobAlreadyRunning(Uuid),
}

impl PollerError {
    /// The connection pool had nothing to hand out in time.
    pub fn is_pool_exhausted(&self) -> bool {
        match self {
            PollerError::DatabaseError(sqlx::Error::PoolTimedOut) => true,
            PollerError::ScoringError(e) => e.is_pool_exhausted(),
            _ => false,
        }
    }
}

impl From<scoring::decode::DecodeError> for PollerError {
    fn from(e: scoring::decode::DecodeError) -> Self {
        PollerError::ProviderDataError(e.to_string())
    }
}
