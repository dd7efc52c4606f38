pub mod database;
pub mod decode;
pub mod dto;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use database::Database;
pub use error::{Result, ScoringError};
pub use repository::{MemoryStore, PgStore, ScoreStore};
