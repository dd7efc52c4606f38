pub mod analytics;
pub mod report;

pub use analytics::{EntryHistoryPoint, LeadTime, Mover, PositionStats, RankingAnalytics};
pub use report::{RoundCalculation, RoundReport, RoundSummary, TournamentReport};
