pub mod bonus_point;
pub mod daily_score;
pub mod entry;
pub mod leaderboard;
pub mod ranking_snapshot;
pub mod score_snapshot;
pub mod scorecard;
pub mod tournament;

pub use bonus_point::{BonusAward, BonusKey, BonusPoint, BonusPointRow, BonusType};
pub use daily_score::{DailyScore, NewDailyScore, ScoreBreakdown, SlotBreakdown, SlotOutcome};
pub use entry::{Entry, Rebuy, RebuyType, SLOTS_PER_ENTRY};
pub use leaderboard::{Leaderboard, LeaderboardRow, PlayerStatus, parse_round_score};
pub use ranking_snapshot::{NewRankingSnapshot, RankingSnapshot};
pub use score_snapshot::ScoreSnapshot;
pub use scorecard::{HoleResult, ScorecardRound, ScorecardSet};
pub use tournament::{FINAL_ROUND, FIRST_ROUND, Tournament, validate_round};
