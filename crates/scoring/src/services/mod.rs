pub mod bonus_detection;
pub mod daily_score;
pub mod manual_bonus;
pub mod notifications;
pub mod position_points;
pub mod ranking_analytics;
pub mod ranking_capture;
pub mod rebuy;
pub mod score_calculator;
pub mod scorecard_changes;

pub use bonus_detection::{BonusContext, detect_bonuses};
pub use daily_score::{calculate_and_save_daily_score, score_slots};
pub use manual_bonus::award_manual_bonus;
pub use notifications::{LogNotifier, Notifier, PoolEvent};
pub use position_points::{RoundTiers, ScoringRules, parse_position};
pub use ranking_capture::{capture_ranking_snapshot, rank_entries};
pub use rebuy::{effective_player_ids, resolve_players};
pub use score_calculator::ScoreCalculator;
pub use scorecard_changes::{MIN_IMPROVEMENT, ScoreImprovement, detect_scorecard_changes};
