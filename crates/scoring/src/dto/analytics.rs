use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryHistoryPoint {
    pub round_id: i32,
    pub position: i32,
    pub total_points: i32,
    pub points_behind_leader: i32,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mover {
    pub entry_id: Uuid,
    pub participant_name: String,
    pub first_position: i32,
    pub last_position: i32,
    /// Positive when the entry climbed.
    pub change: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionStats {
    pub position: i32,
    pub unique_entries: usize,
    pub snapshots: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadTime {
    pub entry_id: Uuid,
    pub participant_name: String,
    pub seconds_in_lead: i64,
    pub captures_in_lead: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RankingAnalytics {
    pub tournament_id: Uuid,
    pub captures: usize,
    pub biggest_movers: Vec<Mover>,
    pub position_distribution: Vec<PositionStats>,
    pub time_in_lead: Vec<LeadTime>,
}
