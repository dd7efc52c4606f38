//! Events for outbound notifiers. Formatting and delivery belong to the
//! [`Notifier`] implementation; the scoring core only decides what happened.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::models::BonusType;

/// Minimum rank change, in either direction, reported as a big move.
pub const BIG_MOVE_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    NewLeader {
        tournament_id: Uuid,
        round_id: i32,
        participant_name: String,
        previous_leader: Option<String>,
        total_points: i32,
    },
    BigMove {
        tournament_id: Uuid,
        round_id: i32,
        participant_name: String,
        old_position: i32,
        new_position: i32,
    },
    SpecialBonus {
        tournament_id: Uuid,
        round_id: i32,
        participant_name: String,
        player_id: String,
        player_name: String,
        bonus_type: BonusType,
        hole: Option<i32>,
        points: i32,
    },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &PoolEvent);
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &PoolEvent) {
        match event {
            PoolEvent::NewLeader {
                round_id,
                participant_name,
                previous_leader,
                total_points,
                ..
            } => info!(
                round_id,
                previous = previous_leader.as_deref().unwrap_or("-"),
                "New leader: {} with {} points",
                participant_name,
                total_points
            ),
            PoolEvent::BigMove {
                round_id,
                participant_name,
                old_position,
                new_position,
                ..
            } => info!(
                round_id,
                "{} moved from #{} to #{}",
                participant_name,
                old_position,
                new_position
            ),
            PoolEvent::SpecialBonus {
                round_id,
                participant_name,
                player_name,
                bonus_type,
                hole,
                points,
                ..
            } => info!(
                round_id,
                hole = hole.unwrap_or_default(),
                "{} for {}: {} (+{})",
                bonus_type,
                participant_name,
                player_name,
                points
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: std::sync::Mutex<Vec<PoolEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<PoolEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &PoolEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
    }
}
