use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::notifications::{BIG_MOVE_THRESHOLD, Notifier, PoolEvent};
use crate::error::Result;
use crate::models::{DailyScore, Entry, NewRankingSnapshot, RankingSnapshot};
use crate::repository::ScoreStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    pub entry_id: Uuid,
    pub position: i32,
    pub total_points: i32,
    pub points_behind_leader: i32,
}

/// Orders entries by running total, highest first.
///
/// Equal totals keep the order of `entries` and still get distinct
/// positions, so ties depend on entry order.
pub fn rank_entries(entries: &[Entry], scores: &[DailyScore]) -> Vec<RankedEntry> {
    let mut totals: HashMap<Uuid, i32> = HashMap::new();
    for score in scores {
        *totals.entry(score.entry_id).or_default() += score.total_points;
    }

    let mut standings: Vec<(Uuid, i32)> = entries
        .iter()
        .map(|entry| {
            let total = totals.get(&entry.entry_id).copied().unwrap_or(0);
            (entry.entry_id, total)
        })
        .collect();
    standings.sort_by(|a, b| b.1.cmp(&a.1));

    let leader_points = standings.first().map(|(_, total)| *total).unwrap_or(0);

    standings
        .into_iter()
        .zip(1..)
        .map(|((entry_id, total_points), position)| RankedEntry {
            entry_id,
            position,
            total_points,
            points_behind_leader: if leader_points > 0 {
                leader_points - total_points
            } else {
                0
            },
        })
        .collect()
}

/// Appends one ranking row per entry, whether or not its total moved, and
/// reports leader changes and big moves against the previous capture.
pub async fn capture_ranking_snapshot(
    store: &dyn ScoreStore,
    notifier: &dyn Notifier,
    tournament_id: Uuid,
    round_id: i32,
) -> Result<Vec<RankingSnapshot>> {
    let entries = store.entries(tournament_id).await?;
    if entries.is_empty() {
        warn!(%tournament_id, "No entries to rank");
        return Ok(Vec::new());
    }

    let previous = store.latest_ranking_capture(tournament_id).await?;
    let scores = store.daily_scores_for_tournament(tournament_id).await?;
    let ranked = rank_entries(&entries, &scores);

    let capture_id = Uuid::new_v4();
    let captured_at = Utc::now();
    let rows: Vec<NewRankingSnapshot> = ranked
        .iter()
        .map(|r| NewRankingSnapshot {
            capture_id,
            tournament_id,
            entry_id: r.entry_id,
            round_id,
            position: r.position,
            total_points: r.total_points,
            points_behind_leader: r.points_behind_leader,
            captured_at,
        })
        .collect();

    let inserted = store.append_ranking_snapshots(&rows).await?;
    info!(
        %tournament_id,
        round_id,
        count = inserted.len(),
        "Captured ranking snapshot"
    );

    for event in position_events(&entries, &previous, &inserted, tournament_id, round_id) {
        notifier.notify(&event).await;
    }

    Ok(inserted)
}

fn position_events(
    entries: &[Entry],
    previous: &[RankingSnapshot],
    current: &[RankingSnapshot],
    tournament_id: Uuid,
    round_id: i32,
) -> Vec<PoolEvent> {
    if previous.is_empty() {
        return Vec::new();
    }

    let names: HashMap<Uuid, &str> = entries
        .iter()
        .map(|e| (e.entry_id, e.participant_name.as_str()))
        .collect();
    let name = |entry_id: Uuid| names.get(&entry_id).copied().unwrap_or("unknown").to_string();

    let mut events = Vec::new();

    let old_leader = previous.iter().find(|r| r.position == 1);
    let new_leader = current.iter().find(|r| r.position == 1);
    if let Some(new_leader) = new_leader
        && old_leader.map(|r| r.entry_id) != Some(new_leader.entry_id)
    {
        events.push(PoolEvent::NewLeader {
            tournament_id,
            round_id,
            participant_name: name(new_leader.entry_id),
            previous_leader: old_leader.map(|r| name(r.entry_id)),
            total_points: new_leader.total_points,
        });
    }

    let old_positions: HashMap<Uuid, i32> =
        previous.iter().map(|r| (r.entry_id, r.position)).collect();
    for row in current {
        let Some(&old_position) = old_positions.get(&row.entry_id) else {
            continue;
        };
        if (old_position - row.position).abs() >= BIG_MOVE_THRESHOLD {
            events.push(PoolEvent::BigMove {
                tournament_id,
                round_id,
                participant_name: name(row.entry_id),
                old_position,
                new_position: row.position,
            });
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use sqlx::types::Json;

    use super::*;
    use crate::models::ScoreBreakdown;
    use crate::repository::MemoryStore;
    use crate::services::notifications::RecordingNotifier;

    fn entries(tournament_id: Uuid, count: usize) -> Vec<Entry> {
        (0..count)
            .map(|i| {
                let players = (1..=6).map(|n| format!("{}-{}", i, n)).collect();
                Entry::new(tournament_id, format!("Entry {}", i), players)
            })
            .collect()
    }

    fn daily(entry_id: Uuid, round_id: i32, total: i32) -> DailyScore {
        DailyScore {
            daily_score_id: Uuid::new_v4(),
            entry_id,
            round_id,
            score_date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            base_points: total,
            bonus_points: 0,
            total_points: total,
            breakdown: Json(ScoreBreakdown::default()),
            calculated_at: Utc::now(),
        }
    }

    #[test]
    fn test_rank_entries_sums_rounds() {
        let list = entries(Uuid::new_v4(), 3);
        let scores = vec![
            daily(list[0].entry_id, 1, 10),
            daily(list[1].entry_id, 1, 8),
            daily(list[1].entry_id, 2, 9),
            daily(list[2].entry_id, 1, 3),
        ];
        let ranked = rank_entries(&list, &scores);

        assert_eq!(ranked[0].entry_id, list[1].entry_id);
        assert_eq!(ranked[0].total_points, 17);
        assert_eq!(ranked[1].points_behind_leader, 7);
        assert_eq!(ranked[2].points_behind_leader, 14);
        assert_eq!(
            ranked.iter().map(|r| r.position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_ties_keep_entry_order() {
        let list = entries(Uuid::new_v4(), 3);
        let scores = vec![
            daily(list[0].entry_id, 1, 5),
            daily(list[1].entry_id, 1, 5),
            daily(list[2].entry_id, 1, 5),
        ];
        let ranked = rank_entries(&list, &scores);
        let order: Vec<Uuid> = ranked.iter().map(|r| r.entry_id).collect();
        assert_eq!(order, list.iter().map(|e| e.entry_id).collect::<Vec<_>>());
        assert!(ranked.iter().all(|r| r.points_behind_leader == 0));
    }

    #[test]
    fn test_no_points_means_nobody_behind() {
        let list = entries(Uuid::new_v4(), 2);
        let ranked = rank_entries(&list, &[]);
        assert!(ranked.iter().all(|r| r.total_points == 0 && r.points_behind_leader == 0));
    }

    #[tokio::test]
    async fn test_capture_is_a_permutation_and_appends() {
        let store = MemoryStore::new();
        let notifier = RecordingNotifier::default();
        let tournament_id = Uuid::new_v4();
        let list = entries(tournament_id, 7);
        for entry in &list {
            store.save_entry(entry).await.unwrap();
        }

        let first = capture_ranking_snapshot(&store, &notifier, tournament_id, 1)
            .await
            .unwrap();
        let mut positions: Vec<i32> = first.iter().map(|r| r.position).collect();
        positions.sort();
        assert_eq!(positions, (1..=7).collect::<Vec<_>>());
        assert!(first.iter().all(|r| r.capture_id == first[0].capture_id));

        capture_ranking_snapshot(&store, &notifier, tournament_id, 1)
            .await
            .unwrap();
        assert_eq!(store.ranking_snapshots(tournament_id).await.unwrap().len(), 14);
        assert!(notifier.events().is_empty());
    }

    #[test]
    fn test_leader_change_and_big_move_events() {
        let tournament_id = Uuid::new_v4();
        let list = entries(tournament_id, 7);
        let row = |entry: &Entry, position: i32, total: i32| RankingSnapshot {
            ranking_snapshot_id: Uuid::new_v4(),
            capture_id: Uuid::nil(),
            tournament_id,
            entry_id: entry.entry_id,
            round_id: 1,
            position,
            total_points: total,
            points_behind_leader: 0,
            captured_at: Utc::now(),
        };
        let previous = vec![row(&list[0], 1, 20), row(&list[6], 7, 2)];
        let current = vec![row(&list[6], 1, 25), row(&list[0], 2, 20)];

        let events = position_events(&list, &previous, &current, tournament_id, 2);
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            PoolEvent::NewLeader {
                tournament_id,
                round_id: 2,
                participant_name: "Entry 6".to_string(),
                previous_leader: Some("Entry 0".to_string()),
                total_points: 25,
            }
        );
        assert!(matches!(
            events[1],
            PoolEvent::BigMove { old_position: 7, new_position: 1, .. }
        ));
    }
}
