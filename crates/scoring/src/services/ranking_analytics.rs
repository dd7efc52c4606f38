use std::collections::{BTreeMap, HashMap, HashSet};

use uuid::Uuid;

use crate::dto::{EntryHistoryPoint, LeadTime, Mover, PositionStats, RankingAnalytics};
use crate::error::Result;
use crate::models::{Entry, RankingSnapshot};
use crate::repository::ScoreStore;

pub const TOP_MOVERS: usize = 10;

pub async fn entry_history(
    store: &dyn ScoreStore,
    tournament_id: Uuid,
    entry_id: Uuid,
) -> Result<Vec<EntryHistoryPoint>> {
    let history = store
        .ranking_snapshots(tournament_id)
        .await?
        .into_iter()
        .filter(|row| row.entry_id == entry_id)
        .map(|row| EntryHistoryPoint {
            round_id: row.round_id,
            position: row.position,
            total_points: row.total_points,
            points_behind_leader: row.points_behind_leader,
            captured_at: row.captured_at,
        })
        .collect();
    Ok(history)
}

pub async fn ranking_analytics(
    store: &dyn ScoreStore,
    tournament_id: Uuid,
) -> Result<RankingAnalytics> {
    let entries = store.entries(tournament_id).await?;
    let snapshots = store.ranking_snapshots(tournament_id).await?;
    Ok(analyze_rankings(tournament_id, &entries, &snapshots))
}

/// Derives movers, position spread and lead time from the capture history.
/// `snapshots` must be ordered by capture time.
pub fn analyze_rankings(
    tournament_id: Uuid,
    entries: &[Entry],
    snapshots: &[RankingSnapshot],
) -> RankingAnalytics {
    let names: HashMap<Uuid, &str> = entries
        .iter()
        .map(|e| (e.entry_id, e.participant_name.as_str()))
        .collect();
    let name_of = |entry_id: &Uuid| {
        names
            .get(entry_id)
            .copied()
            .unwrap_or("Unknown")
            .to_string()
    };

    let captures: HashSet<Uuid> = snapshots.iter().map(|s| s.capture_id).collect();

    RankingAnalytics {
        tournament_id,
        captures: captures.len(),
        biggest_movers: biggest_movers(snapshots, &name_of),
        position_distribution: position_distribution(snapshots),
        time_in_lead: time_in_lead(snapshots, &name_of),
    }
}

fn biggest_movers(snapshots: &[RankingSnapshot], name_of: &dyn Fn(&Uuid) -> String) -> Vec<Mover> {
    // entry -> (first position, last position), in first-seen order
    let mut order: Vec<Uuid> = Vec::new();
    let mut spans: HashMap<Uuid, (i32, i32)> = HashMap::new();
    for snapshot in snapshots {
        spans
            .entry(snapshot.entry_id)
            .and_modify(|span| span.1 = snapshot.position)
            .or_insert_with(|| {
                order.push(snapshot.entry_id);
                (snapshot.position, snapshot.position)
            });
    }

    let mut movers: Vec<Mover> = order
        .into_iter()
        .filter_map(|entry_id| {
            let (first, last) = spans[&entry_id];
            let change = first - last;
            (change != 0).then(|| Mover {
                entry_id,
                participant_name: name_of(&entry_id),
                first_position: first,
                last_position: last,
                change,
            })
        })
        .collect();

    movers.sort_by_key(|m| std::cmp::Reverse(m.change.abs()));
    movers.truncate(TOP_MOVERS);
    movers
}

fn position_distribution(snapshots: &[RankingSnapshot]) -> Vec<PositionStats> {
    let mut by_position: BTreeMap<i32, (HashSet<Uuid>, usize)> = BTreeMap::new();
    for snapshot in snapshots {
        let (entries, count) = by_position.entry(snapshot.position).or_default();
        entries.insert(snapshot.entry_id);
        *count += 1;
    }

    by_position
        .into_iter()
        .map(|(position, (entries, snapshots))| PositionStats {
            position,
            unique_entries: entries.len(),
            snapshots,
        })
        .collect()
}

/// A lead run lasts from the first capture an entry leads until the capture
/// where someone else takes over; the final run ends at the last lead capture.
fn time_in_lead(snapshots: &[RankingSnapshot], name_of: &dyn Fn(&Uuid) -> String) -> Vec<LeadTime> {
    let leads: Vec<&RankingSnapshot> = snapshots.iter().filter(|s| s.position == 1).collect();

    let mut order: Vec<Uuid> = Vec::new();
    let mut totals: HashMap<Uuid, (i64, usize)> = HashMap::new();
    let mut add = |entry_id: Uuid, seconds: i64, captures: usize| {
        let total = totals.entry(entry_id).or_insert_with(|| {
            order.push(entry_id);
            (0, 0)
        });
        total.0 += seconds;
        total.1 += captures;
    };

    let mut run: Option<(&RankingSnapshot, usize)> = None;
    for &lead in &leads {
        run = match run {
            Some((start, count)) if start.entry_id == lead.entry_id => Some((start, count + 1)),
            Some((start, count)) => {
                let seconds = (lead.captured_at - start.captured_at).num_seconds();
                add(start.entry_id, seconds, count);
                Some((lead, 1))
            }
            None => Some((lead, 1)),
        };
    }
    if let (Some((start, count)), Some(last)) = (run, leads.last()) {
        let seconds = (last.captured_at - start.captured_at).num_seconds();
        add(start.entry_id, seconds, count);
    }

    let mut result: Vec<LeadTime> = order
        .into_iter()
        .map(|entry_id| {
            let (seconds_in_lead, captures_in_lead) = totals[&entry_id];
            LeadTime {
                entry_id,
                participant_name: name_of(&entry_id),
                seconds_in_lead,
                captures_in_lead,
            }
        })
        .collect();
    result.sort_by_key(|lead| std::cmp::Reverse(lead.seconds_in_lead));
    result
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};

    use super::*;
    use crate::models::NewRankingSnapshot;
    use crate::repository::MemoryStore;

    struct History {
        entries: Vec<Entry>,
        snapshots: Vec<RankingSnapshot>,
        start: DateTime<Utc>,
    }

    impl History {
        fn new(count: usize) -> Self {
            let tournament_id = Uuid::new_v4();
            let entries = (0..count)
                .map(|i| {
                    let players = (1..=6).map(|n| n.to_string()).collect();
                    Entry::new(tournament_id, format!("E{}", i), players)
                })
                .collect();
            Self {
                entries,
                snapshots: Vec::new(),
                start: Utc::now(),
            }
        }

        /// Records a capture `minutes` after the start, ordering entries by index list.
        fn capture(&mut self, minutes: i64, order: &[usize]) {
            let capture_id = Uuid::new_v4();
            let captured_at = self.start + Duration::minutes(minutes);
            for (position, index) in order.iter().enumerate() {
                let entry = &self.entries[*index];
                self.snapshots.push(RankingSnapshot {
                    ranking_snapshot_id: Uuid::new_v4(),
                    capture_id,
                    tournament_id: entry.tournament_id,
                    entry_id: entry.entry_id,
                    round_id: 1,
                    position: position as i32 + 1,
                    total_points: 0,
                    points_behind_leader: 0,
                    captured_at,
                });
            }
        }

        fn analyze(&self) -> RankingAnalytics {
            analyze_rankings(self.entries[0].tournament_id, &self.entries, &self.snapshots)
        }
    }

    #[tokio::test]
    async fn test_entry_history_follows_one_entry_in_capture_order() {
        let store = MemoryStore::new();
        let tournament_id = Uuid::new_v4();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let start = Utc::now();

        let row = |tournament_id, entry_id, round_id, minutes, position, total| NewRankingSnapshot {
            capture_id: Uuid::new_v4(),
            tournament_id,
            entry_id,
            round_id,
            position,
            total_points: total,
            points_behind_leader: 0,
            captured_at: start + Duration::minutes(minutes),
        };

        // Appended out of order, with rows for another entry and another tournament.
        store
            .append_ranking_snapshots(&[
                row(tournament_id, alice, 2, 30, 1, 25),
                row(tournament_id, bob, 2, 30, 2, 20),
                row(tournament_id, alice, 1, 0, 2, 10),
                row(tournament_id, bob, 1, 0, 1, 12),
                row(Uuid::new_v4(), alice, 1, 5, 1, 99),
            ])
            .await
            .unwrap();

        let history = entry_history(&store, tournament_id, alice).await.unwrap();
        let points: Vec<(i32, i32, i32)> = history
            .iter()
            .map(|p| (p.round_id, p.position, p.total_points))
            .collect();
        assert_eq!(points, vec![(1, 2, 10), (2, 1, 25)]);
        assert!(history[0].captured_at < history[1].captured_at);

        assert!(
            entry_history(&store, tournament_id, Uuid::new_v4())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_movers_sorted_by_distance() {
        let mut history = History::new(4);
        history.capture(0, &[0, 1, 2, 3]);
        history.capture(10, &[3, 0, 1, 2]);
        let analytics = history.analyze();

        assert_eq!(analytics.captures, 2);
        assert_eq!(analytics.biggest_movers.len(), 4);
        let top = &analytics.biggest_movers[0];
        assert_eq!(top.participant_name, "E3");
        assert_eq!((top.first_position, top.last_position, top.change), (4, 1, 3));
        assert!(analytics.biggest_movers[1..].iter().all(|m| m.change == -1));
    }

    #[test]
    fn test_unmoved_entries_are_not_movers() {
        let mut history = History::new(2);
        history.capture(0, &[0, 1]);
        history.capture(5, &[0, 1]);
        assert!(history.analyze().biggest_movers.is_empty());
    }

    #[test]
    fn test_position_distribution() {
        let mut history = History::new(2);
        history.capture(0, &[0, 1]);
        history.capture(5, &[1, 0]);
        history.capture(9, &[1, 0]);
        let distribution = history.analyze().position_distribution;
        assert_eq!(
            distribution,
            vec![
                PositionStats { position: 1, unique_entries: 2, snapshots: 3 },
                PositionStats { position: 2, unique_entries: 2, snapshots: 3 },
            ]
        );
    }

    #[test]
    fn test_time_in_lead_runs() {
        let mut history = History::new(2);
        history.capture(0, &[0, 1]);
        history.capture(30, &[0, 1]);
        history.capture(60, &[1, 0]);
        history.capture(150, &[1, 0]);
        let leads = history.analyze().time_in_lead;

        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].participant_name, "E1");
        assert_eq!(leads[0].seconds_in_lead, 90 * 60);
        assert_eq!(leads[0].captures_in_lead, 2);
        assert_eq!(leads[1].participant_name, "E0");
        assert_eq!(leads[1].seconds_in_lead, 60 * 60);
        assert_eq!(leads[1].captures_in_lead, 2);
    }

    #[test]
    fn test_empty_history() {
        let history = History::new(3);
        let analytics = history.analyze();
        assert_eq!(analytics.captures, 0);
        assert!(analytics.time_in_lead.is_empty());
        assert!(analytics.position_distribution.is_empty());
    }
}
