use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use super::ScoreStore;
use crate::error::{Result, ScoringError};
use crate::models::{
    BonusAward, BonusPoint, DailyScore, Entry, NewDailyScore, NewRankingSnapshot,
    RankingSnapshot, ScoreSnapshot, Tournament,
};

/// In-process [`ScoreStore`] with the same keys and upsert rules as the
/// Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    tournaments: Vec<Tournament>,
    entries: Vec<Entry>,
    score_snapshots: Vec<ScoreSnapshot>,
    daily_scores: Vec<DailyScore>,
    bonus_points: Vec<BonusPoint>,
    ranking_snapshots: Vec<RankingSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tables {
    fn entry_ids(&self, tournament_id: Uuid) -> Vec<Uuid> {
        self.entries
            .iter()
            .filter(|e| e.tournament_id == tournament_id)
            .map(|e| e.entry_id)
            .collect()
    }
}

fn new_bonus_point(entry_id: Uuid, round_id: i32, award: &BonusAward) -> BonusPoint {
    BonusPoint {
        bonus_point_id: Uuid::new_v4(),
        entry_id,
        round_id,
        bonus_type: award.bonus_type,
        player_id: award.player_id.clone(),
        hole: award.hole,
        points: award.points,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl ScoreStore for MemoryStore {
    async fn tournament(&self, tournament_id: Uuid) -> Result<Tournament> {
        self.tables()
            .tournaments
            .iter()
            .find(|t| t.tournament_id == tournament_id)
            .cloned()
            .ok_or(ScoringError::NotFound)
    }

    async fn save_tournament(&self, tournament: &Tournament) -> Result<Tournament> {
        let mut tables = self.tables();
        let existing = tables.tournaments.iter_mut().find(|t| {
            t.org_id == tournament.org_id
                && t.tourn_id == tournament.tourn_id
                && t.year == tournament.year
        });

        match existing {
            Some(stored) => {
                stored.name = tournament.name.clone();
                stored.start_date = tournament.start_date;
                stored.end_date = tournament.end_date;
                stored.current_round = tournament.current_round;
                Ok(stored.clone())
            }
            None => {
                tables.tournaments.push(tournament.clone());
                Ok(tournament.clone())
            }
        }
    }

    async fn set_current_round(&self, tournament_id: Uuid, round_id: i32) -> Result<()> {
        let mut tables = self.tables();
        let tournament = tables
            .tournaments
            .iter_mut()
            .find(|t| t.tournament_id == tournament_id)
            .ok_or(ScoringError::NotFound)?;
        tournament.current_round = round_id;
        Ok(())
    }

    async fn entries(&self, tournament_id: Uuid) -> Result<Vec<Entry>> {
        Ok(self
            .tables()
            .entries
            .iter()
            .filter(|e| e.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    async fn entry(&self, entry_id: Uuid) -> Result<Entry> {
        self.tables()
            .entries
            .iter()
            .find(|e| e.entry_id == entry_id)
            .cloned()
            .ok_or(ScoringError::NotFound)
    }

    async fn save_entry(&self, entry: &Entry) -> Result<()> {
        entry.validate()?;

        let mut tables = self.tables();
        match tables.entries.iter_mut().find(|e| e.entry_id == entry.entry_id) {
            Some(stored) => {
                let earned = stored.weekend_bonus_earned || entry.weekend_bonus_earned;
                *stored = entry.clone();
                stored.weekend_bonus_earned = earned;
            }
            None => tables.entries.push(entry.clone()),
        }
        Ok(())
    }

    async fn set_weekend_bonus_earned(&self, entry_id: Uuid) -> Result<()> {
        let mut tables = self.tables();
        if let Some(entry) = tables.entries.iter_mut().find(|e| e.entry_id == entry_id)
            && !entry.weekend_bonus_forfeited
        {
            entry.weekend_bonus_earned = true;
        }
        Ok(())
    }

    async fn latest_score_snapshot(
        &self,
        tournament_id: Uuid,
        round_id: i32,
    ) -> Result<Option<ScoreSnapshot>> {
        Ok(self
            .tables()
            .score_snapshots
            .iter()
            .filter(|s| s.tournament_id == tournament_id && s.round_id == round_id)
            .max_by_key(|s| s.captured_at)
            .cloned())
    }

    async fn save_score_snapshot(&self, snapshot: &ScoreSnapshot) -> Result<()> {
        self.tables().score_snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn bonus_points(&self, entry_id: Uuid, round_id: i32) -> Result<Vec<BonusPoint>> {
        Ok(self
            .tables()
            .bonus_points
            .iter()
            .filter(|b| b.entry_id == entry_id && b.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn insert_manual_bonus(
        &self,
        entry_id: Uuid,
        round_id: i32,
        award: &BonusAward,
    ) -> Result<BonusPoint> {
        let mut tables = self.tables();
        let duplicate = tables
            .bonus_points
            .iter()
            .any(|b| b.entry_id == entry_id && b.round_id == round_id && b.key() == award.key());
        if duplicate {
            return Err(ScoringError::ConstraintViolation(format!(
                "{} already awarded for round {}",
                award.bonus_type, round_id
            )));
        }

        let bonus = new_bonus_point(entry_id, round_id, award);
        tables.bonus_points.push(bonus.clone());
        Ok(bonus)
    }

    async fn save_daily_score(
        &self,
        score: &NewDailyScore,
        awards: &[BonusAward],
    ) -> Result<DailyScore> {
        let mut tables = self.tables();

        let position = tables
            .daily_scores
            .iter()
            .position(|d| d.entry_id == score.entry_id && d.round_id == score.round_id);

        let saved = match position {
            Some(index) if score.matches(&tables.daily_scores[index]) => {
                tables.daily_scores[index].clone()
            }
            Some(index) => {
                let row = &mut tables.daily_scores[index];
                row.score_date = score.score_date;
                row.base_points = score.base_points;
                row.bonus_points = score.bonus_points;
                row.total_points = score.total_points;
                row.breakdown = Json(score.breakdown.clone());
                row.calculated_at = Utc::now();
                row.clone()
            }
            None => {
                let row = DailyScore {
                    daily_score_id: Uuid::new_v4(),
                    entry_id: score.entry_id,
                    round_id: score.round_id,
                    score_date: score.score_date,
                    base_points: score.base_points,
                    bonus_points: score.bonus_points,
                    total_points: score.total_points,
                    breakdown: Json(score.breakdown.clone()),
                    calculated_at: Utc::now(),
                };
                tables.daily_scores.push(row.clone());
                row
            }
        };

        let automatic: Vec<&BonusAward> = awards
            .iter()
            .filter(|a| !a.bonus_type.is_manual())
            .collect();

        tables.bonus_points.retain(|b| {
            b.entry_id != score.entry_id
                || b.round_id != score.round_id
                || b.bonus_type.is_manual()
                || automatic
                    .iter()
                    .any(|a| a.key() == b.key() && a.points == b.points)
        });

        for award in automatic {
            let exists = tables.bonus_points.iter().any(|b| {
                b.entry_id == score.entry_id && b.round_id == score.round_id && b.key() == award.key()
            });
            if !exists {
                let bonus = new_bonus_point(score.entry_id, score.round_id, award);
                tables.bonus_points.push(bonus);
            }
        }

        Ok(saved)
    }

    async fn daily_score(&self, entry_id: Uuid, round_id: i32) -> Result<Option<DailyScore>> {
        Ok(self
            .tables()
            .daily_scores
            .iter()
            .find(|d| d.entry_id == entry_id && d.round_id == round_id)
            .cloned())
    }

    async fn daily_scores_for_tournament(&self, tournament_id: Uuid) -> Result<Vec<DailyScore>> {
        let tables = self.tables();
        let entry_ids = tables.entry_ids(tournament_id);
        let mut scores: Vec<DailyScore> = Vec::new();
        for entry_id in entry_ids {
            let mut rows: Vec<DailyScore> = tables
                .daily_scores
                .iter()
                .filter(|d| d.entry_id == entry_id)
                .cloned()
                .collect();
            rows.sort_by_key(|d| d.round_id);
            scores.extend(rows);
        }
        Ok(scores)
    }

    async fn append_ranking_snapshots(
        &self,
        rows: &[NewRankingSnapshot],
    ) -> Result<Vec<RankingSnapshot>> {
        let inserted: Vec<RankingSnapshot> =
            rows.iter().cloned().map(NewRankingSnapshot::into_snapshot).collect();
        self.tables()
            .ranking_snapshots
            .extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn latest_ranking_capture(&self, tournament_id: Uuid) -> Result<Vec<RankingSnapshot>> {
        let tables = self.tables();
        let latest = tables
            .ranking_snapshots
            .iter()
            .filter(|r| r.tournament_id == tournament_id)
            .max_by_key(|r| r.captured_at)
            .map(|r| r.capture_id);

        let Some(capture_id) = latest else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<RankingSnapshot> = tables
            .ranking_snapshots
            .iter()
            .filter(|r| r.capture_id == capture_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.position);
        Ok(rows)
    }

    async fn ranking_snapshots(&self, tournament_id: Uuid) -> Result<Vec<RankingSnapshot>> {
        let mut rows: Vec<RankingSnapshot> = self
            .tables()
            .ranking_snapshots
            .iter()
            .filter(|r| r.tournament_id == tournament_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| (r.captured_at, r.position));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{BonusType, ScoreBreakdown};

    fn entry(tournament_id: Uuid) -> Entry {
        let players = (1..=6).map(|n| n.to_string()).collect();
        Entry::new(tournament_id, "Alice", players)
    }

    fn score(entry_id: Uuid, base: i32) -> NewDailyScore {
        NewDailyScore {
            entry_id,
            round_id: 1,
            score_date: NaiveDate::from_ymd_opt(2025, 4, 10).unwrap(),
            base_points: base,
            bonus_points: 0,
            total_points: base,
            breakdown: ScoreBreakdown::default(),
        }
    }

    #[tokio::test]
    async fn test_unchanged_daily_score_keeps_row() {
        let store = MemoryStore::new();
        let entry = entry(Uuid::new_v4());
        store.save_entry(&entry).await.unwrap();

        let first = store.save_daily_score(&score(entry.entry_id, 10), &[]).await.unwrap();
        let second = store.save_daily_score(&score(entry.entry_id, 10), &[]).await.unwrap();
        assert_eq!(first, second);

        let third = store.save_daily_score(&score(entry.entry_id, 12), &[]).await.unwrap();
        assert_eq!(third.daily_score_id, first.daily_score_id);
        assert_eq!(third.total_points, 12);
    }

    #[tokio::test]
    async fn test_reconcile_keeps_manual_bonuses() {
        let store = MemoryStore::new();
        let entry = entry(Uuid::new_v4());
        store.save_entry(&entry).await.unwrap();

        let manual = BonusAward::new(BonusType::GirLeader, Some("1"), None);
        store.insert_manual_bonus(entry.entry_id, 1, &manual).await.unwrap();

        let eagle = BonusAward::new(BonusType::Eagle, Some("2"), Some(7));
        store
            .save_daily_score(&score(entry.entry_id, 10), &[eagle.clone()])
            .await
            .unwrap();
        store
            .save_daily_score(&score(entry.entry_id, 10), &[eagle])
            .await
            .unwrap();
        assert_eq!(store.bonus_points(entry.entry_id, 1).await.unwrap().len(), 2);

        store.save_daily_score(&score(entry.entry_id, 10), &[]).await.unwrap();
        let left = store.bonus_points(entry.entry_id, 1).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].bonus_type, BonusType::GirLeader);
    }

    #[tokio::test]
    async fn test_duplicate_manual_bonus_rejected() {
        let store = MemoryStore::new();
        let entry_id = Uuid::new_v4();
        let award = BonusAward::new(BonusType::FairwaysLeader, Some("3"), None);
        store.insert_manual_bonus(entry_id, 2, &award).await.unwrap();
        assert!(matches!(
            store.insert_manual_bonus(entry_id, 2, &award).await,
            Err(ScoringError::ConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_weekend_bonus_never_set_when_forfeited() {
        let store = MemoryStore::new();
        let mut entry = entry(Uuid::new_v4());
        entry.weekend_bonus_forfeited = true;
        store.save_entry(&entry).await.unwrap();

        store.set_weekend_bonus_earned(entry.entry_id).await.unwrap();
        assert!(!store.entry(entry.entry_id).await.unwrap().weekend_bonus_earned);
    }
}
