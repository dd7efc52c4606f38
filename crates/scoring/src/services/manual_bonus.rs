use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::daily_score::calculate_and_save_daily_score;
use super::position_points::ScoringRules;
use super::rebuy::REBUY_FIRST_ROUND;
use crate::error::{Result, ScoringError};
use crate::models::{BonusAward, BonusPoint, BonusType, Entry, validate_round};
use crate::repository::ScoreStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManualBonusOutcome {
    pub entries_matched: usize,
    pub bonuses_created: Vec<BonusPoint>,
    pub entries_recalculated: usize,
}

/// Records a manually judged bonus (GIR or fairways leader) for every entry
/// fielding `player_id` in the round, then rescores those entries if the
/// round has a snapshot. Existing identical awards are left alone.
pub async fn award_manual_bonus(
    store: &dyn ScoreStore,
    rules: &ScoringRules,
    tournament_id: Uuid,
    round_id: i32,
    bonus_type: BonusType,
    player_id: &str,
    points: Option<i32>,
) -> Result<ManualBonusOutcome> {
    if !bonus_type.is_manual() {
        return Err(ScoringError::ConstraintViolation(format!(
            "{} is calculated automatically and cannot be entered by hand",
            bonus_type
        )));
    }
    let round_id = validate_round(round_id)?;
    let tournament = store.tournament(tournament_id).await?;

    let award = BonusAward {
        bonus_type,
        player_id: Some(player_id.to_string()),
        points: points.unwrap_or_else(|| bonus_type.default_points()),
        hole: None,
    };

    let mut matching: Vec<Entry> = store
        .entries(tournament_id)
        .await?
        .into_iter()
        .filter(|entry| fields_player(entry, player_id, round_id))
        .collect();

    let mut outcome = ManualBonusOutcome {
        entries_matched: matching.len(),
        ..Default::default()
    };

    for entry in &matching {
        let existing = store.bonus_points(entry.entry_id, round_id).await?;
        if existing.iter().any(|bonus| bonus.key() == award.key()) {
            continue;
        }
        let bonus = store
            .insert_manual_bonus(entry.entry_id, round_id, &award)
            .await?;
        outcome.bonuses_created.push(bonus);
    }

    if let Some(snapshot) = store.latest_score_snapshot(tournament_id, round_id).await? {
        for entry in &mut matching {
            match calculate_and_save_daily_score(store, rules, &tournament, entry, &snapshot).await {
                Ok(_) => outcome.entries_recalculated += 1,
                Err(e) => warn!(entry_id = %entry.entry_id, error = %e, "Rescore after manual bonus failed"),
            }
        }
    }

    info!(
        %tournament_id,
        round_id,
        bonus_type = %bonus_type,
        player_id,
        created = outcome.bonuses_created.len(),
        "Manual bonus awarded"
    );
    Ok(outcome)
}

fn fields_player(entry: &Entry, player_id: &str, round_id: i32) -> bool {
    entry.player_ids.iter().any(|id| id == player_id)
        || (round_id >= REBUY_FIRST_ROUND
            && entry
                .rebuys
                .iter()
                .any(|r| r.replacement_player_id == player_id))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::models::{Leaderboard, ScoreSnapshot, ScorecardSet, Tournament};
    use crate::repository::MemoryStore;

    async fn setup(store: &MemoryStore) -> (Tournament, Entry, Entry) {
        let tournament = store
            .save_tournament(&Tournament {
                tournament_id: Uuid::new_v4(),
                name: "The Open".to_string(),
                org_id: "1".to_string(),
                tourn_id: "100".to_string(),
                year: 2025,
                start_date: NaiveDate::from_ymd_opt(2025, 7, 17).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 7, 20).unwrap(),
                current_round: 2,
            })
            .await
            .unwrap();

        let picks = |prefix: &str| (1..=6).map(|n| format!("{}{}", prefix, n)).collect();
        let with_player = Entry::new(tournament.tournament_id, "Alice", picks("a"));
        let without = Entry::new(tournament.tournament_id, "Bob", picks("b"));
        store.save_entry(&with_player).await.unwrap();
        store.save_entry(&without).await.unwrap();
        (tournament, with_player, without)
    }

    #[tokio::test]
    async fn test_rejects_automatic_types() {
        let store = MemoryStore::new();
        let result = award_manual_bonus(
            &store,
            &ScoringRules::default(),
            Uuid::new_v4(),
            1,
            BonusType::Eagle,
            "a1",
            None,
        )
        .await;
        assert!(matches!(result, Err(ScoringError::ConstraintViolation(_))));
    }

    #[tokio::test]
    async fn test_awards_matching_entries_and_rescores() {
        let store = MemoryStore::new();
        let (tournament, alice, bob) = setup(&store).await;
        let leaderboard: Leaderboard = serde_json::from_value(json!({"leaderboardRows": [
            {"playerId": "a1", "position": "1", "status": "active"}
        ]}))
        .unwrap();
        store
            .save_score_snapshot(&ScoreSnapshot::new(
                tournament.tournament_id,
                2,
                leaderboard,
                ScorecardSet::default(),
            ))
            .await
            .unwrap();

        let rules = ScoringRules::default();
        let outcome = award_manual_bonus(
            &store,
            &rules,
            tournament.tournament_id,
            2,
            BonusType::GirLeader,
            "a1",
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.entries_matched, 1);
        assert_eq!(outcome.bonuses_created.len(), 1);
        assert_eq!(outcome.entries_recalculated, 1);

        let score = store.daily_score(alice.entry_id, 2).await.unwrap().unwrap();
        assert_eq!(score.base_points, 12);
        assert_eq!(score.bonus_points, 1);
        assert!(store.daily_score(bob.entry_id, 2).await.unwrap().is_none());

        let again = award_manual_bonus(
            &store,
            &rules,
            tournament.tournament_id,
            2,
            BonusType::GirLeader,
            "a1",
            None,
        )
        .await
        .unwrap();
        assert!(again.bonuses_created.is_empty());
        assert_eq!(store.bonus_points(alice.entry_id, 2).await.unwrap().len(), 1);
    }
}
