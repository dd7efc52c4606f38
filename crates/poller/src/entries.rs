use scoring::ScoreStore;
use scoring::models::{Entry, Rebuy, RebuyType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PollerError, Result};

/// One participant's picks as supplied by the pool organiser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryImport {
    pub participant_name: String,
    pub player_ids: Vec<String>,
    #[serde(default)]
    pub rebuy_type: Option<RebuyType>,
    #[serde(default)]
    pub rebuys: Vec<Rebuy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// Participants that already had an entry and were updated in place.
    pub updated: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuyReport {
    pub entry_id: Uuid,
    pub participant_name: String,
    pub added: usize,
    pub skipped: usize,
    pub weekend_bonus_forfeited: bool,
}

impl EntryImport {
    pub fn into_entry(self, tournament_id: Uuid) -> Entry {
        let mut entry = Entry::new(tournament_id, self.participant_name, self.player_ids);
        match self.rebuy_type {
            Some(rebuy_type) => {
                entry.apply_rebuys(rebuy_type, self.rebuys);
            }
            // Left for validation to reject.
            None => entry.rebuys = self.rebuys,
        }
        entry
    }
}

fn same_participant(entry: &Entry, participant_name: &str) -> bool {
    entry
        .participant_name
        .trim()
        .eq_ignore_ascii_case(participant_name.trim())
}

/// Stores each entry on its own; an invalid one is reported and skipped.
///
/// A participant who already has an entry keeps it: the picks are replaced
/// but the entry id and the weekend bonus flags carry over.
pub async fn import_entries(
    store: &dyn ScoreStore,
    tournament_id: Uuid,
    imports: Vec<EntryImport>,
) -> Result<ImportReport> {
    store.tournament(tournament_id).await?;
    let mut existing = store.entries(tournament_id).await?;

    let mut report = ImportReport::default();
    for (idx, import) in imports.into_iter().enumerate() {
        let name = import.participant_name.clone();
        let mut entry = import.into_entry(tournament_id);

        let previous = existing
            .iter()
            .position(|stored| same_participant(stored, &name));
        if let Some(i) = previous {
            let stored = &existing[i];
            entry.entry_id = stored.entry_id;
            entry.participant_name = stored.participant_name.clone();
            entry.weekend_bonus_earned = stored.weekend_bonus_earned;
            entry.weekend_bonus_forfeited |= stored.weekend_bonus_forfeited;
        }

        match store.save_entry(&entry).await {
            Ok(()) => match previous {
                Some(i) => {
                    existing[i] = entry;
                    report.updated += 1;
                }
                None => {
                    existing.push(entry);
                    report.imported += 1;
                }
            },
            Err(e) => {
                tracing::warn!("Skipping entry #{} ({}): {}", idx + 1, name, e);
                report
                    .errors
                    .push(format!("Entry #{} ({}): {}", idx + 1, name, e));
            }
        }
    }

    tracing::info!(
        "Imported {} entries, updated {}, {} rejected",
        report.imported,
        report.updated,
        report.errors.len()
    );
    Ok(report)
}

/// Records mid-tournament substitutions on a participant's existing entry.
/// Picks that were already replaced are left alone.
pub async fn apply_rebuys(
    store: &dyn ScoreStore,
    tournament_id: Uuid,
    participant_name: &str,
    rebuy_type: RebuyType,
    rebuys: Vec<Rebuy>,
) -> Result<RebuyReport> {
    let mut entry = store
        .entries(tournament_id)
        .await?
        .into_iter()
        .find(|entry| same_participant(entry, participant_name))
        .ok_or_else(|| PollerError::EntryNotFound(participant_name.to_string()))?;

    let requested = rebuys.len();
    let added = entry.apply_rebuys(rebuy_type, rebuys);
    if added > 0 {
        store.save_entry(&entry).await?;
    }

    tracing::info!(
        "Applied {} of {} rebuys for {} ({})",
        added,
        requested,
        entry.participant_name,
        rebuy_type
    );
    Ok(RebuyReport {
        entry_id: entry.entry_id,
        participant_name: entry.participant_name,
        added,
        skipped: requested - added,
        weekend_bonus_forfeited: entry.weekend_bonus_forfeited,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use scoring::MemoryStore;
    use scoring::models::Tournament;

    use super::*;

    fn import(name: &str, picks: usize) -> EntryImport {
        EntryImport {
            participant_name: name.to_string(),
            player_ids: (1..=picks).map(|n| format!("p{}", n)).collect(),
            rebuy_type: None,
            rebuys: Vec::new(),
        }
    }

    fn rebuy(original: &str, replacement: &str) -> Rebuy {
        Rebuy {
            original_player_id: original.to_string(),
            replacement_player_id: replacement.to_string(),
        }
    }

    async fn heritage(store: &MemoryStore) -> Tournament {
        store
            .save_tournament(&Tournament {
                tournament_id: Uuid::new_v4(),
                name: "RBC Heritage".to_string(),
                org_id: "1".to_string(),
                tourn_id: "012".to_string(),
                year: 2025,
                start_date: NaiveDate::from_ymd_opt(2025, 4, 17).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 4, 20).unwrap(),
                current_round: 1,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_entries_are_skipped() {
        let store = MemoryStore::new();
        let tournament = heritage(&store).await;

        let mut rebuy_without_type = import("Carol", 6);
        rebuy_without_type.rebuys.push(Rebuy {
            original_player_id: "p1".to_string(),
            replacement_player_id: "p9".to_string(),
        });

        let report = import_entries(
            &store,
            tournament.tournament_id,
            vec![import("Alice", 6), import("Bob", 5), rebuy_without_type],
        )
        .await
        .unwrap();

        assert_eq!(report.imported, 1);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].contains("Bob"));
        let stored = store.entries(tournament.tournament_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].participant_name, "Alice");
    }

    #[tokio::test]
    async fn test_reimport_updates_existing_entry() {
        let store = MemoryStore::new();
        let tournament = heritage(&store).await;
        import_entries(&store, tournament.tournament_id, vec![import("Alice", 6)])
            .await
            .unwrap();
        let original = store.entries(tournament.tournament_id).await.unwrap();
        store
            .set_weekend_bonus_earned(original[0].entry_id)
            .await
            .unwrap();

        let mut again = import("alice", 6);
        again.player_ids[5] = "p7".to_string();
        let report = import_entries(&store, tournament.tournament_id, vec![again])
            .await
            .unwrap();

        assert_eq!(report.imported, 0);
        assert_eq!(report.updated, 1);
        let stored = store.entries(tournament.tournament_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].entry_id, original[0].entry_id);
        assert_eq!(stored[0].participant_name, "Alice");
        assert_eq!(stored[0].player_ids[5], "p7");
        assert!(stored[0].weekend_bonus_earned);
    }

    #[tokio::test]
    async fn test_apply_rebuys_appends_to_existing_entry() {
        let store = MemoryStore::new();
        let tournament = heritage(&store).await;
        import_entries(&store, tournament.tournament_id, vec![import("Alice", 6)])
            .await
            .unwrap();

        let first = apply_rebuys(
            &store,
            tournament.tournament_id,
            "Alice",
            RebuyType::MissedCut,
            vec![rebuy("p4", "r4")],
        )
        .await
        .unwrap();
        assert_eq!(first.added, 1);

        let second = apply_rebuys(
            &store,
            tournament.tournament_id,
            "Alice",
            RebuyType::MissedCut,
            vec![rebuy("p2", "r9"), rebuy("p4", "r5")],
        )
        .await
        .unwrap();
        assert_eq!(second.added, 1);
        assert_eq!(second.skipped, 1);
        assert!(!second.weekend_bonus_forfeited);

        let stored = store.entries(tournament.tournament_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].rebuys, vec![rebuy("p4", "r4"), rebuy("p2", "r9")]);
    }

    #[tokio::test]
    async fn test_underperformer_rebuy_on_existing_entry_forfeits() {
        let store = MemoryStore::new();
        let tournament = heritage(&store).await;
        import_entries(&store, tournament.tournament_id, vec![import("Bob", 6)])
            .await
            .unwrap();

        let report = apply_rebuys(
            &store,
            tournament.tournament_id,
            "Bob",
            RebuyType::Underperformer,
            vec![rebuy("p1", "r1")],
        )
        .await
        .unwrap();

        assert!(report.weekend_bonus_forfeited);
        let stored = store.entry(report.entry_id).await.unwrap();
        assert!(stored.weekend_bonus_forfeited);
        assert_eq!(stored.rebuy_type, Some(RebuyType::Underperformer));
    }

    #[tokio::test]
    async fn test_apply_rebuys_needs_an_entry() {
        let store = MemoryStore::new();
        let tournament = heritage(&store).await;
        let result = apply_rebuys(
            &store,
            tournament.tournament_id,
            "Nobody",
            RebuyType::MissedCut,
            vec![rebuy("p1", "r1")],
        )
        .await;
        assert!(matches!(result, Err(PollerError::EntryNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_tournament_fails() {
        let store = MemoryStore::new();
        assert!(
            import_entries(&store, Uuid::new_v4(), vec![import("Alice", 6)])
                .await
                .is_err()
        );
    }

    #[test]
    fn test_underperformer_import_forfeits_weekend_bonus() {
        let mut raw = import("Dana", 6);
        raw.rebuy_type = Some(RebuyType::Underperformer);
        raw.rebuys.push(Rebuy {
            original_player_id: "p2".to_string(),
            replacement_player_id: "p8".to_string(),
        });
        let entry = raw.into_entry(Uuid::new_v4());
        assert!(entry.weekend_bonus_forfeited);
        assert!(entry.has_rebuys());
    }
}
