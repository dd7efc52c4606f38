use std::collections::HashMap;

use crate::models::Entry;

/// First round in which rebuy substitutions take effect.
pub const REBUY_FIRST_ROUND: i32 = 3;

/// A slot after substitution: who plays it and whom they replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSlot<'a> {
    pub slot: u8,
    pub player_id: &'a str,
    pub original_player_id: Option<&'a str>,
}

/// Maps the six nominal slots to the players who count for `round_id`.
pub fn resolve_players(entry: &Entry, round_id: i32) -> Vec<ResolvedSlot<'_>> {
    let substitutions: HashMap<&str, &str> = if round_id >= REBUY_FIRST_ROUND {
        entry
            .rebuys
            .iter()
            .map(|r| (r.original_player_id.as_str(), r.replacement_player_id.as_str()))
            .collect()
    } else {
        HashMap::new()
    };

    entry
        .player_ids
        .iter()
        .enumerate()
        .map(|(index, nominal)| {
            let slot = u8::try_from(index + 1).unwrap_or(u8::MAX);
            match substitutions.get(nominal.as_str()) {
                Some(replacement) => ResolvedSlot {
                    slot,
                    player_id: *replacement,
                    original_player_id: Some(nominal.as_str()),
                },
                None => ResolvedSlot {
                    slot,
                    player_id: nominal.as_str(),
                    original_player_id: None,
                },
            }
        })
        .collect()
}

pub fn effective_player_ids(entry: &Entry, round_id: i32) -> Vec<&str> {
    resolve_players(entry, round_id)
        .into_iter()
        .map(|slot| slot.player_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::models::{Rebuy, RebuyType};

    fn entry_with_rebuy() -> Entry {
        let players = (1..=6).map(|n| format!("p{}", n)).collect();
        let mut entry = Entry::new(Uuid::new_v4(), "Alice", players);
        entry.apply_rebuys(
            RebuyType::MissedCut,
            vec![Rebuy {
                original_player_id: "p2".to_string(),
                replacement_player_id: "r9".to_string(),
            }],
        );
        entry
    }

    #[test]
    fn test_early_rounds_use_nominal_players() {
        let entry = entry_with_rebuy();
        for round_id in 1..=2 {
            assert_eq!(
                effective_player_ids(&entry, round_id),
                vec!["p1", "p2", "p3", "p4", "p5", "p6"]
            );
        }
    }

    #[test]
    fn test_weekend_rounds_substitute() {
        let entry = entry_with_rebuy();
        for round_id in 3..=4 {
            assert_eq!(
                effective_player_ids(&entry, round_id),
                vec!["p1", "r9", "p3", "p4", "p5", "p6"]
            );
        }
        let slots = resolve_players(&entry, 3);
        assert_eq!(slots[1].original_player_id, Some("p2"));
        assert_eq!(slots[1].slot, 2);
        assert_eq!(slots[0].original_player_id, None);
    }

    #[test]
    fn test_no_rebuys_is_identity() {
        let players: Vec<String> = (1..=6).map(|n| format!("p{}", n)).collect();
        let entry = Entry::new(Uuid::new_v4(), "Bob", players.clone());
        assert_eq!(effective_player_ids(&entry, 4), players);
    }
}
