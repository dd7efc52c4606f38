use serde::{Deserialize, Serialize};

use crate::models::{FINAL_ROUND, PlayerStatus};

/// Points per position band for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTiers {
    pub leader: i32,
    pub top_5: i32,
    pub top_10: i32,
    pub top_25: i32,
    /// Outside the top 25 but still playing. Zero for round 1.
    #[serde(default)]
    pub made_cut: i32,
}

/// The position-to-points table, one set of tiers per round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringRules {
    pub rounds: [RoundTiers; 4],
    /// Replaces the leader value in the final round for the confirmed winner.
    pub winner: i32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        let weekend = RoundTiers {
            leader: 12,
            top_5: 8,
            top_10: 5,
            top_25: 3,
            made_cut: 1,
        };
        Self {
            rounds: [
                RoundTiers {
                    leader: 8,
                    top_5: 5,
                    top_10: 3,
                    top_25: 1,
                    made_cut: 0,
                },
                weekend,
                weekend,
                weekend,
            ],
            winner: 15,
        }
    }
}

impl ScoringRules {
    pub fn tiers(&self, round_id: i32) -> Option<&RoundTiers> {
        usize::try_from(round_id - 1)
            .ok()
            .and_then(|index| self.rounds.get(index))
    }

    /// Points for one player in one round. Never fails: anything that cannot
    /// be read as a position scores zero.
    pub fn position_points(
        &self,
        position: Option<&str>,
        round_id: i32,
        is_winner: bool,
        status: &PlayerStatus,
    ) -> i32 {
        if status.is_eliminated() {
            return 0;
        }
        let Some(position) = position else {
            return 0;
        };
        if is_elimination_marker(position) {
            return 0;
        }
        let Some(tiers) = self.tiers(round_id) else {
            return 0;
        };

        match parse_position(position) {
            Some(1) if round_id == FINAL_ROUND && is_winner && *status == PlayerStatus::Complete => {
                self.winner
            }
            Some(1) => tiers.leader,
            Some(2..=5) => tiers.top_5,
            Some(6..=10) => tiers.top_10,
            Some(11..=25) => tiers.top_25,
            Some(_) => tiers.made_cut,
            None => 0,
        }
    }
}

pub(crate) fn is_elimination_marker(position: &str) -> bool {
    let position = position.trim();
    ["cut", "wd", "dq"]
        .iter()
        .any(|marker| position.eq_ignore_ascii_case(marker))
}

/// Numeric position with any tie prefix removed ("T4" is 4). Zero is not a position.
pub fn parse_position(position: &str) -> Option<u32> {
    let position = position.trim();
    let digits = position
        .strip_prefix('T')
        .or_else(|| position.strip_prefix('t'))
        .unwrap_or(position);
    digits.trim().parse::<u32>().ok().filter(|p| *p > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(position: &str, round_id: i32) -> i32 {
        ScoringRules::default().position_points(
            Some(position),
            round_id,
            false,
            &PlayerStatus::Active,
        )
    }

    #[test]
    fn test_leader_and_top_five_per_round() {
        let rules = ScoringRules::default();
        for round_id in 1..=3 {
            let tiers = rules.tiers(round_id).unwrap();
            assert_eq!(points("1", round_id), tiers.leader);
            for position in ["T2", "3", "T5"] {
                assert_eq!(points(position, round_id), tiers.top_5);
            }
        }
    }

    #[test]
    fn test_round_one_has_no_made_cut_tier() {
        assert_eq!(points("26", 1), 0);
        assert_eq!(points("T25", 1), 1);
    }

    #[test]
    fn test_made_cut_tier_from_round_two() {
        let rules = ScoringRules::default();
        for round_id in 2..=4 {
            let got = rules.position_points(Some("40"), round_id, false, &PlayerStatus::Complete);
            assert_eq!(got, 1);
        }
    }

    #[test]
    fn test_eliminated_scores_zero() {
        let rules = ScoringRules::default();
        for status in ["cut", "wd", "dq"] {
            let status = PlayerStatus::from(status);
            for round_id in 1..=4 {
                assert_eq!(rules.position_points(Some("1"), round_id, false, &status), 0);
            }
        }
        assert_eq!(points("CUT", 2), 0);
        assert_eq!(points("Wd", 3), 0);
    }

    #[test]
    fn test_winner_needs_complete_status_and_flag() {
        let rules = ScoringRules::default();
        let complete = PlayerStatus::Complete;
        assert_eq!(rules.position_points(Some("1"), 4, true, &complete), 15);
        assert_eq!(rules.position_points(Some("1"), 4, false, &complete), 12);
        assert_eq!(
            rules.position_points(Some("1"), 4, true, &PlayerStatus::Active),
            12
        );
        assert_eq!(rules.position_points(Some("1"), 3, true, &complete), 12);
    }

    #[test]
    fn test_malformed_positions_score_zero() {
        assert_eq!(points("", 2), 0);
        assert_eq!(points("T", 2), 0);
        assert_eq!(points("0", 2), 0);
        assert_eq!(points("first", 2), 0);
        assert_eq!(points("1", 5), 0);
        assert_eq!(
            ScoringRules::default().position_points(None, 2, false, &PlayerStatus::Active),
            0
        );
    }

    #[test]
    fn test_rules_deserialize() {
        let encoded = serde_json::to_value(ScoringRules::default()).unwrap();
        let rules: ScoringRules = serde_json::from_value(encoded).unwrap();
        assert_eq!(rules, ScoringRules::default());
    }
}
