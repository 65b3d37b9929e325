use serde::{Deserialize, Serialize};

/// Role a player holds for the current round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Spectator — connected but not part of the current chase.
    #[default]
    None,
    /// Wins the round by finishing its lap first, unconditionally.
    Pursuer,
    /// Wins the round by finishing its lap far enough ahead of the pursuer.
    Pursued,
}

impl Role {
    /// Whether this role takes part in the current chase.
    pub fn is_participant(self) -> bool {
        matches!(self, Role::Pursuer | Role::Pursued)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::None => "spectator",
            Role::Pursuer => "pursuer",
            Role::Pursued => "pursued",
        };
        write!(f, "{s}")
    }
}

/// Lifecycle state of the chase session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    #[default]
    Waiting,
    InProgress,
    RoundComplete,
    GameComplete,
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GamePhase::Waiting => "Waiting",
            GamePhase::InProgress => "InProgress",
            GamePhase::RoundComplete => "RoundComplete",
            GamePhase::GameComplete => "GameComplete",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    PursuerWins,
    PursuedWins,
    Draw,
}

/// Shortest-arc distance between two normalized track positions on a
/// closed loop. Result is always in `[0.0, 0.5]`.
pub fn circular_distance(a: f32, b: f32) -> f32 {
    let mut d = (a - b).abs();
    if d > 0.5 {
        d = 1.0 - d;
    }
    d
}

/// Decide the round outcome when `finisher_role` completes its lap.
///
/// The asymmetry is intentional: the pursuer wins by out-racing (no distance
/// check), the pursued wins only by escaping beyond `max_chase_distance` —
/// closer than that and the pursuer was "still chasing", which is a draw.
pub fn decide_round(
    finisher_role: Role,
    finisher_pos: f32,
    opponent_pos: Option<f32>,
    max_chase_distance: f32,
) -> RoundOutcome {
    match finisher_role {
        Role::Pursuer => RoundOutcome::PursuerWins,
        Role::Pursued => match opponent_pos {
            Some(pursuer_pos) => {
                let distance = circular_distance(pursuer_pos, finisher_pos);
                if distance <= max_chase_distance {
                    tracing::info!(
                        distance,
                        max_chase_distance,
                        "draw: pursuer within chase distance at pursued finish"
                    );
                    RoundOutcome::Draw
                } else {
                    tracing::info!(
                        distance,
                        max_chase_distance,
                        "pursued wins: pursuer too far behind"
                    );
                    RoundOutcome::PursuedWins
                }
            },
            // No opposing player to measure against — pursued wins by default.
            None => RoundOutcome::PursuedWins,
        },
        Role::None => RoundOutcome::Draw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_simple() {
        assert!((circular_distance(0.92, 0.80) - 0.12).abs() < 1e-6);
        assert!((circular_distance(0.55, 0.92) - 0.37).abs() < 1e-6);
    }

    #[test]
    fn distance_wraps_across_start_line() {
        // 0.98 and 0.02 are 0.04 apart on the loop, not 0.96.
        assert!((circular_distance(0.98, 0.02) - 0.04).abs() < 1e-6);
    }

    #[test]
    fn distance_antipodal_is_fixed_point() {
        // d == 0.5 folds to 1 - 0.5 == 0.5; the branch is a no-op by value.
        assert!((circular_distance(0.0, 0.5) - 0.5).abs() < 1e-6);
        assert!((circular_distance(0.25, 0.75) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn pursued_finish_within_chase_distance_is_draw() {
        // Pursued at 0.92, pursuer at 0.80, threshold 0.15: distance 0.12.
        let outcome = decide_round(Role::Pursued, 0.92, Some(0.80), 0.15);
        assert_eq!(outcome, RoundOutcome::Draw);
    }

    #[test]
    fn pursued_finish_beyond_chase_distance_wins() {
        // Pursuer at 0.55: distance 0.37 > 0.15.
        let outcome = decide_round(Role::Pursued, 0.92, Some(0.55), 0.15);
        assert_eq!(outcome, RoundOutcome::PursuedWins);
    }

    #[test]
    fn pursued_finish_exactly_at_threshold_is_draw() {
        let outcome = decide_round(Role::Pursued, 0.30, Some(0.15), 0.15);
        assert_eq!(outcome, RoundOutcome::Draw);
    }

    #[test]
    fn pursuer_finish_wins_regardless_of_distance() {
        assert_eq!(
            decide_round(Role::Pursuer, 0.10, Some(0.11), 0.15),
            RoundOutcome::PursuerWins
        );
        assert_eq!(
            decide_round(Role::Pursuer, 0.10, Some(0.60), 0.15),
            RoundOutcome::PursuerWins
        );
        assert_eq!(
            decide_round(Role::Pursuer, 0.10, None, 0.15),
            RoundOutcome::PursuerWins
        );
    }

    #[test]
    fn pursued_finish_without_opponent_wins_by_default() {
        assert_eq!(
            decide_round(Role::Pursued, 0.42, None, 0.15),
            RoundOutcome::PursuedWins
        );
    }

    #[test]
    fn spectator_finish_is_a_draw() {
        assert_eq!(
            decide_round(Role::None, 0.42, Some(0.10), 0.15),
            RoundOutcome::Draw
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn distance_is_symmetric(a in 0.0f32..1.0, b in 0.0f32..1.0) {
                let d1 = circular_distance(a, b);
                let d2 = circular_distance(b, a);
                prop_assert!((d1 - d2).abs() < 1e-6);
            }

            #[test]
            fn distance_is_half_track_at_most(a in 0.0f32..1.0, b in 0.0f32..1.0) {
                let d = circular_distance(a, b);
                prop_assert!((0.0..=0.5).contains(&d));
            }

            #[test]
            fn pursued_finish_is_draw_iff_within_threshold(
                pursued in 0.0f32..1.0,
                pursuer in 0.0f32..1.0,
                threshold in 0.0f32..0.5,
            ) {
                let outcome = decide_round(Role::Pursued, pursued, Some(pursuer), threshold);
                let d = circular_distance(pursuer, pursued);
                if d <= threshold {
                    prop_assert_eq!(outcome, RoundOutcome::Draw);
                } else {
                    prop_assert_eq!(outcome, RoundOutcome::PursuedWins);
                }
            }

            #[test]
            fn pursuer_finish_always_wins(
                pursuer in 0.0f32..1.0,
                pursued in 0.0f32..1.0,
                threshold in 0.0f32..0.5,
            ) {
                prop_assert_eq!(
                    decide_round(Role::Pursuer, pursuer, Some(pursued), threshold),
                    RoundOutcome::PursuerWins
                );
            }
        }
    }
}
