//! Category state machine for subjective food reactions.
//!
//! All four categories are mutually reachable (a child's taste can revisit
//! any earlier state), so the transition function is total. Its only output
//! beyond the new state is the celebration flag; persistence is the caller's
//! job via `FoodService`.

use serde::{Deserialize, Serialize};

use crate::domain::models::food::FoodCategory;

/// Outcome of a category transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChange {
    pub from: FoodCategory,
    pub to: FoodCategory,
    /// Positive-reinforcement signal. Fires at most once per transition:
    /// entering `AlwaysLike` from any other state, or leaving `DontLike` for
    /// any non-`DontLike` state.
    pub celebrate: bool,
}

/// Map a user-driven category change to its outcome.
pub fn transition(from: FoodCategory, to: FoodCategory) -> CategoryChange {
    let entered_always_like = to == FoodCategory::AlwaysLike && from != FoodCategory::AlwaysLike;
    let left_dont_like = from == FoodCategory::DontLike && to != FoodCategory::DontLike;

    CategoryChange {
        from,
        to,
        celebrate: entered_always_like || left_dont_like,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FoodCategory::*;

    #[test]
    fn test_transitions_are_total() {
        for from in FoodCategory::ALL {
            for to in FoodCategory::ALL {
                let change = transition(from, to);
                assert_eq!(change.from, from);
                assert_eq!(change.to, to);
            }
        }
    }

    #[test]
    fn test_entering_always_like_celebrates() {
        assert!(transition(NeverTried, AlwaysLike).celebrate);
        assert!(transition(DontLike, AlwaysLike).celebrate);
        assert!(transition(Depends, AlwaysLike).celebrate);
        // Staying put is not a transition worth celebrating
        assert!(!transition(AlwaysLike, AlwaysLike).celebrate);
    }

    #[test]
    fn test_leaving_dont_like_celebrates() {
        assert!(transition(DontLike, NeverTried).celebrate);
        assert!(transition(DontLike, Depends).celebrate);
        assert!(!transition(DontLike, DontLike).celebrate);
    }

    #[test]
    fn test_neutral_transitions_do_not_celebrate() {
        assert!(!transition(NeverTried, DontLike).celebrate);
        assert!(!transition(NeverTried, Depends).celebrate);
        assert!(!transition(Depends, NeverTried).celebrate);
        assert!(!transition(Depends, DontLike).celebrate);
        assert!(!transition(AlwaysLike, Depends).celebrate);
        assert!(!transition(AlwaysLike, DontLike).celebrate);
        assert!(!transition(AlwaysLike, NeverTried).celebrate);
    }

    /// Scenario: DontLike -> Depends fires the signal, Depends -> DontLike
    /// afterwards does not.
    #[test]
    fn test_celebration_fires_once_per_qualifying_transition() {
        assert!(transition(DontLike, Depends).celebrate);
        assert!(!transition(Depends, DontLike).celebrate);
    }
}
