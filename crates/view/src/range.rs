//! Running min/max of the scores seen so far in a session.
//!
//! Pages are fetched lazily, so the range is built only from pages visited so
//! far. It only ever widens: colours stay stable and get more accurate as more
//! pages are browsed. There is no full-dataset prescan.

use serde::{Deserialize, Serialize};

/// Observed score range. `None` means no score has been seen yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeState {
    pub observed_min: Option<f64>,
    pub observed_max: Option<f64>,
}

impl RangeState {
    pub fn is_set(&self) -> bool {
        self.observed_min.is_some() && self.observed_max.is_some()
    }

    /// `(min, max)` once both are known.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.observed_min?, self.observed_max?))
    }
}

/// Fold a batch of scores into `state`. Non-finite scores are skipped.
pub fn update<I>(state: RangeState, scores: I) -> RangeState
where
    I: IntoIterator<Item = f64>,
{
    scores
        .into_iter()
        .filter(|s| s.is_finite())
        .fold(state, |acc, score| RangeState {
            observed_min: Some(acc.observed_min.map_or(score, |m| m.min(score))),
            observed_max: Some(acc.observed_max.map_or(score, |m| m.max(score))),
        })
}

/// Range for a fresh session.
pub fn reset() -> RangeState {
    RangeState::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_page_sets_both_bounds() {
        let state = update(reset(), [0.1, 0.5, 0.9]);
        assert_eq!(state.observed_min, Some(0.1));
        assert_eq!(state.observed_max, Some(0.9));
    }

    #[test]
    fn empty_page_is_identity() {
        assert_eq!(update(reset(), Vec::new()), reset());
        let state = update(reset(), [1.0]);
        assert_eq!(update(state, Vec::new()), state);
    }

    #[test]
    fn narrower_page_does_not_shrink_range() {
        let state = update(reset(), [0.1, 3.0]);
        let state = update(state, [0.5, 0.6]);
        assert_eq!(state.bounds(), Some((0.1, 3.0)));
    }

    #[test]
    fn non_finite_scores_are_ignored() {
        let state = update(reset(), [f64::NAN, 2.0, f64::INFINITY]);
        assert_eq!(state.bounds(), Some((2.0, 2.0)));
    }

    proptest! {
        /// Property: min never increases and max never decreases as pages fold in.
        #[test]
        fn range_is_monotonic(pages in prop::collection::vec(
            prop::collection::vec(0.0f64..1000.0, 0..20), 1..10)
        ) {
            let mut state = reset();
            for page in pages {
                let next = update(state, page.iter().copied());
                if let (Some(prev), Some(now)) = (state.observed_min, next.observed_min) {
                    prop_assert!(now <= prev);
                }
                if let (Some(prev), Some(now)) = (state.observed_max, next.observed_max) {
                    prop_assert!(now >= prev);
                }
                if state.is_set() {
                    prop_assert!(next.is_set());
                }
                state = next;
            }
        }

        /// Property: the final range does not depend on fetch order.
        #[test]
        fn range_is_order_independent(pages in prop::collection::vec(
            prop::collection::vec(0.0f64..1000.0, 1..10), 1..6)
        ) {
            let forward = pages.iter().fold(reset(), |s, p| update(s, p.iter().copied()));
            let backward = pages.iter().rev().fold(reset(), |s, p| update(s, p.iter().copied()));
            prop_assert_eq!(forward, backward);
        }
    }
}
