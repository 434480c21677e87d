//! Quarter-over-quarter 13F position classification.

use std::collections::HashSet;

use observatory_core::HoldingAction;

use crate::constants::GURU_HOLDING_CHANGE_THRESHOLD_PCT;
use crate::indicators::round2;

/// Classify a position's change with the default ±20% threshold.
pub fn classify_holding_change(current_shares: f64, previous_shares: Option<f64>) -> HoldingAction {
    classify_holding_change_with(
        current_shares,
        previous_shares,
        GURU_HOLDING_CHANGE_THRESHOLD_PCT,
    )
}

/// Classify a position's change against an explicit threshold.
///
/// Total over all inputs; the ±threshold boundaries are inclusive of the
/// changed side. No previous position and no current position is UNCHANGED,
/// not a new position.
pub fn classify_holding_change_with(
    current_shares: f64,
    previous_shares: Option<f64>,
    threshold_pct: f64,
) -> HoldingAction {
    let previous = previous_shares.unwrap_or(0.0);

    if previous == 0.0 {
        return if current_shares == 0.0 {
            HoldingAction::Unchanged
        } else {
            HoldingAction::NewPosition
        };
    }

    if current_shares == 0.0 {
        return HoldingAction::SoldOut;
    }

    let change_pct = (current_shares - previous) / previous * 100.0;
    if change_pct >= threshold_pct {
        HoldingAction::Increased
    } else if change_pct <= -threshold_pct {
        HoldingAction::Decreased
    } else {
        HoldingAction::Unchanged
    }
}

/// Share-count change percent; `None` when there was no previous position.
pub fn compute_change_pct(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some(round2((current - previous) / previous * 100.0))
}

/// Position weight within a filing, percent of total value (0 when the
/// filing total is 0).
pub fn compute_holding_weight(holding_value: f64, total_value: f64) -> f64 {
    if total_value == 0.0 {
        return 0.0;
    }
    round2(holding_value / total_value * 100.0)
}

/// Tickers held by both a guru's latest portfolio and the user's watchlist.
pub fn compute_resonance_matches(
    guru_tickers: &HashSet<String>,
    user_tickers: &HashSet<String>,
) -> HashSet<String> {
    guru_tickers.intersection(user_tickers).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_position_when_no_previous() {
        assert_eq!(
            classify_holding_change(1000.0, None),
            HoldingAction::NewPosition
        );
        assert_eq!(
            classify_holding_change(500.0, Some(0.0)),
            HoldingAction::NewPosition
        );
    }

    #[test]
    fn unchanged_when_both_zero() {
        assert_eq!(classify_holding_change(0.0, None), HoldingAction::Unchanged);
        assert_eq!(
            classify_holding_change(0.0, Some(0.0)),
            HoldingAction::Unchanged
        );
    }

    #[test]
    fn sold_out_when_current_zero() {
        assert_eq!(
            classify_holding_change(0.0, Some(1000.0)),
            HoldingAction::SoldOut
        );
    }

    #[test]
    fn threshold_boundaries_are_inclusive() {
        assert_eq!(
            classify_holding_change_with(1200.0, Some(1000.0), 20.0),
            HoldingAction::Increased
        );
        assert_eq!(
            classify_holding_change_with(800.0, Some(1000.0), 20.0),
            HoldingAction::Decreased
        );
        assert_eq!(
            classify_holding_change_with(1199.9, Some(1000.0), 20.0),
            HoldingAction::Unchanged
        );
        assert_eq!(
            classify_holding_change_with(800.1, Some(1000.0), 20.0),
            HoldingAction::Unchanged
        );
    }

    #[test]
    fn classification_is_total() {
        // Every combination lands in exactly one of the five actions.
        for current in [0.0, 100.0, 500.0, 1500.0] {
            for previous in [None, Some(0.0), Some(100.0), Some(1000.0)] {
                let action = classify_holding_change(current, previous);
                assert!(matches!(
                    action,
                    HoldingAction::NewPosition
                        | HoldingAction::SoldOut
                        | HoldingAction::Increased
                        | HoldingAction::Decreased
                        | HoldingAction::Unchanged
                ));
            }
        }
    }

    #[test]
    fn change_pct_none_when_previous_zero() {
        assert_eq!(compute_change_pct(500.0, 0.0), None);
        assert_eq!(compute_change_pct(1200.0, 1000.0), Some(20.0));
        assert_eq!(compute_change_pct(0.0, 1000.0), Some(-100.0));
    }

    #[test]
    fn weight_zero_on_empty_filing() {
        assert_eq!(compute_holding_weight(500.0, 0.0), 0.0);
        assert_eq!(compute_holding_weight(500.0, 1000.0), 50.0);
    }

    #[test]
    fn resonance_is_the_intersection() {
        let guru: HashSet<String> = ["AAPL", "MSFT", "GOOGL"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let user: HashSet<String> = ["AAPL", "TSLA", "MSFT"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let matches = compute_resonance_matches(&guru, &user);
        assert_eq!(matches.len(), 2);
        assert!(matches.contains("AAPL") && matches.contains("MSFT"));

        assert!(compute_resonance_matches(&HashSet::new(), &user).is_empty());
    }
}
