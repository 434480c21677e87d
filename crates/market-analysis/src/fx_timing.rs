//! FX exchange-timing heuristics for the scheduled currency watch.

use observatory_core::{FxWatchConfig, QuoteDay};

use crate::constants::FX_RECENT_HIGH_TOLERANCE_PCT;

/// Outcome of an exchange-timing assessment for one watched pair.
#[derive(Debug, Clone)]
pub struct ExchangeTiming {
    pub latest_rate: Option<f64>,
    pub is_recent_high: bool,
    pub consecutive_increases: usize,
    pub should_alert: bool,
    pub has_data: bool,
}

impl ExchangeTiming {
    fn no_data() -> Self {
        Self {
            latest_rate: None,
            is_recent_high: false,
            consecutive_increases: 0,
            should_alert: false,
            has_data: false,
        }
    }
}

/// True when the latest close sits within `tolerance_pct` of the maximum
/// close over the last `lookback_days`.
pub fn is_recent_high(history: &[QuoteDay], lookback_days: usize, tolerance_pct: f64) -> bool {
    if lookback_days == 0 || history.len() < lookback_days {
        return false;
    }
    let window = &history[history.len() - lookback_days..];
    let max = window.iter().map(|d| d.close).fold(f64::MIN, f64::max);
    let latest = window[window.len() - 1].close;
    if max <= 0.0 || latest <= 0.0 {
        return false;
    }
    latest >= max * (1.0 - tolerance_pct / 100.0)
}

/// Number of strictly increasing closes counting back from the end.
pub fn count_consecutive_increases(history: &[QuoteDay]) -> usize {
    if history.len() < 2 {
        return 0;
    }
    let mut count = 0;
    for pair in history.windows(2).rev() {
        if pair[1].close > pair[0].close {
            count += 1;
        } else {
            break;
        }
    }
    count
}

/// Evaluate a watch config against the pair's close history. Conditions are
/// OR-combined across the enabled toggles.
pub fn assess_exchange_timing(config: &FxWatchConfig, history: &[QuoteDay]) -> ExchangeTiming {
    if history.is_empty() {
        return ExchangeTiming::no_data();
    }

    let recent_high = is_recent_high(history, config.lookback_days, FX_RECENT_HIGH_TOLERANCE_PCT);
    let consecutive = count_consecutive_increases(history);

    let should_alert = (config.alert_on_recent_high && recent_high)
        || (config.alert_on_consecutive && consecutive >= config.consecutive_threshold);

    ExchangeTiming {
        latest_rate: history.last().map(|d| d.close),
        is_recent_high: recent_high,
        consecutive_increases: consecutive,
        should_alert,
        has_data: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(ordinal: u32, close: f64) -> QuoteDay {
        QuoteDay {
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + chrono::Days::new(ordinal as u64),
            close,
        }
    }

    fn series(closes: &[f64]) -> Vec<QuoteDay> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| day(i as u32, *c))
            .collect()
    }

    fn watch(lookback: usize, consecutive: usize) -> FxWatchConfig {
        FxWatchConfig {
            id: 1,
            base: "USD".to_string(),
            quote: "TWD".to_string(),
            lookback_days: lookback,
            consecutive_threshold: consecutive,
            alert_on_recent_high: true,
            alert_on_consecutive: true,
            reminder_interval_hours: 24,
            last_alerted_at: None,
            is_active: true,
        }
    }

    #[test]
    fn recent_high_needs_enough_history() {
        assert!(!is_recent_high(&[], 5, 0.5));
        assert!(!is_recent_high(&series(&[30.0, 31.0]), 5, 0.5));
    }

    #[test]
    fn recent_high_within_tolerance() {
        let hist = series(&[30.0, 30.5, 31.0, 30.9, 30.95]);
        assert!(is_recent_high(&hist, 5, 0.5));

        let below = series(&[30.0, 30.5, 31.0, 30.5, 30.0]);
        assert!(!is_recent_high(&below, 5, 0.5));
    }

    #[test]
    fn recent_high_custom_tolerance() {
        let hist = series(&[30.0, 31.0, 30.5, 30.5, 30.7]);
        assert!(!is_recent_high(&hist, 5, 0.5));
        assert!(is_recent_high(&hist, 5, 2.0));
    }

    #[test]
    fn recent_high_rejects_zero_closes() {
        let hist = series(&[0.0, 0.0, 0.0]);
        assert!(!is_recent_high(&hist, 3, 0.5));
    }

    #[test]
    fn consecutive_counts_from_the_end() {
        assert_eq!(count_consecutive_increases(&series(&[])), 0);
        assert_eq!(count_consecutive_increases(&series(&[31.0])), 0);
        assert_eq!(
            count_consecutive_increases(&series(&[30.0, 30.2, 30.4, 30.6])),
            3
        );
        assert_eq!(
            count_consecutive_increases(&series(&[30.5, 30.2, 30.4, 30.6])),
            2
        );
        assert_eq!(
            count_consecutive_increases(&series(&[30.0, 30.5, 30.2])),
            0
        );
        assert_eq!(
            count_consecutive_increases(&series(&[30.0, 30.0, 30.0])),
            0
        );
    }

    #[test]
    fn assessment_without_history_reports_no_data() {
        let result = assess_exchange_timing(&watch(5, 3), &[]);
        assert!(!result.has_data);
        assert!(!result.should_alert);
    }

    #[test]
    fn alert_fires_when_both_conditions_met() {
        let hist = series(&[30.0, 30.1, 30.2, 30.4, 30.6, 30.8, 31.0]);
        let result = assess_exchange_timing(&watch(5, 3), &hist);
        assert!(result.is_recent_high);
        assert!(result.consecutive_increases >= 3);
        assert!(result.should_alert);
    }

    #[test]
    fn or_logic_alerts_on_recent_high_alone() {
        // At a recent high but only 1 consecutive increase.
        let hist = series(&[30.0, 31.0, 30.9, 30.8, 30.99]);
        let result = assess_exchange_timing(&watch(5, 4), &hist);
        assert!(result.is_recent_high);
        assert!(result.consecutive_increases < 4);
        assert!(result.should_alert);
    }

    #[test]
    fn or_logic_alerts_on_consecutive_alone() {
        // Rising off a deep base: not near the window high, but 3 straight
        // up-days.
        let hist = series(&[35.0, 30.0, 30.1, 30.2, 30.3]);
        let result = assess_exchange_timing(&watch(5, 3), &hist);
        assert!(!result.is_recent_high);
        assert_eq!(result.consecutive_increases, 3);
        assert!(result.should_alert);
    }

    #[test]
    fn no_alert_when_neither_condition_met() {
        let hist = series(&[31.0, 30.8, 30.5, 30.4, 30.2]);
        let result = assess_exchange_timing(&watch(5, 3), &hist);
        assert!(!result.should_alert);
        assert_eq!(result.consecutive_increases, 0);
    }
}
