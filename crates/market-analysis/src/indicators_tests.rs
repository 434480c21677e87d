#[cfg(test)]
mod tests {
    use crate::indicators::*;

    // 20 closes lifted from a real RSI(14) worked example.
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    #[test]
    fn rsi_needs_period_plus_one_closes() {
        assert_eq!(compute_rsi(&[100.0; 14], 14), None);
        assert!(compute_rsi(&[100.0; 15], 14).is_some());
    }

    #[test]
    fn rsi_within_bounds_on_real_prices() {
        let rsi = compute_rsi(&sample_prices(), 14).unwrap();
        assert!((0.0..=100.0).contains(&rsi));
        // Known value for this series, Wilder smoothing.
        assert!((rsi - 57.92).abs() < 0.01);
    }

    #[test]
    fn rsi_is_100_when_there_are_no_losses() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(compute_rsi(&rising, 14), Some(100.0));
    }

    #[test]
    fn rsi_is_low_in_a_steady_decline() {
        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let rsi = compute_rsi(&falling, 14).unwrap();
        assert!(rsi < 5.0);
    }

    #[test]
    fn rsi_stays_in_bounds_across_random_walks() {
        // Deterministic pseudo-random walk; no RNG needed.
        let mut closes = vec![100.0];
        let mut state: u64 = 0x2545F4914F6CDD1D;
        for _ in 0..300 {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let step = (state % 401) as f64 / 100.0 - 2.0;
            let next = (closes.last().unwrap() + step).max(1.0);
            closes.push(next);
        }
        for window in 16..closes.len() {
            let rsi = compute_rsi(&closes[..window], 14).unwrap();
            assert!((0.0..=100.0).contains(&rsi), "rsi {rsi} out of range");
        }
    }

    #[test]
    fn bias_is_relative_deviation() {
        assert_eq!(compute_bias(110.0, 100.0), Some(10.0));
        assert_eq!(compute_bias(95.0, 100.0), Some(-5.0));
        assert_eq!(compute_bias(100.0, 0.0), None);
    }

    #[test]
    fn moving_average_needs_full_window() {
        assert_eq!(compute_moving_average(&[1.0, 2.0], 3), None);
        assert_eq!(compute_moving_average(&[1.0, 2.0, 3.0, 4.0], 3), Some(3.0));
    }

    #[test]
    fn volume_ratio_needs_twenty_samples() {
        assert_eq!(compute_volume_ratio(&[1000.0; 19]), None);

        let mut volumes = vec![1000.0; 15];
        volumes.extend([2000.0; 5]);
        assert_eq!(compute_volume_ratio(&volumes), Some(1.6)); // 2000 / 1250
    }

    #[test]
    fn volume_ratio_none_when_long_window_empty() {
        assert_eq!(compute_volume_ratio(&[0.0; 20]), None);
    }

    #[test]
    fn daily_change_handles_bad_previous() {
        assert_eq!(compute_daily_change_pct(101.0, 100.0), Some(1.0));
        assert_eq!(compute_daily_change_pct(100.0, 0.0), None);
        assert_eq!(compute_daily_change_pct(100.0, -5.0), None);
    }

    #[test]
    fn bias_percentile_needs_two_hundred_samples() {
        let short: Vec<f64> = (0..199).map(|i| i as f64 / 10.0).collect();
        assert_eq!(compute_bias_percentile(5.0, &short), None);
    }

    #[test]
    fn bias_percentile_uses_lower_bound_rank() {
        // 200 ascending biases from -20.00 stepping 0.24.
        let history: Vec<f64> = (0..200).map(|i| -20.0 + i as f64 * 0.24).collect();

        // Above every historical value: percentile 100.
        assert_eq!(compute_bias_percentile(26.0, &history), Some(100.0));
        // Below every historical value: percentile 0.
        assert_eq!(compute_bias_percentile(-30.0, &history), Some(0.0));
        // Exactly the first element: lower-bound rank is 0.
        assert_eq!(compute_bias_percentile(-20.0, &history), Some(0.0));
        // Midpoint.
        let mid = compute_bias_percentile(4.0, &history).unwrap();
        assert!((mid - 50.0).abs() < 1.0);
    }

    #[test]
    fn bias_percentile_is_monotonic() {
        let history: Vec<f64> = (0..200).map(|i| -20.0 + i as f64 * 0.24).collect();
        let mut last = -1.0;
        for i in -25..30 {
            let p = compute_bias_percentile(i as f64, &history).unwrap();
            assert!(p >= last, "percentile decreased at {i}");
            last = p;
        }
    }

    #[test]
    fn rogue_wave_requires_both_thresholds() {
        assert!(detect_rogue_wave(Some(95.0), Some(1.5)));
        assert!(detect_rogue_wave(Some(100.0), Some(1.6)));
        assert!(!detect_rogue_wave(Some(94.9), Some(1.6)));
        assert!(!detect_rogue_wave(Some(96.0), Some(1.49)));
        assert!(!detect_rogue_wave(None, Some(1.6)));
        assert!(!detect_rogue_wave(Some(96.0), None));
        assert!(!detect_rogue_wave(None, None));
    }

    #[test]
    fn rogue_wave_end_to_end_scenario() {
        // Sorted history of 200 biases, current bias beyond the maximum,
        // volume ratio elevated: a textbook rogue wave.
        let history: Vec<f64> = (0..200).map(|i| -20.0 + i as f64 * 0.24).collect();
        let percentile = compute_bias_percentile(26.0, &history);
        assert_eq!(percentile, Some(100.0));
        assert!(detect_rogue_wave(percentile, Some(1.6)));
    }
}
