use crate::indicators::round2;

/// Chain-linked time-weighted return over snapshot values sorted ascending
/// by date, in percent.
///
/// Each sub-period return is `v[i] / v[i-1] - 1`; the chained product minus
/// one is the TWR. Gaps between snapshots are fine: chaining only needs the
/// ratio of adjacent values, not calendar spacing. Returns `None` with
/// fewer than two snapshots or when any non-terminal value is zero.
pub fn compute_twr(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    if values[..values.len() - 1].iter().any(|v| *v == 0.0) {
        return None;
    }

    let mut product = 1.0;
    for pair in values.windows(2) {
        product *= pair[1] / pair[0];
    }

    Some(round2((product - 1.0) * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twr_chains_subperiod_returns() {
        // 100k -> 110k -> 121k is +10% twice: +21% overall.
        let values = [100_000.0, 110_000.0, 121_000.0];
        assert_eq!(compute_twr(&values), Some(21.0));
    }

    #[test]
    fn twr_needs_two_snapshots() {
        assert_eq!(compute_twr(&[]), None);
        assert_eq!(compute_twr(&[100.0]), None);
    }

    #[test]
    fn twr_rejects_zero_denominator() {
        assert_eq!(compute_twr(&[100.0, 0.0, 120.0]), None);
    }

    #[test]
    fn twr_allows_zero_terminal_value() {
        // Total wipeout on the last day is a legitimate -100%.
        assert_eq!(compute_twr(&[100.0, 50.0, 0.0]), Some(-100.0));
    }

    #[test]
    fn twr_round_trip_identity() {
        let values = [100.0, 103.5, 99.2, 107.8, 111.3];
        let twr = compute_twr(&values).unwrap();
        let product: f64 = values.windows(2).map(|w| w[1] / w[0]).product();
        assert!((twr / 100.0 + 1.0 - product).abs() < 0.005);
    }

    #[test]
    fn twr_negative_period() {
        let values = [100.0, 90.0];
        assert_eq!(compute_twr(&values), Some(-10.0));
    }
}
