use crate::constants::{
    ROGUE_WAVE_BIAS_PERCENTILE, ROGUE_WAVE_MIN_HISTORY_DAYS,
    ROGUE_WAVE_VOLUME_RATIO_THRESHOLD, VOLUME_RATIO_LONG_DAYS, VOLUME_RATIO_SHORT_DAYS,
};

/// Round to two decimal places (all public indicator outputs use this).
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Wilder-smoothed RSI over the last `period` bars.
///
/// Needs at least `period + 1` closes. Returns exactly 100.0 when the
/// average loss is zero.
pub fn compute_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = deltas[..period]
        .iter()
        .map(|d| if *d > 0.0 { *d } else { 0.0 })
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = deltas[..period]
        .iter()
        .map(|d| if *d < 0.0 { -*d } else { 0.0 })
        .sum::<f64>()
        / period as f64;

    for d in &deltas[period..] {
        let gain = if *d > 0.0 { *d } else { 0.0 };
        let loss = if *d < 0.0 { -*d } else { 0.0 };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(round2(100.0 - 100.0 / (1.0 + rs)))
}

/// Deviation of `price` from a moving average, percent. `None` when the MA
/// is zero or not finite.
pub fn compute_bias(price: f64, ma: f64) -> Option<f64> {
    if ma == 0.0 || !ma.is_finite() {
        return None;
    }
    Some(round2((price - ma) / ma * 100.0))
}

/// Simple moving average over the trailing `window` values.
pub fn compute_moving_average(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let sum: f64 = values[values.len() - window..].iter().sum();
    Some(round2(sum / window as f64))
}

/// mean(last 5 volumes) / mean(last 20 volumes). `None` below 20 samples or
/// when the long-window mean is zero.
pub fn compute_volume_ratio(volumes: &[f64]) -> Option<f64> {
    if volumes.len() < VOLUME_RATIO_LONG_DAYS {
        return None;
    }
    let short: f64 = volumes[volumes.len() - VOLUME_RATIO_SHORT_DAYS..].iter().sum::<f64>()
        / VOLUME_RATIO_SHORT_DAYS as f64;
    let long: f64 = volumes[volumes.len() - VOLUME_RATIO_LONG_DAYS..].iter().sum::<f64>()
        / VOLUME_RATIO_LONG_DAYS as f64;
    if long > 0.0 {
        Some(round2(short / long))
    } else {
        None
    }
}

/// Day-over-day change, percent. `None` when the previous close is ≤ 0.
pub fn compute_daily_change_pct(current: f64, previous: f64) -> Option<f64> {
    if previous <= 0.0 {
        return None;
    }
    Some(round2((current - previous) / previous * 100.0))
}

/// Percentile rank (0-100) of `current_bias` within an ascending history,
/// lower-bound rank. `None` when the history is shorter than the rogue-wave
/// minimum.
pub fn compute_bias_percentile(current_bias: f64, historical_biases: &[f64]) -> Option<f64> {
    if historical_biases.len() < ROGUE_WAVE_MIN_HISTORY_DAYS {
        return None;
    }
    let rank = historical_biases.partition_point(|b| *b < current_bias);
    Some(round2(rank as f64 / historical_biases.len() as f64 * 100.0))
}

/// Rogue wave: bias at a historical extreme AND volume clearly elevated.
/// Any missing input disarms the detector.
pub fn detect_rogue_wave(bias_percentile: Option<f64>, volume_ratio: Option<f64>) -> bool {
    match (bias_percentile, volume_ratio) {
        (Some(p), Some(v)) => {
            p >= ROGUE_WAVE_BIAS_PERCENTILE && v >= ROGUE_WAVE_VOLUME_RATIO_THRESHOLD
        }
        _ => false,
    }
}
