//! Fear & greed compositing: CNN score preferred, self-calculated
//! seven-component fallback, VIX-only last resort.

use observatory_core::{FearGreedComponents, FearGreedLevel};

use crate::constants::*;
use crate::indicators::compute_rsi;

/// VIX level classification.
pub fn classify_vix(vix: Option<f64>) -> FearGreedLevel {
    let Some(v) = vix else {
        return FearGreedLevel::NotAvailable;
    };
    if v > VIX_EXTREME_FEAR {
        FearGreedLevel::ExtremeFear
    } else if v > VIX_FEAR {
        FearGreedLevel::Fear
    } else if v > VIX_NEUTRAL_LOW {
        FearGreedLevel::Neutral
    } else if v > VIX_GREED {
        FearGreedLevel::Greed
    } else {
        FearGreedLevel::ExtremeGreed
    }
}

/// CNN-style 0-100 score classification.
pub fn classify_cnn_fear_greed(score: Option<i32>) -> FearGreedLevel {
    let Some(s) = score else {
        return FearGreedLevel::NotAvailable;
    };
    if s <= CNN_FG_EXTREME_FEAR {
        FearGreedLevel::ExtremeFear
    } else if s <= CNN_FG_FEAR {
        FearGreedLevel::Fear
    } else if s <= CNN_FG_NEUTRAL_HIGH {
        FearGreedLevel::Neutral
    } else if s <= CNN_FG_GREED {
        FearGreedLevel::Greed
    } else {
        FearGreedLevel::ExtremeGreed
    }
}

/// Piecewise-linear VIX → 0-100 score, clamped outside [8, 40]. The
/// breakpoints mirror the classification thresholds so a VIX level and its
/// score always land in the same band.
pub fn vix_to_score(vix: Option<f64>) -> i32 {
    let Some(v) = vix else { return 50 };

    let points = &VIX_SCORE_POINTS;
    if v >= points[0].0 {
        return points[0].1;
    }
    if v <= points[points.len() - 1].0 {
        return points[points.len() - 1].1;
    }

    for pair in points.windows(2) {
        let (vix_high, score_at_high) = pair[0];
        let (vix_low, score_at_low) = pair[1];
        if v >= vix_low {
            let ratio = (vix_high - v) / (vix_high - vix_low);
            return (score_at_high as f64 + ratio * (score_at_low - score_at_high) as f64).round()
                as i32;
        }
    }
    50
}

fn clamp_score(value: f64) -> i32 {
    value.clamp(0.0, 100.0).round() as i32
}

/// Simple return over the last `lookback` days, percent.
fn period_return(prices: &[f64], lookback: usize) -> Option<f64> {
    if prices.len() < lookback + 1 {
        return None;
    }
    let start = prices[prices.len() - lookback - 1];
    let end = prices[prices.len() - 1];
    if start == 0.0 {
        return None;
    }
    Some((end / start - 1.0) * 100.0)
}

/// Continuous linear VIX score (no piecewise cliffs): VIX 10 → 90,
/// VIX 20 → 58, VIX 30 → 26.
pub fn score_vix_linear(vix: f64) -> i32 {
    clamp_score(FG_VIX_BASE - (vix - FG_VIX_OFFSET) * FG_VIX_SLOPE)
}

/// S&P 14-day return → 0-100; saturates at ±6.25%.
pub fn score_price_strength(prices: &[f64]) -> Option<i32> {
    period_return(prices, FG_LOOKBACK_DAYS)
        .map(|ret| clamp_score(50.0 + ret * FG_PRICE_STRENGTH_MULT))
}

/// 70% RSI(14) + 30% price-vs-MA50 position → 0-100.
pub fn score_momentum_composite(prices: &[f64]) -> Option<i32> {
    if prices.len() < (RSI_PERIOD + 1).max(FG_MA_WINDOW) {
        return None;
    }

    let rsi = compute_rsi(prices, RSI_PERIOD)?;

    let ma50: f64 =
        prices[prices.len() - FG_MA_WINDOW..].iter().sum::<f64>() / FG_MA_WINDOW as f64;
    if ma50 == 0.0 || !ma50.is_finite() {
        return None;
    }
    let deviation_pct = (prices[prices.len() - 1] / ma50 - 1.0) * 100.0;
    let ma_score = clamp_score(50.0 + deviation_pct * FG_MOMENTUM_MA_MULT);

    Some(clamp_score(
        FG_MOMENTUM_RSI_WEIGHT * rsi + (1.0 - FG_MOMENTUM_RSI_WEIGHT) * ma_score as f64,
    ))
}

/// Equal-weight vs cap-weight S&P divergence (RSP vs SPY) → 0-100.
pub fn score_breadth(rsp_prices: &[f64], spy_prices: &[f64]) -> Option<i32> {
    let rsp = period_return(rsp_prices, FG_LOOKBACK_DAYS)?;
    let spy = period_return(spy_prices, FG_LOOKBACK_DAYS)?;
    Some(clamp_score(50.0 + (rsp - spy) * FG_BREADTH_MULT))
}

/// High-yield vs treasuries (HYG vs TLT): outperforming junk = risk
/// appetite = greed.
pub fn score_junk_bond_demand(hyg_prices: &[f64], tlt_prices: &[f64]) -> Option<i32> {
    let hyg = period_return(hyg_prices, FG_LOOKBACK_DAYS)?;
    let tlt = period_return(tlt_prices, FG_LOOKBACK_DAYS)?;
    Some(clamp_score(50.0 + (hyg - tlt) * FG_JUNK_BOND_MULT))
}

/// TLT return inverted: rising treasuries read as equity fear.
pub fn score_safe_haven(tlt_prices: &[f64]) -> Option<i32> {
    period_return(tlt_prices, FG_LOOKBACK_DAYS)
        .map(|ret| clamp_score(50.0 - ret * FG_SAFE_HAVEN_MULT))
}

/// Growth vs defensive rotation (QQQ vs XLP) → 0-100.
pub fn score_sector_rotation(qqq_prices: &[f64], xlp_prices: &[f64]) -> Option<i32> {
    let qqq = period_return(qqq_prices, FG_LOOKBACK_DAYS)?;
    let xlp = period_return(xlp_prices, FG_LOOKBACK_DAYS)?;
    Some(clamp_score(50.0 + (qqq - xlp) * FG_SECTOR_ROTATION_MULT))
}

/// Weighted average of the available component scores; missing components
/// are excluded and the remaining weights re-normalised.
pub fn compute_weighted_fear_greed(components: &FearGreedComponents) -> (FearGreedLevel, i32) {
    let weighted: [(Option<i32>, f64); 7] = [
        (components.vix, FG_WEIGHT_VIX),
        (components.price_strength, FG_WEIGHT_PRICE_STRENGTH),
        (components.momentum, FG_WEIGHT_MOMENTUM),
        (components.breadth, FG_WEIGHT_BREADTH),
        (components.junk_bond, FG_WEIGHT_JUNK_BOND),
        (components.safe_haven, FG_WEIGHT_SAFE_HAVEN),
        (components.sector_rotation, FG_WEIGHT_SECTOR_ROTATION),
    ];

    let mut total_weight = 0.0;
    let mut weighted_sum = 0.0;
    for (score, weight) in weighted {
        if let Some(s) = score {
            total_weight += weight;
            weighted_sum += s as f64 * weight;
        }
    }

    if total_weight == 0.0 {
        return (FearGreedLevel::NotAvailable, 50);
    }

    let composite = clamp_score(weighted_sum / total_weight);
    (classify_cnn_fear_greed(Some(composite)), composite)
}

/// Composite: CNN wins, then the self-calculated composite, then VIX alone.
/// CNN already blends seven indicators (VIX included), so preferring it
/// avoids double-weighting the VIX.
pub fn compute_composite_fear_greed(
    vix: Option<f64>,
    cnn_score: Option<i32>,
    self_calculated: Option<i32>,
) -> (FearGreedLevel, i32) {
    let composite = if let Some(cnn) = cnn_score {
        cnn
    } else if let Some(own) = self_calculated {
        own
    } else if vix.is_some() {
        vix_to_score(vix)
    } else {
        return (FearGreedLevel::NotAvailable, 50);
    };

    let composite = composite.clamp(0, 100);
    (classify_cnn_fear_greed(Some(composite)), composite)
}
