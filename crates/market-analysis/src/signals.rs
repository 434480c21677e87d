use chrono::{DateTime, Utc};
use observatory_core::{MarketSentiment, MoatStatus, ScanSignal, TickerCategory};

use crate::constants::*;
use crate::indicators::round2;

/// Moat status from the gross-margin trend. Returns the status and the
/// margin change in percentage points.
pub fn determine_moat_status(
    current_margin: Option<f64>,
    previous_margin: Option<f64>,
) -> (MoatStatus, f64) {
    let (current, previous) = match (current_margin, previous_margin) {
        (Some(c), Some(p)) => (c, p),
        _ => return (MoatStatus::NotAvailable, 0.0),
    };

    let change = round2(current - previous);
    if change < MOAT_MARGIN_DETERIORATION_THRESHOLD {
        (MoatStatus::Deteriorating, change)
    } else {
        (MoatStatus::Stable, change)
    }
}

/// Five-level market sentiment from the share of Trend Setters trading
/// below their MA60. An empty sample defaults to Bullish so an empty
/// watchlist never raises alarms.
pub fn determine_market_sentiment(below_count: usize, valid_count: usize) -> (MarketSentiment, f64) {
    if valid_count == 0 {
        return (MarketSentiment::Bullish, 0.0);
    }

    let pct = (below_count as f64 / valid_count as f64 * 1000.0).round() / 10.0;

    let sentiment = if pct <= MARKET_STRONG_BULLISH_MAX_PCT {
        MarketSentiment::StrongBullish
    } else if pct <= MARKET_BULLISH_MAX_PCT {
        MarketSentiment::Bullish
    } else if pct <= MARKET_NEUTRAL_MAX_PCT {
        MarketSentiment::Neutral
    } else if pct <= MARKET_BEARISH_MAX_PCT {
        MarketSentiment::Bearish
    } else {
        MarketSentiment::StrongBearish
    };
    (sentiment, pct)
}

/// Two-phase scan-signal decision funnel.
///
/// Phase 1 walks the P1..P8 priority ladder with category-shifted RSI
/// thresholds; phase 2 amplifies via the MA200 bias. Missing inputs mean
/// "condition unmet": a missing RSI still allows OVERSOLD on bias alone,
/// and a missing bias still allows CONTRARIAN_BUY on RSI alone (newly
/// listed tickers have no MA60 yet).
pub fn determine_scan_signal(
    moat: MoatStatus,
    rsi: Option<f64>,
    bias: Option<f64>,
    bias_200: Option<f64>,
    category: Option<TickerCategory>,
) -> ScanSignal {
    let offset = category.map(|c| c.rsi_offset()).unwrap_or(0.0);

    let rsi_contrarian = RSI_CONTRARIAN_BUY_THRESHOLD + offset;
    let rsi_approaching = RSI_APPROACHING_BUY_THRESHOLD + offset;
    let rsi_weakening = RSI_WEAKENING_THRESHOLD + offset;
    let rsi_overbought = RSI_OVERBOUGHT + offset;

    // P1: a broken thesis outranks every technical read.
    if moat == MoatStatus::Deteriorating {
        return ScanSignal::ThesisBroken;
    }

    let bias_oversold = bias.is_some_and(|b| b < BIAS_OVERSOLD_THRESHOLD);
    let bias_overheated = bias.is_some_and(|b| b > BIAS_OVERHEATED_THRESHOLD);
    let rsi_low = rsi.is_some_and(|r| r < rsi_contrarian);
    let rsi_high = rsi.is_some_and(|r| r > rsi_overbought);

    let mut signal = if bias_oversold && rsi_low {
        // P2: double-confirmed deep value.
        ScanSignal::DeepValue
    } else if bias_oversold {
        // P3: extreme bias without RSI confirmation.
        ScanSignal::Oversold
    } else if rsi_low && bias.map_or(true, |b| b < BIAS_OVERHEATED_THRESHOLD) {
        // P4: RSI oversold, bias not contradicting.
        ScanSignal::ContrarianBuy
    } else if rsi.is_some_and(|r| r < rsi_approaching)
        && bias.is_some_and(|b| b < BIAS_WEAKENING_THRESHOLD)
    {
        // P4.5: accumulation zone.
        ScanSignal::ApproachingBuy
    } else if bias_overheated && rsi_high {
        // P5: double-confirmed overheated.
        ScanSignal::Overheated
    } else if bias_overheated || rsi_high {
        // P6: single-indicator warning.
        ScanSignal::CautionHigh
    } else if bias.is_some_and(|b| b < BIAS_WEAKENING_THRESHOLD)
        && rsi.is_some_and(|r| r < rsi_weakening)
    {
        // P7: early weakening.
        ScanSignal::Weakening
    } else {
        ScanSignal::Normal
    };

    // Phase 2: MA200 amplifier. P1-P3 and confirmed OVERHEATED/NORMAL are
    // final; the amplifier never degrades a buy signal.
    if let Some(b200) = bias_200 {
        if b200 < MA200_DEEP_DEVIATION_THRESHOLD {
            signal = match signal {
                ScanSignal::Weakening => ScanSignal::ApproachingBuy,
                ScanSignal::ApproachingBuy => ScanSignal::ContrarianBuy,
                other => other,
            };
        } else if b200 > MA200_HIGH_DEVIATION_THRESHOLD && signal == ScanSignal::CautionHigh {
            signal = ScanSignal::Overheated;
        }
    }

    signal
}

/// Days a signal has persisted and whether it is "new" (< 24h).
pub fn compute_signal_duration(
    signal_since: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (Option<i64>, bool) {
    match signal_since {
        None => (None, false),
        Some(since) => {
            let delta = now - since;
            (Some(delta.num_days()), delta.num_seconds() < SECONDS_PER_DAY)
        }
    }
}
