use serde::{Deserialize, Serialize};

/// Category assigned to a tracked ticker or holding.
///
/// Categories drive which analyses apply: Cash is excluded from signal
/// computation entirely, Bond and Cash (and ETFs) from moat analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickerCategory {
    #[serde(rename = "Trend_Setter")]
    TrendSetter,
    Moat,
    Growth,
    Bond,
    Cash,
}

impl TickerCategory {
    /// RSI threshold shift applied by the scan funnel, derived once from the
    /// category's reference beta via round((beta - 1.0) * 4).
    pub fn rsi_offset(&self) -> f64 {
        match self {
            TickerCategory::TrendSetter => 0.0,
            TickerCategory::Moat => 1.0,
            TickerCategory::Growth => 2.0,
            TickerCategory::Bond => -3.0,
            TickerCategory::Cash => 0.0,
        }
    }

    /// Fallback beta used by the stress test when the provider has none.
    pub fn fallback_beta(&self) -> f64 {
        match self {
            TickerCategory::TrendSetter => 1.0,
            TickerCategory::Moat => 0.8,
            TickerCategory::Growth => 1.5,
            TickerCategory::Bond => 0.3,
            TickerCategory::Cash => 0.0,
        }
    }

    /// Position in the withdrawal liquidity waterfall (lower sells first).
    pub fn liquidity_rank(&self) -> u8 {
        match self {
            TickerCategory::Cash => 0,
            TickerCategory::Bond => 1,
            TickerCategory::Growth => 2,
            TickerCategory::Moat => 3,
            TickerCategory::TrendSetter => 4,
        }
    }

    /// Cash positions carry no technical signals.
    pub fn skips_signals(&self) -> bool {
        matches!(self, TickerCategory::Cash)
    }

    /// Bond and Cash have no gross-margin trend to analyze.
    pub fn skips_moat(&self) -> bool {
        matches!(self, TickerCategory::Bond | TickerCategory::Cash)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TickerCategory::TrendSetter => "Trend_Setter",
            TickerCategory::Moat => "Moat",
            TickerCategory::Growth => "Growth",
            TickerCategory::Bond => "Bond",
            TickerCategory::Cash => "Cash",
        }
    }
}

/// Discrete classification assigned to a ticker by the scan decision funnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanSignal {
    ThesisBroken,
    DeepValue,
    Oversold,
    ContrarianBuy,
    ApproachingBuy,
    Overheated,
    CautionHigh,
    Weakening,
    Normal,
}

impl ScanSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanSignal::ThesisBroken => "THESIS_BROKEN",
            ScanSignal::DeepValue => "DEEP_VALUE",
            ScanSignal::Oversold => "OVERSOLD",
            ScanSignal::ContrarianBuy => "CONTRARIAN_BUY",
            ScanSignal::ApproachingBuy => "APPROACHING_BUY",
            ScanSignal::Overheated => "OVERHEATED",
            ScanSignal::CautionHigh => "CAUTION_HIGH",
            ScanSignal::Weakening => "WEAKENING",
            ScanSignal::Normal => "NORMAL",
        }
    }

    /// Signals worth pushing to the user when a scan produces them.
    pub fn is_noteworthy(&self) -> bool {
        matches!(
            self,
            ScanSignal::ThesisBroken
                | ScanSignal::DeepValue
                | ScanSignal::Oversold
                | ScanSignal::ContrarianBuy
                | ScanSignal::Overheated
        )
    }

    pub fn is_buy_side(&self) -> bool {
        matches!(
            self,
            ScanSignal::DeepValue
                | ScanSignal::Oversold
                | ScanSignal::ContrarianBuy
                | ScanSignal::ApproachingBuy
        )
    }
}

/// Moat health proxied by the gross-margin trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoatStatus {
    Deteriorating,
    Stable,
    NotAvailable,
}

impl MoatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoatStatus::Deteriorating => "DETERIORATING",
            MoatStatus::Stable => "STABLE",
            MoatStatus::NotAvailable => "NOT_AVAILABLE",
        }
    }
}

/// Five-level market weather derived from the Trend Setter subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketSentiment {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl MarketSentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketSentiment::StrongBullish => "STRONG_BULLISH",
            MarketSentiment::Bullish => "BULLISH",
            MarketSentiment::Neutral => "NEUTRAL",
            MarketSentiment::Bearish => "BEARISH",
            MarketSentiment::StrongBearish => "STRONG_BEARISH",
        }
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, MarketSentiment::Bearish | MarketSentiment::StrongBearish)
    }
}

/// Fear & greed classification shared by the VIX and CNN scales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FearGreedLevel {
    ExtremeFear,
    Fear,
    Neutral,
    Greed,
    ExtremeGreed,
    NotAvailable,
}

impl FearGreedLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FearGreedLevel::ExtremeFear => "EXTREME_FEAR",
            FearGreedLevel::Fear => "FEAR",
            FearGreedLevel::Neutral => "NEUTRAL",
            FearGreedLevel::Greed => "GREED",
            FearGreedLevel::ExtremeGreed => "EXTREME_GREED",
            FearGreedLevel::NotAvailable => "NOT_AVAILABLE",
        }
    }
}

/// Quarter-over-quarter action on a 13F position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldingAction {
    NewPosition,
    SoldOut,
    Increased,
    Decreased,
    Unchanged,
}

impl HoldingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldingAction::NewPosition => "NEW_POSITION",
            HoldingAction::SoldOut => "SOLD_OUT",
            HoldingAction::Increased => "INCREASED",
            HoldingAction::Decreased => "DECREASED",
            HoldingAction::Unchanged => "UNCHANGED",
        }
    }
}

/// Pain buckets for the stress test, by absolute loss percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PainLevel {
    Low,
    Moderate,
    High,
    Panic,
}

impl PainLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PainLevel::Low => "low",
            PainLevel::Moderate => "moderate",
            PainLevel::High => "high",
            PainLevel::Panic => "panic",
        }
    }
}

/// Metric a price alert watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMetric {
    Rsi,
    Price,
    Bias,
}

/// Comparison direction of a price alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertOperator {
    Lt,
    Gt,
}

impl AlertOperator {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            AlertOperator::Lt => value < threshold,
            AlertOperator::Gt => value > threshold,
        }
    }
}
