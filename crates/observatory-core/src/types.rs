use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{FearGreedLevel, MoatStatus};

/// Daily close/volume bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    /// Zero when the source endpoint carries no volume (e.g. spark batches);
    /// volume-derived indicators then come back as `None`.
    #[serde(default)]
    pub volume: f64,
}

/// One day of an FX (or any single-series) quote history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteDay {
    pub date: NaiveDate,
    pub close: f64,
}

/// Technical signal bundle for one ticker.
///
/// Degraded results keep the ticker and set `error`; the cache fabric skips
/// persisting those to disk so the next cold read retries upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalSignals {
    pub ticker: String,
    pub price: Option<f64>,
    pub daily_change_pct: Option<f64>,
    pub rsi: Option<f64>,
    pub ma60: Option<f64>,
    pub ma200: Option<f64>,
    /// Deviation from MA60, percent.
    pub bias: Option<f64>,
    /// Deviation from MA200, percent.
    pub bias_200: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub data_points: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TechnicalSignals {
    pub fn degraded(ticker: &str, error: impl Into<String>) -> Self {
        Self {
            ticker: ticker.to_string(),
            price: None,
            daily_change_pct: None,
            rsi: None,
            ma60: None,
            ma200: None,
            bias: None,
            bias_200: None,
            volume_ratio: None,
            data_points: 0,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Gross-margin trend report backing the moat classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoatReport {
    pub ticker: String,
    pub status: MoatStatus,
    /// Margin change in percentage points (0.0 when not available).
    pub margin_change: f64,
    pub current_margin: Option<f64>,
    pub previous_margin: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MoatReport {
    pub fn not_available(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            status: MoatStatus::NotAvailable,
            margin_change: 0.0,
            current_margin: None,
            previous_margin: None,
            error: None,
        }
    }

    pub fn degraded(ticker: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::not_available(ticker)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Dividend summary for one ticker.
///
/// `ytd_dividend_per_share == None` marks a failed upstream call; a
/// legitimate non-payer reports `0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DividendInfo {
    pub ticker: String,
    pub ytd_dividend_per_share: Option<f64>,
    pub dividend_yield_pct: Option<f64>,
    pub is_dividend_payer: bool,
}

impl DividendInfo {
    pub fn is_error(&self) -> bool {
        self.ytd_dividend_per_share.is_none()
    }
}

/// Next scheduled earnings date, when the provider publishes one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsInfo {
    pub ticker: String,
    pub next_earnings_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EarningsInfo {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// GICS sector resolution. Absence is a legitimate cached outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorInfo {
    pub ticker: String,
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SectorInfo {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One constituent of an ETF's published top holdings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtfConstituent {
    pub symbol: String,
    pub name: String,
    /// Portfolio weight as a fraction (0.045 = 4.5%).
    pub weight: f64,
}

/// Top-N holdings of an ETF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtfHoldings {
    pub ticker: String,
    pub holdings: Vec<EtfConstituent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EtfHoldings {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorWeight {
    pub sector: String,
    /// Weight as a fraction of the fund (0.31 = 31%).
    pub weight: f64,
}

/// Published sector weighting of an ETF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorWeights {
    pub ticker: String,
    pub weights: Vec<SectorWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SectorWeights {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Cached beta. `Absent` is a sentinel: the provider legitimately has no
/// value, and storing that fact avoids repeated upstream calls. The public
/// accessor converts it back to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BetaValue {
    Known(f64),
    Absent,
}

impl BetaValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            BetaValue::Known(b) => Some(*b),
            BetaValue::Absent => None,
        }
    }
}

/// Historical bias distribution for rogue-wave detection.
///
/// An empty distribution with `error == None` is a legitimate durable
/// outcome (ticker too young); network failures set `error` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasDistribution {
    pub ticker: String,
    /// Ascending historical MA60 biases.
    pub historical_biases: Vec<f64>,
    pub count: usize,
    pub p95: Option<f64>,
    /// 5/20 volume ratio from the same history window.
    pub volume_ratio: Option<f64>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BiasDistribution {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_data(&self) -> bool {
        !self.historical_biases.is_empty()
    }
}

/// Spot FX rate for a currency pair (direct quotation: units of quote
/// currency per unit of base currency).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxRate {
    pub base: String,
    pub quote: String,
    pub rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FxRate {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Daily FX close history for a currency pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxHistory {
    pub base: String,
    pub quote: String,
    pub days: Vec<QuoteDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FxHistory {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Where a fear & greed composite came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FearGreedSource {
    Cnn,
    SelfCalculated,
    VixOnly,
    NotAvailable,
}

/// Component scores of the self-calculated fear & greed composite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FearGreedComponents {
    pub vix: Option<i32>,
    pub price_strength: Option<i32>,
    pub momentum: Option<i32>,
    pub breadth: Option<i32>,
    pub junk_bond: Option<i32>,
    pub safe_haven: Option<i32>,
    pub sector_rotation: Option<i32>,
}

/// Composite fear & greed reading: CNN preferred, then self-calculated,
/// then VIX alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FearGreedReport {
    pub level: FearGreedLevel,
    pub score: i32,
    pub source: FearGreedSource,
    pub vix: Option<f64>,
    pub cnn_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<FearGreedComponents>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FearGreedReport {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
