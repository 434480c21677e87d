use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{AlertMetric, AlertOperator, MarketSentiment, ScanSignal, TickerCategory};

/// A ticker on the user's watchlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedTicker {
    pub symbol: String,
    pub category: TickerCategory,
    pub current_thesis: String,
    pub current_tags: Vec<String>,
    pub is_etf: bool,
    pub is_active: bool,
    pub last_scan_signal: ScanSignal,
    pub signal_since: Option<DateTime<Utc>>,
    pub display_order: i32,
}

impl TrackedTicker {
    pub fn new(symbol: &str, category: TickerCategory, thesis: &str) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            category,
            current_thesis: thesis.to_string(),
            current_tags: Vec::new(),
            is_etf: false,
            is_active: true,
            last_scan_signal: ScanSignal::Normal,
            signal_since: None,
            display_order: 0,
        }
    }
}

/// Append-only thesis version. Versions are dense and strictly ascending
/// per ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThesisLog {
    pub symbol: String,
    pub version: u32,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only removal reason; a ticker accumulates several across
/// deactivate/reactivate cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalLog {
    pub symbol: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// One row per (ticker, scan run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLog {
    pub symbol: String,
    pub signal: ScanSignal,
    pub market_sentiment: MarketSentiment,
    /// Structured alert detail (alert strings, rogue-wave fields, metrics).
    pub detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Threshold alert on a scan metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceAlert {
    pub id: i64,
    pub symbol: String,
    pub metric: AlertMetric,
    pub operator: AlertOperator,
    pub threshold: f64,
    pub is_active: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
}

/// A position in the portfolio. Cash rows have `symbol == currency` and
/// `is_cash == true`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub category: TickerCategory,
    pub quantity: f64,
    /// Per-unit cost in the holding's own currency.
    pub cost_basis: Option<f64>,
    pub currency: String,
    pub broker: Option<String>,
    pub is_cash: bool,
}

/// Target allocation and display currency. Percentages sum to 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentProfile {
    pub targets: HashMap<TickerCategory, f64>,
    pub home_currency: String,
}

/// An institutional manager tracked via 13F filings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guru {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    /// 10-digit zero-padded SEC CIK.
    pub cik: String,
    pub is_active: bool,
}

/// A synced 13F-HR filing, uniquely identified by accession number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuruFiling {
    pub id: i64,
    pub guru_id: i64,
    pub accession_number: String,
    pub report_date: NaiveDate,
    pub filing_date: NaiveDate,
    /// Sum of position values, thousands USD.
    pub total_value: f64,
    pub holdings_count: usize,
    pub filing_url: String,
    pub synced_at: DateTime<Utc>,
}

/// One classified position within a filing. References its filing and guru
/// by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuruHolding {
    pub filing_id: i64,
    pub guru_id: i64,
    pub cusip: String,
    pub ticker: Option<String>,
    pub company_name: String,
    /// Thousands USD.
    pub value: f64,
    pub shares: f64,
    pub action: crate::enums::HoldingAction,
    pub change_pct: Option<f64>,
    pub weight_pct: Option<f64>,
    pub sector: Option<String>,
}

/// Daily portfolio valuation snapshot (one per date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub total_value: f64,
    pub category_values: HashMap<TickerCategory, f64>,
    pub currency: String,
    pub benchmark_values: HashMap<String, f64>,
}

/// Configuration for a scheduled FX timing watch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FxWatchConfig {
    pub id: i64,
    pub base: String,
    pub quote: String,
    pub lookback_days: usize,
    pub consecutive_threshold: usize,
    pub alert_on_recent_high: bool,
    pub alert_on_consecutive: bool,
    pub reminder_interval_hours: i64,
    pub last_alerted_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}
