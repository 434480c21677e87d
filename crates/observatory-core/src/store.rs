//! Persistence seams consumed by the engine.
//!
//! The relational layout behind these traits is the external collaborator's
//! concern. One hard contract: stores that persist timestamps without a
//! timezone MUST interpret them as UTC when mapping back into
//! `DateTime<Utc>` — alert cooldown comparisons depend on it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{
    FxWatchConfig, Guru, GuruFiling, GuruHolding, Holding, InvestmentProfile, PortfolioSnapshot,
    PriceAlert, RemovalLog, ScanLog, ThesisLog, TrackedTicker,
};
use crate::enums::ScanSignal;
use crate::error::EngineError;

/// Watchlist, thesis/removal logs and scan-log persistence.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn list_active_tickers(&self) -> Result<Vec<TrackedTicker>, EngineError>;
    async fn list_inactive_tickers(&self) -> Result<Vec<TrackedTicker>, EngineError>;
    async fn find_ticker(&self, symbol: &str) -> Result<Option<TrackedTicker>, EngineError>;
    async fn upsert_ticker(&self, ticker: &TrackedTicker) -> Result<(), EngineError>;

    async fn max_thesis_version(&self, symbol: &str) -> Result<u32, EngineError>;
    async fn append_thesis(&self, log: &ThesisLog) -> Result<(), EngineError>;
    async fn thesis_history(&self, symbol: &str) -> Result<Vec<ThesisLog>, EngineError>;

    async fn append_removal(&self, log: &RemovalLog) -> Result<(), EngineError>;
    async fn removal_history(&self, symbol: &str) -> Result<Vec<RemovalLog>, EngineError>;

    /// Update `last_scan_signal` and, when the signal changed, `signal_since`.
    async fn update_scan_state(
        &self,
        symbol: &str,
        signal: ScanSignal,
        signal_since: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError>;

    async fn insert_scan_log(&self, log: &ScanLog) -> Result<(), EngineError>;

    /// Scan logs of the most recent run (empty when never scanned).
    async fn latest_scan_logs(&self) -> Result<Vec<ScanLog>, EngineError>;
}

/// Price-alert persistence.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_active_alerts(&self) -> Result<Vec<PriceAlert>, EngineError>;
    async fn mark_alert_triggered(
        &self,
        alert_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError>;
}

/// Holdings, profile, snapshots and FX watches.
#[async_trait]
pub trait PortfolioStore: Send + Sync {
    async fn list_holdings(&self) -> Result<Vec<Holding>, EngineError>;
    async fn get_profile(&self) -> Result<Option<InvestmentProfile>, EngineError>;
    /// Snapshots ascending by date.
    async fn list_snapshots(&self) -> Result<Vec<PortfolioSnapshot>, EngineError>;
    async fn list_fx_watches(&self) -> Result<Vec<FxWatchConfig>, EngineError>;
    async fn mark_fx_alerted(&self, watch_id: i64, at: DateTime<Utc>)
        -> Result<(), EngineError>;
}

/// Guru 13F persistence.
#[async_trait]
pub trait FilingStore: Send + Sync {
    async fn find_guru(&self, guru_id: i64) -> Result<Option<Guru>, EngineError>;
    async fn list_active_gurus(&self) -> Result<Vec<Guru>, EngineError>;
    async fn find_filing_by_accession(
        &self,
        accession_number: &str,
    ) -> Result<Option<GuruFiling>, EngineError>;
    /// Filings for a guru, newest report_date first.
    async fn list_filings_by_guru(
        &self,
        guru_id: i64,
        limit: usize,
    ) -> Result<Vec<GuruFiling>, EngineError>;
    async fn latest_filing_by_guru(&self, guru_id: i64)
        -> Result<Option<GuruFiling>, EngineError>;
    async fn holdings_by_filing(&self, filing_id: i64) -> Result<Vec<GuruHolding>, EngineError>;
    /// Persist a filing and return its id.
    async fn save_filing(&self, filing: &GuruFiling) -> Result<i64, EngineError>;
    async fn save_holdings_batch(&self, holdings: &[GuruHolding]) -> Result<(), EngineError>;
}

/// Notification log — the only state needed to rate-limit notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn last_sent(&self, kind: &str) -> Result<Option<DateTime<Utc>>, EngineError>;
    async fn record_sent(&self, kind: &str, at: DateTime<Utc>) -> Result<(), EngineError>;
}
