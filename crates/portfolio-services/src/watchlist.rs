//! Watchlist lifecycle: add/remove/reactivate tickers, thesis versioning,
//! category changes, and the enriched listing the dashboard renders.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use market_analysis::determine_scan_signal;
use observatory_core::{
    store::WatchlistStore, Clock, DividendInfo, EarningsInfo, EngineError, MoatReport,
    MoatStatus, RemovalLog, ScanSignal, TechnicalSignals, ThesisLog, TickerCategory,
    TrackedTicker,
};

use crate::market_data::PortfolioMarketData;

/// Pool width and per-ticker timeout for the enriched listing, so one slow
/// symbol cannot stall the whole batch.
const ENRICH_CONCURRENCY: usize = 8;
const ENRICH_TIMEOUT: Duration = Duration::from_secs(30);

/// One watchlist row with its live enrichment.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedTicker {
    pub symbol: String,
    pub category: TickerCategory,
    pub current_thesis: String,
    pub current_tags: Vec<String>,
    pub is_etf: bool,
    pub last_scan_signal: ScanSignal,
    pub display_order: i32,
    pub signals: Option<TechnicalSignals>,
    pub earnings: Option<EarningsInfo>,
    pub dividend: Option<DividendInfo>,
    /// Live funnel output from the fresh RSI/bias (moat skipped here — too
    /// expensive per page load). A persisted THESIS_BROKEN always wins.
    pub computed_signal: Option<ScanSignal>,
}

pub struct WatchlistService<S> {
    store: Arc<S>,
    market: Arc<dyn PortfolioMarketData>,
    clock: Arc<dyn Clock>,
}

impl<S> WatchlistService<S>
where
    S: WatchlistStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, market: Arc<dyn PortfolioMarketData>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            market,
            clock,
        }
    }

    async fn ticker_or_not_found(&self, symbol: &str) -> Result<TrackedTicker, EngineError> {
        let upper = symbol.to_uppercase();
        self.store
            .find_ticker(&upper)
            .await?
            .ok_or(EngineError::TickerNotFound(upper))
    }

    async fn append_thesis_version(
        &self,
        symbol: &str,
        content: &str,
        tags: Vec<String>,
    ) -> Result<u32, EngineError> {
        let version = self.store.max_thesis_version(symbol).await? + 1;
        self.store
            .append_thesis(&ThesisLog {
                symbol: symbol.to_string(),
                version,
                content: content.to_string(),
                tags,
                created_at: self.clock.now(),
            })
            .await?;
        Ok(version)
    }

    /// Add a ticker to the watchlist with its first thesis version.
    /// `is_etf == None` probes the provider's quote type.
    pub async fn create_ticker(
        &self,
        symbol: &str,
        category: TickerCategory,
        thesis: &str,
        tags: Vec<String>,
        is_etf: Option<bool>,
    ) -> Result<TrackedTicker, EngineError> {
        let upper = symbol.to_uppercase();
        if self.store.find_ticker(&upper).await?.is_some() {
            return Err(EngineError::TickerExists(upper));
        }

        let is_etf = match is_etf {
            Some(flag) => flag,
            None => self.market.detect_is_etf(&upper).await,
        };

        let mut ticker = TrackedTicker::new(&upper, category, thesis);
        ticker.current_tags = tags.clone();
        ticker.is_etf = is_etf;
        self.store.upsert_ticker(&ticker).await?;
        self.append_thesis_version(&upper, thesis, tags).await?;

        tracing::info!("now tracking {upper} ({})", category.as_str());
        Ok(ticker)
    }

    /// Record a new thesis version and update the current one.
    pub async fn add_thesis(
        &self,
        symbol: &str,
        content: &str,
        tags: Vec<String>,
    ) -> Result<u32, EngineError> {
        let mut ticker = self.ticker_or_not_found(symbol).await?;
        let version = self
            .append_thesis_version(&ticker.symbol, content, tags.clone())
            .await?;
        ticker.current_thesis = content.to_string();
        ticker.current_tags = tags;
        self.store.upsert_ticker(&ticker).await?;
        tracing::info!("{} thesis now at v{version}", ticker.symbol);
        Ok(version)
    }

    /// Move a ticker to another category, logging the change in the
    /// thesis history.
    pub async fn change_category(
        &self,
        symbol: &str,
        new_category: TickerCategory,
    ) -> Result<TrackedTicker, EngineError> {
        let mut ticker = self.ticker_or_not_found(symbol).await?;
        if ticker.category == new_category {
            return Err(EngineError::CategoryUnchanged(ticker.symbol));
        }

        let note = format!(
            "Category changed: {} → {}",
            ticker.category.as_str(),
            new_category.as_str()
        );
        ticker.category = new_category;
        self.store.upsert_ticker(&ticker).await?;
        self.append_thesis_version(&ticker.symbol, &note, Vec::new())
            .await?;
        Ok(ticker)
    }

    /// Stop tracking a ticker, recording why.
    pub async fn deactivate(&self, symbol: &str, reason: &str) -> Result<(), EngineError> {
        let mut ticker = self.ticker_or_not_found(symbol).await?;
        if !ticker.is_active {
            return Err(EngineError::TickerInactive(ticker.symbol));
        }

        ticker.is_active = false;
        self.store.upsert_ticker(&ticker).await?;
        self.store
            .append_removal(&RemovalLog {
                symbol: ticker.symbol.clone(),
                reason: reason.to_string(),
                created_at: self.clock.now(),
            })
            .await?;
        self.append_thesis_version(&ticker.symbol, &format!("Removed: {reason}"), Vec::new())
            .await?;
        tracing::info!("stopped tracking {} ({reason})", ticker.symbol);
        Ok(())
    }

    /// Resume tracking a previously removed ticker. The stale signal
    /// resets so the next scan starts a fresh streak.
    pub async fn reactivate(
        &self,
        symbol: &str,
        category: Option<TickerCategory>,
        thesis: Option<&str>,
    ) -> Result<TrackedTicker, EngineError> {
        let mut ticker = self.ticker_or_not_found(symbol).await?;
        if ticker.is_active {
            return Err(EngineError::TickerActive(ticker.symbol));
        }

        ticker.is_active = true;
        ticker.last_scan_signal = ScanSignal::Normal;
        ticker.signal_since = None;
        if let Some(category) = category {
            ticker.category = category;
        }
        if let Some(thesis) = thesis {
            ticker.current_thesis = thesis.to_string();
        }
        self.store.upsert_ticker(&ticker).await?;
        self.append_thesis_version(
            &ticker.symbol,
            thesis.unwrap_or("Reactivated"),
            Vec::new(),
        )
        .await?;
        Ok(ticker)
    }

    pub async fn list_active(&self) -> Result<Vec<TrackedTicker>, EngineError> {
        self.store.list_active_tickers().await
    }

    pub async fn list_removed(&self) -> Result<Vec<(TrackedTicker, Option<RemovalLog>)>, EngineError> {
        let tickers = self.store.list_inactive_tickers().await?;
        let mut results = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let latest = self
                .store
                .removal_history(&ticker.symbol)
                .await?
                .into_iter()
                .max_by_key(|log| log.created_at);
            results.push((ticker, latest));
        }
        Ok(results)
    }

    pub async fn thesis_history(&self, symbol: &str) -> Result<Vec<ThesisLog>, EngineError> {
        let ticker = self.ticker_or_not_found(symbol).await?;
        self.store.thesis_history(&ticker.symbol).await
    }

    pub async fn removal_history(&self, symbol: &str) -> Result<Vec<RemovalLog>, EngineError> {
        let ticker = self.ticker_or_not_found(symbol).await?;
        self.store.removal_history(&ticker.symbol).await
    }

    /// Moat trend for one ticker; Bond/Cash never call upstream.
    pub async fn moat_for_ticker(&self, symbol: &str) -> Result<MoatReport, EngineError> {
        let upper = symbol.to_uppercase();
        if let Some(ticker) = self.store.find_ticker(&upper).await? {
            if ticker.category.skips_moat() || ticker.is_etf {
                return Ok(MoatReport::not_available(&upper));
            }
        }
        Ok(self.market.moat(&upper).await)
    }

    /// Every active ticker with signals, earnings and dividend attached —
    /// fetched concurrently with a per-ticker timeout so the dashboard
    /// renders in one round trip.
    pub async fn list_enriched(&self) -> Result<Vec<EnrichedTicker>, EngineError> {
        let tickers = self.store.list_active_tickers().await?;
        if tickers.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!("enriching {} watchlist rows", tickers.len());

        let semaphore = Arc::new(tokio::sync::Semaphore::new(ENRICH_CONCURRENCY));
        let mut handles = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let market = self.market.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                let symbol = ticker.symbol.clone();
                match tokio::time::timeout(ENRICH_TIMEOUT, enrich_one(market.as_ref(), &ticker))
                    .await
                {
                    Ok(enriched) => enriched,
                    Err(_) => {
                        tracing::warn!("enrichment timed out for {symbol}, serving bare row");
                        bare_row(&ticker)
                    }
                }
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(row) = handle.await {
                results.push(row);
            }
        }
        results.sort_by_key(|r| r.display_order);
        Ok(results)
    }
}

fn bare_row(ticker: &TrackedTicker) -> EnrichedTicker {
    EnrichedTicker {
        symbol: ticker.symbol.clone(),
        category: ticker.category,
        current_thesis: ticker.current_thesis.clone(),
        current_tags: ticker.current_tags.clone(),
        is_etf: ticker.is_etf,
        last_scan_signal: ticker.last_scan_signal,
        display_order: ticker.display_order,
        signals: None,
        earnings: None,
        dividend: None,
        computed_signal: None,
    }
}

async fn enrich_one(market: &dyn PortfolioMarketData, ticker: &TrackedTicker) -> EnrichedTicker {
    let mut row = bare_row(ticker);

    if !ticker.category.skips_signals() {
        row.signals = Some(market.signals(&ticker.symbol).await);
    }
    row.earnings = Some(market.earnings(&ticker.symbol).await);
    row.dividend = Some(market.dividend(&ticker.symbol).await);

    // A persisted THESIS_BROKEN never downgrades from a live recompute.
    row.computed_signal = if ticker.last_scan_signal == ScanSignal::ThesisBroken {
        Some(ScanSignal::ThesisBroken)
    } else {
        row.signals.as_ref().map(|signals| {
            determine_scan_signal(
                MoatStatus::NotAvailable,
                signals.rsi,
                signals.bias,
                None,
                Some(ticker.category),
            )
        })
    };

    row
}
