//! The batched scan pipeline: prefetch, analyze, classify, persist,
//! alert — with at-most-one concurrent execution.

mod prewarm;
mod price_alerts;

pub use prewarm::{collect_ticker_sets, PrewarmService, TickerSets};
pub use price_alerts::evaluate_price_alerts;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use market_analysis::{
    compute_bias_percentile, detect_rogue_wave, determine_market_sentiment,
    determine_scan_signal,
};
use observatory_core::{
    store::{AlertStore, NotificationStore, WatchlistStore},
    BiasDistribution, Clock, EngineError, FearGreedReport, MarketSentiment, MoatReport,
    MoatStatus, Notifier, ScanLog, ScanSignal, TechnicalSignals, TickerCategory, TrackedTicker,
};

use notification_service::NotificationGate;
use yahoo_client::YahooClient;

/// Bounded width of the per-ticker scan stage.
pub const SCAN_CONCURRENCY: usize = 4;

/// Notification gate intervals.
pub const SIGNAL_NOTIFY_KIND: &str = "scan_signal";
pub const ROGUE_WAVE_NOTIFY_KIND: &str = "rogue_wave";
const SIGNAL_NOTIFY_INTERVAL_HOURS: i64 = 6;
const ROGUE_WAVE_NOTIFY_INTERVAL_HOURS: i64 = 12;

/// Market-data seam for the scan (the production impl is `YahooClient`).
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn technical_signals(&self, ticker: &str) -> TechnicalSignals;
    async fn bias_distribution(&self, ticker: &str) -> BiasDistribution;
    async fn moat_trend(&self, ticker: &str) -> MoatReport;
    /// Batch-download history and prime the signals cache, falling back to
    /// per-ticker calls for anything the batch missed.
    async fn warm_signals(&self, tickers: &[String]);
    async fn fear_greed(&self) -> FearGreedReport;
}

#[async_trait]
impl MarketFeed for Arc<YahooClient> {
    async fn technical_signals(&self, ticker: &str) -> TechnicalSignals {
        self.get_technical_signals(ticker).await
    }

    async fn bias_distribution(&self, ticker: &str) -> BiasDistribution {
        self.get_bias_distribution(ticker).await
    }

    async fn moat_trend(&self, ticker: &str) -> MoatReport {
        self.analyze_moat_trend(ticker).await
    }

    async fn warm_signals(&self, tickers: &[String]) {
        match self.batch_download_history(tickers).await {
            Ok(history) if !history.is_empty() => {
                let primed = self.prime_signals_cache_batch(&history);
                let missed: Vec<String> = tickers
                    .iter()
                    .filter(|t| !history.contains_key(*t))
                    .cloned()
                    .collect();
                tracing::info!(
                    "batch primed {primed} tickers, {} falling back to single fetches",
                    missed.len()
                );
                if !missed.is_empty() {
                    self.clone().prewarm_signals_batch(missed).await;
                }
            }
            Ok(_) | Err(_) => {
                tracing::warn!("batch history download failed, warming per ticker");
                self.clone().prewarm_signals_batch(tickers.to_vec()).await;
            }
        }
    }

    async fn fear_greed(&self) -> FearGreedReport {
        self.get_fear_greed_index().await
    }
}

/// One ticker's scan outcome; serialized into the scan log's detail blob.
#[derive(Debug, Clone, Serialize)]
pub struct TickerScanResult {
    pub ticker: String,
    pub category: TickerCategory,
    pub signal: ScanSignal,
    pub previous_signal: ScanSignal,
    pub price: Option<f64>,
    pub rsi: Option<f64>,
    pub bias: Option<f64>,
    pub bias_200: Option<f64>,
    pub volume_ratio: Option<f64>,
    pub bias_percentile: Option<f64>,
    pub is_rogue_wave: bool,
    pub moat: MoatStatus,
    pub alerts: Vec<String>,
}

/// Full scan report.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub results: Vec<TickerScanResult>,
    pub sentiment: MarketSentiment,
    pub below_ma60_pct: f64,
    pub scanned: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Timestamps and counts of the most recent scan run.
#[derive(Debug, Clone, Serialize)]
pub struct ScanStatus {
    pub last_scan_at: Option<DateTime<Utc>>,
    pub scanned: usize,
    pub noteworthy: usize,
}

pub struct ScanService<S> {
    store: Arc<S>,
    market: Arc<dyn MarketFeed>,
    notifier: Arc<dyn Notifier>,
    gate: NotificationGate<S>,
    clock: Arc<dyn Clock>,
    scan_running: AtomicBool,
    concurrency: usize,
}

impl<S> ScanService<S>
where
    S: WatchlistStore + AlertStore + NotificationStore + Send + Sync + 'static,
{
    pub fn new(
        store: Arc<S>,
        market: Arc<dyn MarketFeed>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate: NotificationGate::new(store.clone(), clock.clone()),
            store,
            market,
            notifier,
            clock,
            scan_running: AtomicBool::new(false),
            concurrency: SCAN_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    /// Run one full scan. A second call while one is in flight fails with
    /// `ScanInProgress` — the caller decides whether to retry later.
    pub async fn run_scan(&self) -> Result<ScanReport, EngineError> {
        if self.scan_running.swap(true, Ordering::SeqCst) {
            return Err(EngineError::ScanInProgress);
        }
        let result = self.run_scan_inner().await;
        self.scan_running.store(false, Ordering::SeqCst);
        result
    }

    async fn run_scan_inner(&self) -> Result<ScanReport, EngineError> {
        let started_at = self.clock.now();
        let tickers = self.store.list_active_tickers().await?;

        // Cash rows carry no technical signals at all.
        let scannable: Vec<TrackedTicker> = tickers
            .into_iter()
            .filter(|t| !t.category.skips_signals())
            .collect();

        let symbols: Vec<String> = scannable.iter().map(|t| t.symbol.clone()).collect();
        tracing::info!("scan started for {} tickers", symbols.len());

        // Prime the signals cache before any per-ticker work.
        self.market.warm_signals(&symbols).await;

        let (sentiment, below_ma60_pct) = self.market_sentiment(&scannable).await;

        // Per-ticker stage: embarrassingly parallel, bounded.
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(scannable.len());
        for ticker in scannable {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let market = self.market.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                scan_one_ticker(market.as_ref(), &ticker).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!("scan worker panicked: {e}"),
            }
        }

        // Persist one scan log per ticker; bump the signal state only when
        // it changed so `signal_since` tracks streak starts.
        let now = self.clock.now();
        for result in &results {
            let log = ScanLog {
                symbol: result.ticker.clone(),
                signal: result.signal,
                market_sentiment: sentiment,
                detail: serde_json::to_value(result).unwrap_or_default(),
                created_at: now,
            };
            self.store.insert_scan_log(&log).await?;

            let signal_since = (result.signal != result.previous_signal).then_some(now);
            self.store
                .update_scan_state(&result.ticker, result.signal, signal_since)
                .await?;
        }

        // Price alerts are isolated: their failure must not suppress the
        // signal notifications below.
        if let Err(e) = evaluate_price_alerts(
            self.store.as_ref(),
            &results,
            self.notifier.as_ref(),
            self.clock.as_ref(),
        )
        .await
        {
            tracing::warn!("price alert evaluation failed: {e}");
        }

        self.dispatch_notifications(&results).await;

        let finished_at = self.clock.now();
        tracing::info!(
            "scan finished: {} tickers, sentiment {}",
            results.len(),
            sentiment.as_str()
        );
        Ok(ScanReport {
            scanned: results.len(),
            results,
            sentiment,
            below_ma60_pct,
            started_at,
            finished_at,
        })
    }

    /// Share of Trend Setters trading below their MA60 (served from the
    /// just-primed cache).
    async fn market_sentiment(&self, tickers: &[TrackedTicker]) -> (MarketSentiment, f64) {
        let mut below = 0;
        let mut valid = 0;
        for ticker in tickers {
            if ticker.category != TickerCategory::TrendSetter {
                continue;
            }
            let signals = self.market.technical_signals(&ticker.symbol).await;
            if let (Some(price), Some(ma60)) = (signals.price, signals.ma60) {
                valid += 1;
                if price < ma60 {
                    below += 1;
                }
            }
        }
        determine_market_sentiment(below, valid)
    }

    async fn dispatch_notifications(&self, results: &[TickerScanResult]) {
        let noteworthy: Vec<&TickerScanResult> = results
            .iter()
            .filter(|r| r.signal.is_noteworthy() && r.signal != r.previous_signal)
            .collect();
        if !noteworthy.is_empty() {
            match self
                .gate
                .try_acquire(SIGNAL_NOTIFY_KIND, Duration::hours(SIGNAL_NOTIFY_INTERVAL_HOURS))
                .await
            {
                Ok(true) => {
                    let lines: Vec<String> = noteworthy
                        .iter()
                        .map(|r| format!("{}: {}", r.ticker, r.signal.as_str()))
                        .collect();
                    let message = format!("📡 Scan signals\n{}", lines.join("\n"));
                    if let Err(e) = self.notifier.send(&message).await {
                        tracing::warn!("signal notification failed: {e}");
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("signal notification gate failed: {e}"),
            }
        }

        let rogue: Vec<&TickerScanResult> =
            results.iter().filter(|r| r.is_rogue_wave).collect();
        if !rogue.is_empty() {
            match self
                .gate
                .try_acquire(
                    ROGUE_WAVE_NOTIFY_KIND,
                    Duration::hours(ROGUE_WAVE_NOTIFY_INTERVAL_HOURS),
                )
                .await
            {
                Ok(true) => {
                    let lines: Vec<String> = rogue
                        .iter()
                        .flat_map(|r| r.alerts.iter().cloned())
                        .collect();
                    let message = format!("🌊 Rogue waves\n{}", lines.join("\n"));
                    if let Err(e) = self.notifier.send(&message).await {
                        tracing::warn!("rogue wave notification failed: {e}");
                    }
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("rogue wave notification gate failed: {e}"),
            }
        }
    }

    /// Metadata of the most recent scan run.
    pub async fn get_last_scan_status(&self) -> Result<ScanStatus, EngineError> {
        let logs = self.store.latest_scan_logs().await?;
        let last_scan_at = logs.iter().map(|l| l.created_at).max();
        let noteworthy = logs.iter().filter(|l| l.signal.is_noteworthy()).count();
        Ok(ScanStatus {
            last_scan_at,
            scanned: logs.len(),
            noteworthy,
        })
    }
}

/// Analytical funnel for one ticker. Moat is skipped for Bond/Cash and
/// ETFs (no income statement to trend).
async fn scan_one_ticker(market: &dyn MarketFeed, ticker: &TrackedTicker) -> TickerScanResult {
    let signals = market.technical_signals(&ticker.symbol).await;
    let dist = market.bias_distribution(&ticker.symbol).await;

    let moat = if ticker.category.skips_moat() || ticker.is_etf {
        MoatReport::not_available(&ticker.symbol)
    } else {
        market.moat_trend(&ticker.symbol).await
    };

    let bias_percentile = signals
        .bias
        .and_then(|bias| compute_bias_percentile(bias, &dist.historical_biases));
    // Batch-primed signals may lack volume; the distribution fetch saw the
    // full 3y history and carries its own ratio.
    let volume_ratio = signals.volume_ratio.or(dist.volume_ratio);
    let is_rogue_wave = detect_rogue_wave(bias_percentile, volume_ratio);

    let signal = determine_scan_signal(
        moat.status,
        signals.rsi,
        signals.bias,
        signals.bias_200,
        Some(ticker.category),
    );

    let alerts = collect_alerts(ticker, signal, &moat, bias_percentile, volume_ratio, is_rogue_wave);

    TickerScanResult {
        ticker: ticker.symbol.clone(),
        category: ticker.category,
        signal,
        previous_signal: ticker.last_scan_signal,
        price: signals.price,
        rsi: signals.rsi,
        bias: signals.bias,
        bias_200: signals.bias_200,
        volume_ratio,
        bias_percentile,
        is_rogue_wave,
        moat: moat.status,
        alerts,
    }
}

fn collect_alerts(
    ticker: &TrackedTicker,
    signal: ScanSignal,
    moat: &MoatReport,
    bias_percentile: Option<f64>,
    volume_ratio: Option<f64>,
    is_rogue_wave: bool,
) -> Vec<String> {
    let mut alerts = Vec::new();

    if is_rogue_wave {
        alerts.push(format!(
            "🌊 {}: bias at P{:.0} with volume {:.2}x the 20-day average",
            ticker.symbol,
            bias_percentile.unwrap_or(0.0),
            volume_ratio.unwrap_or(0.0)
        ));
    }

    match signal {
        ScanSignal::ThesisBroken => alerts.push(format!(
            "⚠️ {}: gross margin down {:.1}pp, thesis needs review",
            ticker.symbol,
            moat.margin_change.abs()
        )),
        ScanSignal::Overheated => {
            alerts.push(format!("🔥 {}: overheated on both bias and RSI", ticker.symbol))
        }
        ScanSignal::DeepValue => {
            alerts.push(format!("💎 {}: deep value zone (bias and RSI agree)", ticker.symbol))
        }
        _ => {}
    }

    alerts
}
