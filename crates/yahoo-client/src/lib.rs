//! Market-data adapter over Yahoo Finance's unofficial JSON endpoints.
//!
//! Every accessor routes through a cache-fabric namespace; inside the
//! fetcher the call acquires the provider rate limiter, runs under the
//! retry policy, and parses into the domain shape. Failures come back as
//! degraded structs with an `error` field, which the cache keeps out of
//! the disk tier.

mod fundamentals;
mod market_mood;
mod signals;
mod wire;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;

use cache_fabric::{DiskCache, Inflight, Namespace, RateLimiter, RetryPolicy};
use observatory_core::{
    BetaValue, BiasDistribution, DividendInfo, EarningsInfo, EngineError, EtfHoldings,
    FearGreedReport, FxHistory, FxRate, MoatReport, SectorInfo, SectorWeights, TechnicalSignals,
};

const CHART_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const SPARK_URL: &str = "https://query1.finance.yahoo.com/v8/finance/spark";
const QUOTE_SUMMARY_BASE_URL: &str =
    "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const CNN_FEAR_GREED_URL: &str =
    "https://production.dataviz.cnn.io/index/fearandgreed/graphdata";

/// Chrome-style User-Agent; Yahoo's bot detection rejects default clients.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// L1 capacity / L1 TTL / L2 TTL per namespace.
const SIGNALS_CACHE: (usize, u64, u64) = (500, 900, 3_600);
const MOAT_CACHE: (usize, u64, u64) = (500, 86_400, 7 * 86_400);
const DIVIDEND_CACHE: (usize, u64, u64) = (500, 86_400, 7 * 86_400);
const EARNINGS_CACHE: (usize, u64, u64) = (500, 86_400, 3 * 86_400);
const SECTOR_CACHE: (usize, u64, u64) = (1_000, 30 * 86_400, 30 * 86_400);
const ETF_HOLDINGS_CACHE: (usize, u64, u64) = (200, 86_400, 7 * 86_400);
const ETF_SECTOR_WEIGHTS_CACHE: (usize, u64, u64) = (200, 86_400, 7 * 86_400);
const BETA_CACHE: (usize, u64, u64) = (500, 86_400, 7 * 86_400);
const BIAS_DIST_CACHE: (usize, u64, u64) = (300, 86_400, 86_400);
const FX_CACHE: (usize, u64, u64) = (100, 900, 3_600);
const FX_HISTORY_CACHE: (usize, u64, u64) = (100, 3_600, 6 * 3_600);
const FEAR_GREED_CACHE: (usize, u64, u64) = (4, 1_800, 3_600);

pub(crate) const SIGNALS_HISTORY_RANGE: &str = "1y";
pub(crate) const BIAS_DIST_HISTORY_RANGE: &str = "3y";
pub(crate) const FX_HISTORY_RANGE: &str = "1y";
pub(crate) const FX_SPOT_RANGE: &str = "5d";
pub(crate) const VIX_RANGE: &str = "3mo";
pub(crate) const MOOD_HISTORY_RANGE: &str = "6mo";

/// Default pool width for the batch pre-warm helpers.
pub const PREWARM_CONCURRENCY: usize = 2;

/// Environment-tunable client settings.
#[derive(Debug, Clone)]
pub struct YahooClientConfig {
    pub calls_per_second: f64,
    pub request_timeout: Duration,
    pub cnn_fear_greed_url: String,
}

impl Default for YahooClientConfig {
    fn default() -> Self {
        Self {
            calls_per_second: 2.0,
            request_timeout: Duration::from_secs(20),
            cnn_fear_greed_url: CNN_FEAR_GREED_URL.to_string(),
        }
    }
}

impl YahooClientConfig {
    /// Read overrides from the environment (`YAHOO_RATE_LIMIT_CPS`,
    /// `YAHOO_REQUEST_TIMEOUT_SECS`, `CNN_FEAR_GREED_URL`).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            calls_per_second: std::env::var("YAHOO_RATE_LIMIT_CPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.calls_per_second),
            request_timeout: std::env::var("YAHOO_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            cnn_fear_greed_url: std::env::var("CNN_FEAR_GREED_URL")
                .unwrap_or(defaults.cnn_fear_greed_url),
        }
    }
}

pub(crate) struct Caches {
    pub signals: Namespace<TechnicalSignals>,
    pub moat: Namespace<MoatReport>,
    pub dividend: Namespace<DividendInfo>,
    pub earnings: Namespace<EarningsInfo>,
    pub sector: Namespace<SectorInfo>,
    pub etf_holdings: Namespace<EtfHoldings>,
    pub etf_sector_weights: Namespace<SectorWeights>,
    pub beta: Namespace<BetaValue>,
    pub bias_dist: Namespace<BiasDistribution>,
    pub fx: Namespace<FxRate>,
    pub fx_history: Namespace<FxHistory>,
    pub fear_greed: Namespace<FearGreedReport>,
}

/// The market-data adapter.
pub struct YahooClient {
    pub(crate) http: reqwest::Client,
    pub(crate) limiter: RateLimiter,
    pub(crate) retry: RetryPolicy,
    pub(crate) config: YahooClientConfig,
    pub(crate) caches: Caches,
    disk: Arc<DiskCache>,
}

fn namespace<T>(
    name: &str,
    sizes: (usize, u64, u64),
    disk: &Arc<DiskCache>,
    inflight: &Arc<Inflight>,
    is_error: Option<fn(&T) -> bool>,
) -> Namespace<T>
where
    T: Clone + serde::Serialize + DeserializeOwned + Send + Sync,
{
    Namespace::new(
        name,
        sizes.0,
        Duration::from_secs(sizes.1),
        disk.clone(),
        Duration::from_secs(sizes.2),
        inflight.clone(),
        is_error,
    )
}

impl YahooClient {
    pub fn new(disk: Arc<DiskCache>, config: YahooClientConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let inflight = Arc::new(Inflight::new());
        let caches = Caches {
            signals: namespace(
                "signals",
                SIGNALS_CACHE,
                &disk,
                &inflight,
                Some(TechnicalSignals::is_error),
            ),
            moat: namespace("moat", MOAT_CACHE, &disk, &inflight, Some(MoatReport::is_error)),
            dividend: namespace(
                "dividend",
                DIVIDEND_CACHE,
                &disk,
                &inflight,
                Some(DividendInfo::is_error),
            ),
            earnings: namespace(
                "earnings",
                EARNINGS_CACHE,
                &disk,
                &inflight,
                Some(EarningsInfo::is_error),
            ),
            sector: namespace(
                "sector",
                SECTOR_CACHE,
                &disk,
                &inflight,
                Some(SectorInfo::is_error),
            ),
            etf_holdings: namespace(
                "etf_holdings",
                ETF_HOLDINGS_CACHE,
                &disk,
                &inflight,
                Some(EtfHoldings::is_error),
            ),
            etf_sector_weights: namespace(
                "etf_sector_weights",
                ETF_SECTOR_WEIGHTS_CACHE,
                &disk,
                &inflight,
                Some(SectorWeights::is_error),
            ),
            // Beta has no error predicate: `Absent` is a sentinel worth
            // persisting, and hard failures bubble as errors instead.
            beta: namespace("beta", BETA_CACHE, &disk, &inflight, None),
            bias_dist: namespace(
                "rogue_wave",
                BIAS_DIST_CACHE,
                &disk,
                &inflight,
                Some(BiasDistribution::is_error),
            ),
            fx: namespace("forex", FX_CACHE, &disk, &inflight, Some(FxRate::is_error)),
            fx_history: namespace(
                "forex_history",
                FX_HISTORY_CACHE,
                &disk,
                &inflight,
                Some(FxHistory::is_error),
            ),
            fear_greed: namespace(
                "fear_greed",
                FEAR_GREED_CACHE,
                &disk,
                &inflight,
                Some(FearGreedReport::is_error),
            ),
        };

        Self {
            http,
            limiter: RateLimiter::new(config.calls_per_second),
            retry: RetryPolicy::default(),
            config,
            caches,
            disk,
        }
    }

    /// Clear every L1 namespace and the shared L2 store. Returns the
    /// number of L1 namespaces cleared.
    pub fn clear_all_caches(&self) -> usize {
        self.caches.signals.clear_l1();
        self.caches.moat.clear_l1();
        self.caches.dividend.clear_l1();
        self.caches.earnings.clear_l1();
        self.caches.sector.clear_l1();
        self.caches.etf_holdings.clear_l1();
        self.caches.etf_sector_weights.clear_l1();
        self.caches.beta.clear_l1();
        self.caches.bias_dist.clear_l1();
        self.caches.fx.clear_l1();
        self.caches.fx_history.clear_l1();
        self.caches.fear_greed.clear_l1();
        self.disk.clear();
        let cleared = 12;
        tracing::info!("cleared {cleared} L1 namespaces and the L2 store");
        cleared
    }

    /// Rate-limited GET returning parsed JSON. 4xx responses map to
    /// `NotFound` (never retried); transport and 5xx/429 failures map to
    /// `Transport` so the retry policy can re-attempt them.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, EngineError> {
        self.limiter.wait().await;

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| EngineError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_client_error() && status.as_u16() != 429 {
            return Err(EngineError::NotFound(format!("HTTP {status} from {url}")));
        }
        if !status.is_success() {
            return Err(EngineError::Transport(format!("HTTP {status} from {url}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))
    }

    pub(crate) fn quote_summary_url(&self, ticker: &str) -> String {
        format!("{QUOTE_SUMMARY_BASE_URL}/{ticker}")
    }

    pub(crate) fn chart_url(&self, ticker: &str) -> String {
        format!("{CHART_BASE_URL}/{ticker}")
    }

    pub(crate) fn spark_url(&self) -> &'static str {
        SPARK_URL
    }
}

/// Run `op` over `items` with at most `workers` concurrent tasks, ignoring
/// individual failures (each phase logs its own).
pub(crate) async fn bounded_for_each<F, Fut>(items: Vec<String>, workers: usize, op: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let semaphore = Arc::new(tokio::sync::Semaphore::new(workers.max(1)));
    let op = Arc::new(op);
    let mut handles = Vec::with_capacity(items.len());
    for item in items {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let op = op.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            op(item).await;
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

/// Ticker → candle series, as returned by the batch history download.
pub type HistoryMap = HashMap<String, Vec<observatory_core::Candle>>;
