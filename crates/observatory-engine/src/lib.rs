//! Engine assembly: one explicit object owning the cache fabric, rate
//! limiters, adapters and services. Startup builds it, shutdown drops it —
//! no hidden singletons anywhere.

use std::path::PathBuf;
use std::sync::Arc;

use cache_fabric::DiskCache;
use edgar_client::{EdgarClient, EdgarClientConfig};
use filing_service::FilingService;
use notification_service::{TelegramConfig, TelegramNotifier};
use observatory_core::{
    store::{AlertStore, FilingStore, NotificationStore, PortfolioStore, WatchlistStore},
    Clock, EngineError, Notifier, SystemClock,
};
use portfolio_services::{
    CurrencyExposureService, PerformanceService, RebalanceService, StressTestService,
    WatchlistService, WithdrawalService,
};
use scan_service::{PrewarmService, ScanService};
use yahoo_client::{YahooClient, YahooClientConfig};

/// Install the process-wide tracing subscriber (`RUST_LOG` filtered).
/// Call once from the binary embedding the engine.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

/// Everything the engine needs to start, environment-driven in production.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding the L2 cache database.
    pub cache_dir: PathBuf,
    pub yahoo: YahooClientConfig,
    pub edgar: EdgarClientConfig,
    pub telegram: TelegramConfig,
}

impl EngineConfig {
    /// Load from the environment (`.env` honored for local development).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            cache_dir: std::env::var("OBSERVATORY_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./cache")),
            yahoo: YahooClientConfig::from_env(),
            edgar: EdgarClientConfig::from_env(),
            telegram: TelegramConfig::from_env(),
        }
    }
}

/// The assembled engine over one persistence implementation.
pub struct ObservatoryEngine<S> {
    pub market: Arc<YahooClient>,
    pub edgar: Arc<EdgarClient>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub watchlist: WatchlistService<S>,
    pub rebalance: RebalanceService<S>,
    pub stress: StressTestService<S>,
    pub withdrawal: WithdrawalService<S>,
    pub currency: CurrencyExposureService<S>,
    pub performance: PerformanceService<S>,
    pub filings: Arc<FilingService<S>>,
    pub scan: Arc<ScanService<S>>,
    pub prewarm: Arc<PrewarmService<S>>,
}

impl<S> ObservatoryEngine<S>
where
    S: WatchlistStore
        + AlertStore
        + PortfolioStore
        + FilingStore
        + NotificationStore
        + Send
        + Sync
        + 'static,
{
    pub fn new(store: Arc<S>, config: EngineConfig) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&config.cache_dir)
            .map_err(|e| EngineError::Store(format!("cache dir: {e}")))?;
        let disk = Arc::new(
            DiskCache::open(&config.cache_dir.join("observatory-cache.db"))
                .map_err(|e| EngineError::Store(e.to_string()))?,
        );

        let market = Arc::new(YahooClient::new(disk.clone(), config.yahoo));
        let edgar = Arc::new(EdgarClient::new(disk, config.edgar));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(config.telegram));

        let filings = Arc::new(FilingService::new(
            store.clone(),
            edgar.clone(),
            market.clone(),
            clock.clone(),
        ));
        let scan = Arc::new(ScanService::new(
            store.clone(),
            Arc::new(market.clone()),
            notifier.clone(),
            clock.clone(),
        ));
        let prewarm = Arc::new(PrewarmService::new(
            store.clone(),
            market.clone(),
            filings.clone(),
        ));

        Ok(Self {
            watchlist: WatchlistService::new(store.clone(), market.clone(), clock.clone()),
            rebalance: RebalanceService::new(store.clone(), market.clone()),
            stress: StressTestService::new(store.clone(), market.clone()),
            withdrawal: WithdrawalService::new(store.clone(), market.clone()),
            performance: PerformanceService::new(store.clone()),
            currency: CurrencyExposureService::new(
                store,
                market.clone(),
                notifier.clone(),
                clock.clone(),
            ),
            market,
            edgar,
            notifier,
            clock,
            filings,
            scan,
            prewarm,
        })
    }

    /// Kick off the background cache warm-up; readiness is reported by
    /// `prewarm.is_ready()`.
    pub fn start_prewarm(&self) -> tokio::task::JoinHandle<()> {
        tracing::info!("starting background cache pre-warm");
        self.prewarm.clone().spawn()
    }
}
