//! Startup cache pre-warmer: a background task that stages the warm-up so
//! the first page load hits warm caches instead of a cold provider.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use observatory_core::{
    store::{FilingStore, PortfolioStore, WatchlistStore},
    Holding, TrackedTicker,
};

use filing_service::{FilingService, BACKFILL_YEARS};
use yahoo_client::YahooClient;

use crate::MarketFeed;

/// Moat warm-up runs wider than the scan pool: the rate limiter is the
/// real bottleneck, and extra workers grab slots the moment it yields.
const MOAT_PREWARM_WORKERS: usize = 4;

/// Per-domain ticker subsets, built by category exclusion.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickerSets {
    /// Watchlist ∪ non-cash holdings, unique, sorted.
    pub all: Vec<String>,
    /// Signals and beta: everything but Cash.
    pub signals: Vec<String>,
    /// Moat: no Bond/Cash and no ETFs (nothing to trend).
    pub moat: Vec<String>,
    /// ETF composition: tracked ETFs only.
    pub etf: Vec<String>,
    /// Sector resolution: everything but Cash (Bonds have a sector).
    pub sector: Vec<String>,
}

/// Build the warm-up subsets. Holding-only tickers (not on the watchlist)
/// have no category metadata and are included everywhere except the
/// ETF set.
pub fn collect_ticker_sets(tickers: &[TrackedTicker], holdings: &[Holding]) -> TickerSets {
    use std::collections::{BTreeSet, HashMap};

    let tracked: HashMap<&str, &TrackedTicker> =
        tickers.iter().map(|t| (t.symbol.as_str(), t)).collect();

    let mut all: BTreeSet<String> = tickers.iter().map(|t| t.symbol.clone()).collect();
    all.extend(
        holdings
            .iter()
            .filter(|h| !h.is_cash)
            .map(|h| h.symbol.clone()),
    );

    let mut sets = TickerSets::default();
    for symbol in &all {
        let meta = tracked.get(symbol.as_str());

        let skips_signals = meta.is_some_and(|t| t.category.skips_signals());
        if !skips_signals {
            sets.signals.push(symbol.clone());
            sets.sector.push(symbol.clone());
        }

        let skips_moat = meta.is_some_and(|t| t.category.skips_moat() || t.is_etf);
        if !skips_moat {
            sets.moat.push(symbol.clone());
        }

        if meta.is_some_and(|t| t.is_etf) {
            sets.etf.push(symbol.clone());
        }
    }

    sets.all = all.into_iter().collect();
    sets
}

/// Background warmer. `ready()` flips true once every phase has finished
/// (or fatally failed) so an observability endpoint can report readiness.
pub struct PrewarmService<S> {
    store: Arc<S>,
    market: Arc<YahooClient>,
    filings: Arc<FilingService<S>>,
    ready: Arc<AtomicBool>,
}

impl<S> PrewarmService<S>
where
    S: WatchlistStore + PortfolioStore + FilingStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, market: Arc<YahooClient>, filings: Arc<FilingService<S>>) -> Self {
        Self {
            store,
            market,
            filings,
            ready: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn ready_flag(&self) -> Arc<AtomicBool> {
        self.ready.clone()
    }

    /// Launch the warm-up without blocking startup.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Run every warm-up phase. Each phase is isolated: one failing
    /// provider never aborts the rest, and the service stays usable
    /// (cold) even when the whole warm-up dies.
    pub async fn run(&self) {
        let started = Instant::now();
        tracing::info!("cache pre-warm starting");

        let sets = match self.collect().await {
            Ok(sets) => sets,
            Err(e) => {
                tracing::error!("pre-warm could not read the store, staying cold: {e}");
                self.ready.store(true, Ordering::Release);
                return;
            }
        };

        if sets.all.is_empty() {
            tracing::info!("pre-warm: nothing tracked or held, skipping");
            self.ready.store(true, Ordering::Release);
            return;
        }

        tracing::info!(
            "pre-warm: {} tickers (signals={}, moat={}, etf={}, sector={})",
            sets.all.len(),
            sets.signals.len(),
            sets.moat.len(),
            sets.etf.len(),
            sets.sector.len()
        );

        // Phase 1: one batch request primes the signal cache for everyone.
        let market_feed: Arc<YahooClient> = self.market.clone();
        phase("signals", market_feed.warm_signals(&sets.signals)).await;

        // Phase 2+: independent phases run concurrently.
        let market = &self.market;
        tokio::join!(
            phase("fear_greed", async {
                let _ = market_feed.fear_greed().await;
            }),
            phase(
                "moat",
                market.clone().prewarm_moat_batch(sets.moat.clone(), MOAT_PREWARM_WORKERS)
            ),
            phase(
                "etf_holdings",
                market.clone().prewarm_etf_holdings_batch(sets.etf.clone())
            ),
            phase(
                "etf_sector_weights",
                market.clone().prewarm_etf_sector_weights_batch(sets.etf.clone())
            ),
            phase("beta", market.clone().prewarm_beta_batch(sets.signals.clone())),
            phase("sector", market.clone().prewarm_sectors_batch(sets.sector.clone())),
            phase("guru_backfill", self.backfill_gurus()),
        );

        tracing::info!("cache pre-warm done in {:.1}s", started.elapsed().as_secs_f64());
        self.ready.store(true, Ordering::Release);
    }

    async fn collect(&self) -> Result<TickerSets, observatory_core::EngineError> {
        let tickers = self.store.list_active_tickers().await?;
        let holdings = self.store.list_holdings().await?;
        Ok(collect_ticker_sets(&tickers, &holdings))
    }

    /// Idempotent 13F history backfill for every active guru: already
    /// synced accessions skip, so repeated startups are safe.
    async fn backfill_gurus(&self) {
        let gurus = match self.store.list_active_gurus().await {
            Ok(gurus) => gurus,
            Err(e) => {
                tracing::warn!("pre-warm [guru_backfill] could not list gurus: {e}");
                return;
            }
        };
        if gurus.is_empty() {
            tracing::info!("pre-warm [guru_backfill] no active gurus");
            return;
        }

        for guru in gurus {
            match self.filings.backfill_guru_filings(guru.id, BACKFILL_YEARS).await {
                Ok(result) => tracing::info!(
                    "backfilled {}: {} in window, {} synced, {} skipped, {} errors",
                    guru.display_name,
                    result.total_filings,
                    result.synced,
                    result.skipped,
                    result.errors
                ),
                Err(e) => tracing::warn!(
                    "pre-warm [guru_backfill] failed for {} (id {}): {e}",
                    guru.display_name,
                    guru.id
                ),
            }
        }
    }
}

/// Run one warm-up phase with timing; failures inside the future are its
/// own responsibility to log.
async fn phase<F: Future<Output = ()>>(name: &str, fut: F) {
    let started = Instant::now();
    fut.await;
    tracing::info!(
        "pre-warm [{name}] done in {:.1}s",
        started.elapsed().as_secs_f64()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use observatory_core::{ScanSignal, TickerCategory};

    fn tracked(symbol: &str, category: TickerCategory, is_etf: bool) -> TrackedTicker {
        TrackedTicker {
            symbol: symbol.to_string(),
            category,
            current_thesis: String::new(),
            current_tags: Vec::new(),
            is_etf,
            is_active: true,
            last_scan_signal: ScanSignal::Normal,
            signal_since: None,
            display_order: 0,
        }
    }

    fn holding(symbol: &str, is_cash: bool) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            category: if is_cash {
                TickerCategory::Cash
            } else {
                TickerCategory::Growth
            },
            quantity: 1.0,
            cost_basis: None,
            currency: "USD".to_string(),
            broker: None,
            is_cash,
        }
    }

    #[test]
    fn subsets_apply_category_exclusions() {
        let tickers = vec![
            tracked("AAPL", TickerCategory::TrendSetter, false),
            tracked("BRK.B", TickerCategory::Moat, false),
            tracked("SGOV", TickerCategory::Bond, false),
            tracked("USD", TickerCategory::Cash, false),
            tracked("QQQ", TickerCategory::Growth, true),
        ];
        let holdings = vec![holding("NVDA", false), holding("TWD", true)];

        let sets = collect_ticker_sets(&tickers, &holdings);

        // Cash tracked tickers stay out of everything; cash holdings are
        // not collected at all.
        assert_eq!(
            sets.all,
            vec!["AAPL", "BRK.B", "NVDA", "QQQ", "SGOV", "USD"]
        );
        assert!(!sets.signals.contains(&"USD".to_string()));
        assert!(!sets.all.contains(&"TWD".to_string()));

        // Bonds scan but never moat; ETFs never moat either.
        assert!(sets.signals.contains(&"SGOV".to_string()));
        assert!(!sets.moat.contains(&"SGOV".to_string()));
        assert!(!sets.moat.contains(&"QQQ".to_string()));

        // Holding-only tickers participate everywhere except the ETF set.
        assert!(sets.signals.contains(&"NVDA".to_string()));
        assert!(sets.moat.contains(&"NVDA".to_string()));

        assert_eq!(sets.etf, vec!["QQQ"]);

        // Sector includes bonds but not cash.
        assert!(sets.sector.contains(&"SGOV".to_string()));
        assert!(!sets.sector.contains(&"USD".to_string()));
    }

    #[test]
    fn empty_inputs_produce_empty_sets() {
        let sets = collect_ticker_sets(&[], &[]);
        assert_eq!(sets, TickerSets::default());
    }
}
