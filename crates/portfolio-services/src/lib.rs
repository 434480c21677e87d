//! Portfolio-facing orchestrators: watchlist lifecycle, rebalancing with
//! ETF look-through, currency exposure and FX watches, stress testing and
//! smart withdrawal. Thin layers — the math lives in `market-analysis`,
//! the data plumbing in `yahoo-client`.

pub mod currency;
pub mod market_data;
pub mod performance;
pub mod rebalance;
pub mod stress;
pub mod valuation;
pub mod watchlist;
pub mod withdrawal;

#[cfg(test)]
mod testutil;

pub use currency::{CurrencyExposure, CurrencyExposureService, FxWatchOutcome};
pub use market_data::PortfolioMarketData;
pub use performance::{PerformanceService, PerformanceSummary};
pub use rebalance::{
    distribute_by_constituents, distribute_by_sector_weights, CategoryBreakdown, RebalanceAction,
    RebalancePlan, RebalanceService, SectorExposure, TradeSide,
};
pub use stress::StressTestService;
pub use valuation::{value_holdings, PortfolioValuation, ValuedHolding};
pub use watchlist::{EnrichedTicker, WatchlistService};
pub use withdrawal::WithdrawalService;
