//! Rebalance analysis with ETF X-Ray look-through.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use market_analysis::round2;
use observatory_core::{
    store::{PortfolioStore, WatchlistStore},
    EngineError, SectorWeight, TickerCategory,
};

use crate::market_data::PortfolioMarketData;
use crate::valuation::{value_holdings, PortfolioValuation};

/// Drift below this many percentage points needs no action.
const REBALANCE_DRIFT_THRESHOLD_PCT: f64 = 1.0;
/// Constituents considered by the X-Ray fallback.
const XRAY_TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub category: TickerCategory,
    pub market_value: f64,
    pub current_pct: f64,
    pub target_pct: f64,
    pub drift_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceAction {
    pub category: TickerCategory,
    pub side: TradeSide,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalancePlan {
    pub display_currency: String,
    pub total_value: f64,
    pub categories: Vec<CategoryBreakdown>,
    pub actions: Vec<RebalanceAction>,
}

/// Sector slice of the X-Ray decomposition.
#[derive(Debug, Clone, Serialize)]
pub struct SectorExposure {
    pub sector: String,
    pub market_value: f64,
    pub pct: f64,
}

/// Strategy A: the fund publishes sector weights — distribute the market
/// value proportionally (weights renormalised to their own sum).
pub fn distribute_by_sector_weights(
    market_value: f64,
    weights: &[SectorWeight],
) -> Vec<(String, f64)> {
    let total: f64 = weights.iter().map(|w| w.weight).sum();
    if total <= 0.0 {
        return vec![("Unknown".to_string(), market_value)];
    }
    weights
        .iter()
        .map(|w| (w.sector.clone(), market_value * w.weight / total))
        .collect()
}

/// Strategy B: top-N constituents with resolved sectors. The residual
/// (1 − Σweights, plus constituents whose sector could not be resolved)
/// redistributes proportionally across the resolved sectors — never into
/// an "Unknown" bucket.
pub fn distribute_by_constituents(
    market_value: f64,
    entries: &[(Option<String>, f64)],
) -> Vec<(String, f64)> {
    let mut sector_weights: HashMap<String, f64> = HashMap::new();
    for (sector, weight) in entries {
        if let Some(sector) = sector {
            *sector_weights.entry(sector.clone()).or_insert(0.0) += weight;
        }
    }

    let resolved_total: f64 = sector_weights.values().sum();
    if resolved_total <= 0.0 {
        return vec![("Unknown".to_string(), market_value)];
    }

    sector_weights
        .into_iter()
        .map(|(sector, weight)| (sector, market_value * weight / resolved_total))
        .collect()
}

pub struct RebalanceService<S> {
    store: Arc<S>,
    market: Arc<dyn PortfolioMarketData>,
}

impl<S> RebalanceService<S>
where
    S: PortfolioStore + WatchlistStore + Send + Sync,
{
    pub fn new(store: Arc<S>, market: Arc<dyn PortfolioMarketData>) -> Self {
        Self { store, market }
    }

    async fn valuation(&self) -> Result<(PortfolioValuation, HashMap<TickerCategory, f64>), EngineError> {
        let profile = self
            .store
            .get_profile()
            .await?
            .ok_or_else(|| EngineError::NotFound("investment profile".to_string()))?;
        let holdings = self.store.list_holdings().await?;
        let valuation =
            value_holdings(self.market.as_ref(), &holdings, &profile.home_currency).await;
        Ok((valuation, profile.targets))
    }

    /// Category breakdown, drifts and the buy/sell actions that would
    /// close them.
    pub async fn plan(&self) -> Result<RebalancePlan, EngineError> {
        let (valuation, targets) = self.valuation().await?;
        let current = valuation.category_pcts();

        let mut categories: Vec<CategoryBreakdown> = Vec::new();
        let mut seen: Vec<TickerCategory> = Vec::new();
        for (cat, pct) in &current {
            let target = targets.get(cat).copied().unwrap_or(0.0);
            categories.push(CategoryBreakdown {
                category: *cat,
                market_value: round2(valuation.category_values.get(cat).copied().unwrap_or(0.0)),
                current_pct: *pct,
                target_pct: target,
                drift_pct: round2(pct - target),
            });
            seen.push(*cat);
        }
        for (cat, target) in &targets {
            if !seen.contains(cat) {
                categories.push(CategoryBreakdown {
                    category: *cat,
                    market_value: 0.0,
                    current_pct: 0.0,
                    target_pct: *target,
                    drift_pct: round2(-target),
                });
            }
        }
        categories.sort_by(|a, b| b.drift_pct.total_cmp(&a.drift_pct));

        let actions = categories
            .iter()
            .filter(|c| c.drift_pct.abs() >= REBALANCE_DRIFT_THRESHOLD_PCT)
            .map(|c| RebalanceAction {
                category: c.category,
                side: if c.drift_pct > 0.0 {
                    TradeSide::Sell
                } else {
                    TradeSide::Buy
                },
                amount: round2(c.drift_pct.abs() / 100.0 * valuation.total_value),
            })
            .collect();

        Ok(RebalancePlan {
            display_currency: valuation.display_currency.clone(),
            total_value: valuation.total_value,
            categories,
            actions,
        })
    }

    /// X-Ray sector exposure: equities map to their own sector, ETFs are
    /// decomposed via published sector weights (strategy A) or top-N
    /// constituents (strategy B).
    pub async fn sector_exposure(&self) -> Result<Vec<SectorExposure>, EngineError> {
        let (valuation, _) = self.valuation().await?;

        let mut by_sector: HashMap<String, f64> = HashMap::new();
        for holding in &valuation.holdings {
            if holding.is_cash || holding.market_value <= 0.0 {
                continue;
            }

            let is_etf = match self.store.find_ticker(&holding.symbol).await? {
                Some(tracked) => tracked.is_etf,
                None => self.market.detect_is_etf(&holding.symbol).await,
            };

            let slices = if is_etf {
                self.xray_etf(&holding.symbol, holding.market_value).await
            } else {
                let sector = self
                    .market
                    .sector(&holding.symbol)
                    .await
                    .unwrap_or_else(|| "Unknown".to_string());
                vec![(sector, holding.market_value)]
            };
            for (sector, value) in slices {
                *by_sector.entry(sector).or_insert(0.0) += value;
            }
        }

        let total: f64 = by_sector.values().sum();
        let mut exposures: Vec<SectorExposure> = by_sector
            .into_iter()
            .map(|(sector, value)| SectorExposure {
                sector,
                market_value: round2(value),
                pct: if total > 0.0 {
                    round2(value / total * 100.0)
                } else {
                    0.0
                },
            })
            .collect();
        exposures.sort_by(|a, b| b.market_value.total_cmp(&a.market_value));
        Ok(exposures)
    }

    async fn xray_etf(&self, symbol: &str, market_value: f64) -> Vec<(String, f64)> {
        let weights = self.market.etf_sector_weights(symbol).await;
        if !weights.weights.is_empty() {
            return distribute_by_sector_weights(market_value, &weights.weights);
        }

        // Fallback: resolve the top constituents' sectors one by one.
        let holdings = self.market.etf_holdings(symbol).await;
        let mut entries = Vec::new();
        for constituent in holdings.holdings.iter().take(XRAY_TOP_N) {
            let sector = self.market.sector(&constituent.symbol).await;
            entries.push((sector, constituent.weight));
        }
        distribute_by_constituents(market_value, &entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{holding, MemoryStore, StubMarketData};
    use observatory_core::InvestmentProfile;

    fn profile() -> InvestmentProfile {
        InvestmentProfile {
            targets: HashMap::from([
                (TickerCategory::Growth, 30.0),
                (TickerCategory::TrendSetter, 30.0),
                (TickerCategory::Bond, 40.0),
            ]),
            home_currency: "USD".to_string(),
        }
    }

    #[test]
    fn strategy_a_distributes_proportionally() {
        let weights = vec![
            SectorWeight {
                sector: "Technology".to_string(),
                weight: 0.6,
            },
            SectorWeight {
                sector: "Healthcare".to_string(),
                weight: 0.4,
            },
        ];
        let slices = distribute_by_sector_weights(1000.0, &weights);
        let map: HashMap<_, _> = slices.into_iter().collect();
        assert_eq!(map["Technology"], 600.0);
        assert_eq!(map["Healthcare"], 400.0);
    }

    #[test]
    fn strategy_a_without_weights_is_unknown() {
        let slices = distribute_by_sector_weights(1000.0, &[]);
        assert_eq!(slices, vec![("Unknown".to_string(), 1000.0)]);
    }

    #[test]
    fn strategy_b_redistributes_residual_proportionally() {
        // Top constituents cover 50% of the fund: 30% tech, 20% health.
        // The uncovered half spreads 60/40, never into "Unknown".
        let entries = vec![
            (Some("Technology".to_string()), 0.3),
            (Some("Healthcare".to_string()), 0.2),
        ];
        let slices = distribute_by_constituents(1000.0, &entries);
        let map: HashMap<_, _> = slices.into_iter().collect();
        assert_eq!(map["Technology"], 600.0);
        assert_eq!(map["Healthcare"], 400.0);
        assert!(!map.contains_key("Unknown"));
    }

    #[test]
    fn strategy_b_drops_unresolved_constituents_into_the_residual() {
        let entries = vec![
            (Some("Technology".to_string()), 0.3),
            (None, 0.3), // sector lookup failed
        ];
        let slices = distribute_by_constituents(1000.0, &entries);
        assert_eq!(slices, vec![("Technology".to_string(), 1000.0)]);
    }

    #[test]
    fn strategy_b_with_nothing_resolved_is_unknown() {
        let slices = distribute_by_constituents(1000.0, &[(None, 0.5)]);
        assert_eq!(slices, vec![("Unknown".to_string(), 1000.0)]);
    }

    #[tokio::test]
    async fn plan_flags_overweight_and_underweight() {
        let store = Arc::new(MemoryStore::default());
        *store.profile.lock().unwrap() = Some(profile());
        *store.holdings.lock().unwrap() = vec![
            holding("NVDA", TickerCategory::Growth, 60.0, "USD", false), // 6000
            holding("AAPL", TickerCategory::TrendSetter, 40.0, "USD", false), // 4000
        ];

        let market = StubMarketData::new().price("NVDA", 100.0).price("AAPL", 100.0);
        let svc = RebalanceService::new(store, Arc::new(market));
        let plan = svc.plan().await.unwrap();

        assert_eq!(plan.total_value, 10_000.0);

        let growth = plan
            .categories
            .iter()
            .find(|c| c.category == TickerCategory::Growth)
            .unwrap();
        assert_eq!(growth.drift_pct, 30.0);

        let bond = plan
            .categories
            .iter()
            .find(|c| c.category == TickerCategory::Bond)
            .unwrap();
        assert_eq!(bond.drift_pct, -40.0);

        let sell_growth = plan
            .actions
            .iter()
            .find(|a| a.category == TickerCategory::Growth)
            .unwrap();
        assert_eq!(sell_growth.side, TradeSide::Sell);
        assert_eq!(sell_growth.amount, 3000.0);

        let buy_bond = plan
            .actions
            .iter()
            .find(|a| a.category == TickerCategory::Bond)
            .unwrap();
        assert_eq!(buy_bond.side, TradeSide::Buy);
        assert_eq!(buy_bond.amount, 4000.0);
    }

    #[tokio::test]
    async fn sector_exposure_xrays_etfs() {
        let store = Arc::new(MemoryStore::default());
        *store.profile.lock().unwrap() = Some(profile());
        *store.holdings.lock().unwrap() = vec![
            holding("QQQ", TickerCategory::Growth, 10.0, "USD", false), // 5000
            holding("JNJ", TickerCategory::Moat, 10.0, "USD", false),   // 1000
        ];

        let market = StubMarketData::new()
            .price("QQQ", 500.0)
            .price("JNJ", 100.0)
            .etf("QQQ")
            .sector_weights("QQQ", &[("Technology", 0.6), ("Communication Services", 0.4)])
            .sector_name("JNJ", "Healthcare");

        let svc = RebalanceService::new(store, Arc::new(market));
        let exposure = svc.sector_exposure().await.unwrap();

        let map: HashMap<String, f64> = exposure
            .iter()
            .map(|e| (e.sector.clone(), e.market_value))
            .collect();
        assert_eq!(map["Technology"], 3000.0);
        assert_eq!(map["Communication Services"], 2000.0);
        assert_eq!(map["Healthcare"], 1000.0);
    }

    #[tokio::test]
    async fn sector_exposure_falls_back_to_constituents() {
        let store = Arc::new(MemoryStore::default());
        *store.profile.lock().unwrap() = Some(profile());
        *store.holdings.lock().unwrap() =
            vec![holding("SMH", TickerCategory::Growth, 10.0, "USD", false)]; // 1000

        // No published sector weights; two constituents resolve, covering
        // only 40% of the fund.
        let market = StubMarketData::new()
            .price("SMH", 100.0)
            .etf("SMH")
            .constituents("SMH", &[("NVDA", 0.25), ("TSM", 0.15)])
            .sector_name("NVDA", "Technology")
            .sector_name("TSM", "Technology");

        let svc = RebalanceService::new(store, Arc::new(market));
        let exposure = svc.sector_exposure().await.unwrap();

        assert_eq!(exposure.len(), 1);
        assert_eq!(exposure[0].sector, "Technology");
        assert_eq!(exposure[0].market_value, 1000.0);
        assert_eq!(exposure[0].pct, 100.0);
    }
}
