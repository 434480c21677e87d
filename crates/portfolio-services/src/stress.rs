//! Stress-test orchestration: valuation in the home currency, beta
//! resolution with category fallbacks, then the pure scenario math.

use std::sync::Arc;

use market_analysis::{calculate_stress_test, round2, StressHolding, StressTestReport};
use observatory_core::{store::PortfolioStore, EngineError};

use crate::market_data::PortfolioMarketData;
use crate::valuation::value_holdings;

pub struct StressTestService<S> {
    store: Arc<S>,
    market: Arc<dyn PortfolioMarketData>,
}

impl<S: PortfolioStore + Send + Sync> StressTestService<S> {
    pub fn new(store: Arc<S>, market: Arc<dyn PortfolioMarketData>) -> Self {
        Self { store, market }
    }

    /// Run a market-drop scenario (e.g. −20.0) against the portfolio.
    ///
    /// Betas come from the provider's sentinel-aware cache; a symbol the
    /// provider has no beta for falls back to its category's reference
    /// beta (cash pins to 0).
    pub async fn run(&self, scenario_drop_pct: f64) -> Result<StressTestReport, EngineError> {
        let profile = self
            .store
            .get_profile()
            .await?
            .ok_or_else(|| EngineError::NotFound("investment profile".to_string()))?;
        let holdings = self.store.list_holdings().await?;
        let valuation =
            value_holdings(self.market.as_ref(), &holdings, &profile.home_currency).await;

        let mut exposures = Vec::with_capacity(valuation.holdings.len());
        for holding in &valuation.holdings {
            if holding.market_value <= 0.0 {
                continue;
            }
            let beta = if holding.is_cash {
                0.0
            } else {
                match self.market.beta(&holding.symbol).await {
                    Some(beta) => beta,
                    None => holding.category.fallback_beta(),
                }
            };
            let weight_pct = if valuation.total_value > 0.0 {
                round2(holding.market_value / valuation.total_value * 100.0)
            } else {
                0.0
            };
            exposures.push(StressHolding {
                ticker: holding.symbol.clone(),
                category: holding.category,
                market_value: holding.market_value,
                beta,
                weight_pct,
            });
        }

        Ok(calculate_stress_test(&exposures, scenario_drop_pct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{holding, MemoryStore, StubMarketData};
    use observatory_core::{InvestmentProfile, PainLevel, TickerCategory};
    use std::collections::HashMap;

    fn store_with(holdings: Vec<observatory_core::Holding>) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::default());
        *store.profile.lock().unwrap() = Some(InvestmentProfile {
            targets: HashMap::new(),
            home_currency: "USD".to_string(),
        });
        *store.holdings.lock().unwrap() = holdings;
        store
    }

    #[tokio::test]
    async fn uses_provider_betas_and_category_fallbacks() {
        let store = store_with(vec![
            holding("NVDA", TickerCategory::Growth, 10.0, "USD", false), // 1000, beta 2.0
            holding("MYST", TickerCategory::Bond, 10.0, "USD", false),   // 1000, fallback 0.3
        ]);
        let market = StubMarketData::new()
            .price("NVDA", 100.0)
            .price("MYST", 100.0)
            .beta_value("NVDA", 2.0);

        let svc = StressTestService::new(store, Arc::new(market));
        let report = svc.run(-10.0).await.unwrap();

        // Beta = 50% x 2.0 + 50% x 0.3 = 1.15.
        assert_eq!(report.portfolio_beta, 1.15);

        let nvda = report
            .holdings_breakdown
            .iter()
            .find(|h| h.ticker == "NVDA")
            .unwrap();
        assert_eq!(nvda.expected_drop_pct, -20.0);
        assert_eq!(nvda.expected_loss, -200.0);
    }

    #[tokio::test]
    async fn cash_is_immune_to_the_scenario() {
        let store = store_with(vec![holding("USD", TickerCategory::Cash, 5000.0, "USD", true)]);
        let market = StubMarketData::new();

        let svc = StressTestService::new(store, Arc::new(market));
        let report = svc.run(-50.0).await.unwrap();

        assert_eq!(report.portfolio_beta, 0.0);
        assert_eq!(report.total_loss, 0.0);
        assert_eq!(report.pain_level, PainLevel::Low);
    }

    #[tokio::test]
    async fn foreign_holdings_convert_before_the_scenario() {
        let store = store_with(vec![holding(
            "2330.TW",
            TickerCategory::Moat,
            100.0,
            "TWD",
            false,
        )]);
        let market = StubMarketData::new()
            .price("2330.TW", 1000.0)
            .fx("TWD", "USD", 0.032)
            .beta_value("2330.TW", 1.0);

        let svc = StressTestService::new(store, Arc::new(market));
        let report = svc.run(-20.0).await.unwrap();

        // 100 x 1000 TWD x 0.032 = 3200 USD; -20% x beta 1.0 = -640 USD.
        assert_eq!(report.total_value, 3200.0);
        assert_eq!(report.total_loss, -640.0);
    }

    #[tokio::test]
    async fn missing_profile_is_not_found() {
        let store = Arc::new(MemoryStore::default());
        let svc = StressTestService::new(store, Arc::new(StubMarketData::new()));
        assert!(matches!(
            svc.run(-20.0).await,
            Err(EngineError::NotFound(_))
        ));
    }
}
