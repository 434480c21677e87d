//! Smart-withdrawal orchestration: valuation, drifts, then the pure
//! liquidity waterfall.

use std::sync::Arc;

use market_analysis::{plan_withdrawal, HoldingSnapshot, WithdrawalPlan};
use observatory_core::{store::PortfolioStore, EngineError};

use crate::market_data::PortfolioMarketData;
use crate::valuation::value_holdings;

pub struct WithdrawalService<S> {
    store: Arc<S>,
    market: Arc<dyn PortfolioMarketData>,
}

impl<S: PortfolioStore + Send + Sync> WithdrawalService<S> {
    pub fn new(store: Arc<S>, market: Arc<dyn PortfolioMarketData>) -> Self {
        Self { store, market }
    }

    /// Plan how to raise `target_amount` in the home currency.
    pub async fn plan(&self, target_amount: f64) -> Result<WithdrawalPlan, EngineError> {
        let profile = self
            .store
            .get_profile()
            .await?
            .ok_or_else(|| EngineError::NotFound("investment profile".to_string()))?;
        let holdings = self.store.list_holdings().await?;
        let valuation =
            value_holdings(self.market.as_ref(), &holdings, &profile.home_currency).await;

        let snapshots: Vec<HoldingSnapshot> = valuation
            .holdings
            .iter()
            .map(|h| HoldingSnapshot {
                ticker: h.symbol.clone(),
                category: h.category,
                quantity: h.quantity,
                cost_basis: h.cost_basis,
                current_price: h.price,
                market_value: h.market_value,
                currency: h.currency.clone(),
                is_cash: h.is_cash,
                fx_rate: h.fx_rate,
            })
            .collect();

        let drifts = valuation.drifts(&profile.targets);

        Ok(plan_withdrawal(
            target_amount,
            &snapshots,
            &drifts,
            valuation.total_value,
            &profile.targets,
        ))
    }
}
