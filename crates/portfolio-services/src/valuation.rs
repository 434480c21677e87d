//! Shared valuation: convert every holding into the display currency and
//! aggregate by category.
//!
//! FX convention (service contract): `fx_rate(base, quote)` is a direct
//! quotation — units of `quote` per unit of `base` — and market values
//! convert by multiplication: `value_display = value_local × rate(local →
//! display)`.

use std::collections::HashMap;

use market_analysis::round2;
use observatory_core::{Holding, TickerCategory};
use serde::Serialize;

use crate::market_data::PortfolioMarketData;

/// One holding valued in the display currency.
#[derive(Debug, Clone, Serialize)]
pub struct ValuedHolding {
    pub symbol: String,
    pub category: TickerCategory,
    pub quantity: f64,
    pub cost_basis: Option<f64>,
    pub currency: String,
    pub is_cash: bool,
    /// Per-unit price in the holding's own currency (1.0 for cash).
    pub price: Option<f64>,
    /// Holding currency → display currency.
    pub fx_rate: f64,
    pub market_value: f64,
}

/// Valuation of the whole portfolio.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioValuation {
    pub display_currency: String,
    pub holdings: Vec<ValuedHolding>,
    pub total_value: f64,
    pub category_values: HashMap<TickerCategory, f64>,
}

impl PortfolioValuation {
    /// Current allocation percentages (empty portfolio yields zeros).
    pub fn category_pcts(&self) -> HashMap<TickerCategory, f64> {
        self.category_values
            .iter()
            .map(|(cat, value)| {
                let pct = if self.total_value > 0.0 {
                    round2(value / self.total_value * 100.0)
                } else {
                    0.0
                };
                (*cat, pct)
            })
            .collect()
    }

    /// Drift (actual − target) per category, covering the union of held
    /// and targeted categories.
    pub fn drifts(&self, targets: &HashMap<TickerCategory, f64>) -> HashMap<TickerCategory, f64> {
        let current = self.category_pcts();
        let mut drifts = HashMap::new();
        for (cat, pct) in &current {
            let target = targets.get(cat).copied().unwrap_or(0.0);
            drifts.insert(*cat, round2(pct - target));
        }
        for (cat, target) in targets {
            drifts.entry(*cat).or_insert(round2(-target));
        }
        drifts
    }
}

/// Value every holding in `display_currency`. Price preference: live
/// quote, then cost basis (degraded), else the position values at zero.
/// A missing FX rate degrades to 1:1 with a warning rather than dropping
/// the position.
pub async fn value_holdings(
    market: &dyn PortfolioMarketData,
    holdings: &[Holding],
    display_currency: &str,
) -> PortfolioValuation {
    let display_ccy = display_currency.to_uppercase();
    let mut valued = Vec::with_capacity(holdings.len());
    let mut category_values: HashMap<TickerCategory, f64> = HashMap::new();
    let mut total = 0.0;

    for holding in holdings {
        let fx_rate = if holding.currency.eq_ignore_ascii_case(&display_ccy) {
            1.0
        } else {
            match market.fx_rate(&holding.currency, &display_ccy).await {
                Some(rate) if rate > 0.0 => rate,
                _ => {
                    tracing::warn!(
                        "no FX rate for {}→{}, valuing {} at 1:1",
                        holding.currency,
                        display_ccy,
                        holding.symbol
                    );
                    1.0
                }
            }
        };

        let price = if holding.is_cash {
            Some(1.0)
        } else {
            let quoted = market.signals(&holding.symbol).await.price;
            quoted.or(holding.cost_basis)
        };

        let market_value = round2(price.unwrap_or(0.0) * holding.quantity * fx_rate);
        total += market_value;
        *category_values.entry(holding.category).or_insert(0.0) += market_value;

        valued.push(ValuedHolding {
            symbol: holding.symbol.clone(),
            category: holding.category,
            quantity: holding.quantity,
            cost_basis: holding.cost_basis,
            currency: holding.currency.to_uppercase(),
            is_cash: holding.is_cash,
            price,
            fx_rate,
            market_value,
        });
    }

    PortfolioValuation {
        display_currency: display_ccy,
        holdings: valued,
        total_value: round2(total),
        category_values,
    }
}
