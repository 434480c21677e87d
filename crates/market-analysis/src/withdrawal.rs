//! Smart-withdrawal liquidity waterfall.
//!
//! Three selling priorities, applied until the target amount is covered:
//! rebalance out of overweight categories, harvest paper losses, then walk
//! the liquidity order (Cash, Bond, Growth, Moat, Trend Setter). All inputs
//! are already converted to the display currency; this module is pure.

use std::collections::HashMap;

use observatory_core::TickerCategory;
use serde::{Deserialize, Serialize};

use crate::constants::WITHDRAWAL_MIN_SELL_VALUE;
use crate::indicators::round2;

/// Holding snapshot with market value in the display currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingSnapshot {
    pub ticker: String,
    pub category: TickerCategory,
    pub quantity: f64,
    /// Per-unit cost in the holding's own currency.
    pub cost_basis: Option<f64>,
    /// Current per-unit price in the holding's own currency.
    pub current_price: Option<f64>,
    pub market_value: f64,
    pub currency: String,
    pub is_cash: bool,
    /// Holding currency → display currency.
    pub fx_rate: f64,
}

/// Why a holding was selected for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SellReason {
    Rebalance {
        category: TickerCategory,
        drift_pct: f64,
    },
    TaxLossHarvest,
    LiquidityHigh {
        category: TickerCategory,
    },
    Liquidity {
        category: TickerCategory,
    },
}

/// A single sell recommendation, priority 1 (rebalance) to 3 (liquidity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellRecommendation {
    pub ticker: String,
    pub category: TickerCategory,
    pub quantity_to_sell: f64,
    pub sell_value: f64,
    pub reason: SellReason,
    pub unrealized_pl: Option<f64>,
    pub priority: u8,
}

/// Projected allocation for one category after the plan executes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSellDrift {
    pub target_pct: f64,
    pub current_pct: f64,
    pub drift_pct: f64,
    pub market_value: f64,
}

/// The full withdrawal plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WithdrawalPlan {
    pub recommendations: Vec<SellRecommendation>,
    pub total_sell_value: f64,
    pub target_amount: f64,
    /// > 0 when the portfolio cannot cover the target.
    pub shortfall: f64,
    pub post_sell_drifts: HashMap<TickerCategory, PostSellDrift>,
}

fn unit_price(h: &HoldingSnapshot) -> f64 {
    if let Some(p) = h.current_price {
        if p > 0.0 {
            return p;
        }
    }
    if let Some(c) = h.cost_basis {
        if c > 0.0 {
            return c;
        }
    }
    0.0
}

fn unrealized_pl(h: &HoldingSnapshot, qty_to_sell: f64) -> Option<f64> {
    match (h.cost_basis, h.current_price) {
        (Some(cost), Some(price)) => Some(round2((price - cost) * qty_to_sell * h.fx_rate)),
        _ => None,
    }
}

fn qty_for_value(h: &HoldingSnapshot, target_value: f64) -> f64 {
    let price = unit_price(h);
    if price <= 0.0 || h.fx_rate <= 0.0 {
        return 0.0;
    }
    target_value / (price * h.fx_rate)
}

/// Carve a recommendation out of one holding, at most `remaining` worth.
/// `None` when nothing sellable is left or the amount is below the minimum.
fn sell_from_holding(
    h: &HoldingSnapshot,
    remaining: f64,
    reason: SellReason,
    priority: u8,
    already_sold: &HashMap<String, f64>,
) -> Option<SellRecommendation> {
    let available_qty = h.quantity - already_sold.get(&h.ticker).copied().unwrap_or(0.0);
    if available_qty <= 0.0 {
        return None;
    }

    let price = unit_price(h);
    if price <= 0.0 {
        return None;
    }

    let available_value = available_qty * price * h.fx_rate;
    let sell_value = available_value.min(remaining);
    if sell_value < WITHDRAWAL_MIN_SELL_VALUE {
        return None;
    }

    let qty_to_sell = qty_for_value(h, sell_value).min(available_qty);
    if qty_to_sell <= 0.0 {
        return None;
    }

    let actual_sell_value = round2(qty_to_sell * price * h.fx_rate);

    Some(SellRecommendation {
        ticker: h.ticker.clone(),
        category: h.category,
        quantity_to_sell: (qty_to_sell * 10_000.0).round() / 10_000.0,
        sell_value: actual_sell_value,
        unrealized_pl: unrealized_pl(h, qty_to_sell),
        reason,
        priority,
    })
}

fn compute_post_sell_drifts(
    category_values: &HashMap<TickerCategory, f64>,
    sell_by_category: &HashMap<TickerCategory, f64>,
    target_config: &HashMap<TickerCategory, f64>,
) -> HashMap<TickerCategory, PostSellDrift> {
    let mut post_values: HashMap<TickerCategory, f64> = category_values
        .iter()
        .map(|(cat, val)| {
            let sold = sell_by_category.get(cat).copied().unwrap_or(0.0);
            (*cat, (val - sold).max(0.0))
        })
        .collect();
    for cat in target_config.keys() {
        post_values.entry(*cat).or_insert(0.0);
    }

    let post_total: f64 = post_values.values().sum();

    post_values
        .iter()
        .map(|(cat, mv)| {
            let target_pct = target_config.get(cat).copied().unwrap_or(0.0);
            let current_pct = if post_total > 0.0 {
                round2(mv / post_total * 100.0)
            } else {
                0.0
            };
            (
                *cat,
                PostSellDrift {
                    target_pct,
                    current_pct,
                    drift_pct: round2(current_pct - target_pct),
                    market_value: round2(*mv),
                },
            )
        })
        .collect()
}

/// Build the liquidity-waterfall withdrawal plan.
pub fn plan_withdrawal(
    target_amount: f64,
    holdings: &[HoldingSnapshot],
    category_drifts: &HashMap<TickerCategory, f64>,
    total_portfolio_value: f64,
    target_config: &HashMap<TickerCategory, f64>,
) -> WithdrawalPlan {
    if target_amount <= 0.0 || holdings.is_empty() {
        return WithdrawalPlan {
            target_amount,
            shortfall: target_amount.max(0.0),
            ..WithdrawalPlan::default()
        };
    }

    let mut recommendations: Vec<SellRecommendation> = Vec::new();
    let mut remaining = target_amount;
    let mut already_sold: HashMap<String, f64> = HashMap::new();

    let mut category_values: HashMap<TickerCategory, f64> = HashMap::new();
    for h in holdings {
        *category_values.entry(h.category).or_insert(0.0) += h.market_value;
    }
    let mut sell_by_category: HashMap<TickerCategory, f64> = HashMap::new();

    let record = |rec: SellRecommendation,
                      already_sold: &mut HashMap<String, f64>,
                      sell_by_category: &mut HashMap<TickerCategory, f64>,
                      remaining: &mut f64,
                      recommendations: &mut Vec<SellRecommendation>| {
        *already_sold.entry(rec.ticker.clone()).or_insert(0.0) += rec.quantity_to_sell;
        *sell_by_category.entry(rec.category).or_insert(0.0) += rec.sell_value;
        *remaining -= rec.sell_value;
        recommendations.push(rec);
    };

    // Priority 1: rebalance — most overweight categories first, larger
    // positions first, capped by drift% x total value.
    let mut overweight: Vec<(TickerCategory, f64)> = category_drifts
        .iter()
        .filter(|(_, drift)| **drift > 0.0)
        .map(|(cat, drift)| (*cat, *drift))
        .collect();
    overweight.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (cat, drift_pct) in overweight {
        if remaining <= 0.0 {
            break;
        }

        let max_rebalance_value = drift_pct / 100.0 * total_portfolio_value;
        let mut sellable_value = max_rebalance_value.min(remaining);

        let mut cat_holdings: Vec<&HoldingSnapshot> =
            holdings.iter().filter(|h| h.category == cat).collect();
        cat_holdings.sort_by(|a, b| b.market_value.total_cmp(&a.market_value));

        for h in cat_holdings {
            if remaining <= 0.0 || sellable_value <= 0.0 {
                break;
            }
            if let Some(rec) = sell_from_holding(
                h,
                remaining.min(sellable_value),
                SellReason::Rebalance {
                    category: cat,
                    drift_pct,
                },
                1,
                &already_sold,
            ) {
                sellable_value -= rec.sell_value;
                record(
                    rec,
                    &mut already_sold,
                    &mut sell_by_category,
                    &mut remaining,
                    &mut recommendations,
                );
            }
        }
    }

    // Priority 2: tax-loss harvesting — largest paper loss first.
    if remaining > 0.0 {
        let mut loss_holdings: Vec<(&HoldingSnapshot, f64)> = holdings
            .iter()
            .filter_map(|h| {
                let avail = h.quantity - already_sold.get(&h.ticker).copied().unwrap_or(0.0);
                if avail <= 0.0 {
                    return None;
                }
                match (h.cost_basis, h.current_price) {
                    (Some(cost), Some(price)) if price < cost => {
                        Some((h, (cost - price) * avail * h.fx_rate))
                    }
                    _ => None,
                }
            })
            .collect();
        loss_holdings.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (h, _loss) in loss_holdings {
            if remaining <= 0.0 {
                break;
            }
            if let Some(rec) =
                sell_from_holding(h, remaining, SellReason::TaxLossHarvest, 2, &already_sold)
            {
                record(
                    rec,
                    &mut already_sold,
                    &mut sell_by_category,
                    &mut remaining,
                    &mut recommendations,
                );
            }
        }
    }

    // Priority 3: liquidity order, then market value descending.
    if remaining > 0.0 {
        let mut rest: Vec<&HoldingSnapshot> = holdings
            .iter()
            .filter(|h| h.quantity - already_sold.get(&h.ticker).copied().unwrap_or(0.0) > 0.0)
            .collect();
        rest.sort_by(|a, b| {
            a.category
                .liquidity_rank()
                .cmp(&b.category.liquidity_rank())
                .then(b.market_value.total_cmp(&a.market_value))
        });

        for h in rest {
            if remaining <= 0.0 {
                break;
            }
            let reason = if h.category.liquidity_rank() <= 1 {
                SellReason::LiquidityHigh {
                    category: h.category,
                }
            } else {
                SellReason::Liquidity {
                    category: h.category,
                }
            };
            if let Some(rec) = sell_from_holding(h, remaining, reason, 3, &already_sold) {
                record(
                    rec,
                    &mut already_sold,
                    &mut sell_by_category,
                    &mut remaining,
                    &mut recommendations,
                );
            }
        }
    }

    let total_sell: f64 = recommendations.iter().map(|r| r.sell_value).sum();
    let post_sell_drifts =
        compute_post_sell_drifts(&category_values, &sell_by_category, target_config);

    WithdrawalPlan {
        recommendations,
        total_sell_value: round2(total_sell),
        target_amount,
        shortfall: round2((target_amount - total_sell).max(0.0)),
        post_sell_drifts,
    }
}
