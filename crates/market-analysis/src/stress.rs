//! Pure stress-test math: portfolio beta, expected drawdown, pain level,
//! panic advice.

use observatory_core::{PainLevel, TickerCategory};
use serde::{Deserialize, Serialize};

use crate::constants::{
    PAIN_HIGH_PCT, PAIN_MODERATE_PCT, PAIN_PANIC_PCT, STRESS_BETA_HIGH, STRESS_BETA_MODERATE,
};
use crate::indicators::round2;

/// One holding's exposure input: market value already in the display
/// currency, weight as percent of the portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressHolding {
    pub ticker: String,
    pub category: TickerCategory,
    pub market_value: f64,
    pub beta: f64,
    pub weight_pct: f64,
}

/// Per-holding stress outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingStress {
    pub ticker: String,
    pub category: TickerCategory,
    pub market_value: f64,
    pub beta: f64,
    pub weight_pct: f64,
    pub expected_drop_pct: f64,
    pub expected_loss: f64,
}

/// Advice lines attached to a panic-level outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressAdvice {
    PanicIntro,
    BetaHigh,
    BetaModerate,
    BetaLow,
    EmergencyFund,
    Leverage,
    ThesisBroken,
}

/// Full stress-test report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestReport {
    pub portfolio_beta: f64,
    pub scenario_drop_pct: f64,
    pub total_value: f64,
    pub total_loss: f64,
    pub total_loss_pct: f64,
    pub pain_level: PainLevel,
    pub holdings_breakdown: Vec<HoldingStress>,
    pub advice: Vec<StressAdvice>,
}

/// Weighted-average portfolio beta: Σ(weight% × beta) / 100, rounded 2 dp.
pub fn calculate_portfolio_beta(holdings: &[StressHolding]) -> f64 {
    let weighted: f64 = holdings.iter().map(|h| h.weight_pct * h.beta).sum();
    round2(weighted / 100.0)
}

/// Pain bucket by loss percent (positive = loss). Boundaries land in the
/// higher bucket; gains read as low pain.
pub fn classify_pain_level(loss_pct: f64) -> PainLevel {
    if loss_pct >= PAIN_PANIC_PCT {
        PainLevel::Panic
    } else if loss_pct >= PAIN_HIGH_PCT {
        PainLevel::High
    } else if loss_pct >= PAIN_MODERATE_PCT {
        PainLevel::Moderate
    } else {
        PainLevel::Low
    }
}

/// Advice is generated only for panic outcomes, with a beta-dependent
/// first recommendation.
pub fn generate_advice(pain: PainLevel, portfolio_beta: f64) -> Vec<StressAdvice> {
    if pain != PainLevel::Panic {
        return Vec::new();
    }

    let beta_advice = if portfolio_beta >= STRESS_BETA_HIGH {
        StressAdvice::BetaHigh
    } else if portfolio_beta >= STRESS_BETA_MODERATE {
        StressAdvice::BetaModerate
    } else {
        StressAdvice::BetaLow
    };

    vec![
        StressAdvice::PanicIntro,
        beta_advice,
        StressAdvice::EmergencyFund,
        StressAdvice::Leverage,
        StressAdvice::ThesisBroken,
    ]
}

/// Run the scenario: per holding, expected drop% = scenario_drop × beta and
/// expected loss = market_value × drop% / 100.
pub fn calculate_stress_test(holdings: &[StressHolding], scenario_drop_pct: f64) -> StressTestReport {
    let portfolio_beta = calculate_portfolio_beta(holdings);
    let total_value: f64 = holdings.iter().map(|h| h.market_value).sum();

    let mut breakdown = Vec::with_capacity(holdings.len());
    let mut total_loss = 0.0;
    for h in holdings {
        let expected_drop_pct = round2(scenario_drop_pct * h.beta);
        let expected_loss = round2(h.market_value * expected_drop_pct / 100.0);
        total_loss += expected_loss;
        breakdown.push(HoldingStress {
            ticker: h.ticker.clone(),
            category: h.category,
            market_value: h.market_value,
            beta: h.beta,
            weight_pct: h.weight_pct,
            expected_drop_pct,
            expected_loss,
        });
    }

    let total_loss = round2(total_loss);
    let total_loss_pct = if total_value > 0.0 {
        round2(total_loss / total_value * 100.0)
    } else {
        0.0
    };

    // Pain reads the loss as a positive magnitude; a net gain (negative
    // beta book) is zero pain.
    let pain_level = classify_pain_level(-total_loss_pct);
    let advice = generate_advice(pain_level, portfolio_beta);

    StressTestReport {
        portfolio_beta,
        scenario_drop_pct,
        total_value,
        total_loss,
        total_loss_pct,
        pain_level,
        holdings_breakdown: breakdown,
        advice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(ticker: &str, category: TickerCategory, mv: f64, beta: f64, weight: f64) -> StressHolding {
        StressHolding {
            ticker: ticker.to_string(),
            category,
            market_value: mv,
            beta,
            weight_pct: weight,
        }
    }

    #[test]
    fn portfolio_beta_is_weighted_average() {
        let holdings = vec![
            holding("A", TickerCategory::TrendSetter, 5000.0, 1.0, 50.0),
            holding("B", TickerCategory::Growth, 3000.0, 1.5, 30.0),
            holding("C", TickerCategory::Bond, 2000.0, 0.5, 20.0),
        ];
        assert_eq!(calculate_portfolio_beta(&holdings), 1.05);
        assert_eq!(calculate_portfolio_beta(&[]), 0.0);
    }

    #[test]
    fn portfolio_beta_handles_inverse_positions() {
        let holdings = vec![
            holding("A", TickerCategory::Growth, 7000.0, 1.2, 70.0),
            holding("SH", TickerCategory::Growth, 3000.0, -0.5, 30.0),
        ];
        assert_eq!(calculate_portfolio_beta(&holdings), 0.69);
    }

    #[test]
    fn pain_buckets_and_boundaries() {
        assert_eq!(classify_pain_level(5.0), PainLevel::Low);
        assert_eq!(classify_pain_level(10.0), PainLevel::Moderate);
        assert_eq!(classify_pain_level(15.0), PainLevel::Moderate);
        assert_eq!(classify_pain_level(20.0), PainLevel::High);
        assert_eq!(classify_pain_level(25.0), PainLevel::High);
        assert_eq!(classify_pain_level(30.0), PainLevel::Panic);
        assert_eq!(classify_pain_level(99.0), PainLevel::Panic);
        assert_eq!(classify_pain_level(0.0), PainLevel::Low);
        assert_eq!(classify_pain_level(-5.0), PainLevel::Low);
    }

    #[test]
    fn advice_only_for_panic() {
        assert!(generate_advice(PainLevel::Low, 1.2).is_empty());
        assert!(generate_advice(PainLevel::Moderate, 1.2).is_empty());
        assert!(generate_advice(PainLevel::High, 1.2).is_empty());

        let advice = generate_advice(PainLevel::Panic, 1.0);
        assert!(advice.contains(&StressAdvice::PanicIntro));
        assert!(advice.contains(&StressAdvice::EmergencyFund));
        assert!(advice.contains(&StressAdvice::Leverage));
        assert!(advice.contains(&StressAdvice::ThesisBroken));
    }

    #[test]
    fn advice_branches_on_portfolio_beta() {
        assert!(generate_advice(PainLevel::Panic, 1.5).contains(&StressAdvice::BetaHigh));
        assert!(generate_advice(PainLevel::Panic, 1.3).contains(&StressAdvice::BetaModerate));
        assert!(generate_advice(PainLevel::Panic, 0.9).contains(&StressAdvice::BetaLow));
    }

    #[test]
    fn stress_test_mixed_portfolio() {
        let holdings = vec![
            holding("NVDA", TickerCategory::Growth, 50_000.0, 1.8, 50.0),
            holding("BRK.B", TickerCategory::Moat, 30_000.0, 0.8, 30.0),
            holding("TLT", TickerCategory::Bond, 20_000.0, 0.3, 20.0),
        ];
        let report = calculate_stress_test(&holdings, -20.0);

        assert_eq!(report.portfolio_beta, 1.2);
        assert_eq!(report.total_value, 100_000.0);
        assert_eq!(report.total_loss, -24_000.0);
        assert_eq!(report.total_loss_pct, -24.0);
        assert_eq!(report.pain_level, PainLevel::High);

        let nvda = report
            .holdings_breakdown
            .iter()
            .find(|h| h.ticker == "NVDA")
            .unwrap();
        assert_eq!(nvda.expected_drop_pct, -36.0);
        assert_eq!(nvda.expected_loss, -18_000.0);
    }

    #[test]
    fn stress_test_empty_portfolio() {
        let report = calculate_stress_test(&[], -20.0);
        assert_eq!(report.portfolio_beta, 0.0);
        assert_eq!(report.total_value, 0.0);
        assert_eq!(report.total_loss, 0.0);
        assert_eq!(report.total_loss_pct, 0.0);
        assert_eq!(report.pain_level, PainLevel::Low);
        assert!(report.holdings_breakdown.is_empty());
    }

    #[test]
    fn stress_test_extreme_drop_produces_advice() {
        let holdings = vec![holding("NVDA", TickerCategory::Growth, 10_000.0, 2.0, 100.0)];
        let report = calculate_stress_test(&holdings, -50.0);
        assert_eq!(report.total_loss, -10_000.0);
        assert_eq!(report.total_loss_pct, -100.0);
        assert_eq!(report.pain_level, PainLevel::Panic);
        assert!(!report.advice.is_empty());
    }

    #[test]
    fn stress_test_negative_beta_gains() {
        let holdings = vec![holding("SH", TickerCategory::Growth, 10_000.0, -1.0, 100.0)];
        let report = calculate_stress_test(&holdings, -20.0);
        assert_eq!(report.total_loss, 2_000.0);
        assert_eq!(report.total_loss_pct, 20.0);
        assert_eq!(report.pain_level, PainLevel::Low);
    }
}
