//! Pure analytical primitives: stateless, deterministic, no I/O.
//!
//! Inputs that violate preconditions (insufficient history, zero
//! denominators) come back as `None` rather than panicking; the adapter and
//! service layers decide how to degrade.

pub mod constants;
pub mod fear_greed;
pub mod fx_timing;
pub mod indicators;
pub mod performance;
pub mod signals;
pub mod smart_money;
pub mod stress;
pub mod withdrawal;

mod indicators_tests;

pub use fear_greed::{
    classify_cnn_fear_greed, classify_vix, compute_composite_fear_greed,
    compute_weighted_fear_greed, score_breadth, score_junk_bond_demand, score_momentum_composite,
    score_price_strength, score_safe_haven, score_sector_rotation, score_vix_linear, vix_to_score,
};
pub use fx_timing::{assess_exchange_timing, count_consecutive_increases, is_recent_high,
    ExchangeTiming};
pub use indicators::{
    compute_bias, compute_bias_percentile, compute_daily_change_pct, compute_moving_average,
    compute_rsi, compute_volume_ratio, detect_rogue_wave, round2,
};
pub use performance::compute_twr;
pub use signals::{
    compute_signal_duration, determine_market_sentiment, determine_moat_status,
    determine_scan_signal,
};
pub use smart_money::{
    classify_holding_change, classify_holding_change_with, compute_change_pct,
    compute_holding_weight, compute_resonance_matches,
};
pub use stress::{
    calculate_portfolio_beta, calculate_stress_test, classify_pain_level, generate_advice,
    HoldingStress, StressAdvice, StressHolding, StressTestReport,
};
pub use withdrawal::{
    plan_withdrawal, HoldingSnapshot, PostSellDrift, SellReason, SellRecommendation,
    WithdrawalPlan,
};
