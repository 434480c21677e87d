//! Tunable thresholds shared by the analytics and the service layers.

/// Wilder RSI lookback.
pub const RSI_PERIOD: usize = 14;

/// Moving-average windows (trading days).
pub const MA60_WINDOW: usize = 60;
pub const MA200_WINDOW: usize = 200;

/// Volume-ratio windows: mean(last 5) / mean(last 20).
pub const VOLUME_RATIO_SHORT_DAYS: usize = 5;
pub const VOLUME_RATIO_LONG_DAYS: usize = 20;

// Scan funnel thresholds. RSI thresholds shift by the category offset.
pub const BIAS_OVERSOLD_THRESHOLD: f64 = -20.0;
pub const BIAS_OVERHEATED_THRESHOLD: f64 = 20.0;
pub const BIAS_WEAKENING_THRESHOLD: f64 = -15.0;
pub const RSI_CONTRARIAN_BUY_THRESHOLD: f64 = 35.0;
pub const RSI_APPROACHING_BUY_THRESHOLD: f64 = 37.0;
pub const RSI_WEAKENING_THRESHOLD: f64 = 38.0;
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// MA200 amplifier bands. The sell side sits at +20 rather than −15's
/// mirror: equity markets drift upward over the long run.
pub const MA200_DEEP_DEVIATION_THRESHOLD: f64 = -15.0;
pub const MA200_HIGH_DEVIATION_THRESHOLD: f64 = 20.0;

/// Rogue wave: extreme historical bias plus elevated volume.
pub const ROGUE_WAVE_BIAS_PERCENTILE: f64 = 95.0;
pub const ROGUE_WAVE_VOLUME_RATIO_THRESHOLD: f64 = 1.5;
pub const ROGUE_WAVE_MIN_HISTORY_DAYS: usize = 200;

/// Gross-margin drop (percentage points) that flags a deteriorating moat.
pub const MOAT_MARGIN_DETERIORATION_THRESHOLD: f64 = -2.0;

// Market sentiment bands: % of Trend Setters below MA60.
pub const MARKET_STRONG_BULLISH_MAX_PCT: f64 = 10.0;
pub const MARKET_BULLISH_MAX_PCT: f64 = 30.0;
pub const MARKET_NEUTRAL_MAX_PCT: f64 = 50.0;
pub const MARKET_BEARISH_MAX_PCT: f64 = 70.0;

// VIX level classification.
pub const VIX_EXTREME_FEAR: f64 = 30.0;
pub const VIX_FEAR: f64 = 20.0;
pub const VIX_NEUTRAL_LOW: f64 = 15.0;
pub const VIX_GREED: f64 = 10.0;

// CNN fear & greed score bands (0-100).
pub const CNN_FG_EXTREME_FEAR: i32 = 25;
pub const CNN_FG_FEAR: i32 = 45;
pub const CNN_FG_NEUTRAL_HIGH: i32 = 55;
pub const CNN_FG_GREED: i32 = 75;

/// VIX → score piecewise map, anchored to the classification thresholds so
/// the level and the score band always agree. Clamped outside [8, 40].
pub const VIX_SCORE_POINTS: [(f64, i32); 6] = [
    (40.0, 0),
    (30.0, 25),
    (20.0, 45),
    (15.0, 55),
    (10.0, 75),
    (8.0, 100),
];

// Self-calculated fear & greed composite.
pub const FG_LOOKBACK_DAYS: usize = 14;
pub const FG_MA_WINDOW: usize = 50;
pub const FG_VIX_BASE: f64 = 90.0;
pub const FG_VIX_OFFSET: f64 = 10.0;
pub const FG_VIX_SLOPE: f64 = 3.2;
pub const FG_PRICE_STRENGTH_MULT: f64 = 8.0;
pub const FG_MOMENTUM_RSI_WEIGHT: f64 = 0.7;
pub const FG_MOMENTUM_MA_MULT: f64 = 5.0;
pub const FG_BREADTH_MULT: f64 = 18.0;
pub const FG_JUNK_BOND_MULT: f64 = 15.0;
pub const FG_SAFE_HAVEN_MULT: f64 = 10.0;
pub const FG_SECTOR_ROTATION_MULT: f64 = 10.0;

/// Component weights (vix, price_strength, momentum, breadth, junk_bond,
/// safe_haven, sector_rotation). Missing components are re-normalised.
pub const FG_WEIGHT_VIX: f64 = 0.25;
pub const FG_WEIGHT_PRICE_STRENGTH: f64 = 0.15;
pub const FG_WEIGHT_MOMENTUM: f64 = 0.15;
pub const FG_WEIGHT_BREADTH: f64 = 0.15;
pub const FG_WEIGHT_JUNK_BOND: f64 = 0.10;
pub const FG_WEIGHT_SAFE_HAVEN: f64 = 0.10;
pub const FG_WEIGHT_SECTOR_ROTATION: f64 = 0.10;

/// Recommendations below this display-currency amount are dropped from the
/// withdrawal plan.
pub const WITHDRAWAL_MIN_SELL_VALUE: f64 = 10.0;

/// 13F share-count change (%) that counts as a real increase/decrease.
pub const GURU_HOLDING_CHANGE_THRESHOLD_PCT: f64 = 20.0;

// Stress-test pain buckets (absolute loss %); boundaries land in the
// higher bucket.
pub const PAIN_MODERATE_PCT: f64 = 10.0;
pub const PAIN_HIGH_PCT: f64 = 20.0;
pub const PAIN_PANIC_PCT: f64 = 30.0;

// Portfolio-beta branches for panic advice.
pub const STRESS_BETA_HIGH: f64 = 1.4;
pub const STRESS_BETA_MODERATE: f64 = 1.1;

/// Latest close counts as a "recent high" when within this % of the
/// lookback-window maximum.
pub const FX_RECENT_HIGH_TOLERANCE_PCT: f64 = 0.5;

pub const SECONDS_PER_DAY: i64 = 86_400;
