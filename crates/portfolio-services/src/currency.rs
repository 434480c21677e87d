//! Currency exposure and the scheduled FX timing watch.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;

use market_analysis::{assess_exchange_timing, round2};
use observatory_core::{
    store::PortfolioStore, Clock, EngineError, FxWatchConfig, Notifier,
};

use crate::market_data::PortfolioMarketData;
use crate::valuation::value_holdings;

/// Exposure to one currency, in the display currency.
#[derive(Debug, Clone, Serialize)]
pub struct CurrencyExposure {
    pub currency: String,
    pub market_value: f64,
    pub pct: f64,
}

/// What happened to one FX watch during a check run.
#[derive(Debug, Clone, Serialize)]
pub struct FxWatchOutcome {
    pub watch_id: i64,
    pub pair: String,
    pub latest_rate: Option<f64>,
    pub consecutive_increases: usize,
    pub is_recent_high: bool,
    pub alerted: bool,
}

pub struct CurrencyExposureService<S> {
    store: Arc<S>,
    market: Arc<dyn PortfolioMarketData>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl<S: PortfolioStore + Send + Sync> CurrencyExposureService<S> {
    pub fn new(
        store: Arc<S>,
        market: Arc<dyn PortfolioMarketData>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            market,
            notifier,
            clock,
        }
    }

    /// Aggregate holdings by their own currency, valued in the home
    /// currency, largest exposure first.
    pub async fn exposure(&self) -> Result<Vec<CurrencyExposure>, EngineError> {
        let profile = self
            .store
            .get_profile()
            .await?
            .ok_or_else(|| EngineError::NotFound("investment profile".to_string()))?;
        let holdings = self.store.list_holdings().await?;
        let valuation =
            value_holdings(self.market.as_ref(), &holdings, &profile.home_currency).await;

        let mut by_currency: HashMap<String, f64> = HashMap::new();
        for holding in &valuation.holdings {
            *by_currency.entry(holding.currency.clone()).or_insert(0.0) +=
                holding.market_value;
        }

        let total = valuation.total_value;
        let mut exposures: Vec<CurrencyExposure> = by_currency
            .into_iter()
            .map(|(currency, value)| CurrencyExposure {
                currency,
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

    /// Check every active FX watch: assess the timing conditions and, when
    /// they fire outside the reminder window, notify and stamp the watch.
    pub async fn check_fx_watches(&self) -> Result<Vec<FxWatchOutcome>, EngineError> {
        let watches = self.store.list_fx_watches().await?;
        let now = self.clock.now();
        let mut outcomes = Vec::new();

        for watch in watches.iter().filter(|w| w.is_active) {
            let history = self.market.fx_history(&watch.base, &watch.quote).await;
            let timing = assess_exchange_timing(watch, &history);

            let mut alerted = false;
            if timing.should_alert && self.outside_reminder_window(watch, now) {
                let message = format!(
                    "💱 {}/{} at {:.4}: near the {}-day high ({} straight up days)",
                    watch.base,
                    watch.quote,
                    timing.latest_rate.unwrap_or(0.0),
                    watch.lookback_days,
                    timing.consecutive_increases
                );
                match self.notifier.send(&message).await {
                    Ok(()) => {
                        self.store.mark_fx_alerted(watch.id, now).await?;
                        alerted = true;
                    }
                    Err(e) => tracing::warn!(
                        "FX watch notification failed for {}/{}: {e}",
                        watch.base,
                        watch.quote
                    ),
                }
            }

            outcomes.push(FxWatchOutcome {
                watch_id: watch.id,
                pair: format!("{}/{}", watch.base, watch.quote),
                latest_rate: timing.latest_rate,
                consecutive_increases: timing.consecutive_increases,
                is_recent_high: timing.is_recent_high,
                alerted,
            });
        }

        Ok(outcomes)
    }

    fn outside_reminder_window(
        &self,
        watch: &FxWatchConfig,
        now: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        match watch.last_alerted_at {
            None => true,
            Some(last) => now - last >= Duration::hours(watch.reminder_interval_hours),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{fixed_clock, holding, MemoryStore, RecordingNotifier, StubMarketData};
    use chrono::{TimeZone, Utc};
    use observatory_core::{InvestmentProfile, TickerCategory};

    fn watch(id: i64) -> FxWatchConfig {
        FxWatchConfig {
            id,
            base: "USD".to_string(),
            quote: "TWD".to_string(),
            lookback_days: 5,
            consecutive_threshold: 3,
            alert_on_recent_high: true,
            alert_on_consecutive: true,
            reminder_interval_hours: 24,
            last_alerted_at: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn exposure_groups_by_holding_currency() {
        let store = Arc::new(MemoryStore::default());
        *store.profile.lock().unwrap() = Some(InvestmentProfile {
            targets: HashMap::new(),
            home_currency: "USD".to_string(),
        });
        *store.holdings.lock().unwrap() = vec![
            holding("AAPL", TickerCategory::TrendSetter, 10.0, "USD", false), // 1700
            holding("2330.TW", TickerCategory::Moat, 100.0, "TWD", false),    // 3200
            holding("TWD", TickerCategory::Cash, 10_000.0, "TWD", true),      // 320
        ];

        let market = StubMarketData::new()
            .price("AAPL", 170.0)
            .price("2330.TW", 1000.0)
            .fx("TWD", "USD", 0.032);

        let svc = CurrencyExposureService::new(
            store,
            Arc::new(market),
            Arc::new(RecordingNotifier::default()),
            fixed_clock(),
        );
        let exposure = svc.exposure().await.unwrap();

        assert_eq!(exposure[0].currency, "TWD");
        assert_eq!(exposure[0].market_value, 3520.0);
        assert_eq!(exposure[1].currency, "USD");
        assert_eq!(exposure[1].market_value, 1700.0);
        assert!((exposure[0].pct - 67.43).abs() < 0.1);
    }

    #[tokio::test]
    async fn fx_watch_alerts_and_stamps_the_watch() {
        let store = Arc::new(MemoryStore::default());
        store.fx_watches.lock().unwrap().push(watch(1));

        // Five straight up days ending at the window high.
        let market = StubMarketData::new().fx_days(
            "USD",
            "TWD",
            &[30.0, 30.2, 30.4, 30.6, 30.8, 31.0],
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = CurrencyExposureService::new(
            store.clone(),
            Arc::new(market),
            notifier.clone(),
            fixed_clock(),
        );

        let outcomes = svc.check_fx_watches().await.unwrap();
        assert!(outcomes[0].alerted);
        assert!(outcomes[0].is_recent_high);
        assert!(store.fx_watches.lock().unwrap()[0].last_alerted_at.is_some());
        assert!(notifier.messages.lock().unwrap()[0].contains("USD/TWD"));
    }

    #[tokio::test]
    async fn fx_watch_respects_the_reminder_interval() {
        let store = Arc::new(MemoryStore::default());
        let mut w = watch(1);
        // Alerted two hours before the fixed clock; the 24h reminder
        // window still applies.
        w.last_alerted_at = Some(Utc.with_ymd_and_hms(2026, 8, 1, 10, 0, 0).unwrap());
        store.fx_watches.lock().unwrap().push(w);

        let market = StubMarketData::new().fx_days(
            "USD",
            "TWD",
            &[30.0, 30.2, 30.4, 30.6, 30.8, 31.0],
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = CurrencyExposureService::new(
            store,
            Arc::new(market),
            notifier.clone(),
            fixed_clock(),
        );

        let outcomes = svc.check_fx_watches().await.unwrap();
        assert!(!outcomes[0].alerted);
        assert!(notifier.messages.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn quiet_market_does_not_alert() {
        let store = Arc::new(MemoryStore::default());
        store.fx_watches.lock().unwrap().push(watch(1));

        let market =
            StubMarketData::new().fx_days("USD", "TWD", &[31.0, 30.8, 30.6, 30.4, 30.2]);
        let notifier = Arc::new(RecordingNotifier::default());
        let svc = CurrencyExposureService::new(
            store,
            Arc::new(market),
            notifier.clone(),
            fixed_clock(),
        );

        let outcomes = svc.check_fx_watches().await.unwrap();
        assert!(!outcomes[0].alerted);
        assert_eq!(outcomes[0].consecutive_increases, 0);
    }
}
