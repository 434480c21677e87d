//! Shared in-memory fixtures for the service tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use observatory_core::{
    store::{PortfolioStore, WatchlistStore},
    Clock, DividendInfo, EarningsInfo, EngineError, EtfConstituent, EtfHoldings, FxWatchConfig,
    Holding, InvestmentProfile, MoatReport, Notifier, PortfolioSnapshot, QuoteDay, RemovalLog,
    ScanLog, ScanSignal, SectorWeight, SectorWeights, TechnicalSignals, ThesisLog,
    TickerCategory, TrackedTicker,
};

use crate::market_data::PortfolioMarketData;

pub fn holding(
    symbol: &str,
    category: TickerCategory,
    quantity: f64,
    currency: &str,
    is_cash: bool,
) -> Holding {
    Holding {
        symbol: symbol.to_string(),
        category,
        quantity,
        cost_basis: None,
        currency: currency.to_string(),
        broker: None,
        is_cash,
    }
}

#[derive(Default)]
pub struct StubMarketData {
    pub prices: HashMap<String, f64>,
    pub betas: HashMap<String, f64>,
    pub fx: HashMap<(String, String), f64>,
    pub fx_histories: HashMap<(String, String), Vec<QuoteDay>>,
    pub sectors: HashMap<String, String>,
    pub etf_holdings: HashMap<String, Vec<EtfConstituent>>,
    pub etf_weights: HashMap<String, Vec<SectorWeight>>,
    pub etfs: Vec<String>,
    pub rsis: HashMap<String, f64>,
}

impl StubMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price(mut self, ticker: &str, price: f64) -> Self {
        self.prices.insert(ticker.to_string(), price);
        self
    }

    pub fn rsi(mut self, ticker: &str, rsi: f64) -> Self {
        self.rsis.insert(ticker.to_string(), rsi);
        self
    }

    pub fn beta_value(mut self, ticker: &str, beta: f64) -> Self {
        self.betas.insert(ticker.to_string(), beta);
        self
    }

    pub fn fx(mut self, base: &str, quote: &str, rate: f64) -> Self {
        self.fx.insert((base.to_string(), quote.to_string()), rate);
        self
    }

    pub fn fx_days(mut self, base: &str, quote: &str, closes: &[f64]) -> Self {
        let days = closes
            .iter()
            .enumerate()
            .map(|(i, c)| QuoteDay {
                date: chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
                    + chrono::Days::new(i as u64),
                close: *c,
            })
            .collect();
        self.fx_histories
            .insert((base.to_string(), quote.to_string()), days);
        self
    }

    pub fn sector_name(mut self, ticker: &str, sector: &str) -> Self {
        self.sectors.insert(ticker.to_string(), sector.to_string());
        self
    }

    pub fn etf(mut self, ticker: &str) -> Self {
        self.etfs.push(ticker.to_string());
        self
    }

    pub fn constituents(mut self, ticker: &str, entries: &[(&str, f64)]) -> Self {
        self.etf_holdings.insert(
            ticker.to_string(),
            entries
                .iter()
                .map(|(symbol, weight)| EtfConstituent {
                    symbol: symbol.to_string(),
                    name: symbol.to_string(),
                    weight: *weight,
                })
                .collect(),
        );
        self
    }

    pub fn sector_weights(mut self, ticker: &str, entries: &[(&str, f64)]) -> Self {
        self.etf_weights.insert(
            ticker.to_string(),
            entries
                .iter()
                .map(|(sector, weight)| SectorWeight {
                    sector: sector.to_string(),
                    weight: *weight,
                })
                .collect(),
        );
        self
    }
}

#[async_trait]
impl PortfolioMarketData for StubMarketData {
    async fn fx_rate(&self, base: &str, quote: &str) -> Option<f64> {
        self.fx.get(&(base.to_string(), quote.to_string())).copied()
    }

    async fn fx_history(&self, base: &str, quote: &str) -> Vec<QuoteDay> {
        self.fx_histories
            .get(&(base.to_string(), quote.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    async fn signals(&self, ticker: &str) -> TechnicalSignals {
        TechnicalSignals {
            ticker: ticker.to_string(),
            price: self.prices.get(ticker).copied(),
            daily_change_pct: None,
            rsi: self.rsis.get(ticker).copied(),
            ma60: None,
            ma200: None,
            bias: None,
            bias_200: None,
            volume_ratio: None,
            data_points: 0,
            error: None,
        }
    }

    async fn beta(&self, ticker: &str) -> Option<f64> {
        self.betas.get(ticker).copied()
    }

    async fn sector(&self, ticker: &str) -> Option<String> {
        self.sectors.get(ticker).cloned()
    }

    async fn etf_holdings(&self, ticker: &str) -> EtfHoldings {
        EtfHoldings {
            ticker: ticker.to_string(),
            holdings: self.etf_holdings.get(ticker).cloned().unwrap_or_default(),
            error: None,
        }
    }

    async fn etf_sector_weights(&self, ticker: &str) -> SectorWeights {
        SectorWeights {
            ticker: ticker.to_string(),
            weights: self.etf_weights.get(ticker).cloned().unwrap_or_default(),
            error: None,
        }
    }

    async fn dividend(&self, ticker: &str) -> DividendInfo {
        DividendInfo {
            ticker: ticker.to_string(),
            ytd_dividend_per_share: Some(0.0),
            dividend_yield_pct: None,
            is_dividend_payer: false,
        }
    }

    async fn earnings(&self, ticker: &str) -> EarningsInfo {
        EarningsInfo {
            ticker: ticker.to_string(),
            next_earnings_date: None,
            error: None,
        }
    }

    async fn moat(&self, ticker: &str) -> MoatReport {
        MoatReport::not_available(ticker)
    }

    async fn detect_is_etf(&self, ticker: &str) -> bool {
        self.etfs.iter().any(|t| t == ticker)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    pub tickers: Mutex<Vec<TrackedTicker>>,
    pub thesis_logs: Mutex<Vec<ThesisLog>>,
    pub removal_logs: Mutex<Vec<RemovalLog>>,
    pub holdings: Mutex<Vec<Holding>>,
    pub profile: Mutex<Option<InvestmentProfile>>,
    pub snapshots: Mutex<Vec<PortfolioSnapshot>>,
    pub fx_watches: Mutex<Vec<FxWatchConfig>>,
}

#[async_trait]
impl WatchlistStore for MemoryStore {
    async fn list_active_tickers(&self) -> Result<Vec<TrackedTicker>, EngineError> {
        Ok(self
            .tickers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }

    async fn list_inactive_tickers(&self) -> Result<Vec<TrackedTicker>, EngineError> {
        Ok(self
            .tickers
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.is_active)
            .cloned()
            .collect())
    }

    async fn find_ticker(&self, symbol: &str) -> Result<Option<TrackedTicker>, EngineError> {
        Ok(self
            .tickers
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.symbol == symbol)
            .cloned())
    }

    async fn upsert_ticker(&self, ticker: &TrackedTicker) -> Result<(), EngineError> {
        let mut tickers = self.tickers.lock().unwrap();
        match tickers.iter_mut().find(|t| t.symbol == ticker.symbol) {
            Some(existing) => *existing = ticker.clone(),
            None => tickers.push(ticker.clone()),
        }
        Ok(())
    }

    async fn max_thesis_version(&self, symbol: &str) -> Result<u32, EngineError> {
        Ok(self
            .thesis_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.symbol == symbol)
            .map(|l| l.version)
            .max()
            .unwrap_or(0))
    }

    async fn append_thesis(&self, log: &ThesisLog) -> Result<(), EngineError> {
        self.thesis_logs.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn thesis_history(&self, symbol: &str) -> Result<Vec<ThesisLog>, EngineError> {
        Ok(self
            .thesis_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn append_removal(&self, log: &RemovalLog) -> Result<(), EngineError> {
        self.removal_logs.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn removal_history(&self, symbol: &str) -> Result<Vec<RemovalLog>, EngineError> {
        Ok(self
            .removal_logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.symbol == symbol)
            .cloned()
            .collect())
    }

    async fn update_scan_state(
        &self,
        symbol: &str,
        signal: ScanSignal,
        signal_since: Option<DateTime<Utc>>,
    ) -> Result<(), EngineError> {
        let mut tickers = self.tickers.lock().unwrap();
        if let Some(ticker) = tickers.iter_mut().find(|t| t.symbol == symbol) {
            ticker.last_scan_signal = signal;
            if signal_since.is_some() {
                ticker.signal_since = signal_since;
            }
        }
        Ok(())
    }

    async fn insert_scan_log(&self, _log: &ScanLog) -> Result<(), EngineError> {
        Ok(())
    }

    async fn latest_scan_logs(&self) -> Result<Vec<ScanLog>, EngineError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl PortfolioStore for MemoryStore {
    async fn list_holdings(&self) -> Result<Vec<Holding>, EngineError> {
        Ok(self.holdings.lock().unwrap().clone())
    }

    async fn get_profile(&self) -> Result<Option<InvestmentProfile>, EngineError> {
        Ok(self.profile.lock().unwrap().clone())
    }

    async fn list_snapshots(&self) -> Result<Vec<PortfolioSnapshot>, EngineError> {
        Ok(self.snapshots.lock().unwrap().clone())
    }

    async fn list_fx_watches(&self) -> Result<Vec<FxWatchConfig>, EngineError> {
        Ok(self.fx_watches.lock().unwrap().clone())
    }

    async fn mark_fx_alerted(&self, watch_id: i64, at: DateTime<Utc>) -> Result<(), EngineError> {
        let mut watches = self.fx_watches.lock().unwrap();
        if let Some(watch) = watches.iter_mut().find(|w| w.id == watch_id) {
            watch.last_alerted_at = Some(at);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), EngineError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn fixed_clock() -> std::sync::Arc<FixedClock> {
    std::sync::Arc::new(FixedClock(
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap(),
    ))
}
