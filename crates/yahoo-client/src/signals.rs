//! History fetch, technical-signal computation, bias distribution and the
//! batch pre-warm entry points.

use std::collections::HashMap;

use chrono::Utc;

use market_analysis::constants::{
    MA200_WINDOW, MA60_WINDOW, ROGUE_WAVE_MIN_HISTORY_DAYS, RSI_PERIOD,
};
use market_analysis::{
    compute_bias, compute_daily_change_pct, compute_moving_average, compute_rsi,
    compute_volume_ratio, round2,
};
use observatory_core::{BiasDistribution, Candle, EngineError, TechnicalSignals};

use crate::wire::{ChartEnvelope, SparkEnvelope};
use crate::{
    bounded_for_each, HistoryMap, YahooClient, BIAS_DIST_HISTORY_RANGE, PREWARM_CONCURRENCY,
    SIGNALS_HISTORY_RANGE,
};

/// Derive the full signal bundle from a candle series. Pure; shared by the
/// per-ticker fetch and the batch priming path.
pub fn signals_from_candles(ticker: &str, candles: &[Candle]) -> TechnicalSignals {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    let price = closes.last().copied();
    let daily_change_pct = match (closes.len().checked_sub(2), price) {
        (Some(prev_idx), Some(current)) => compute_daily_change_pct(current, closes[prev_idx]),
        _ => None,
    };

    let ma60 = compute_moving_average(&closes, MA60_WINDOW);
    let ma200 = compute_moving_average(&closes, MA200_WINDOW);
    let bias = match (price, ma60) {
        (Some(p), Some(ma)) => compute_bias(p, ma),
        _ => None,
    };
    let bias_200 = match (price, ma200) {
        (Some(p), Some(ma)) => compute_bias(p, ma),
        _ => None,
    };

    TechnicalSignals {
        ticker: ticker.to_string(),
        price: price.map(round2),
        daily_change_pct,
        rsi: compute_rsi(&closes, RSI_PERIOD),
        ma60,
        ma200,
        bias,
        bias_200,
        volume_ratio: compute_volume_ratio(&volumes),
        data_points: candles.len(),
        error: None,
    }
}

/// Rolling MA60 bias for every eligible day of a series, unsorted.
fn rolling_biases(closes: &[f64]) -> Vec<f64> {
    if closes.len() < MA60_WINDOW {
        return Vec::new();
    }
    let mut biases = Vec::with_capacity(closes.len() - MA60_WINDOW + 1);
    let mut window_sum: f64 = closes[..MA60_WINDOW].iter().sum();
    for i in MA60_WINDOW..=closes.len() {
        let ma = window_sum / MA60_WINDOW as f64;
        let close = closes[i - 1];
        if ma != 0.0 {
            biases.push(round2((close - ma) / ma * 100.0));
        }
        if i < closes.len() {
            window_sum += closes[i] - closes[i - MA60_WINDOW];
        }
    }
    biases
}

impl YahooClient {
    /// Raw daily history for one symbol. An empty series is wrapped as a
    /// transport error: the provider swallows transient failures and hands
    /// back an empty chart instead of failing, so emptiness must retry.
    pub async fn fetch_history(
        &self,
        ticker: &str,
        range: &str,
    ) -> Result<Vec<Candle>, EngineError> {
        self.retry
            .run(|| async {
                let envelope: ChartEnvelope = self
                    .get_json(
                        &self.chart_url(ticker),
                        &[
                            ("range", range.to_string()),
                            ("interval", "1d".to_string()),
                            ("events", "div,split".to_string()),
                        ],
                    )
                    .await?;

                let candles = envelope
                    .chart
                    .result
                    .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
                    .map(|r| r.into_candles())
                    .unwrap_or_default();

                if candles.is_empty() {
                    return Err(EngineError::Transport(format!(
                        "{ticker}: empty history, possibly a swallowed upstream failure"
                    )));
                }
                Ok(candles)
            })
            .await
    }

    /// Technical signal bundle, through the two-tier cache.
    pub async fn get_technical_signals(&self, ticker: &str) -> TechnicalSignals {
        let result = self
            .caches
            .signals
            .get_or_fetch(ticker, || async {
                match self.fetch_history(ticker, SIGNALS_HISTORY_RANGE).await {
                    Ok(candles) => Ok(signals_from_candles(ticker, &candles)),
                    Err(e) => {
                        tracing::warn!("signals fetch failed for {ticker}: {e}");
                        Ok(TechnicalSignals::degraded(ticker, e.to_string()))
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| TechnicalSignals::degraded(ticker, e.to_string()))
    }

    /// Historical MA60-bias distribution (3y window) for rogue-wave
    /// detection, through the two-tier cache. A ticker with under 200
    /// eligible days yields an empty, durable distribution.
    pub async fn get_bias_distribution(&self, ticker: &str) -> BiasDistribution {
        let result = self
            .caches
            .bias_dist
            .get_or_fetch(ticker, || async {
                match self.fetch_history(ticker, BIAS_DIST_HISTORY_RANGE).await {
                    Ok(candles) => Ok(Self::bias_distribution_from_candles(ticker, &candles)),
                    Err(e) => {
                        tracing::warn!("bias distribution fetch failed for {ticker}: {e}");
                        Ok(BiasDistribution {
                            ticker: ticker.to_string(),
                            historical_biases: Vec::new(),
                            count: 0,
                            p95: None,
                            volume_ratio: None,
                            fetched_at: Utc::now(),
                            error: Some(e.to_string()),
                        })
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| BiasDistribution {
            ticker: ticker.to_string(),
            historical_biases: Vec::new(),
            count: 0,
            p95: None,
            volume_ratio: None,
            fetched_at: Utc::now(),
            error: Some(e.to_string()),
        })
    }

    fn bias_distribution_from_candles(ticker: &str, candles: &[Candle]) -> BiasDistribution {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let mut biases = rolling_biases(&closes);
        if biases.len() < ROGUE_WAVE_MIN_HISTORY_DAYS {
            // Legitimate absence: too young for a meaningful distribution.
            return BiasDistribution {
                ticker: ticker.to_string(),
                historical_biases: Vec::new(),
                count: 0,
                p95: None,
                volume_ratio: compute_volume_ratio(&volumes),
                fetched_at: Utc::now(),
                error: None,
            };
        }

        biases.sort_by(f64::total_cmp);
        let p95_index = ((biases.len() - 1) as f64 * 0.95).round() as usize;
        let p95 = biases.get(p95_index).copied();

        BiasDistribution {
            ticker: ticker.to_string(),
            count: biases.len(),
            p95,
            volume_ratio: compute_volume_ratio(&volumes),
            historical_biases: biases,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// One multi-symbol spark request for the whole watchlist. Spark
    /// carries closes only; symbols missing from the response are simply
    /// absent from the map (the caller falls back per ticker).
    pub async fn batch_download_history(
        &self,
        tickers: &[String],
    ) -> Result<HistoryMap, EngineError> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let symbols = tickers.join(",");
        let envelope: SparkEnvelope = self
            .retry
            .run(|| async {
                self.get_json(
                    self.spark_url(),
                    &[
                        ("symbols", symbols.clone()),
                        ("range", SIGNALS_HISTORY_RANGE.to_string()),
                        ("interval", "1d".to_string()),
                    ],
                )
                .await
            })
            .await?;

        let mut map = HashMap::new();
        for result in envelope.spark.result.unwrap_or_default() {
            let symbol = result.symbol.clone();
            if let Some(chart) = result.response.into_iter().next() {
                let candles = chart.into_candles();
                if !candles.is_empty() {
                    map.insert(symbol, candles);
                }
            }
        }
        tracing::info!("batch history downloaded for {}/{} symbols", map.len(), tickers.len());
        Ok(map)
    }

    /// Split a batch history map per ticker and prime the signals cache
    /// (both tiers). Returns how many tickers were primed.
    pub fn prime_signals_cache_batch(&self, history: &HistoryMap) -> usize {
        let mut primed = 0;
        for (ticker, candles) in history {
            let signals = signals_from_candles(ticker, candles);
            self.caches.signals.prime(ticker, &signals);
            primed += 1;
        }
        primed
    }

    /// Per-ticker signal warm-up for symbols the batch download missed.
    pub async fn prewarm_signals_batch(self: std::sync::Arc<Self>, tickers: Vec<String>) {
        let client = self.clone();
        bounded_for_each(tickers, PREWARM_CONCURRENCY, move |ticker| {
            let client = client.clone();
            async move {
                let _ = client.get_technical_signals(&ticker).await;
            }
        })
        .await;
    }

    /// Moat warm-up. Uses a wider pool than the scan default: the rate
    /// limiter is the true bottleneck, and idle workers pick up slots the
    /// moment it releases them.
    pub async fn prewarm_moat_batch(self: std::sync::Arc<Self>, tickers: Vec<String>, workers: usize) {
        let client = self.clone();
        bounded_for_each(tickers, workers, move |ticker| {
            let client = client.clone();
            async move {
                let _ = client.analyze_moat_trend(&ticker).await;
            }
        })
        .await;
    }

    pub async fn prewarm_etf_holdings_batch(self: std::sync::Arc<Self>, tickers: Vec<String>) {
        let client = self.clone();
        bounded_for_each(tickers, PREWARM_CONCURRENCY, move |ticker| {
            let client = client.clone();
            async move {
                let _ = client.get_etf_top_holdings(&ticker).await;
            }
        })
        .await;
    }

    pub async fn prewarm_etf_sector_weights_batch(self: std::sync::Arc<Self>, tickers: Vec<String>) {
        let client = self.clone();
        bounded_for_each(tickers, PREWARM_CONCURRENCY, move |ticker| {
            let client = client.clone();
            async move {
                let _ = client.get_etf_sector_weights(&ticker).await;
            }
        })
        .await;
    }

    pub async fn prewarm_beta_batch(self: std::sync::Arc<Self>, tickers: Vec<String>) {
        let client = self.clone();
        bounded_for_each(tickers, PREWARM_CONCURRENCY, move |ticker| {
            let client = client.clone();
            async move {
                let _ = client.get_stock_beta(&ticker).await;
            }
        })
        .await;
    }

    pub async fn prewarm_sectors_batch(self: std::sync::Arc<Self>, tickers: Vec<String>) {
        let client = self.clone();
        bounded_for_each(tickers, PREWARM_CONCURRENCY, move |ticker| {
            let client = client.clone();
            async move {
                let _ = client.get_ticker_sector(&ticker).await;
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candles(closes: &[f64], volume: f64) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Candle {
                timestamp: chrono::Utc
                    .timestamp_opt(1_600_000_000 + i as i64 * 86_400, 0)
                    .unwrap(),
                close: *c,
                volume,
            })
            .collect()
    }

    #[test]
    fn signals_from_short_series_leave_slow_fields_empty() {
        let series = candles(&[100.0, 101.0, 102.0], 1000.0);
        let signals = signals_from_candles("AAPL", &series);
        assert_eq!(signals.price, Some(102.0));
        assert!(signals.rsi.is_none());
        assert!(signals.ma60.is_none());
        assert!(signals.bias.is_none());
        assert!(signals.volume_ratio.is_none());
        assert_eq!(signals.data_points, 3);
        assert!(!signals.is_error());
    }

    #[test]
    fn signals_from_long_series_fill_everything() {
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + (i % 7) as f64).collect();
        let signals = signals_from_candles("AAPL", &candles(&closes, 1_000_000.0));
        assert!(signals.rsi.is_some());
        assert!(signals.ma60.is_some());
        assert!(signals.ma200.is_some());
        assert!(signals.bias.is_some());
        assert!(signals.bias_200.is_some());
        assert_eq!(signals.volume_ratio, Some(1.0));
        assert!(signals.daily_change_pct.is_some());
    }

    #[test]
    fn zero_volume_batches_leave_volume_ratio_empty() {
        // Spark-primed candles carry zero volume: the ratio must not
        // pretend to know better.
        let closes: Vec<f64> = (0..250).map(|i| 100.0 + (i % 7) as f64).collect();
        let signals = signals_from_candles("AAPL", &candles(&closes, 0.0));
        assert_eq!(signals.volume_ratio, None);
    }

    #[test]
    fn rolling_biases_need_a_full_ma_window() {
        assert!(rolling_biases(&[100.0; 59]).is_empty());
        let biases = rolling_biases(&vec![100.0; 120]);
        assert_eq!(biases.len(), 61);
        assert!(biases.iter().all(|b| *b == 0.0));
    }

    #[test]
    fn bias_distribution_is_sorted_with_p95() {
        // 400 days trending up: plenty of eligible rows, rising bias tail.
        let closes: Vec<f64> = (0..400).map(|i| 100.0 + i as f64 * 0.5).collect();
        let dist =
            YahooClient::bias_distribution_from_candles("NVDA", &candles(&closes, 1_000_000.0));
        assert!(dist.count >= ROGUE_WAVE_MIN_HISTORY_DAYS);
        assert_eq!(dist.count, dist.historical_biases.len());
        assert!(dist
            .historical_biases
            .windows(2)
            .all(|pair| pair[0] <= pair[1]));
        let p95 = dist.p95.unwrap();
        let above = dist.historical_biases.iter().filter(|b| **b > p95).count();
        assert!(above as f64 / dist.count as f64 <= 0.06);
        assert!(!dist.is_error());
    }

    #[test]
    fn bias_distribution_too_young_is_empty_but_not_an_error() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let dist =
            YahooClient::bias_distribution_from_candles("IPO", &candles(&closes, 1_000.0));
        assert!(!dist.has_data());
        assert!(!dist.is_error());
        assert_eq!(dist.p95, None);
    }
}
