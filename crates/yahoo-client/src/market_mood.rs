//! Macro mood: FX rates and history, VIX, CNN fear & greed, and the
//! composite fear & greed index with its self-calculated fallback.

use chrono::Utc;

use market_analysis::{
    classify_vix, compute_composite_fear_greed, compute_weighted_fear_greed, round2,
    score_breadth, score_junk_bond_demand, score_momentum_composite, score_price_strength,
    score_safe_haven, score_sector_rotation, score_vix_linear,
};
use observatory_core::{
    EngineError, FearGreedComponents, FearGreedLevel, FearGreedReport, FearGreedSource, FxHistory,
    FxRate, QuoteDay,
};

use crate::wire::CnnFearGreedEnvelope;
use crate::{YahooClient, FX_HISTORY_RANGE, FX_SPOT_RANGE, MOOD_HISTORY_RANGE, VIX_RANGE};

const VIX_TICKER: &str = "^VIX";

fn fx_ticker(base: &str, quote: &str) -> String {
    format!("{}{}=X", base.to_uppercase(), quote.to_uppercase())
}

fn fx_key(base: &str, quote: &str) -> String {
    format!("{}/{}", base.to_uppercase(), quote.to_uppercase())
}

impl YahooClient {
    /// Spot rate for a pair, direct quotation: units of `quote` per unit
    /// of `base`.
    pub async fn get_forex_rate(&self, base: &str, quote: &str) -> FxRate {
        let key = fx_key(base, quote);
        let result = self
            .caches
            .fx
            .get_or_fetch(&key, || async {
                match self.fetch_history(&fx_ticker(base, quote), FX_SPOT_RANGE).await {
                    Ok(candles) => Ok(FxRate {
                        base: base.to_uppercase(),
                        quote: quote.to_uppercase(),
                        rate: candles.last().map(|c| c.close),
                        error: None,
                    }),
                    Err(e) => {
                        tracing::warn!("FX rate fetch failed for {key}: {e}");
                        Ok(FxRate {
                            base: base.to_uppercase(),
                            quote: quote.to_uppercase(),
                            rate: None,
                            error: Some(e.to_string()),
                        })
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| FxRate {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
            rate: None,
            error: Some(e.to_string()),
        })
    }

    /// Daily close history for a pair (one year), oldest first.
    pub async fn get_forex_history(&self, base: &str, quote: &str) -> FxHistory {
        let key = fx_key(base, quote);
        let result = self
            .caches
            .fx_history
            .get_or_fetch(&key, || async {
                match self.fetch_history(&fx_ticker(base, quote), FX_HISTORY_RANGE).await {
                    Ok(candles) => Ok(FxHistory {
                        base: base.to_uppercase(),
                        quote: quote.to_uppercase(),
                        days: candles
                            .iter()
                            .map(|c| QuoteDay {
                                date: c.timestamp.date_naive(),
                                close: c.close,
                            })
                            .collect(),
                        error: None,
                    }),
                    Err(e) => {
                        tracing::warn!("FX history fetch failed for {key}: {e}");
                        Ok(FxHistory {
                            base: base.to_uppercase(),
                            quote: quote.to_uppercase(),
                            days: Vec::new(),
                            error: Some(e.to_string()),
                        })
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| FxHistory {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
            days: Vec::new(),
            error: Some(e.to_string()),
        })
    }

    /// Latest VIX close.
    pub async fn get_vix(&self) -> Result<Option<f64>, EngineError> {
        let candles = self.fetch_history(VIX_TICKER, VIX_RANGE).await?;
        Ok(candles.last().map(|c| round2(c.close)))
    }

    /// CNN's published fear & greed score; `None` on any failure (the
    /// composite degrades to the self-calculated fallback).
    pub async fn get_cnn_fear_greed(&self) -> Option<i32> {
        let result: Result<CnnFearGreedEnvelope, EngineError> =
            self.get_json(self.config.cnn_fear_greed_url.as_str(), &[]).await;
        match result {
            Ok(envelope) => Some(envelope.fear_and_greed.score.round() as i32),
            Err(e) => {
                tracing::warn!("CNN fear & greed fetch failed: {e}");
                None
            }
        }
    }

    async fn closes(&self, ticker: &str) -> Option<Vec<f64>> {
        match self.fetch_history(ticker, MOOD_HISTORY_RANGE).await {
            Ok(candles) => Some(candles.iter().map(|c| c.close).collect()),
            Err(e) => {
                tracing::debug!("mood history fetch failed for {ticker}: {e}");
                None
            }
        }
    }

    /// Seven-component self-calculated composite, used when CNN is down.
    async fn self_calculated_components(&self, vix: Option<f64>) -> FearGreedComponents {
        let spy = self.closes("SPY").await;
        let rsp = self.closes("RSP").await;
        let hyg = self.closes("HYG").await;
        let tlt = self.closes("TLT").await;
        let qqq = self.closes("QQQ").await;
        let xlp = self.closes("XLP").await;

        FearGreedComponents {
            vix: vix.map(score_vix_linear),
            price_strength: spy.as_deref().and_then(score_price_strength),
            momentum: spy.as_deref().and_then(score_momentum_composite),
            breadth: match (rsp.as_deref(), spy.as_deref()) {
                (Some(r), Some(s)) => score_breadth(r, s),
                _ => None,
            },
            junk_bond: match (hyg.as_deref(), tlt.as_deref()) {
                (Some(h), Some(t)) => score_junk_bond_demand(h, t),
                _ => None,
            },
            safe_haven: tlt.as_deref().and_then(score_safe_haven),
            sector_rotation: match (qqq.as_deref(), xlp.as_deref()) {
                (Some(q), Some(x)) => score_sector_rotation(q, x),
                _ => None,
            },
        }
    }

    /// Composite fear & greed index: CNN, then the self-calculated
    /// seven-component average, then the VIX alone.
    pub async fn get_fear_greed_index(&self) -> FearGreedReport {
        let result = self
            .caches
            .fear_greed
            .get_or_fetch("composite", || async {
                let vix = match self.get_vix().await {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!("VIX fetch failed: {e}");
                        None
                    }
                };

                let cnn_score = self.get_cnn_fear_greed().await;

                let (components, self_score) = if cnn_score.is_none() {
                    let components = self.self_calculated_components(vix).await;
                    let (level, score) = compute_weighted_fear_greed(&components);
                    let usable = level != FearGreedLevel::NotAvailable;
                    (Some(components), usable.then_some(score))
                } else {
                    (None, None)
                };

                let (level, score) = compute_composite_fear_greed(vix, cnn_score, self_score);
                let source = if cnn_score.is_some() {
                    FearGreedSource::Cnn
                } else if self_score.is_some() {
                    FearGreedSource::SelfCalculated
                } else if vix.is_some() {
                    FearGreedSource::VixOnly
                } else {
                    FearGreedSource::NotAvailable
                };

                Ok(FearGreedReport {
                    level,
                    score,
                    source,
                    vix,
                    cnn_score,
                    components,
                    fetched_at: Utc::now(),
                    // A fully degraded reading should retry after L1 TTL.
                    error: (source == FearGreedSource::NotAvailable)
                        .then(|| "no fear/greed source available".to_string()),
                })
            })
            .await;

        result.unwrap_or_else(|e| FearGreedReport {
            level: FearGreedLevel::NotAvailable,
            score: 50,
            source: FearGreedSource::NotAvailable,
            vix: None,
            cnn_score: None,
            components: None,
            fetched_at: Utc::now(),
            error: Some(e.to_string()),
        })
    }

    /// VIX level classification shortcut for dashboards.
    pub async fn get_vix_level(&self) -> FearGreedLevel {
        match self.get_vix().await {
            Ok(vix) => classify_vix(vix),
            Err(_) => FearGreedLevel::NotAvailable,
        }
    }
}
