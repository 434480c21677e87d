//! Fundamental accessors: moat trend, dividends, earnings calendar,
//! sector, ETF composition and beta.

use chrono::DateTime;

use market_analysis::{determine_moat_status, round2};
use observatory_core::{
    BetaValue, DividendInfo, EarningsInfo, EngineError, EtfConstituent, EtfHoldings, MoatReport,
    SectorInfo, SectorWeight, SectorWeights,
};

use crate::wire::{fund_sector_display_name, QuoteSummaryEnvelope, QuoteSummaryResult};
use crate::YahooClient;

impl YahooClient {
    pub(crate) async fn fetch_quote_summary(
        &self,
        ticker: &str,
        modules: &str,
    ) -> Result<QuoteSummaryResult, EngineError> {
        self.retry
            .run(|| async {
                let envelope: QuoteSummaryEnvelope = self
                    .get_json(
                        &self.quote_summary_url(ticker),
                        &[("modules", modules.to_string())],
                    )
                    .await?;
                envelope
                    .quote_summary
                    .result
                    .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
                    .ok_or_else(|| {
                        EngineError::NotFound(format!("{ticker}: no quoteSummary result"))
                    })
            })
            .await
    }

    /// Gross-margin trend. Compares the latest published quarter against
    /// the same quarter a year back when five quarters are available,
    /// otherwise the oldest quarter on file.
    pub async fn analyze_moat_trend(&self, ticker: &str) -> MoatReport {
        let result = self
            .caches
            .moat
            .get_or_fetch(ticker, || async {
                match self
                    .fetch_quote_summary(ticker, "incomeStatementHistoryQuarterly")
                    .await
                {
                    Ok(summary) => Ok(Self::moat_from_summary(ticker, &summary)),
                    Err(e) => {
                        tracing::warn!("moat fetch failed for {ticker}: {e}");
                        Ok(MoatReport::degraded(ticker, e.to_string()))
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| MoatReport::degraded(ticker, e.to_string()))
    }

    fn moat_from_summary(ticker: &str, summary: &QuoteSummaryResult) -> MoatReport {
        let statements = summary
            .income_statement_history_quarterly
            .as_ref()
            .map(|h| h.income_statement_history.as_slice())
            .unwrap_or_default();

        let margins: Vec<f64> = statements
            .iter()
            .filter_map(|s| s.gross_margin_pct())
            .collect();

        if margins.len() < 2 {
            return MoatReport::not_available(ticker);
        }

        let current = margins[0];
        let previous = margins[margins.len().min(5) - 1];
        let (status, change) = determine_moat_status(Some(current), Some(previous));

        MoatReport {
            ticker: ticker.to_string(),
            status,
            margin_change: change,
            current_margin: Some(round2(current)),
            previous_margin: Some(round2(previous)),
            error: None,
        }
    }

    /// Dividend summary. A non-payer legitimately reports 0.0; a `None`
    /// rate marks a failed upstream call and stays out of L2.
    pub async fn get_dividend_info(&self, ticker: &str) -> DividendInfo {
        let result = self
            .caches
            .dividend
            .get_or_fetch(ticker, || async {
                match self.fetch_quote_summary(ticker, "summaryDetail").await {
                    Ok(summary) => {
                        let detail = summary.summary_detail.unwrap_or_default();
                        let rate = detail
                            .trailing_annual_dividend_rate
                            .and_then(|r| r.value())
                            .unwrap_or(0.0);
                        let yield_pct = detail
                            .dividend_yield
                            .and_then(|r| r.value())
                            .map(|y| round2(y * 100.0));
                        Ok(DividendInfo {
                            ticker: ticker.to_string(),
                            ytd_dividend_per_share: Some(round2(rate)),
                            dividend_yield_pct: yield_pct,
                            is_dividend_payer: rate > 0.0,
                        })
                    }
                    Err(e) => {
                        tracing::warn!("dividend fetch failed for {ticker}: {e}");
                        Ok(DividendInfo {
                            ticker: ticker.to_string(),
                            ytd_dividend_per_share: None,
                            dividend_yield_pct: None,
                            is_dividend_payer: false,
                        })
                    }
                }
            })
            .await;

        result.unwrap_or_else(|_| DividendInfo {
            ticker: ticker.to_string(),
            ytd_dividend_per_share: None,
            dividend_yield_pct: None,
            is_dividend_payer: false,
        })
    }

    /// Next scheduled earnings date, when published.
    pub async fn get_earnings_date(&self, ticker: &str) -> EarningsInfo {
        let result = self
            .caches
            .earnings
            .get_or_fetch(ticker, || async {
                match self.fetch_quote_summary(ticker, "calendarEvents").await {
                    Ok(summary) => {
                        let next = summary
                            .calendar_events
                            .and_then(|c| c.earnings)
                            .and_then(|e| e.earnings_date.first().and_then(|d| d.value()))
                            .and_then(|epoch| DateTime::from_timestamp(epoch as i64, 0))
                            .map(|dt| dt.date_naive());
                        Ok(EarningsInfo {
                            ticker: ticker.to_string(),
                            next_earnings_date: next,
                            error: None,
                        })
                    }
                    Err(e) => {
                        tracing::warn!("earnings fetch failed for {ticker}: {e}");
                        Ok(EarningsInfo {
                            ticker: ticker.to_string(),
                            next_earnings_date: None,
                            error: Some(e.to_string()),
                        })
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| EarningsInfo {
            ticker: ticker.to_string(),
            next_earnings_date: None,
            error: Some(e.to_string()),
        })
    }

    /// GICS sector. Absence (funds, some foreign listings) is a durable
    /// outcome and caches to L2.
    pub async fn get_ticker_sector(&self, ticker: &str) -> Option<String> {
        let result = self
            .caches
            .sector
            .get_or_fetch(ticker, || async {
                match self.fetch_quote_summary(ticker, "assetProfile").await {
                    Ok(summary) => Ok(SectorInfo {
                        ticker: ticker.to_string(),
                        sector: summary.asset_profile.and_then(|p| p.sector),
                        error: None,
                    }),
                    Err(e) => {
                        tracing::debug!("sector fetch failed for {ticker}: {e}");
                        Ok(SectorInfo {
                            ticker: ticker.to_string(),
                            sector: None,
                            error: Some(e.to_string()),
                        })
                    }
                }
            })
            .await;

        result.ok().and_then(|info| info.sector)
    }

    /// Published top holdings of an ETF.
    pub async fn get_etf_top_holdings(&self, ticker: &str) -> EtfHoldings {
        let result = self
            .caches
            .etf_holdings
            .get_or_fetch(ticker, || async {
                match self.fetch_quote_summary(ticker, "topHoldings").await {
                    Ok(summary) => {
                        let holdings = summary
                            .top_holdings
                            .map(|top| {
                                top.holdings
                                    .into_iter()
                                    .filter_map(|h| {
                                        Some(EtfConstituent {
                                            symbol: h.symbol?,
                                            name: h.holding_name.unwrap_or_default(),
                                            weight: h.holding_percent.and_then(|p| p.value())?,
                                        })
                                    })
                                    .collect()
                            })
                            .unwrap_or_default();
                        Ok(EtfHoldings {
                            ticker: ticker.to_string(),
                            holdings,
                            error: None,
                        })
                    }
                    Err(e) => {
                        tracing::warn!("ETF holdings fetch failed for {ticker}: {e}");
                        Ok(EtfHoldings {
                            ticker: ticker.to_string(),
                            holdings: Vec::new(),
                            error: Some(e.to_string()),
                        })
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| EtfHoldings {
            ticker: ticker.to_string(),
            holdings: Vec::new(),
            error: Some(e.to_string()),
        })
    }

    /// Published sector weighting of an ETF.
    pub async fn get_etf_sector_weights(&self, ticker: &str) -> SectorWeights {
        let result = self
            .caches
            .etf_sector_weights
            .get_or_fetch(ticker, || async {
                match self.fetch_quote_summary(ticker, "topHoldings").await {
                    Ok(summary) => {
                        let mut weights = Vec::new();
                        for entry in summary
                            .top_holdings
                            .map(|t| t.sector_weightings)
                            .unwrap_or_default()
                        {
                            // Each entry is a single-key object like
                            // {"technology": {"raw": 0.31}}.
                            let Some(map) = entry.as_object() else { continue };
                            for (key, value) in map {
                                if let Some(raw) = value.get("raw").and_then(|v| v.as_f64()) {
                                    weights.push(SectorWeight {
                                        sector: fund_sector_display_name(key),
                                        weight: raw,
                                    });
                                }
                            }
                        }
                        Ok(SectorWeights {
                            ticker: ticker.to_string(),
                            weights,
                            error: None,
                        })
                    }
                    Err(e) => {
                        tracing::warn!("ETF sector weights fetch failed for {ticker}: {e}");
                        Ok(SectorWeights {
                            ticker: ticker.to_string(),
                            weights: Vec::new(),
                            error: Some(e.to_string()),
                        })
                    }
                }
            })
            .await;

        result.unwrap_or_else(|e| SectorWeights {
            ticker: ticker.to_string(),
            weights: Vec::new(),
            error: Some(e.to_string()),
        })
    }

    /// Beta with sentinel caching: a provider without a beta for this
    /// symbol is remembered as `Absent` so the upstream call is not
    /// repeated, and the public shape is still `Option<f64>`.
    pub async fn get_stock_beta(&self, ticker: &str) -> Result<Option<f64>, EngineError> {
        let value = self
            .caches
            .beta
            .get_or_fetch(ticker, || async {
                let summary = self.fetch_quote_summary(ticker, "summaryDetail").await?;
                let beta = summary
                    .summary_detail
                    .and_then(|d| d.beta)
                    .and_then(|b| b.value());
                Ok(match beta {
                    Some(b) => BetaValue::Known(round2(b)),
                    None => BetaValue::Absent,
                })
            })
            .await?;
        Ok(value.value())
    }

    /// Quote-type probe; false on any failure. Not cached: it runs once
    /// per watchlist add/import.
    pub async fn detect_is_etf(&self, ticker: &str) -> bool {
        match self.fetch_quote_summary(ticker, "price").await {
            Ok(summary) => summary
                .price
                .and_then(|p| p.quote_type)
                .map(|t| t.eq_ignore_ascii_case("ETF"))
                .unwrap_or(false),
            Err(e) => {
                tracing::debug!("quote type probe failed for {ticker}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use observatory_core::MoatStatus;

    fn summary_with_margins(margins: &[(f64, f64)]) -> QuoteSummaryResult {
        use crate::wire::{IncomeStatement, IncomeStatementHistory, RawNumber};
        QuoteSummaryResult {
            income_statement_history_quarterly: Some(IncomeStatementHistory {
                income_statement_history: margins
                    .iter()
                    .map(|(revenue, gross)| IncomeStatement {
                        total_revenue: Some(RawNumber { raw: Some(*revenue) }),
                        gross_profit: Some(RawNumber { raw: Some(*gross) }),
                    })
                    .collect(),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn moat_stable_on_flat_margins() {
        let summary = summary_with_margins(&[
            (1000.0, 420.0),
            (1000.0, 418.0),
            (1000.0, 425.0),
            (1000.0, 419.0),
            (1000.0, 421.0),
        ]);
        let report = YahooClient::moat_from_summary("AAPL", &summary);
        assert_eq!(report.status, MoatStatus::Stable);
        assert_eq!(report.current_margin, Some(42.0));
        assert_eq!(report.previous_margin, Some(42.1));
    }

    #[test]
    fn moat_deteriorating_on_margin_drop() {
        // 42% now vs 45% a year ago: -3pp, beyond the -2pp threshold.
        let summary = summary_with_margins(&[
            (1000.0, 420.0),
            (1000.0, 430.0),
            (1000.0, 440.0),
            (1000.0, 445.0),
            (1000.0, 450.0),
        ]);
        let report = YahooClient::moat_from_summary("INTC", &summary);
        assert_eq!(report.status, MoatStatus::Deteriorating);
        assert_eq!(report.margin_change, -3.0);
    }

    #[test]
    fn moat_not_available_without_two_quarters() {
        let report =
            YahooClient::moat_from_summary("IPO", &summary_with_margins(&[(1000.0, 420.0)]));
        assert_eq!(report.status, MoatStatus::NotAvailable);
        assert!(report.current_margin.is_none());
        assert!(!report.is_error());
    }

    #[test]
    fn moat_uses_oldest_quarter_when_fewer_than_five() {
        let summary = summary_with_margins(&[(1000.0, 400.0), (1000.0, 430.0)]);
        let report = YahooClient::moat_from_summary("NEW", &summary);
        assert_eq!(report.previous_margin, Some(43.0));
        assert_eq!(report.status, MoatStatus::Deteriorating);
    }
}
