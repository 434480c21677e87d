//! Serde shapes for the Yahoo endpoints this adapter touches. Only the
//! fields the engine reads are modeled; everything else is ignored.

use serde::Deserialize;
use serde_json::Value;

use observatory_core::Candle;

// ---------------------------------------------------------------------------
// v8 chart
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Deserialize)]
pub struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChartQuote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    /// Zip timestamps and quote arrays into candles, dropping null closes
    /// (market holidays and half-day gaps).
    pub fn into_candles(self) -> Vec<Candle> {
        let quote = self.indicators.quote.into_iter().next().unwrap_or_default();
        let mut candles = Vec::with_capacity(self.timestamp.len());
        for (i, ts) in self.timestamp.iter().enumerate() {
            let close = match quote.close.get(i) {
                Some(Some(c)) => *c,
                _ => continue,
            };
            let Some(timestamp) = chrono::DateTime::from_timestamp(*ts, 0) else {
                continue;
            };
            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);
            candles.push(Candle {
                timestamp,
                close,
                volume,
            });
        }
        candles
    }
}

// ---------------------------------------------------------------------------
// v8 spark (multi-symbol close series; no volume on this endpoint)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SparkEnvelope {
    pub spark: SparkBody,
}

#[derive(Debug, Deserialize)]
pub struct SparkBody {
    #[serde(default)]
    pub result: Option<Vec<SparkResult>>,
}

#[derive(Debug, Deserialize)]
pub struct SparkResult {
    pub symbol: String,
    #[serde(default)]
    pub response: Vec<ChartResult>,
}

// ---------------------------------------------------------------------------
// v10 quoteSummary
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct QuoteSummaryEnvelope {
    #[serde(rename = "quoteSummary")]
    pub quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Deserialize)]
pub struct QuoteSummaryBody {
    #[serde(default)]
    pub result: Option<Vec<QuoteSummaryResult>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteSummaryResult {
    #[serde(default, rename = "summaryDetail")]
    pub summary_detail: Option<SummaryDetail>,
    #[serde(default, rename = "assetProfile")]
    pub asset_profile: Option<AssetProfile>,
    #[serde(default, rename = "calendarEvents")]
    pub calendar_events: Option<CalendarEvents>,
    #[serde(default, rename = "topHoldings")]
    pub top_holdings: Option<TopHoldings>,
    #[serde(default)]
    pub price: Option<PriceModule>,
    #[serde(default, rename = "incomeStatementHistoryQuarterly")]
    pub income_statement_history_quarterly: Option<IncomeStatementHistory>,
}

/// Yahoo wraps every numeric field as `{"raw": 1.23, "fmt": "1.23"}`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawNumber {
    #[serde(default)]
    pub raw: Option<f64>,
}

impl RawNumber {
    pub fn value(&self) -> Option<f64> {
        self.raw
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryDetail {
    #[serde(default)]
    pub beta: Option<RawNumber>,
    #[serde(default, rename = "trailingAnnualDividendRate")]
    pub trailing_annual_dividend_rate: Option<RawNumber>,
    #[serde(default, rename = "dividendYield")]
    pub dividend_yield: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssetProfile {
    #[serde(default)]
    pub sector: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarEvents {
    #[serde(default)]
    pub earnings: Option<EarningsCalendar>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EarningsCalendar {
    #[serde(default, rename = "earningsDate")]
    pub earnings_date: Vec<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopHoldings {
    #[serde(default)]
    pub holdings: Vec<FundHolding>,
    #[serde(default, rename = "sectorWeightings")]
    pub sector_weightings: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct FundHolding {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, rename = "holdingName")]
    pub holding_name: Option<String>,
    #[serde(default, rename = "holdingPercent")]
    pub holding_percent: Option<RawNumber>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PriceModule {
    #[serde(default, rename = "quoteType")]
    pub quote_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncomeStatementHistory {
    #[serde(default, rename = "incomeStatementHistory")]
    pub income_statement_history: Vec<IncomeStatement>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncomeStatement {
    #[serde(default, rename = "totalRevenue")]
    pub total_revenue: Option<RawNumber>,
    #[serde(default, rename = "grossProfit")]
    pub gross_profit: Option<RawNumber>,
}

impl IncomeStatement {
    /// Gross margin in percent, when both lines are published.
    pub fn gross_margin_pct(&self) -> Option<f64> {
        let revenue = self.total_revenue.as_ref()?.value()?;
        let gross = self.gross_profit.as_ref()?.value()?;
        if revenue == 0.0 {
            return None;
        }
        Some(gross / revenue * 100.0)
    }
}

/// Map Yahoo's fund sector keys to display names.
pub fn fund_sector_display_name(key: &str) -> String {
    match key {
        "realestate" => "Real Estate",
        "consumer_cyclical" => "Consumer Cyclical",
        "basic_materials" => "Basic Materials",
        "consumer_defensive" => "Consumer Defensive",
        "technology" => "Technology",
        "communication_services" => "Communication Services",
        "financial_services" => "Financial Services",
        "utilities" => "Utilities",
        "industrials" => "Industrials",
        "energy" => "Energy",
        "healthcare" => "Healthcare",
        other => return other.replace('_', " "),
    }
    .to_string()
}

// ---------------------------------------------------------------------------
// CNN fear & greed
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CnnFearGreedEnvelope {
    #[serde(rename = "fear_and_greed")]
    pub fear_and_greed: CnnFearGreedBody,
}

#[derive(Debug, Deserialize)]
pub struct CnnFearGreedBody {
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_result_drops_null_closes() {
        let json = r#"{
            "chart": {"result": [{
                "timestamp": [1700000000, 1700086400, 1700172800],
                "indicators": {"quote": [{
                    "close": [100.0, null, 102.5],
                    "volume": [1000, null, 1200]
                }]}
            }]}
        }"#;
        let envelope: ChartEnvelope = serde_json::from_str(json).unwrap();
        let candles = envelope
            .chart
            .result
            .unwrap()
            .into_iter()
            .next()
            .unwrap()
            .into_candles();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close, 100.0);
        assert_eq!(candles[1].close, 102.5);
        assert_eq!(candles[1].volume, 1200.0);
    }

    #[test]
    fn spark_parses_multiple_symbols() {
        let json = r#"{
            "spark": {"result": [
                {"symbol": "AAPL", "response": [{
                    "timestamp": [1700000000],
                    "indicators": {"quote": [{"close": [190.0]}]}
                }]},
                {"symbol": "MSFT", "response": [{
                    "timestamp": [1700000000],
                    "indicators": {"quote": [{"close": [370.0]}]}
                }]}
            ]}
        }"#;
        let envelope: SparkEnvelope = serde_json::from_str(json).unwrap();
        let results = envelope.spark.result.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].symbol, "AAPL");
        // Spark has no volume arrays: candles default to zero volume.
        let candles = results[1].response.first().unwrap();
        assert_eq!(candles.indicators.quote[0].volume.len(), 0);
    }

    #[test]
    fn quote_summary_reads_beta_and_sector() {
        let json = r#"{
            "quoteSummary": {"result": [{
                "summaryDetail": {"beta": {"raw": 1.29, "fmt": "1.29"}},
                "assetProfile": {"sector": "Technology"}
            }]}
        }"#;
        let envelope: QuoteSummaryEnvelope = serde_json::from_str(json).unwrap();
        let result = envelope.quote_summary.result.unwrap().into_iter().next().unwrap();
        assert_eq!(result.summary_detail.unwrap().beta.unwrap().value(), Some(1.29));
        assert_eq!(result.asset_profile.unwrap().sector.as_deref(), Some("Technology"));
    }

    #[test]
    fn gross_margin_needs_both_lines() {
        let stmt = IncomeStatement {
            total_revenue: Some(RawNumber { raw: Some(1000.0) }),
            gross_profit: Some(RawNumber { raw: Some(420.0) }),
        };
        assert_eq!(stmt.gross_margin_pct(), Some(42.0));

        let missing = IncomeStatement {
            total_revenue: Some(RawNumber { raw: Some(1000.0) }),
            gross_profit: None,
        };
        assert_eq!(missing.gross_margin_pct(), None);
    }

    #[test]
    fn fund_sector_names_are_human_readable() {
        assert_eq!(fund_sector_display_name("realestate"), "Real Estate");
        assert_eq!(fund_sector_display_name("technology"), "Technology");
        assert_eq!(fund_sector_display_name("weird_new_key"), "weird new key");
    }

    #[test]
    fn cnn_envelope_parses_score() {
        let json = r#"{"fear_and_greed": {"score": 62.4, "rating": "greed"}}"#;
        let envelope: CnnFearGreedEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.fear_and_greed.score, 62.4);
    }
}
