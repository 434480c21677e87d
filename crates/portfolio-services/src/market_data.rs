//! Market-data seam for the portfolio services (production impl:
//! `YahooClient`; tests stub it).

use async_trait::async_trait;

use observatory_core::{
    DividendInfo, EarningsInfo, EtfHoldings, MoatReport, QuoteDay, SectorWeights,
    TechnicalSignals,
};
use yahoo_client::YahooClient;

#[async_trait]
pub trait PortfolioMarketData: Send + Sync {
    /// Direct quotation: units of `quote` currency per unit of `base`.
    async fn fx_rate(&self, base: &str, quote: &str) -> Option<f64>;
    async fn fx_history(&self, base: &str, quote: &str) -> Vec<QuoteDay>;
    async fn signals(&self, ticker: &str) -> TechnicalSignals;
    async fn beta(&self, ticker: &str) -> Option<f64>;
    async fn sector(&self, ticker: &str) -> Option<String>;
    async fn etf_holdings(&self, ticker: &str) -> EtfHoldings;
    async fn etf_sector_weights(&self, ticker: &str) -> SectorWeights;
    async fn dividend(&self, ticker: &str) -> DividendInfo;
    async fn earnings(&self, ticker: &str) -> EarningsInfo;
    async fn moat(&self, ticker: &str) -> MoatReport;
    async fn detect_is_etf(&self, ticker: &str) -> bool;
}

#[async_trait]
impl PortfolioMarketData for YahooClient {
    async fn fx_rate(&self, base: &str, quote: &str) -> Option<f64> {
        self.get_forex_rate(base, quote).await.rate
    }

    async fn fx_history(&self, base: &str, quote: &str) -> Vec<QuoteDay> {
        self.get_forex_history(base, quote).await.days
    }

    async fn signals(&self, ticker: &str) -> TechnicalSignals {
        self.get_technical_signals(ticker).await
    }

    async fn beta(&self, ticker: &str) -> Option<f64> {
        match self.get_stock_beta(ticker).await {
            Ok(beta) => beta,
            Err(e) => {
                tracing::warn!("beta fetch failed for {ticker}: {e}");
                None
            }
        }
    }

    async fn sector(&self, ticker: &str) -> Option<String> {
        self.get_ticker_sector(ticker).await
    }

    async fn etf_holdings(&self, ticker: &str) -> EtfHoldings {
        self.get_etf_top_holdings(ticker).await
    }

    async fn etf_sector_weights(&self, ticker: &str) -> SectorWeights {
        self.get_etf_sector_weights(ticker).await
    }

    async fn dividend(&self, ticker: &str) -> DividendInfo {
        self.get_dividend_info(ticker).await
    }

    async fn earnings(&self, ticker: &str) -> EarningsInfo {
        self.get_earnings_date(ticker).await
    }

    async fn moat(&self, ticker: &str) -> MoatReport {
        self.analyze_moat_trend(ticker).await
    }

    async fn detect_is_etf(&self, ticker: &str) -> bool {
        YahooClient::detect_is_etf(self, ticker).await
    }
}
