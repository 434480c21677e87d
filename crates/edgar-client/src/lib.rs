//! SEC EDGAR adapter for 13F-HR institutional filings.
//!
//! EDGAR policy: a User-Agent with a real contact email, and at most
//! 10 requests per second. Submissions indexes cache in both tiers;
//! infotable XML caches on disk only (a filed report never changes).

mod cusip;
mod filings;
mod infotable;
pub mod wire;

pub use cusip::map_cusip_to_ticker;
pub use filings::EdgarFiling;
pub use infotable::{parse_13f_xml, RawHolding13F};
pub use wire::SubmissionsIndex;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};

use cache_fabric::{DiskCache, Inflight, Namespace, RateLimiter, RetryPolicy};
use observatory_core::EngineError;

const SEC_DATA_BASE_URL: &str = "https://data.sec.gov";
const SEC_ARCHIVES_BASE_URL: &str = "https://www.sec.gov";

const SUBMISSIONS_CACHE: (usize, u64, u64) = (100, 21_600, 86_400);
const INFOTABLE_DISK_TTL: Duration = Duration::from_secs(30 * 86_400);

/// EDGAR client settings.
#[derive(Debug, Clone)]
pub struct EdgarClientConfig {
    /// Must carry a contact email per SEC fair-access policy.
    pub user_agent: String,
    pub calls_per_second: f64,
    pub request_timeout: Duration,
}

impl Default for EdgarClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "portfolio-observatory (admin@example.com)".to_string(),
            calls_per_second: 8.0,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl EdgarClientConfig {
    /// `SEC_EDGAR_USER_AGENT` overrides the placeholder; set it to a real
    /// contact address in production.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            user_agent: std::env::var("SEC_EDGAR_USER_AGENT").unwrap_or(defaults.user_agent),
            calls_per_second: std::env::var("SEC_EDGAR_RATE_LIMIT_CPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.calls_per_second),
            request_timeout: defaults.request_timeout,
        }
    }
}

/// The 13F adapter.
pub struct EdgarClient {
    pub(crate) http: reqwest::Client,
    pub(crate) limiter: RateLimiter,
    pub(crate) retry: RetryPolicy,
    pub(crate) submissions: Namespace<SubmissionsIndex>,
    pub(crate) disk: Arc<DiskCache>,
}

impl EdgarClient {
    pub fn new(disk: Arc<DiskCache>, config: EdgarClientConfig) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip, deflate"));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let inflight = Arc::new(Inflight::new());
        let submissions = Namespace::new(
            "guru_filing_submissions",
            SUBMISSIONS_CACHE.0,
            Duration::from_secs(SUBMISSIONS_CACHE.1),
            disk.clone(),
            Duration::from_secs(SUBMISSIONS_CACHE.2),
            inflight,
            None,
        );

        Self {
            http,
            limiter: RateLimiter::new(config.calls_per_second),
            retry: RetryPolicy::default(),
            submissions,
            disk,
        }
    }

    pub(crate) fn submissions_url(&self, cik: &str) -> String {
        format!("{SEC_DATA_BASE_URL}/submissions/CIK{cik}.json")
    }

    /// Filing documents are served by www.sec.gov, not data.sec.gov.
    pub(crate) fn archive_base(&self, cik: &str, accession_path: &str) -> String {
        format!(
            "{SEC_ARCHIVES_BASE_URL}/Archives/edgar/data/{}/{}",
            cik.trim_start_matches('0'),
            accession_path
        )
    }

    pub(crate) fn infotable_disk_ttl(&self) -> Duration {
        INFOTABLE_DISK_TTL
    }

    pub(crate) async fn http_get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<T, EngineError> {
        self.retry
            .run(|| async {
                self.limiter.wait().await;
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| EngineError::Transport(e.to_string()))?;

                let status = response.status();
                if status.is_client_error() && status.as_u16() != 429 {
                    return Err(EngineError::NotFound(format!("HTTP {status} from {url}")));
                }
                if !status.is_success() {
                    return Err(EngineError::Transport(format!("HTTP {status} from {url}")));
                }
                response
                    .json::<T>()
                    .await
                    .map_err(|e| EngineError::Parse(e.to_string()))
            })
            .await
    }

    pub(crate) async fn http_get_text(&self, url: &str) -> Result<String, EngineError> {
        self.retry
            .run(|| async {
                self.limiter.wait().await;
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| EngineError::Transport(e.to_string()))?;

                let status = response.status();
                if status.is_client_error() && status.as_u16() != 429 {
                    return Err(EngineError::NotFound(format!("HTTP {status} from {url}")));
                }
                if !status.is_success() {
                    return Err(EngineError::Transport(format!("HTTP {status} from {url}")));
                }
                response
                    .text()
                    .await
                    .map_err(|e| EngineError::Transport(e.to_string()))
            })
            .await
    }
}
