//! Portfolio performance over the daily snapshot series.

use std::sync::Arc;

use serde::Serialize;

use market_analysis::compute_twr;
use observatory_core::{store::PortfolioStore, EngineError};

/// Time-weighted return summary for the digest.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummary {
    /// Chain-linked TWR in percent; `None` with fewer than two snapshots.
    pub twr_pct: Option<f64>,
    pub snapshot_count: usize,
    pub first_value: Option<f64>,
    pub latest_value: Option<f64>,
}

pub struct PerformanceService<S> {
    store: Arc<S>,
}

impl<S: PortfolioStore + Send + Sync> PerformanceService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// TWR over the full snapshot history. Chaining is insensitive to
    /// snapshot gaps (holidays, missed cron runs).
    pub async fn summary(&self) -> Result<PerformanceSummary, EngineError> {
        let snapshots = self.store.list_snapshots().await?;
        let values: Vec<f64> = snapshots.iter().map(|s| s.total_value).collect();

        Ok(PerformanceSummary {
            twr_pct: compute_twr(&values),
            snapshot_count: values.len(),
            first_value: values.first().copied(),
            latest_value: values.last().copied(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MemoryStore;
    use chrono::NaiveDate;
    use observatory_core::PortfolioSnapshot;
    use std::collections::HashMap;

    fn snapshot(date: &str, total_value: f64) -> PortfolioSnapshot {
        PortfolioSnapshot {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            total_value,
            category_values: HashMap::new(),
            currency: "USD".to_string(),
            benchmark_values: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn twr_over_snapshot_history() {
        let store = Arc::new(MemoryStore::default());
        *store.snapshots.lock().unwrap() = vec![
            snapshot("2025-01-01", 100_000.0),
            snapshot("2025-06-01", 110_000.0),
            snapshot("2025-12-31", 121_000.0),
        ];

        let summary = PerformanceService::new(store).summary().await.unwrap();
        assert_eq!(summary.twr_pct, Some(21.0));
        assert_eq!(summary.snapshot_count, 3);
        assert_eq!(summary.latest_value, Some(121_000.0));
    }

    #[tokio::test]
    async fn single_snapshot_has_no_twr() {
        let store = Arc::new(MemoryStore::default());
        *store.snapshots.lock().unwrap() = vec![snapshot("2025-01-01", 100_000.0)];

        let summary = PerformanceService::new(store).summary().await.unwrap();
        assert_eq!(summary.twr_pct, None);
        assert_eq!(summary.snapshot_count, 1);
    }
}
