//! 13F filing sync: quarter-by-quarter diff classification with
//! idempotent per-accession persistence.
//!
//! The one ordering rule that matters: the previous-quarter snapshot is
//! captured BEFORE the new filing is saved. Once the new filing lands it
//! becomes "latest", and a snapshot taken after that point would diff the
//! quarter against itself.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

use edgar_client::{map_cusip_to_ticker, EdgarClient, EdgarFiling, RawHolding13F};
use market_analysis::{
    classify_holding_change, compute_change_pct, compute_holding_weight,
    compute_resonance_matches,
};
use observatory_core::{
    Clock, EngineError, Guru, GuruFiling, GuruHolding, HoldingAction, store::FilingStore,
};
use yahoo_client::YahooClient;

/// How many filings one backfill pulls from the submissions index.
pub const BACKFILL_FILING_COUNT: usize = 30;
/// Default backfill window in years.
pub const BACKFILL_YEARS: i64 = 5;
/// Top-N positions included in a sync summary.
pub const TOP_HOLDINGS_COUNT: usize = 10;

/// EDGAR access seam, stubbed in tests.
#[async_trait]
pub trait FilingFeed: Send + Sync {
    async fn latest_13f_filings(&self, cik: &str, count: usize) -> Vec<EdgarFiling>;
    async fn filing_detail(&self, accession_number: &str, cik: &str) -> Vec<RawHolding13F>;
}

#[async_trait]
impl FilingFeed for EdgarClient {
    async fn latest_13f_filings(&self, cik: &str, count: usize) -> Vec<EdgarFiling> {
        self.get_latest_13f_filings(cik, count).await
    }

    async fn filing_detail(&self, accession_number: &str, cik: &str) -> Vec<RawHolding13F> {
        self.fetch_13f_filing_detail(accession_number, cik).await
    }
}

/// Sector resolution seam (one upstream call per unique ticker).
#[async_trait]
pub trait SectorLookup: Send + Sync {
    async fn sector_for(&self, ticker: &str) -> Option<String>;
}

#[async_trait]
impl SectorLookup for YahooClient {
    async fn sector_for(&self, ticker: &str) -> Option<String> {
        self.get_ticker_sector(ticker).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Synced,
    Skipped,
}

/// Outcome of syncing one filing.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSummary {
    pub guru_id: i64,
    pub guru_display_name: String,
    pub status: SyncStatus,
    pub accession_number: String,
    pub report_date: NaiveDate,
    pub filing_date: NaiveDate,
    pub total_value: f64,
    pub holdings_count: usize,
    pub new_positions: usize,
    pub sold_out: usize,
    pub increased: usize,
    pub decreased: usize,
    pub top_holdings: Vec<GuruHolding>,
}

/// Outcome of a backfill run.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillSummary {
    pub guru_id: i64,
    pub guru_display_name: String,
    pub total_filings: usize,
    pub synced: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Overlap between one guru's current portfolio and the user's watchlist.
#[derive(Debug, Clone, Serialize)]
pub struct GuruResonance {
    pub guru_id: i64,
    pub guru_display_name: String,
    pub matches: Vec<String>,
}

pub struct FilingService<S> {
    store: Arc<S>,
    feed: Arc<dyn FilingFeed>,
    sectors: Arc<dyn SectorLookup>,
    clock: Arc<dyn Clock>,
}

impl<S: FilingStore> FilingService<S> {
    pub fn new(
        store: Arc<S>,
        feed: Arc<dyn FilingFeed>,
        sectors: Arc<dyn SectorLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            feed,
            sectors,
            clock,
        }
    }

    async fn guru_or_not_found(&self, guru_id: i64) -> Result<Guru, EngineError> {
        self.store
            .find_guru(guru_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("guru {guru_id}")))
    }

    /// Sync the latest 13F filing for one guru.
    pub async fn sync_guru_filing(&self, guru_id: i64) -> Result<SyncSummary, EngineError> {
        let guru = self.guru_or_not_found(guru_id).await?;

        let filings = self.feed.latest_13f_filings(&guru.cik, 2).await;
        let Some(latest) = filings.into_iter().next() else {
            tracing::warn!("no 13F filings on EDGAR for {} ({})", guru.display_name, guru.cik);
            return Err(EngineError::NotFound(format!(
                "no 13F filings for {}",
                guru.display_name
            )));
        };

        self.sync_single_filing(&guru, &latest).await
    }

    /// Sync every active guru's latest filing; per-guru failures are
    /// logged and skipped.
    pub async fn sync_all_gurus(&self) -> Result<Vec<SyncSummary>, EngineError> {
        let gurus = self.store.list_active_gurus().await?;
        if gurus.is_empty() {
            tracing::info!("no active gurus, nothing to sync");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(gurus.len());
        for guru in gurus {
            match self.sync_guru_filing(guru.id).await {
                Ok(summary) => results.push(summary),
                Err(e) => {
                    tracing::warn!("sync failed for {} (id {}): {e}", guru.display_name, guru.id);
                }
            }
        }
        Ok(results)
    }

    /// Backfill up to `years` of filing history, oldest quarter first so
    /// each diff compares against its true predecessor.
    pub async fn backfill_guru_filings(
        &self,
        guru_id: i64,
        years: i64,
    ) -> Result<BackfillSummary, EngineError> {
        let guru = self.guru_or_not_found(guru_id).await?;

        let filings = self
            .feed
            .latest_13f_filings(&guru.cik, BACKFILL_FILING_COUNT)
            .await;
        if filings.is_empty() {
            tracing::info!("no 13F history to backfill for {}", guru.display_name);
            return Ok(BackfillSummary {
                guru_id,
                guru_display_name: guru.display_name,
                total_filings: 0,
                synced: 0,
                skipped: 0,
                errors: 0,
            });
        }

        let cutoff = self.clock.now().date_naive() - chrono::Duration::days(years * 365);
        let mut in_window: Vec<EdgarFiling> = filings
            .into_iter()
            .filter(|f| f.report_date >= cutoff)
            .collect();
        // Ascending report_date keeps the diff chain flowing old -> new.
        in_window.sort_by_key(|f| f.report_date);

        let total = in_window.len();
        let mut synced = 0;
        let mut skipped = 0;
        let mut errors = 0;

        for filing in &in_window {
            match self.sync_single_filing(&guru, filing).await {
                Ok(summary) if summary.status == SyncStatus::Skipped => skipped += 1,
                Ok(_) => synced += 1,
                Err(e) => {
                    tracing::warn!(
                        "backfill failed for {} {}: {e}",
                        guru.display_name,
                        filing.accession_number
                    );
                    errors += 1;
                }
            }
        }

        tracing::info!(
            "13F backfill for {}: {total} in window, {synced} synced, {skipped} skipped, {errors} errors",
            guru.display_name
        );
        Ok(BackfillSummary {
            guru_id,
            guru_display_name: guru.display_name.clone(),
            total_filings: total,
            synced,
            skipped,
            errors,
        })
    }

    async fn sync_single_filing(
        &self,
        guru: &Guru,
        edgar_filing: &EdgarFiling,
    ) -> Result<SyncSummary, EngineError> {
        // Idempotency: a filing is identified by its accession number and
        // is never re-synced.
        if let Some(existing) = self
            .store
            .find_filing_by_accession(&edgar_filing.accession_number)
            .await?
        {
            tracing::debug!(
                "filing {} already synced for {}, skipping",
                edgar_filing.accession_number,
                guru.display_name
            );
            return Ok(SyncSummary {
                guru_id: guru.id,
                guru_display_name: guru.display_name.clone(),
                status: SyncStatus::Skipped,
                accession_number: existing.accession_number,
                report_date: existing.report_date,
                filing_date: existing.filing_date,
                total_value: existing.total_value,
                holdings_count: existing.holdings_count,
                new_positions: 0,
                sold_out: 0,
                increased: 0,
                decreased: 0,
                top_holdings: Vec::new(),
            });
        }

        let raw_holdings = self
            .feed
            .filing_detail(&edgar_filing.accession_number, &guru.cik)
            .await;
        if raw_holdings.is_empty() {
            return Err(EngineError::Parse(format!(
                "failed to fetch or parse infotable for {}",
                edgar_filing.accession_number
            )));
        }

        // Snapshot the previous quarter BEFORE saving the new filing.
        let prev_map = self.snapshot_prev_holdings(guru.id).await?;

        let total_value: f64 = raw_holdings.iter().map(|h| h.value).sum();

        let filing = GuruFiling {
            id: 0,
            guru_id: guru.id,
            accession_number: edgar_filing.accession_number.clone(),
            report_date: edgar_filing.report_date,
            filing_date: edgar_filing.filing_date,
            total_value,
            holdings_count: raw_holdings.len(),
            filing_url: edgar_filing.filing_url.clone(),
            synced_at: Utc::now(),
        };
        let filing_id = self.store.save_filing(&filing).await?;

        let holdings = self
            .build_holdings(&raw_holdings, filing_id, guru, &prev_map, total_value)
            .await;
        self.store.save_holdings_batch(&holdings).await?;

        let summary = build_summary(guru, &filing, &holdings);
        tracing::info!(
            "13F synced: {} {} — {} positions, {} new, {} sold out",
            guru.display_name,
            filing.accession_number,
            holdings.len(),
            summary.new_positions,
            summary.sold_out
        );
        Ok(summary)
    }

    /// cusip -> shares of the guru's current latest filing; empty when
    /// this is the first quarter on record.
    async fn snapshot_prev_holdings(&self, guru_id: i64) -> Result<HashMap<String, f64>, EngineError> {
        let Some(prev_filing) = self.store.latest_filing_by_guru(guru_id).await? else {
            return Ok(HashMap::new());
        };
        let prev_holdings = self.store.holdings_by_filing(prev_filing.id).await?;
        Ok(prev_holdings
            .into_iter()
            .map(|h| (h.cusip, h.shares))
            .collect())
    }

    /// Classify current positions against the previous snapshot and
    /// synthesize SOLD_OUT rows for vanished CUSIPs.
    async fn build_holdings(
        &self,
        raw_holdings: &[RawHolding13F],
        filing_id: i64,
        guru: &Guru,
        prev_map: &HashMap<String, f64>,
        total_value: f64,
    ) -> Vec<GuruHolding> {
        // Pass 1: resolve every CUSIP -> ticker once (current + vanished).
        let mut current_cusips: HashSet<&str> = HashSet::new();
        let mut cusip_to_ticker: HashMap<String, Option<String>> = HashMap::new();

        for raw in raw_holdings {
            current_cusips.insert(raw.cusip.as_str());
            cusip_to_ticker.insert(
                raw.cusip.clone(),
                map_cusip_to_ticker(&raw.cusip, &raw.company_name).map(str::to_string),
            );
        }
        for cusip in prev_map.keys() {
            if !current_cusips.contains(cusip.as_str()) {
                cusip_to_ticker.insert(
                    cusip.clone(),
                    map_cusip_to_ticker(cusip, "").map(str::to_string),
                );
            }
        }

        // Pass 2: one sector lookup per unique ticker, not per holding.
        let unique_tickers: HashSet<String> =
            cusip_to_ticker.values().flatten().cloned().collect();
        let mut ticker_to_sector: HashMap<String, Option<String>> = HashMap::new();
        for ticker in unique_tickers {
            let sector = self.sectors.sector_for(&ticker).await;
            ticker_to_sector.insert(ticker, sector);
        }

        let sector_of = |ticker: &Option<String>| -> Option<String> {
            ticker
                .as_ref()
                .and_then(|t| ticker_to_sector.get(t).cloned().flatten())
        };

        let mut holdings = Vec::with_capacity(raw_holdings.len());
        for raw in raw_holdings {
            let previous_shares = prev_map.get(&raw.cusip).copied();
            let action = classify_holding_change(raw.shares, previous_shares);
            let change_pct = previous_shares.and_then(|prev| compute_change_pct(raw.shares, prev));
            let ticker = cusip_to_ticker.get(&raw.cusip).cloned().flatten();

            holdings.push(GuruHolding {
                filing_id,
                guru_id: guru.id,
                cusip: raw.cusip.clone(),
                sector: sector_of(&ticker),
                ticker,
                company_name: raw.company_name.clone(),
                value: raw.value,
                shares: raw.shares,
                action,
                change_pct,
                weight_pct: Some(compute_holding_weight(raw.value, total_value)),
            });
        }

        // Held last quarter, absent this quarter: the filing XML has no
        // row to classify, so one is synthesized.
        for cusip in prev_map.keys() {
            if !current_cusips.contains(cusip.as_str()) {
                let ticker = cusip_to_ticker.get(cusip).cloned().flatten();
                holdings.push(GuruHolding {
                    filing_id,
                    guru_id: guru.id,
                    cusip: cusip.clone(),
                    sector: sector_of(&ticker),
                    ticker,
                    company_name: String::new(),
                    value: 0.0,
                    shares: 0.0,
                    action: HoldingAction::SoldOut,
                    change_pct: Some(-100.0),
                    weight_pct: Some(0.0),
                });
            }
        }

        holdings
    }

    /// Latest-filing summary for one guru, `None` when nothing is synced.
    pub async fn get_filing_summary(
        &self,
        guru_id: i64,
    ) -> Result<Option<SyncSummary>, EngineError> {
        let guru = self.guru_or_not_found(guru_id).await?;
        let Some(filing) = self.store.latest_filing_by_guru(guru_id).await? else {
            return Ok(None);
        };
        let holdings = self.store.holdings_by_filing(filing.id).await?;
        Ok(Some(build_summary(&guru, &filing, &holdings)))
    }

    /// Positions with an action in the latest filing, most significant
    /// first (|change%| then weight), optionally limited.
    pub async fn get_holding_changes(
        &self,
        guru_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<GuruHolding>, EngineError> {
        let Some(filing) = self.store.latest_filing_by_guru(guru_id).await? else {
            return Ok(Vec::new());
        };
        let holdings = self.store.holdings_by_filing(filing.id).await?;

        let mut changes: Vec<GuruHolding> = holdings
            .into_iter()
            .filter(|h| h.action != HoldingAction::Unchanged)
            .collect();
        changes.sort_by(|a, b| {
            let a_key = (a.change_pct.unwrap_or(0.0).abs(), a.weight_pct.unwrap_or(0.0));
            let b_key = (b.change_pct.unwrap_or(0.0).abs(), b.weight_pct.unwrap_or(0.0));
            b_key.partial_cmp(&a_key).unwrap_or(std::cmp::Ordering::Equal)
        });

        if let Some(limit) = limit {
            changes.truncate(limit);
        }
        Ok(changes)
    }

    /// Top-N positions of the latest filing by weight.
    pub async fn get_top_holdings(
        &self,
        guru_id: i64,
        n: usize,
    ) -> Result<Vec<GuruHolding>, EngineError> {
        let Some(filing) = self.store.latest_filing_by_guru(guru_id).await? else {
            return Ok(Vec::new());
        };
        let mut holdings = self.store.holdings_by_filing(filing.id).await?;
        holdings.sort_by(|a, b| {
            b.weight_pct
                .unwrap_or(0.0)
                .partial_cmp(&a.weight_pct.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        holdings.truncate(n);
        Ok(holdings)
    }

    /// All synced filings for a guru, newest first (timeline view).
    pub async fn get_guru_filing_history(
        &self,
        guru_id: i64,
    ) -> Result<Vec<GuruFiling>, EngineError> {
        self.store.list_filings_by_guru(guru_id, 100).await
    }

    /// Smart-money resonance: which of the user's tracked tickers each
    /// active guru currently holds.
    pub async fn get_resonance(
        &self,
        user_tickers: &HashSet<String>,
    ) -> Result<Vec<GuruResonance>, EngineError> {
        let mut results = Vec::new();
        for guru in self.store.list_active_gurus().await? {
            let Some(filing) = self.store.latest_filing_by_guru(guru.id).await? else {
                continue;
            };
            let holdings = self.store.holdings_by_filing(filing.id).await?;
            let guru_tickers: HashSet<String> = holdings
                .iter()
                .filter(|h| h.action != HoldingAction::SoldOut)
                .filter_map(|h| h.ticker.clone())
                .collect();

            let mut matches: Vec<String> = compute_resonance_matches(&guru_tickers, user_tickers)
                .into_iter()
                .collect();
            matches.sort();
            if !matches.is_empty() {
                results.push(GuruResonance {
                    guru_id: guru.id,
                    guru_display_name: guru.display_name.clone(),
                    matches,
                });
            }
        }
        Ok(results)
    }
}

fn build_summary(guru: &Guru, filing: &GuruFiling, holdings: &[GuruHolding]) -> SyncSummary {
    let mut new_positions = 0;
    let mut sold_out = 0;
    let mut increased = 0;
    let mut decreased = 0;
    for h in holdings {
        match h.action {
            HoldingAction::NewPosition => new_positions += 1,
            HoldingAction::SoldOut => sold_out += 1,
            HoldingAction::Increased => increased += 1,
            HoldingAction::Decreased => decreased += 1,
            HoldingAction::Unchanged => {}
        }
    }

    let mut top: Vec<GuruHolding> = holdings.to_vec();
    top.sort_by(|a, b| {
        b.weight_pct
            .unwrap_or(0.0)
            .partial_cmp(&a.weight_pct.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    top.truncate(TOP_HOLDINGS_COUNT);

    SyncSummary {
        guru_id: guru.id,
        guru_display_name: guru.display_name.clone(),
        status: SyncStatus::Synced,
        accession_number: filing.accession_number.clone(),
        report_date: filing.report_date,
        filing_date: filing.filing_date,
        total_value: filing.total_value,
        holdings_count: holdings.len(),
        new_positions,
        sold_out,
        increased,
        decreased,
        top_holdings: top,
    }
}
