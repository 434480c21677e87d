//! Submissions index, 13F-HR filtering and infotable retrieval.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use observatory_core::EngineError;

use crate::infotable::{parse_13f_xml, RawHolding13F};
use crate::wire::{FilingIndex, SubmissionsIndex};
use crate::EdgarClient;

/// One 13F-HR entry from the submissions index, with the synthetic URL
/// pieces the sync workflow needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgarFiling {
    pub accession_number: String,
    /// Accession number without dashes (archive path segment).
    pub accession_path: String,
    pub filing_date: NaiveDate,
    pub report_date: NaiveDate,
    pub primary_doc: String,
    pub filing_url: String,
}

impl EdgarClient {
    /// Company submissions index for a zero-padded CIK, L1+L2 cached.
    pub async fn fetch_company_filings(
        &self,
        cik: &str,
    ) -> Result<SubmissionsIndex, EngineError> {
        let url = self.submissions_url(cik);
        self.submissions
            .get_or_fetch(cik, || async { self.http_get_json(&url).await })
            .await
    }

    /// Latest `count` 13F-HR filings for a CIK, newest first. Empty on any
    /// failure (logged), matching the degrade-not-fail adapter contract.
    pub async fn get_latest_13f_filings(&self, cik: &str, count: usize) -> Vec<EdgarFiling> {
        let submissions = match self.fetch_company_filings(cik).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("EDGAR submissions fetch failed for CIK {cik}: {e}");
                return Vec::new();
            }
        };

        let recent = submissions.filings.recent;
        let mut results = Vec::new();
        for (i, form) in recent.form.iter().enumerate() {
            if form != "13F-HR" {
                continue;
            }
            let (Some(accession), Some(filing_date), Some(report_date), Some(primary_doc)) = (
                recent.accession_number.get(i),
                recent.filing_date.get(i),
                recent.report_date.get(i),
                recent.primary_document.get(i),
            ) else {
                continue;
            };
            let (Ok(filing_date), Ok(report_date)) = (
                NaiveDate::parse_from_str(filing_date, "%Y-%m-%d"),
                NaiveDate::parse_from_str(report_date, "%Y-%m-%d"),
            ) else {
                tracing::debug!("skipping 13F with unparseable dates: {accession}");
                continue;
            };

            let accession_path = accession.replace('-', "");
            let filing_url = format!("{}/{}", self.archive_base(cik, &accession_path), primary_doc);
            results.push(EdgarFiling {
                accession_number: accession.clone(),
                accession_path,
                filing_date,
                report_date,
                primary_doc: primary_doc.clone(),
                filing_url,
            });
            if results.len() >= count {
                break;
            }
        }

        tracing::debug!("EDGAR 13F-HR index for CIK {cik}: {} entries", results.len());
        results
    }

    /// Discover the information-table XML filename from the filing's
    /// `index.json`. 13F infotable names vary (infotable.xml, bare numeric
    /// names, 13f_infotable.xml); the first `.xml` that is not
    /// `primary_doc.xml` wins.
    async fn discover_infotable_filename(
        &self,
        cik: &str,
        accession_path: &str,
    ) -> Option<String> {
        let url = format!("{}/index.json", self.archive_base(cik, accession_path));
        match self.http_get_json::<FilingIndex>(&url).await {
            Ok(index) => index
                .directory
                .item
                .into_iter()
                .map(|item| item.name)
                .find(|name| name.ends_with(".xml") && name != "primary_doc.xml"),
            Err(e) => {
                tracing::debug!("infotable discovery failed for {accession_path}: {e}");
                None
            }
        }
    }

    /// Download and parse the information table for one filing. Empty on
    /// failure. The disk-cache key includes the discovered filename so a
    /// re-filed document never serves a stale table.
    pub async fn fetch_13f_filing_detail(
        &self,
        accession_number: &str,
        cik: &str,
    ) -> Vec<RawHolding13F> {
        let accession_path = accession_number.replace('-', "");

        let xml_filename = match self.discover_infotable_filename(cik, &accession_path).await {
            Some(name) => name,
            None => {
                tracing::debug!(
                    "infotable discovery failed for {accession_number}, using the default name"
                );
                "infotable.xml".to_string()
            }
        };

        let cache_key = format!("guru_filing:infotable:{accession_number}:{xml_filename}");
        if let Some(cached) = self.disk.get::<Vec<RawHolding13F>>(&cache_key) {
            tracing::debug!("infotable L2 hit for {accession_number}");
            return cached;
        }

        let xml_url = format!("{}/{}", self.archive_base(cik, &accession_path), xml_filename);
        match self.http_get_text(&xml_url).await {
            Ok(xml) => {
                let holdings = parse_13f_xml(&xml);
                if !holdings.is_empty() {
                    self.disk.set(&cache_key, &holdings, self.infotable_disk_ttl());
                }
                tracing::info!(
                    "parsed infotable {accession_number} ({xml_filename}): {} positions",
                    holdings.len()
                );
                holdings
            }
            Err(e) => {
                tracing::warn!("infotable fetch failed for {accession_number}: {e}");
                Vec::new()
            }
        }
    }
}
