//! Serde shapes for the EDGAR endpoints.

use serde::{Deserialize, Serialize};

/// Company submissions index (`/submissions/CIK{padded}.json`), trimmed to
/// the parallel arrays the 13F filter reads. Cached in both tiers, so it
/// round-trips through serde.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionsIndex {
    #[serde(default)]
    pub filings: SubmissionsFilings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionsFilings {
    #[serde(default)]
    pub recent: RecentFilings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecentFilings {
    pub form: Vec<String>,
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    pub report_date: Vec<String>,
    pub primary_document: Vec<String>,
}

/// Filing directory listing (`index.json`) used to discover the infotable
/// XML filename.
#[derive(Debug, Default, Deserialize)]
pub struct FilingIndex {
    #[serde(default)]
    pub directory: FilingDirectory,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilingDirectory {
    #[serde(default)]
    pub item: Vec<FilingIndexItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilingIndexItem {
    #[serde(default)]
    pub name: String,
}
