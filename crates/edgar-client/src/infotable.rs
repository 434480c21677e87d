//! 13F information-table XML parsing.
//!
//! EDGAR serves two vintages of this document: legacy tables with bare tag
//! names and modern ones with namespace prefixes (`ns1:infoTable`).
//! Namespace declarations and prefixes are stripped up front so one set of
//! patterns reads both.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// One raw position from an information table. `value` is thousands USD.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHolding13F {
    pub cusip: String,
    pub company_name: String,
    pub value: f64,
    pub shares: f64,
}

fn strip_namespaces(xml: &str) -> String {
    let no_decls = Regex::new(r#"\s+xmlns(:\w+)?="[^"]*""#)
        .map(|re| re.replace_all(xml, "").into_owned())
        .unwrap_or_else(|_| xml.to_string());
    let no_schema = Regex::new(r#"\s+xsi:schemaLocation="[^"]*""#)
        .map(|re| re.replace_all(&no_decls, "").into_owned())
        .unwrap_or(no_decls);
    Regex::new(r"<(/?)\w+:")
        .map(|re| re.replace_all(&no_schema, "<$1").into_owned())
        .unwrap_or(no_schema)
}

fn tag_text(block: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?s)<{tag}[^>]*>(.*?)</{tag}>");
    let re = Regex::new(&pattern).ok()?;
    re.captures(block)
        .map(|caps| caps[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse an information table into raw positions. Unreadable entries are
/// skipped; a document without a single readable entry yields an empty
/// list (the caller logs and degrades).
pub fn parse_13f_xml(xml: &str) -> Vec<RawHolding13F> {
    let clean = strip_namespaces(xml);

    let Ok(entry_re) = Regex::new(r"(?s)<infoTable[^>]*>(.*?)</infoTable>") else {
        return Vec::new();
    };

    let mut holdings = Vec::new();
    for entry in entry_re.captures_iter(&clean) {
        let block = &entry[1];

        let Some(cusip) = tag_text(block, "cusip") else {
            continue;
        };
        let Some(company_name) = tag_text(block, "nameOfIssuer") else {
            continue;
        };

        let value = tag_text(block, "value")
            .and_then(|v| v.replace(',', "").parse::<f64>().ok())
            .unwrap_or(0.0);
        // sshPrnamt sits inside shrsOrPrnAmt; it is the only tag with that
        // name in an entry, so a direct match is safe.
        let shares = tag_text(block, "sshPrnamt")
            .and_then(|v| v.replace(',', "").parse::<f64>().ok())
            .unwrap_or(0.0);

        holdings.push(RawHolding13F {
            cusip: cusip.to_uppercase(),
            company_name,
            value,
            shares,
        });
    }

    holdings
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<informationTable xmlns="http://www.sec.gov/edgar/document/thirteenf/informationtable">
  <infoTable>
    <nameOfIssuer>APPLE INC</nameOfIssuer>
    <titleOfClass>COM</titleOfClass>
    <cusip>037833100</cusip>
    <value>174300000</value>
    <shrsOrPrnAmt>
      <sshPrnamt>915560382</sshPrnamt>
      <sshPrnamtType>SH</sshPrnamtType>
    </shrsOrPrnAmt>
  </infoTable>
  <infoTable>
    <nameOfIssuer>BANK AMER CORP</nameOfIssuer>
    <cusip>060505104</cusip>
    <value>28279487</value>
    <shrsOrPrnAmt>
      <sshPrnamt>1032852006</sshPrnamt>
    </shrsOrPrnAmt>
  </infoTable>
</informationTable>"#;

    const NAMESPACED_XML: &str = r#"<?xml version="1.0"?>
<ns1:informationTable xmlns:ns1="http://www.sec.gov/edgar/document/thirteenf/informationtable" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.sec.gov/edgar/document/thirteenf/informationtable eis_13FDocument.xsd">
  <ns1:infoTable>
    <ns1:nameOfIssuer>NVIDIA CORP</ns1:nameOfIssuer>
    <ns1:cusip>67066g104</ns1:cusip>
    <ns1:value>4500000</ns1:value>
    <ns1:shrsOrPrnAmt>
      <ns1:sshPrnamt>35000000</ns1:sshPrnamt>
      <ns1:sshPrnamtType>SH</ns1:sshPrnamtType>
    </ns1:shrsOrPrnAmt>
  </ns1:infoTable>
</ns1:informationTable>"#;

    #[test]
    fn parses_legacy_tables() {
        let holdings = parse_13f_xml(LEGACY_XML);
        assert_eq!(holdings.len(), 2);
        assert_eq!(holdings[0].cusip, "037833100");
        assert_eq!(holdings[0].company_name, "APPLE INC");
        assert_eq!(holdings[0].value, 174_300_000.0);
        assert_eq!(holdings[0].shares, 915_560_382.0);
        assert_eq!(holdings[1].cusip, "060505104");
    }

    #[test]
    fn parses_namespaced_tables() {
        let holdings = parse_13f_xml(NAMESPACED_XML);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].cusip, "67066G104");
        assert_eq!(holdings[0].company_name, "NVIDIA CORP");
        assert_eq!(holdings[0].shares, 35_000_000.0);
    }

    #[test]
    fn entries_without_cusip_or_name_are_skipped() {
        let xml = r#"<informationTable>
          <infoTable>
            <nameOfIssuer>MYSTERY CORP</nameOfIssuer>
            <value>100</value>
          </infoTable>
          <infoTable>
            <cusip>037833100</cusip>
            <value>100</value>
          </infoTable>
        </informationTable>"#;
        assert!(parse_13f_xml(xml).is_empty());
    }

    #[test]
    fn malformed_documents_yield_empty() {
        assert!(parse_13f_xml("this is not xml at all").is_empty());
        assert!(parse_13f_xml("").is_empty());
    }

    #[test]
    fn missing_numeric_fields_default_to_zero() {
        let xml = r#"<informationTable>
          <infoTable>
            <nameOfIssuer>ACME</nameOfIssuer>
            <cusip>123456789</cusip>
          </infoTable>
        </informationTable>"#;
        let holdings = parse_13f_xml(xml);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].value, 0.0);
        assert_eq!(holdings[0].shares, 0.0);
    }
}
