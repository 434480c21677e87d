//! Best-effort CUSIP → ticker resolution.
//!
//! A static table covers the large institutional positions; uppercase
//! name-fragment hints catch the rest of the well-known issuers. Anything
//! else stays unmapped (the holding keeps its CUSIP and company name).

/// Top institutional holdings, sourced from public EDGAR data.
const CUSIP_MAP: &[(&str, &str)] = &[
    // Mega-cap tech
    ("037833100", "AAPL"),
    ("02079K305", "GOOGL"),
    ("02079K107", "GOOG"),
    ("023135106", "AMZN"),
    ("67066G104", "NVDA"),
    ("594918104", "MSFT"),
    ("88160R101", "TSLA"),
    ("30303M102", "META"),
    ("44919P508", "NFLX"),
    // Financials
    ("025816109", "AXP"),
    ("060505104", "BAC"),
    ("808513105", "SCHW"),
    ("172967424", "BRK/B"),
    ("172967101", "BRK/A"),
    ("46625H100", "JPM"),
    ("38141G104", "GS"),
    ("949746101", "WFC"),
    ("693475105", "PNC"),
    ("11135F101", "BLK"),
    ("57636Q104", "MA"),
    ("91680M107", "V"),
    // Tech and industrials
    ("459200101", "IBM"),
    ("78468R101", "SNOW"),
    ("832696405", "CRM"),
    ("90353T100", "UBER"),
    ("713448108", "PEP"),
    ("931142103", "WMT"),
    ("438516106", "HON"),
    ("369604103", "GE"),
    // Healthcare
    ("478160104", "JNJ"),
    ("58933Y105", "MRK"),
    ("693506107", "PFE"),
    ("002824100", "ABT"),
    ("58155Q103", "MDT"),
    ("055622104", "BMY"),
    // Energy
    ("30231G102", "XOM"),
    ("124653109", "CVX"),
    // Broad-market ETFs held by institutions
    ("78462F103", "SPY"),
    ("464287804", "IVV"),
    ("921943858", "VTI"),
];

/// Uppercase name fragment → ticker.
const NAME_HINTS: &[(&str, &str)] = &[
    ("APPLE INC", "AAPL"),
    ("MICROSOFT CORP", "MSFT"),
    ("AMAZON COM", "AMZN"),
    ("ALPHABET INC", "GOOGL"),
    ("META PLATFORMS", "META"),
    ("NVIDIA CORP", "NVDA"),
    ("TESLA INC", "TSLA"),
    ("NETFLIX INC", "NFLX"),
    ("BERKSHIRE HATHAWAY", "BRK/B"),
    ("JPMORGAN CHASE", "JPM"),
    ("BANK AMER", "BAC"),
    ("BANK OF AMERICA", "BAC"),
    ("AMERICAN EXPRESS", "AXP"),
    ("EXXON MOBIL", "XOM"),
    ("CHEVRON CORP", "CVX"),
    ("WALMART INC", "WMT"),
    ("JOHNSON & JOHNSON", "JNJ"),
    ("MASTERCARD INC", "MA"),
    ("VISA INC", "V"),
];

/// Resolve a CUSIP to a ticker: static table first, then name hints,
/// else `None`.
pub fn map_cusip_to_ticker(cusip: &str, company_name: &str) -> Option<&'static str> {
    let cusip = cusip.trim().to_uppercase();
    if let Some((_, ticker)) = CUSIP_MAP.iter().find(|(c, _)| *c == cusip) {
        return Some(ticker);
    }

    let name_upper = company_name.trim().to_uppercase();
    if name_upper.is_empty() {
        return None;
    }
    NAME_HINTS
        .iter()
        .find(|(fragment, _)| name_upper.contains(fragment))
        .map(|(_, ticker)| *ticker)
}
