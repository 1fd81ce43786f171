//! Canonicalizers and structured-signal parsing for transactional records
//! and free idea text.
//!
//! Trade blotters arrive with inconsistent region names, date formats and
//! notional spellings; idea text buries currency pairs, product keywords
//! and tenors inside prose. Everything here is pure string-in, value-out.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Regions in fallback priority order.
pub const REGIONS: &[&str] = &["EUROPE", "APAC", "AMERICA", "CEEMEA"];

const REGION_ALIASES: &[(&str, &str)] = &[
    ("EUROPE", "EUROPE"),
    ("APAC", "APAC"),
    ("AMERICAS", "AMERICA"),
    ("AMERICA", "AMERICA"),
    ("CEEMEA", "CEEMEA"),
    ("CEEMA", "CEEMEA"),
];

pub const TENOR_BUCKETS: &[&str] = &["<1W", "1W", "2W-1M", "1M-3M", "3M-6M", "6M-1Y", ">1Y"];

/// Product-type codes recognized in trade records and idea text.
const PRODUCT_TYPES: &[&str] = &[
    "EUR", "KNO", "KNI", "NDO", "EKI", "EKO", "EKIKO", "KIKO", "DIG", "MDIG", "DIGKNO",
    "DIGRKO", "DKO", "DKI", "DNT", "DOT", "OT", "RKO", "RKI", "MBAR", "WKNO", "WKNI",
    "TPF", "PTPF", "DCD", "BASKET", "COMPOUND", "AMER", "FWDACC", "FWDSTRUCT", "VOLSWAP",
    "VARSWAP", "CORRSWP", "STRUCTSWP", "AVGRATE", "AVGSTRIKE", "BOWO", "FVA",
];

/// Free-text keyword -> product code expansions, checked in order.
const PRODUCT_KEYWORDS: &[(&str, &[&str])] = &[
    ("dual digital", &["DIG", "DIGKNO"]),
    ("digital", &["DIG"]),
    ("knockout", &["KNO"]),
    ("knock out", &["KNO"]),
    ("knock-out", &["KNO"]),
    ("knock in", &["KNI"]),
    ("knock-in", &["KNI"]),
    ("basket", &["BASKET"]),
    ("forward structure", &["FWDSTRUCT"]),
    ("accumulator", &["FWDACC"]),
    ("double no touch", &["DNT"]),
    ("one touch", &["OT"]),
];

pub fn normalize_region(value: &str) -> String {
    let region = value.trim().to_ascii_uppercase();
    for (alias, canonical) in REGION_ALIASES {
        if region == *alias {
            return (*canonical).to_string();
        }
    }
    if REGIONS.contains(&region.as_str()) {
        region
    } else {
        String::new()
    }
}

pub fn normalize_country(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// Keep letters only; a valid pair needs at least six (`EURUSD`).
pub fn normalize_ccy_pair(value: &str) -> String {
    let letters: String =
        value.chars().filter(|c| c.is_ascii_alphabetic()).map(|c| c.to_ascii_uppercase()).collect();
    if letters.len() >= 6 {
        letters[..6].to_string()
    } else {
        String::new()
    }
}

pub fn normalize_product_type(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Uppercase and trim; known buckets pass through, unknown spellings are
/// kept as-is so bad upstream data stays visible instead of vanishing.
pub fn normalize_tenor_bucket(value: &str) -> String {
    value.trim().to_ascii_uppercase()
}

/// Parse a blotter trade date; formats vary by upstream system.
pub fn parse_trade_date(value: &str) -> Option<NaiveDate> {
    let text = value.trim();
    if text.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];
    FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parse a notional in millions: `"15.00M"` -> 15.0, commas tolerated,
/// unparseable input -> 0.0.
pub fn parse_notional_m(value: &str) -> f64 {
    let mut text = value.trim().to_ascii_uppercase().replace(',', "");
    if text.is_empty() {
        return 0.0;
    }
    if text.ends_with('M') {
        text.pop();
    }
    text.parse::<f64>().unwrap_or(0.0)
}

/// Map a raw sector string onto a client-type code.
pub fn infer_client_type_from_sector(sector: &str) -> String {
    let token = sector.trim().to_ascii_uppercase();
    if token.contains("HF") {
        "HF_MACRO".to_string()
    } else if token.contains("REAL MONEY") {
        "ASSET_MANAGER_LONG_ONLY".to_string()
    } else if token.contains("BANK") || token.contains("PB") || token.contains("INTERNAL") {
        "BANK".to_string()
    } else if token.contains("CORPORATE") {
        "CORPORATE_TREASURY".to_string()
    } else {
        "HF_MACRO".to_string()
    }
}

/// The target region first, then the remaining regions in priority order.
pub fn region_fallbacks(region: &str) -> Vec<String> {
    let canonical = normalize_region(region);
    if canonical.is_empty() {
        return REGIONS.iter().map(|r| (*r).to_string()).collect();
    }
    let mut ordered = vec![canonical.clone()];
    for r in REGIONS {
        if *r != canonical {
            ordered.push((*r).to_string());
        }
    }
    ordered
}

/// Structured signals mined out of free idea text, used to pre-filter the
/// candidate pool before scoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StructuredSignals {
    pub ccy_pairs: Vec<String>,
    pub product_types: Vec<String>,
    pub tenor_bucket: String,
    pub region: String,
}

impl StructuredSignals {
    pub fn primary_pair(&self) -> &str {
        self.ccy_pairs.first().map(String::as_str).unwrap_or("")
    }

    pub fn primary_product(&self) -> &str {
        self.product_types.first().map(String::as_str).unwrap_or("")
    }
}

pub fn extract_structured_signals(text: &str) -> StructuredSignals {
    let raw = text.to_ascii_uppercase();
    let tokens: Vec<&str> = raw
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .collect();

    let mut ccy_pairs = Vec::new();
    for token in &tokens {
        if token.len() == 6 && token.bytes().all(|b| b.is_ascii_alphabetic()) {
            let pair = normalize_ccy_pair(token);
            if !pair.is_empty() && !ccy_pairs.contains(&pair) {
                ccy_pairs.push(pair);
            }
        }
    }

    let mut product_types = Vec::new();
    for token in &tokens {
        if PRODUCT_TYPES.contains(token) && !product_types.contains(&(*token).to_string()) {
            product_types.push((*token).to_string());
        }
    }
    let lowered = text.to_ascii_lowercase();
    for (keyword, codes) in PRODUCT_KEYWORDS {
        if lowered.contains(keyword) {
            for code in *codes {
                if !product_types.contains(&(*code).to_string()) {
                    product_types.push((*code).to_string());
                }
            }
        }
    }

    let tenor_bucket = if tokens.contains(&"1W") {
        "1W"
    } else if tokens.contains(&"1M") || tokens.contains(&"2W") {
        "2W-1M"
    } else if tokens.contains(&"3M") || tokens.contains(&"2M") {
        "1M-3M"
    } else if tokens.contains(&"6M")
        || tokens.contains(&"9M")
        || tokens.contains(&"12M")
        || tokens.contains(&"1Y")
    {
        "6M-1Y"
    } else {
        ""
    }
    .to_string();

    let mut region = String::new();
    for (alias, canonical) in REGION_ALIASES {
        if raw.contains(alias) {
            region = (*canonical).to_string();
            break;
        }
    }

    StructuredSignals { ccy_pairs, product_types, tenor_bucket, region }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_multiple_pairs_and_digital_products() {
        let signals = extract_structured_signals(
            "FX Trade Idea: AUDJPY and USDJPY dual digital (DIG). Correlation is high.",
        );
        assert!(signals.ccy_pairs.contains(&"AUDJPY".to_string()));
        assert!(signals.ccy_pairs.contains(&"USDJPY".to_string()));
        assert!(signals.product_types.contains(&"DIG".to_string()));
        assert!(signals.product_types.contains(&"DIGKNO".to_string()));
    }

    #[test]
    fn extracts_non_digital_product_keywords() {
        let signals =
            extract_structured_signals("Client may like knockout basket forward structures in EURUSD.");
        assert!(signals.ccy_pairs.contains(&"EURUSD".to_string()));
        assert!(["KNO", "BASKET", "FWDSTRUCT"]
            .iter()
            .any(|p| signals.product_types.contains(&(*p).to_string())));
    }

    #[test]
    fn extracts_tenor_and_region() {
        let signals = extract_structured_signals("3m EURUSD digital for APAC accounts");
        assert_eq!(signals.tenor_bucket, "1M-3M");
        assert_eq!(signals.region, "APAC");
        assert_eq!(signals.primary_pair(), "EURUSD");
    }

    #[test]
    fn region_aliases_fold_to_canonical() {
        assert_eq!(normalize_region("americas"), "AMERICA");
        assert_eq!(normalize_region("CEEMA"), "CEEMEA");
        assert_eq!(normalize_region(" europe "), "EUROPE");
        assert_eq!(normalize_region("MOON"), "");
    }

    #[test]
    fn region_fallbacks_are_deterministic() {
        assert_eq!(region_fallbacks("APAC"), vec!["APAC", "EUROPE", "AMERICA", "CEEMEA"]);
        assert_eq!(region_fallbacks(""), vec!["EUROPE", "APAC", "AMERICA", "CEEMEA"]);
    }

    #[test]
    fn trade_dates_parse_across_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(parse_trade_date("03/07/2024"), Some(expected));
        assert_eq!(parse_trade_date("2024-03-07"), Some(expected));
        assert_eq!(parse_trade_date(""), None);
        assert_eq!(parse_trade_date("not a date"), None);
    }

    #[test]
    fn notional_parsing_tolerates_units_and_commas() {
        assert_eq!(parse_notional_m("15.00M"), 15.0);
        assert_eq!(parse_notional_m("1,250M"), 1250.0);
        assert_eq!(parse_notional_m("7.5"), 7.5);
        assert_eq!(parse_notional_m("n/a"), 0.0);
    }

    #[test]
    fn ccy_pair_normalization_strips_noise() {
        assert_eq!(normalize_ccy_pair("EUR/USD"), "EURUSD");
        assert_eq!(normalize_ccy_pair("eurusd spot"), "EURUSD");
        assert_eq!(normalize_ccy_pair("EUR"), "");
    }

    #[test]
    fn sector_maps_to_client_type() {
        assert_eq!(infer_client_type_from_sector("HF - Macro"), "HF_MACRO");
        assert_eq!(infer_client_type_from_sector("Real Money"), "ASSET_MANAGER_LONG_ONLY");
        assert_eq!(infer_client_type_from_sector("Private Bank"), "BANK");
        assert_eq!(infer_client_type_from_sector("Corporate"), "CORPORATE_TREASURY");
    }
}
