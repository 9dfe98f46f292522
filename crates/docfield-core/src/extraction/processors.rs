//! Value processors applied to captured field values.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::fuzzy::fold;

lazy_static! {
    static ref DATE_DMY: Regex = Regex::new(
        r"\b(\d{1,2})\s*[./\-]\s*(\d{1,2})\s*[./\-]\s*(\d{4}|\d{2})\b"
    ).unwrap();

    static ref DATE_YMD: Regex = Regex::new(
        r"\b(\d{4})[./\-](\d{1,2})[./\-](\d{1,2})\b"
    ).unwrap();

    static ref DATE_LONG: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:er)?\s+(\p{L}+)\.?\s+(\d{4})\b"
    ).unwrap();
}

/// A processor implemented in code rather than described as data.
#[derive(Clone)]
pub struct CustomProcessor(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl CustomProcessor {
    pub fn new(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CustomProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomProcessor")
    }
}

/// One row of a lookup table: values containing `contains` map to `value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupEntry {
    pub contains: String,
    pub value: String,
}

impl LookupEntry {
    pub fn new(contains: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            contains: contains.into(),
            value: value.into(),
        }
    }
}

/// Transformation applied to a captured value before it is returned.
///
/// Processors that parse (amounts, dates, ...) return an empty string when
/// the capture does not parse, which the extractor treats as no match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueProcessor {
    Trim,
    Uppercase,
    Lowercase,
    CollapseWhitespace,
    /// `1 234,50 €` -> `1234.50`.
    Amount,
    /// `25,0` -> `25`.
    Quantity,
    /// `20 %` -> `20`.
    Percentage,
    /// Any supported date form -> `YYYY-MM-DD`.
    Date,
    /// `€` -> `EUR`, `usd` -> `USD`.
    Currency,
    /// First entry whose folded `contains` occurs in the folded value.
    Lookup {
        entries: Vec<LookupEntry>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<String>,
    },
    #[serde(skip)]
    Custom(CustomProcessor),
}

impl ValueProcessor {
    /// Wrap a closure as a processor.
    pub fn custom(f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(CustomProcessor::new(f))
    }

    /// Apply the processor to a raw captured value.
    pub fn apply(&self, raw: &str) -> String {
        let value = raw.trim();
        match self {
            Self::Trim => value.to_string(),
            Self::Uppercase => value.to_uppercase(),
            Self::Lowercase => value.to_lowercase(),
            Self::CollapseWhitespace => value.split_whitespace().collect::<Vec<_>>().join(" "),
            Self::Amount => parse_amount(value)
                .map(|d| d.to_string())
                .unwrap_or_default(),
            Self::Quantity => parse_amount(value)
                .map(|d| d.normalize().to_string())
                .unwrap_or_default(),
            Self::Percentage => parse_amount(value.trim_end_matches('%'))
                .map(|d| d.normalize().to_string())
                .unwrap_or_default(),
            Self::Date => parse_date(value)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            Self::Currency => normalize_currency(value).unwrap_or_default(),
            Self::Lookup { entries, fallback } => {
                let folded = fold(value);
                entries
                    .iter()
                    .find(|e| folded.contains(&fold(&e.contains)))
                    .map(|e| e.value.clone())
                    .or_else(|| fallback.clone())
                    .unwrap_or_else(|| value.to_string())
            }
            Self::Custom(f) => (f.0)(value),
        }
    }
}

/// Parse an amount written the European or English way
/// (`1 234,56`, `1.234,56`, `1,234.56`, `1234.56`).
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let negative = s.trim_start().starts_with('-');

    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == ',' || c == '.');
    if cleaned.is_empty() {
        return None;
    }

    let commas = cleaned.matches(',').count();
    let dots = cleaned.matches('.').count();

    let normalized = match (commas, dots) {
        (0, 0) => cleaned.to_string(),
        (1, 0) => cleaned.replace(',', "."),
        (_, 0) => cleaned.replace(',', ""),
        (0, 1) => cleaned.to_string(),
        (0, _) => cleaned.replace('.', ""),
        _ => {
            // Both present: the last one is the decimal separator.
            let comma_pos = cleaned.rfind(',');
            let dot_pos = cleaned.rfind('.');
            match (comma_pos, dot_pos) {
                (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
                _ => cleaned.replace(',', ""),
            }
        }
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Parse a date in numeric (`15/01/2024`, `15.01.24`, `2024-01-15`) or long
/// form (`15 janvier 2024`, `1er mars 2024`, `15 January 2024`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Some(caps) = DATE_YMD.captures(s) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = DATE_DMY.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year = parse_year(&caps[3]);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return Some(date);
        }
    }

    if let Some(caps) = DATE_LONG.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month = month_number(&caps[2])?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    None
}

fn parse_year(s: &str) -> i32 {
    let year: i32 = s.parse().unwrap_or(0);
    if year < 100 {
        // Two-digit year: 00-50 is 2000s, 51-99 is 1900s
        if year <= 50 { 2000 + year } else { 1900 + year }
    } else {
        year
    }
}

fn month_number(name: &str) -> Option<u32> {
    let month = match fold(name).as_str() {
        "janvier" | "january" | "janv" | "jan" => 1,
        "fevrier" | "february" | "fevr" | "fev" | "feb" => 2,
        "mars" | "march" | "mar" => 3,
        "avril" | "april" | "avr" | "apr" => 4,
        "mai" | "may" => 5,
        "juin" | "june" | "jun" => 6,
        "juillet" | "july" | "juil" | "jul" => 7,
        "aout" | "august" | "aug" => 8,
        "septembre" | "september" | "sept" | "sep" => 9,
        "octobre" | "october" | "oct" => 10,
        "novembre" | "november" | "nov" => 11,
        "decembre" | "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn normalize_currency(s: &str) -> Option<String> {
    let folded = fold(s);
    let code = match folded.as_str() {
        "€" | "eur" | "euro" | "euros" => "EUR",
        "$" | "usd" | "dollar" | "dollars" => "USD",
        "£" | "gbp" => "GBP",
        "chf" => "CHF",
        "dh" | "mad" | "dirham" | "dirhams" => "MAD",
        other if other.len() == 3 && other.chars().all(|c| c.is_ascii_alphabetic()) => {
            return Some(other.to_uppercase());
        }
        _ => return None,
    };
    Some(code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1 234,56"), Some(Decimal::from_str("1234.56").unwrap()));
        assert_eq!(parse_amount("1.234,56"), Some(Decimal::from_str("1234.56").unwrap()));
        assert_eq!(parse_amount("1,234.56"), Some(Decimal::from_str("1234.56").unwrap()));
        assert_eq!(parse_amount("89.99 EUR"), Some(Decimal::from_str("89.99").unwrap()));
        assert_eq!(parse_amount("12 345 678,90"), Some(Decimal::from_str("12345678.90").unwrap()));
        assert_eq!(parse_amount("-15,00"), Some(Decimal::from_str("-15.00").unwrap()));
        assert_eq!(parse_amount("abc"), None);
    }

    #[test]
    fn test_amount_processor_keeps_scale() {
        assert_eq!(ValueProcessor::Amount.apply(" 1 250,50 € "), "1250.50");
        assert_eq!(ValueProcessor::Amount.apply("89.99"), "89.99");
        assert_eq!(ValueProcessor::Amount.apply("n/a"), "");
    }

    #[test]
    fn test_quantity_and_percentage() {
        assert_eq!(ValueProcessor::Quantity.apply("25"), "25");
        assert_eq!(ValueProcessor::Quantity.apply("2,50"), "2.5");
        assert_eq!(ValueProcessor::Percentage.apply("20 %"), "20");
        assert_eq!(ValueProcessor::Percentage.apply("5,5%"), "5.5");
    }

    #[test]
    fn test_parse_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_date("15/01/2024"), Some(expected));
        assert_eq!(parse_date("15.01.24"), Some(expected));
        assert_eq!(parse_date("2024-01-15"), Some(expected));
        assert_eq!(parse_date("15 janvier 2024"), Some(expected));
        assert_eq!(parse_date("15 January 2024"), Some(expected));
        assert_eq!(parse_date("1er mars 2024"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_date("32/01/2024"), None);
    }

    #[test]
    fn test_date_processor() {
        assert_eq!(ValueProcessor::Date.apply("29/02/2024"), "2024-02-29");
        assert_eq!(ValueProcessor::Date.apply("3 août 2023"), "2023-08-03");
        assert_eq!(ValueProcessor::Date.apply("bientôt"), "");
    }

    #[test]
    fn test_currency_processor() {
        assert_eq!(ValueProcessor::Currency.apply("€"), "EUR");
        assert_eq!(ValueProcessor::Currency.apply("usd"), "USD");
        assert_eq!(ValueProcessor::Currency.apply("Dh"), "MAD");
        assert_eq!(ValueProcessor::Currency.apply("euros!"), "");
    }

    #[test]
    fn test_lookup_processor() {
        let processor = ValueProcessor::Lookup {
            entries: vec![
                LookupEntry::new("virement", "transfer"),
                LookupEntry::new("cheque", "check"),
            ],
            fallback: Some("other".to_string()),
        };
        assert_eq!(processor.apply("Virement bancaire"), "transfer");
        assert_eq!(processor.apply("Chèque n° 123"), "check");
        assert_eq!(processor.apply("troc"), "other");
    }

    #[test]
    fn test_custom_processor() {
        let processor = ValueProcessor::custom(|v| v.replace('O', "0"));
        assert_eq!(processor.apply(" PR0D-2O24 "), "PR0D-2024");
    }

    #[test]
    fn test_processor_json_shape() {
        let json = serde_json::to_string(&ValueProcessor::Amount).unwrap();
        assert_eq!(json, r#"{"kind":"amount"}"#);

        let parsed: ValueProcessor = serde_json::from_str(
            r#"{"kind":"lookup","entries":[{"contains":"carte","value":"card"}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.apply("Carte bleue"), "card");
    }
}
