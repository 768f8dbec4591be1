//! Shared extraction helpers used by every site adapter: selector fallback
//! chains, price normalization for both decimal conventions, bilingual
//! availability keywords, and rating/review text parsing.

use regex::Regex;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use std::str::FromStr;

use crate::models::Availability;

/// Maximum stored description length, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Phrases meaning the product cannot be bought. Checked before the
/// in-stock phrases because several are supersets of them
/// ("indisponible" contains "disponible").
const OUT_OF_STOCK_PHRASES: &[&str] = &[
    "out of stock",
    "sold out",
    "currently unavailable",
    "unavailable",
    "indisponible",
    "non disponible",
    "rupture de stock",
    "épuisé",
    "victime de son succès",
];

const IN_STOCK_PHRASES: &[&str] = &[
    "in stock",
    "en stock",
    "add to cart",
    "add to basket",
    "ajouter au panier",
    "available",
    "disponible",
];

/// Walk a fallback chain of CSS selectors and return the first non-empty
/// text. Invalid selectors are skipped so one bad pattern cannot disable
/// the rest of the chain.
pub fn first_text(doc: &Html, selectors: &[&str]) -> Option<String> {
    for pattern in selectors {
        let Ok(selector) = Selector::parse(pattern) else {
            continue;
        };
        if let Some(element) = doc.select(&selector).next() {
            let text = collapse_ws(&element.text().collect::<String>());
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// Scan a fallback chain for the first element whose text cleans to a
/// positive price. Unlike `first_text` this inspects every matching
/// element, since price selectors often also match struck-through or
/// hidden amounts that fail to parse.
pub fn first_price(doc: &Html, selectors: &[&str]) -> Option<(Decimal, Option<String>)> {
    for pattern in selectors {
        let Ok(selector) = Selector::parse(pattern) else {
            continue;
        };
        for element in doc.select(&selector) {
            let raw = element.text().collect::<String>();
            if let Some(price) = clean_price(&raw) {
                return Some((price, detect_currency(&raw)));
            }
        }
    }
    None
}

/// Full visible text of the document, used for block-page and
/// expired-listing detection.
pub fn page_text(doc: &Html) -> String {
    doc.root_element().text().collect()
}

/// True when any element matches the selector.
pub fn element_exists(doc: &Html, pattern: &str) -> bool {
    Selector::parse(pattern)
        .map(|selector| doc.select(&selector).next().is_some())
        .unwrap_or(false)
}

/// Normalize a displayed price into a positive decimal amount.
///
/// Handles both the European convention (`1.234,56 €`) and the US one
/// (`$1,234.56`); when only a comma is present, a one-or-two digit final
/// group is read as decimals and anything longer as thousands grouping.
/// Zero and negative amounts are rejected.
pub fn clean_price(raw: &str) -> Option<Decimal> {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if filtered.is_empty() {
        return None;
    }

    let normalized = match (filtered.rfind('.'), filtered.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => {
            // 1.234,56
            filtered.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => {
            // 1,234.56
            filtered.replace(',', "")
        }
        (None, Some(comma)) => {
            let decimals = filtered.len() - comma - 1;
            if (1..=2).contains(&decimals) {
                let (head, tail) = filtered.split_at(comma);
                format!("{}.{}", head.replace(',', ""), &tail[1..])
            } else {
                filtered.replace(',', "")
            }
        }
        (Some(_), None) if filtered.matches('.').count() > 1 => filtered.replace('.', ""),
        _ => filtered,
    };

    Decimal::from_str(&normalized)
        .ok()
        .filter(|price| *price > Decimal::ZERO)
}

/// Guess the currency from symbols or ISO codes in the raw price text.
pub fn detect_currency(raw: &str) -> Option<String> {
    let lower = raw.to_lowercase();
    if raw.contains('€') || lower.contains("eur") {
        Some("EUR".to_string())
    } else if raw.contains('£') || lower.contains("gbp") {
        Some("GBP".to_string())
    } else if raw.contains('$') || lower.contains("usd") {
        Some("USD".to_string())
    } else if raw.contains('¥') || lower.contains("jpy") {
        Some("JPY".to_string())
    } else {
        None
    }
}

/// Classify an availability phrase, French or English.
pub fn parse_availability(text: &str) -> Availability {
    let lower = text.to_lowercase();
    if OUT_OF_STOCK_PHRASES.iter().any(|p| lower.contains(p)) {
        Availability::OutOfStock
    } else if IN_STOCK_PHRASES.iter().any(|p| lower.contains(p)) {
        Availability::InStock
    } else {
        Availability::Unknown
    }
}

/// Truncate a description to its storage limit, on a character boundary.
pub fn truncate_description(text: &str) -> String {
    collapse_ws(text).chars().take(DESCRIPTION_MAX_CHARS).collect()
}

pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compiled patterns for the free-text rating fields. Built once per
/// adapter.
#[derive(Debug, Clone)]
pub struct TextRules {
    rating: Regex,
    review_count: Regex,
    bare_number: Regex,
}

impl Default for TextRules {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRules {
    pub fn new() -> Self {
        // Static patterns, compile failures are programmer errors.
        TextRules {
            rating: Regex::new(
                r"(\d+[.,]\d+)\s*(?:/\s*5|sur\s*5|out of 5|★|étoiles?|stars?)",
            )
            .unwrap(),
            review_count: Regex::new(r"(\d[\d\s.,\u{a0}\u{202f}]*)\s*(?:avis|reviews?|ratings?|évaluations?)")
                .unwrap(),
            bare_number: Regex::new(r"(\d[\d\s.,\u{a0}\u{202f}]*)").unwrap(),
        }
    }

    /// Rating from a phrase carrying a scale or star marker, e.g.
    /// "4,5 sur 5" or "4.8 stars".
    pub fn parse_rating(&self, text: &str) -> Option<f64> {
        let lower = text.to_lowercase();
        let capture = self.rating.captures(&lower)?;
        capture[1].replace(',', ".").parse().ok()
    }

    /// Rating from an element known to carry only the score, e.g. "4,9".
    /// Values outside the 0-5 scale are rejected.
    pub fn parse_bare_rating(&self, text: &str) -> Option<f64> {
        let value: f64 = text.trim().replace(',', ".").parse().ok()?;
        (0.0..=5.0).contains(&value).then_some(value)
    }

    /// Review count from phrases like "1 234 avis" or "2,891 ratings".
    pub fn parse_review_count(&self, text: &str) -> Option<u32> {
        let lower = text.to_lowercase();
        let capture = self.review_count.captures(&lower)?;
        Self::digits(&capture[1])
    }

    /// Review count from an element known to hold only the number,
    /// possibly wrapped in punctuation, e.g. "(47)".
    pub fn parse_bare_review_count(&self, text: &str) -> Option<u32> {
        let capture = self.bare_number.captures(text)?;
        Self::digits(&capture[1])
    }

    fn digits(group: &str) -> Option<u32> {
        let digits: String = group.chars().filter(char::is_ascii_digit).collect();
        digits.parse().ok()
    }
}
