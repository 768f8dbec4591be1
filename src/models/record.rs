use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry from the user-supplied URL list. Immutable for the duration of
/// a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredUrl {
    pub url: String,
    pub name: Option<String>,
    pub category: Option<String>,
}

impl MonitoredUrl {
    pub fn new(url: impl Into<String>) -> Self {
        MonitoredUrl {
            url: url.into(),
            name: None,
            category: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    OutOfStock,
    #[default]
    Unknown,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::InStock => write!(f, "in_stock"),
            Availability::OutOfStock => write!(f, "out_of_stock"),
            Availability::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnsupportedSite,
    NetworkError,
    Blocked,
    HttpError,
    ExtractionFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnsupportedSite => write!(f, "unsupported_site"),
            ErrorKind::NetworkError => write!(f, "network_error"),
            ErrorKind::Blocked => write!(f, "blocked"),
            ErrorKind::HttpError => write!(f, "http_error"),
            ErrorKind::ExtractionFailed => write!(f, "extraction_failed"),
        }
    }
}

/// Normalized observation of a product page at one point in time.
///
/// Informational fields degrade independently to `None`/`Unknown`; a record
/// with `success == false` always carries an `error_kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRecord {
    pub url: String,
    pub site_family: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub availability: Availability,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub description: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
}

impl ProductRecord {
    /// Skeleton record for a URL with every informational field unknown.
    pub fn empty(url: impl Into<String>, site_family: impl Into<String>) -> Self {
        ProductRecord {
            url: url.into(),
            site_family: site_family.into(),
            name: None,
            category: None,
            title: None,
            price: None,
            currency: None,
            availability: Availability::Unknown,
            rating: None,
            review_count: None,
            description: None,
            fetched_at: Utc::now(),
            duration_ms: 0,
            success: false,
            error_kind: None,
        }
    }

    /// Record for a URL whose scrape failed before or during extraction.
    pub fn failed(url: impl Into<String>, site_family: impl Into<String>, kind: ErrorKind) -> Self {
        let mut record = Self::empty(url, site_family);
        record.error_kind = Some(kind);
        record
    }

    pub fn is_fully_unknown(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.availability == Availability::Unknown
            && self.rating.is_none()
            && self.review_count.is_none()
            && self.description.is_none()
    }

    /// Price usable for delta computation. A zero price is a historical
    /// parse failure, not a real price, and must not seed a percent delta.
    pub fn comparable_price(&self) -> Option<Decimal> {
        self.price.filter(|p| !p.is_zero())
    }
}
