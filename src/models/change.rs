use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    PriceIncrease,
    PriceDecrease,
    AvailabilityChanged,
    NewProduct,
    ExtractionFailed,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::PriceIncrease => write!(f, "price_increase"),
            ChangeKind::PriceDecrease => write!(f, "price_decrease"),
            ChangeKind::AvailabilityChanged => write!(f, "availability_changed"),
            ChangeKind::NewProduct => write!(f, "new_product"),
            ChangeKind::ExtractionFailed => write!(f, "extraction_failed"),
        }
    }
}

/// A typed, comparable difference between two snapshots of the same URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub url: String,
    pub kind: ChangeKind,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub percent_delta: Option<Decimal>,
    pub detected_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(url: impl Into<String>, kind: ChangeKind) -> Self {
        ChangeEvent {
            url: url.into(),
            kind,
            previous_value: None,
            new_value: None,
            percent_delta: None,
            detected_at: Utc::now(),
        }
    }

    pub fn with_values(
        mut self,
        previous: Option<String>,
        new: Option<String>,
    ) -> Self {
        self.previous_value = previous;
        self.new_value = new;
        self
    }

    pub fn with_delta(mut self, delta: Decimal) -> Self {
        self.percent_delta = Some(delta);
        self
    }
}
