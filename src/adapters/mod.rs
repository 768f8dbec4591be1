pub mod amazon;
pub mod beacon;
pub mod etsy;
pub mod fiverr;
pub mod leboncoin;
pub mod registry;
pub mod rules;
pub mod shopify;

pub use registry::AdapterRegistry;

use crate::models::Availability;
use rust_decimal::Decimal;

/// Raw field set pulled out of one product page. Every field degrades
/// independently; a missing selector never aborts the rest of the page.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub currency: Option<String>,
    pub availability: Availability,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub description: Option<String>,
}

impl ExtractedFields {
    /// True when nothing at all was recovered from the page.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.availability == Availability::Unknown
            && self.rating.is_none()
            && self.review_count.is_none()
            && self.description.is_none()
    }
}

/// One extraction strategy per site family. Adapters parse the document
/// themselves so no non-Send parser state crosses an await point.
pub trait SiteAdapter: Send + Sync {
    /// Stable identifier recorded on every observation, e.g. `"shopify"`.
    fn site_family(&self) -> &'static str;

    /// Pull product fields out of a fetched HTML document.
    fn extract(&self, html: &str) -> ExtractedFields;
}
