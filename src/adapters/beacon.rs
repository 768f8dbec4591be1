use scraper::Html;

use super::rules::{first_price, first_text, parse_availability, truncate_description};
use super::{ExtractedFields, SiteAdapter};
use crate::models::Availability;

const TITLE_SELECTORS: &[&str] = &["h1.service-title", ".service-name", "h1", ".title"];
const PRICE_SELECTORS: &[&str] = &[".price", ".service-price", ".pricing", "[data-price]"];
const AVAILABILITY_SELECTORS: &[&str] = &[".availability", ".service-status", ".status"];
const DESCRIPTION_SELECTORS: &[&str] = &[
    ".service-description",
    ".description",
    ".service-details",
];

/// Service pages on beacon.by carry no ratings, and a published page is
/// bookable unless it says otherwise.
pub struct BeaconAdapter;

impl BeaconAdapter {
    pub fn new() -> Self {
        BeaconAdapter
    }
}

impl Default for BeaconAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for BeaconAdapter {
    fn site_family(&self) -> &'static str {
        "beacon"
    }

    fn extract(&self, html: &str) -> ExtractedFields {
        let doc = Html::parse_document(html);

        let (price, currency) = match first_price(&doc, PRICE_SELECTORS) {
            Some((price, currency)) => (Some(price), currency),
            None => (None, None),
        };

        let availability = match first_text(&doc, AVAILABILITY_SELECTORS) {
            Some(text) => parse_availability(&text),
            None => Availability::InStock,
        };

        ExtractedFields {
            title: first_text(&doc, TITLE_SELECTORS),
            price,
            currency,
            availability,
            rating: None,
            review_count: None,
            description: first_text(&doc, DESCRIPTION_SELECTORS)
                .map(|t| truncate_description(&t)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn test_extract_service_page() {
        let html = r#"
            <html><body>
              <h1 class="service-title">Audit SEO complet</h1>
              <div class="service-price">$150</div>
              <div class="service-description">Analyse complète de votre site.</div>
            </body></html>"#;

        let fields = BeaconAdapter::new().extract(html);

        assert_eq!(fields.title.as_deref(), Some("Audit SEO complet"));
        assert_eq!(fields.price, Some(Decimal::from_str("150").unwrap()));
        assert_eq!(fields.currency.as_deref(), Some("USD"));
        assert_eq!(fields.availability, Availability::InStock);
    }

    #[test]
    fn test_explicit_status_overrides_default() {
        let html = r#"<div class="service-status">Indisponible</div>"#;
        let fields = BeaconAdapter::new().extract(html);
        assert_eq!(fields.availability, Availability::OutOfStock);
    }
}
