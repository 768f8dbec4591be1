use scraper::Html;

use super::rules::{
    element_exists, first_price, first_text, parse_availability, truncate_description, TextRules,
};
use super::{ExtractedFields, SiteAdapter};
use crate::models::Availability;

const TITLE_SELECTORS: &[&str] = &[
    r#"h1[data-test-id="listing-page-title"]"#,
    ".listing-page-title",
];
const PRICE_SELECTORS: &[&str] = &[
    r#"[data-test-id="listing-page-price"] .currency-value"#,
    ".currency-value",
    ".notranslate",
    ".shop2-listing-price",
];
const STOCK_SELECTORS: &[&str] = &[
    r#"[data-test-id="listing-page-inventory"]"#,
    ".listing-page-availability",
    ".stock-level",
];
const RATING_SELECTORS: &[&str] = &[
    r#"[data-test-id="review-star-rating"]"#,
    ".shop2-review-average",
    ".rating-text",
];
const REVIEW_COUNT_SELECTORS: &[&str] = &[
    r#"[data-test-id="review-count"]"#,
    ".review-count",
    "[data-review-count]",
];
const DESCRIPTION_SELECTORS: &[&str] = &[".listing-description", ".shop2-listing-description"];

pub struct EtsyAdapter {
    rules: TextRules,
}

impl EtsyAdapter {
    pub fn new() -> Self {
        EtsyAdapter {
            rules: TextRules::new(),
        }
    }

    /// Listings usually show a remaining-stock phrase; a digit in it means
    /// units are left even when no keyword matches. The cart button state
    /// is the last resort.
    fn availability(doc: &Html) -> Availability {
        if let Some(text) = first_text(doc, STOCK_SELECTORS) {
            let parsed = parse_availability(&text);
            if parsed != Availability::Unknown {
                return parsed;
            }
            if text.chars().any(|c| c.is_ascii_digit()) {
                return Availability::InStock;
            }
        }

        if element_exists(doc, r#"[data-test-id="add-to-cart-button"][disabled]"#)
            || element_exists(doc, r#"[data-test-id="add-to-cart-button"].disabled"#)
        {
            return Availability::OutOfStock;
        }
        if element_exists(doc, r#"[data-test-id="add-to-cart-button"]"#) {
            return Availability::InStock;
        }

        Availability::Unknown
    }
}

impl Default for EtsyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for EtsyAdapter {
    fn site_family(&self) -> &'static str {
        "etsy"
    }

    fn extract(&self, html: &str) -> ExtractedFields {
        let doc = Html::parse_document(html);

        let (price, currency) = match first_price(&doc, PRICE_SELECTORS) {
            Some((price, currency)) => (Some(price), currency),
            None => (None, None),
        };

        let rating = first_text(&doc, RATING_SELECTORS).and_then(|t| {
            self.rules
                .parse_rating(&t)
                .or_else(|| self.rules.parse_bare_rating(&t))
        });

        ExtractedFields {
            title: first_text(&doc, TITLE_SELECTORS),
            price,
            currency,
            availability: Self::availability(&doc),
            rating,
            review_count: first_text(&doc, REVIEW_COUNT_SELECTORS)
                .and_then(|t| self.rules.parse_bare_review_count(&t)),
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
    fn test_extract_listing_page() {
        let html = r#"
            <html><body>
              <h1 data-test-id="listing-page-title">Collier en argent fait main</h1>
              <div data-test-id="listing-page-price">
                <span class="currency-value">45,00 €</span>
              </div>
              <div data-test-id="listing-page-inventory">Plus que 3 en stock</div>
              <div data-test-id="review-star-rating">4,9</div>
              <span data-test-id="review-count">(212)</span>
              <div class="listing-description">Collier artisanal en argent 925.</div>
            </body></html>"#;

        let fields = EtsyAdapter::new().extract(html);

        assert_eq!(
            fields.title.as_deref(),
            Some("Collier en argent fait main")
        );
        assert_eq!(fields.price, Some(Decimal::from_str("45.00").unwrap()));
        assert_eq!(fields.availability, Availability::InStock);
        assert_eq!(fields.rating, Some(4.9));
        assert_eq!(fields.review_count, Some(212));
    }

    #[test]
    fn test_digit_bearing_stock_text_means_in_stock() {
        let html =
            r#"<div data-test-id="listing-page-inventory">Il en reste 2 !</div>"#;
        let fields = EtsyAdapter::new().extract(html);
        assert_eq!(fields.availability, Availability::InStock);
    }

    #[test]
    fn test_disabled_cart_button_means_out_of_stock() {
        let html = r#"<button data-test-id="add-to-cart-button" disabled>Sold out</button>"#;
        let fields = EtsyAdapter::new().extract(html);
        assert_eq!(fields.availability, Availability::OutOfStock);
    }

    #[test]
    fn test_enabled_cart_button_means_in_stock() {
        let html = r#"<button data-test-id="add-to-cart-button">Add to cart</button>"#;
        let fields = EtsyAdapter::new().extract(html);
        assert_eq!(fields.availability, Availability::InStock);
    }
}
