use scraper::Html;

use super::rules::{
    element_exists, first_price, first_text, parse_availability, truncate_description, TextRules,
};
use super::{ExtractedFields, SiteAdapter};
use crate::models::Availability;

const TITLE_SELECTORS: &[&str] = &[
    "h1.product-title",
    ".product__title",
    ".product-single__title",
    "h1",
];
const PRICE_SELECTORS: &[&str] = &[".price", ".product-price", ".money", ".current_price"];
const AVAILABILITY_SELECTORS: &[&str] = &[
    ".product-availability",
    ".inventory_quantity",
    ".stock-level",
];
const REVIEWS_SELECTORS: &[&str] = &[".reviews-summary", ".product-reviews", ".review-count"];
const DESCRIPTION_SELECTORS: &[&str] = &[
    ".product-description",
    ".product-single__description",
    ".rte",
];

/// Disabled add-to-cart controls, the fallback stock signal when no
/// availability label is rendered.
const DISABLED_CART_SELECTORS: &[&str] = &[
    "button.add-to-cart[disabled]",
    "button.btn-cart[disabled]",
    "button.product-submit[disabled]",
    "input.add-to-cart[disabled]",
    ".add-to-cart.disabled",
    ".btn-cart.disabled",
];

pub struct ShopifyAdapter {
    rules: TextRules,
}

impl ShopifyAdapter {
    pub fn new() -> Self {
        ShopifyAdapter {
            rules: TextRules::new(),
        }
    }

    fn availability(&self, doc: &Html) -> Availability {
        if let Some(text) = first_text(doc, AVAILABILITY_SELECTORS) {
            let parsed = parse_availability(&text);
            if parsed != Availability::Unknown {
                return parsed;
            }
        }

        if DISABLED_CART_SELECTORS
            .iter()
            .any(|pattern| element_exists(doc, pattern))
        {
            return Availability::OutOfStock;
        }

        Availability::Unknown
    }
}

impl Default for ShopifyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for ShopifyAdapter {
    fn site_family(&self) -> &'static str {
        "shopify"
    }

    fn extract(&self, html: &str) -> ExtractedFields {
        let doc = Html::parse_document(html);

        let (price, currency) = match first_price(&doc, PRICE_SELECTORS) {
            Some((price, currency)) => (Some(price), currency),
            None => (None, None),
        };

        let reviews_text = first_text(&doc, REVIEWS_SELECTORS);

        ExtractedFields {
            title: first_text(&doc, TITLE_SELECTORS),
            price,
            currency,
            availability: self.availability(&doc),
            rating: reviews_text
                .as_deref()
                .and_then(|t| self.rules.parse_rating(t)),
            review_count: reviews_text
                .as_deref()
                .and_then(|t| self.rules.parse_review_count(t)),
            description: first_text(&doc, DESCRIPTION_SELECTORS)
                .map(|t| truncate_description(&t)),
        }
    }
}
