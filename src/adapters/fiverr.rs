use scraper::{Html, Selector};

use super::rules::{first_price, first_text, truncate_description, TextRules};
use super::{ExtractedFields, SiteAdapter};
use crate::models::Availability;

const TITLE_SELECTORS: &[&str] = &[
    "[data-gig-title]",
    "h1.gig-page-title",
    ".gig-title",
    "h1",
];
const PRICE_SELECTORS: &[&str] = &[
    ".price-value",
    ".starting-price",
    "[data-price]",
    ".price",
];
const RATING_SELECTORS: &[&str] = &[".rating-score", "[data-rating]", ".star-rating"];
const REVIEW_COUNT_SELECTORS: &[&str] = &[".reviews-count", "[data-reviews]", ".review-count"];
const DESCRIPTION_SELECTORS: &[&str] = &[
    ".gig-desc-container",
    ".description",
    ".gig-description",
];

/// A gig that renders is for sale; availability is therefore constant.
pub struct FiverrAdapter {
    rules: TextRules,
}

impl FiverrAdapter {
    pub fn new() -> Self {
        FiverrAdapter {
            rules: TextRules::new(),
        }
    }

    /// Scores are shown as a bare number next to the stars; anything that
    /// does not read as a 5-point value is some other element.
    fn rating(&self, doc: &Html) -> Option<f64> {
        for pattern in RATING_SELECTORS {
            let Ok(selector) = Selector::parse(pattern) else {
                continue;
            };
            for element in doc.select(&selector) {
                let text = element.text().collect::<String>();
                if let Some(rating) = self.rules.parse_bare_rating(&text) {
                    return Some(rating);
                }
            }
        }
        None
    }
}

impl Default for FiverrAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for FiverrAdapter {
    fn site_family(&self) -> &'static str {
        "fiverr"
    }

    fn extract(&self, html: &str) -> ExtractedFields {
        let doc = Html::parse_document(html);

        let (price, currency) = match first_price(&doc, PRICE_SELECTORS) {
            Some((price, currency)) => (Some(price), currency),
            None => (None, None),
        };

        ExtractedFields {
            title: first_text(&doc, TITLE_SELECTORS),
            price,
            currency,
            availability: Availability::InStock,
            rating: self.rating(&doc),
            review_count: first_text(&doc, REVIEW_COUNT_SELECTORS)
                .and_then(|t| self.rules.parse_bare_review_count(&t)),
            description: first_text(&doc, DESCRIPTION_SELECTORS)
                .map(|t| truncate_description(&t)),
        }
    }
}
