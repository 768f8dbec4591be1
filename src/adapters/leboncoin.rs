use scraper::Html;

use super::rules::{first_price, first_text, page_text, truncate_description};
use super::{ExtractedFields, SiteAdapter};
use crate::models::Availability;

const TITLE_SELECTORS: &[&str] = &[r#"h1[data-qa-id="adview_title"]"#, ".ad-title"];
const PRICE_SELECTORS: &[&str] = &[r#"[data-qa-id="adview_price"]"#, ".price"];
const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"[data-qa-id="adview_description_container"]"#,
    ".ad-description",
];

/// Phrases shown in place of a withdrawn or expired listing.
const EXPIRED_MARKERS: &[&str] = &[
    "cette annonce n'est plus disponible",
    "annonce expirée",
    "cette annonce a été supprimée",
];

/// Classified-ad listings have no stock concept: a reachable ad is for
/// sale, an expired one is not, and there are no ratings.
pub struct LeboncoinAdapter;

impl LeboncoinAdapter {
    pub fn new() -> Self {
        LeboncoinAdapter
    }

    fn availability(doc: &Html) -> Availability {
        let text = page_text(doc).to_lowercase();
        if EXPIRED_MARKERS.iter().any(|m| text.contains(m)) {
            Availability::OutOfStock
        } else {
            Availability::InStock
        }
    }
}

impl Default for LeboncoinAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for LeboncoinAdapter {
    fn site_family(&self) -> &'static str {
        "leboncoin"
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
            availability: Self::availability(&doc),
            rating: None,
            review_count: None,
            description: first_text(&doc, DESCRIPTION_SELECTORS)
                .map(|t| truncate_description(&t)),
        }
    }
}
