use scraper::{Html, Selector};

use super::rules::{
    collapse_ws, detect_currency, first_price, first_text, page_text, parse_availability,
    truncate_description, TextRules,
};
use super::{ExtractedFields, SiteAdapter};

const TITLE_SELECTORS: &[&str] = &["#productTitle", ".product-title"];
const PRICE_SELECTORS: &[&str] = &[
    ".a-price-whole",
    "#priceblock_dealprice",
    "#priceblock_ourprice",
    ".a-offscreen",
    ".a-price.a-text-price.a-size-medium.apexPriceToPay",
    ".a-price-range",
];
const AVAILABILITY_SELECTORS: &[&str] = &[
    "#availability span",
    ".a-alert-content",
    ".availability-msg",
];
const RATING_SELECTORS: &[&str] = &[
    r#"[data-hook="average-star-rating"] .a-offscreen"#,
    ".a-icon-alt",
];
const REVIEW_COUNT_SELECTORS: &[&str] = &[
    r#"[data-hook="total-review-count"]"#,
    "#acrCustomerReviewText",
];
const DESCRIPTION_SELECTORS: &[&str] = &[".product-description", "#productDescription"];

/// Phrases that only appear on the interstitial served to suspected bots.
/// A page carrying one of these holds no product data at all.
const ROBOT_CHECK_MARKERS: &[&str] = &[
    "api-services-support@amazon.com",
    "robot check",
    "enter the characters you see below",
    "sorry, we just need to make sure you're not a robot",
];

pub struct AmazonAdapter {
    rules: TextRules,
}

impl AmazonAdapter {
    pub fn new() -> Self {
        AmazonAdapter {
            rules: TextRules::new(),
        }
    }

    fn is_robot_check(doc: &Html) -> bool {
        let text = page_text(doc).to_lowercase();
        ROBOT_CHECK_MARKERS.iter().any(|m| text.contains(m))
    }

    /// Star ratings live in alt-text spans shared with unrelated icons, so
    /// only elements naming the 5-point scale count.
    fn rating(&self, doc: &Html) -> Option<f64> {
        for pattern in RATING_SELECTORS {
            let Ok(selector) = Selector::parse(pattern) else {
                continue;
            };
            for element in doc.select(&selector) {
                let text = element.text().collect::<String>();
                if text.contains("sur 5") || text.contains("out of 5") {
                    if let Some(rating) = self.rules.parse_rating(&text) {
                        return Some(rating);
                    }
                }
            }
        }
        None
    }

    /// Bullet lists are joined into one line; the first five entries carry
    /// the substance, the rest is boilerplate.
    fn description(doc: &Html) -> Option<String> {
        if let Ok(bullets) = Selector::parse("#feature-bullets ul li") {
            let joined = doc
                .select(&bullets)
                .take(5)
                .map(|li| collapse_ws(&li.text().collect::<String>()))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" | ");
            if !joined.is_empty() {
                return Some(truncate_description(&joined));
            }
        }

        first_text(doc, DESCRIPTION_SELECTORS).map(|t| truncate_description(&t))
    }
}

impl Default for AmazonAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SiteAdapter for AmazonAdapter {
    fn site_family(&self) -> &'static str {
        "amazon"
    }

    fn extract(&self, html: &str) -> ExtractedFields {
        let doc = Html::parse_document(html);

        if Self::is_robot_check(&doc) {
            return ExtractedFields::default();
        }

        let (price, currency) = match first_price(&doc, PRICE_SELECTORS) {
            Some((price, currency)) => (Some(price), currency),
            None => (None, None),
        };
        // `.a-price-whole` holds only digits; the symbol lives in a
        // sibling span.
        let currency = currency.or_else(|| {
            first_text(&doc, &[".a-price-symbol"]).and_then(|s| detect_currency(&s))
        });

        ExtractedFields {
            title: first_text(&doc, TITLE_SELECTORS),
            price,
            currency,
            availability: first_text(&doc, AVAILABILITY_SELECTORS)
                .map(|t| parse_availability(&t))
                .unwrap_or_default(),
            rating: self.rating(&doc),
            review_count: first_text(&doc, REVIEW_COUNT_SELECTORS)
                .and_then(|t| self.rules.parse_review_count(&t)),
            description: Self::description(&doc),
        }
    }
}
