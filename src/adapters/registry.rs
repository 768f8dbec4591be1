use std::sync::Arc;
use url::Url;

use super::amazon::AmazonAdapter;
use super::beacon::BeaconAdapter;
use super::etsy::EtsyAdapter;
use super::fiverr::FiverrAdapter;
use super::leboncoin::LeboncoinAdapter;
use super::shopify::ShopifyAdapter;
use super::SiteAdapter;
use crate::utils::error::{AppError, Result};

/// How a rule matches the host of a monitored URL. Matching is on the
/// parsed host only, never on the full URL string, so a path like
/// `/amazon-dupes` cannot misroute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostRule {
    /// `etsy.com` matches `etsy.com` and any subdomain of it.
    Suffix(&'static str),
    /// `amazon` matches any host with that DNS label, covering the
    /// per-country storefronts (`amazon.fr`, `amazon.co.uk`, ...).
    Label(&'static str),
}

impl HostRule {
    fn matches(&self, host: &str) -> bool {
        match self {
            HostRule::Suffix(suffix) => {
                host == *suffix || host.ends_with(&format!(".{suffix}"))
            }
            HostRule::Label(label) => host.split('.').any(|part| part == *label),
        }
    }
}

/// Ordered table routing each monitored URL to its extraction strategy.
/// The first matching rule wins.
pub struct AdapterRegistry {
    rules: Vec<(HostRule, Arc<dyn SiteAdapter>)>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        let shopify: Arc<dyn SiteAdapter> = Arc::new(ShopifyAdapter::new());
        AdapterRegistry {
            rules: vec![
                (HostRule::Label("amazon"), Arc::new(AmazonAdapter::new())),
                (HostRule::Suffix("myshopify.com"), Arc::clone(&shopify)),
                (HostRule::Label("shopify"), shopify),
                (HostRule::Suffix("etsy.com"), Arc::new(EtsyAdapter::new())),
                (
                    HostRule::Suffix("leboncoin.fr"),
                    Arc::new(LeboncoinAdapter::new()),
                ),
                (HostRule::Suffix("beacon.by"), Arc::new(BeaconAdapter::new())),
                (HostRule::Suffix("fiverr.com"), Arc::new(FiverrAdapter::new())),
            ],
        }
    }

    /// Registry with an explicit rule table, for tests that need to route
    /// a local mock server to a real adapter.
    pub fn with_rules(rules: Vec<(HostRule, Arc<dyn SiteAdapter>)>) -> Self {
        AdapterRegistry { rules }
    }

    /// Find the adapter for a URL, or report the host as unsupported.
    pub fn resolve(&self, url: &str) -> Result<Arc<dyn SiteAdapter>> {
        let host = Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
            .ok_or_else(|| AppError::UnsupportedSite {
                host: url.to_string(),
            })?;

        self.rules
            .iter()
            .find(|(rule, _)| rule.matches(&host))
            .map(|(_, adapter)| Arc::clone(adapter))
            .ok_or(AppError::UnsupportedSite { host })
    }

    /// Distinct site families, in rule order.
    pub fn supported_sites(&self) -> Vec<&'static str> {
        let mut sites = Vec::new();
        for (_, adapter) in &self.rules {
            if !sites.contains(&adapter.site_family()) {
                sites.push(adapter.site_family());
            }
        }
        sites
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
