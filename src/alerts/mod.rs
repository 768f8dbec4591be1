pub mod email;

use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;
use tracing::info;

use crate::config::AlertPolicy;
use crate::models::{ChangeEvent, ChangeKind};
use crate::reports::RunSummary;
use crate::utils::error::Result;

pub use email::EmailNotifier;

/// Delivery channel for formatted alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, subject: &str, html_body: &str, text_body: &str) -> Result<()>;
}

/// Fallback channel used when SMTP is not configured: alerts land in the
/// log instead of being dropped silently.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, subject: &str, _html_body: &str, text_body: &str) -> Result<()> {
        info!(subject, body = %text_body, "alert delivered to log, email not configured");
        Ok(())
    }
}

/// Groups change events into per-kind alert emails and hands them to the
/// configured channel.
pub struct AlertDispatcher {
    policy: AlertPolicy,
    notifier: Arc<dyn Notifier>,
}

impl AlertDispatcher {
    pub fn new(policy: AlertPolicy, notifier: Arc<dyn Notifier>) -> Self {
        AlertDispatcher { policy, notifier }
    }

    /// Send at most one price alert and one stock alert for a batch of
    /// events. Returns the number of alerts sent.
    pub async fn dispatch(&self, events: &[ChangeEvent]) -> Result<usize> {
        if !self.policy.enabled {
            info!("alerting disabled, {} events suppressed", events.len());
            return Ok(0);
        }

        let price_events: Vec<&ChangeEvent> = events
            .iter()
            .filter(|e| {
                matches!(
                    e.kind,
                    ChangeKind::PriceIncrease | ChangeKind::PriceDecrease
                )
            })
            .collect();
        let stock_events: Vec<&ChangeEvent> = events
            .iter()
            .filter(|e| e.kind == ChangeKind::AvailabilityChanged)
            .collect();

        let mut sent = 0;

        if !price_events.is_empty() {
            let subject = format!(
                "🔔 Alerte Prix - {} changements détectés",
                price_events.len()
            );
            self.notifier
                .send(
                    &subject,
                    &price_alert_html(&price_events),
                    &price_alert_text(&price_events),
                )
                .await?;
            sent += 1;
        }

        if !stock_events.is_empty() {
            let subject = format!(
                "📦 Alerte Stock - {} changements détectés",
                stock_events.len()
            );
            self.notifier
                .send(
                    &subject,
                    &availability_alert_html(&stock_events),
                    &availability_alert_text(&stock_events),
                )
                .await?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Emailed end-of-run digest, used by scheduled runs.
    pub async fn send_digest(&self, summary: &RunSummary) -> Result<()> {
        if !self.policy.enabled {
            return Ok(());
        }
        let text = summary.to_text();
        let html = format!("<html><body><h2>Résumé du scraping</h2><pre>{text}</pre></body></html>");
        self.notifier
            .send("📊 Résumé du scraping concurrentiel", &html, &text)
            .await
    }
}

fn header_html(title: &str, count: usize, noun: &str) -> String {
    format!(
        r#"<html>
<head>
<style>
    body {{ font-family: Arial, sans-serif; }}
    .header {{ background-color: #f8f9fa; padding: 20px; }}
    .price-up {{ color: #e74c3c; font-weight: bold; }}
    .price-down {{ color: #27ae60; font-weight: bold; }}
    .product {{ margin: 15px 0; padding: 10px; border-left: 4px solid #3498db; }}
</style>
</head>
<body>
<div class="header">
    <h2>{title}</h2>
    <p>Détection de {count} {noun}</p>
    <p><strong>Date:</strong> {}</p>
</div>
"#,
        Local::now().format("%d/%m/%Y à %H:%M")
    )
}

fn price_alert_html(events: &[&ChangeEvent]) -> String {
    let mut html = header_html(
        "🔔 Alerte Changements de Prix",
        events.len(),
        "changements de prix significatifs",
    );

    for event in events {
        let rising = event.kind == ChangeKind::PriceIncrease;
        let class = if rising { "price-up" } else { "price-down" };
        let arrow = if rising { "📈" } else { "📉" };
        let delta = event
            .percent_delta
            .map(|d| d.to_string())
            .unwrap_or_default();

        html.push_str(&format!(
            r#"<div class="product">
    <p><strong>Prix précédent:</strong> {}</p>
    <p><strong>Prix actuel:</strong> <span class="{class}">{}</span></p>
    <p><strong>Variation:</strong> <span class="{class}">{arrow} {delta}%</span></p>
    <p><a href="{}">Voir le produit</a></p>
</div>
"#,
            event.previous_value.as_deref().unwrap_or("?"),
            event.new_value.as_deref().unwrap_or("?"),
            event.url,
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn price_alert_text(events: &[&ChangeEvent]) -> String {
    let mut text = format!("ALERTE PRIX - {} changements\n\n", events.len());
    for event in events {
        let delta = event
            .percent_delta
            .map(|d| d.to_string())
            .unwrap_or_default();
        text.push_str(&format!(
            "{}: {} -> {} ({delta}%)\n",
            event.url,
            event.previous_value.as_deref().unwrap_or("?"),
            event.new_value.as_deref().unwrap_or("?"),
        ));
    }
    text
}

fn availability_alert_html(events: &[&ChangeEvent]) -> String {
    let mut html = header_html(
        "📦 Alerte Changements de Stock",
        events.len(),
        "changements de disponibilité",
    );

    for event in events {
        html.push_str(&format!(
            r#"<div class="product">
    <p><strong>Avant:</strong> {}</p>
    <p><strong>Maintenant:</strong> {}</p>
    <p><a href="{}">Voir le produit</a></p>
</div>
"#,
            event.previous_value.as_deref().unwrap_or("?"),
            event.new_value.as_deref().unwrap_or("?"),
            event.url,
        ));
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn availability_alert_text(events: &[&ChangeEvent]) -> String {
    let mut text = format!("ALERTE STOCK - {} changements\n\n", events.len());
    for event in events {
        text.push_str(&format!(
            "{}: {} -> {}\n",
            event.url,
            event.previous_value.as_deref().unwrap_or("?"),
            event.new_value.as_deref().unwrap_or("?"),
        ));
    }
    text
}
