// End-to-end tests over the full monitoring flow: URL file on disk,
// HTTP fetch against a local server, extraction, change detection,
// snapshot persistence, reports, and alert dispatch.

use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use pricewatch::adapters::registry::HostRule;
use pricewatch::adapters::shopify::ShopifyAdapter;
use pricewatch::adapters::{AdapterRegistry, SiteAdapter};
use pricewatch::config::{AppConfig, FetchConfig};
use pricewatch::models::{ChangeKind, MonitoredUrl};
use pricewatch::pipeline::Pipeline;
use pricewatch::utils::loader;
use pricewatch::alerts::Notifier;

struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        subject: &str,
        _html_body: &str,
        text_body: &str,
    ) -> pricewatch::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), text_body.to_string()));
        Ok(())
    }
}

fn test_config(workdir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.fetch = FetchConfig {
        delay_min_ms: 0,
        delay_max_ms: 1,
        backoff_base_ms: 1,
        ..FetchConfig::default()
    };
    config.storage.data_dir = workdir.path().join("data");
    config.storage.reports_dir = workdir.path().join("reports");
    config.storage.logs_dir = workdir.path().join("logs");
    config
}

fn local_pipeline(workdir: &TempDir) -> (Pipeline, Arc<RecordingNotifier>) {
    let shopify: Arc<dyn SiteAdapter> = Arc::new(ShopifyAdapter::new());
    let registry = AdapterRegistry::with_rules(vec![(HostRule::Suffix("127.0.0.1"), shopify)]);

    let notifier = Arc::new(RecordingNotifier {
        sent: Mutex::new(Vec::new()),
    });
    let pipeline =
        Pipeline::with_components(&test_config(workdir), registry, notifier.clone()).unwrap();
    (pipeline, notifier)
}

fn write_url_file(workdir: &TempDir, urls: &[String]) -> PathBuf {
    let path = workdir.path().join("input_urls.csv");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "url,name,category").unwrap();
    for url in urls {
        writeln!(file, "{url},Produit test,test").unwrap();
    }
    path
}

const PAGE_BASELINE: &str = r#"
    <html><body>
      <h1 class="product-title">Bougie artisanale</h1>
      <span class="price">20,00 €</span>
      <div class="product-availability">En stock</div>
    </body></html>"#;

const PAGE_PRICE_UP_AND_SOLD_OUT: &str = r#"
    <html><body>
      <h1 class="product-title">Bougie artisanale</h1>
      <span class="price">25,00 €</span>
      <div class="product-availability">Rupture de stock</div>
    </body></html>"#;

#[tokio::test]
async fn test_full_cycle_from_url_file_to_alerts() {
    let workdir = TempDir::new().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_BASELINE))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_PRICE_UP_AND_SOLD_OUT))
        .mount(&server)
        .await;

    let url_file = write_url_file(&workdir, &[format!("{}/produits/bougie", server.uri())]);
    let urls = loader::load_urls(&url_file).unwrap();
    assert_eq!(urls.len(), 1);
    assert_eq!(urls[0].name.as_deref(), Some("Produit test"));

    let (mut pipeline, notifier) = local_pipeline(&workdir);
    let cancel = CancellationToken::new();

    // First run: baseline only, no alerts.
    let first = pipeline.run(&urls, &cancel).await.unwrap();
    assert_eq!(first.events.len(), 1);
    assert_eq!(first.events[0].kind, ChangeKind::NewProduct);
    assert_eq!(first.alerts_sent, 0);

    // Second run: +25% price and stock flip, one alert each.
    let second = pipeline.run(&urls, &cancel).await.unwrap();
    let kinds: Vec<ChangeKind> = second.events.iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&ChangeKind::PriceIncrease));
    assert!(kinds.contains(&ChangeKind::AvailabilityChanged));
    assert_eq!(second.alerts_sent, 2);

    let sent = notifier.sent.lock().unwrap();
    assert!(sent[0].0.contains("Alerte Prix"));
    assert!(sent[0].1.contains("20.00 -> 25.00") || sent[0].1.contains("20 -> 25"));
    assert!(sent[1].0.contains("Alerte Stock"));
    assert!(sent[1].1.contains("in_stock -> out_of_stock"));
}

#[tokio::test]
async fn test_baseline_survives_a_restart() {
    let workdir = TempDir::new().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_BASELINE))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PAGE_PRICE_UP_AND_SOLD_OUT))
        .mount(&server)
        .await;

    let urls = vec![MonitoredUrl::new(format!("{}/produits/bougie", server.uri()))];
    let cancel = CancellationToken::new();

    {
        let (mut pipeline, _) = local_pipeline(&workdir);
        pipeline.run(&urls, &cancel).await.unwrap();
    }

    // A fresh pipeline over the same data directory remembers the run.
    let (mut pipeline, _) = local_pipeline(&workdir);
    let outcome = pipeline.run(&urls, &cancel).await.unwrap();

    let kinds: Vec<ChangeKind> = outcome.events.iter().map(|e| e.kind).collect();
    assert!(
        kinds.contains(&ChangeKind::PriceIncrease),
        "expected a price change against the reloaded baseline, got {kinds:?}"
    );
    assert!(!kinds.contains(&ChangeKind::NewProduct));
}

#[tokio::test]
async fn test_blocked_site_produces_failed_record_not_a_crash() {
    let workdir = TempDir::new().unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let urls = vec![MonitoredUrl::new(format!("{}/produits/bougie", server.uri()))];
    let (mut pipeline, notifier) = local_pipeline(&workdir);

    let outcome = pipeline
        .run(&urls, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert!(!outcome.records[0].success);
    assert_eq!(outcome.summary.failed, 1);
    // A first-seen failure is recorded but never alerted.
    assert!(notifier.sent.lock().unwrap().is_empty());
}
