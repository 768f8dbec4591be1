//! One monitoring run from URL list to alerts: fetch each page, extract,
//! diff against the snapshot baseline, commit, alert, and write reports.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::adapters::AdapterRegistry;
use crate::alerts::{AlertDispatcher, EmailNotifier, LogNotifier, Notifier};
use crate::config::AppConfig;
use crate::detector::ChangeDetector;
use crate::fetch::FetchEngine;
use crate::models::{ChangeEvent, ErrorKind, MonitoredUrl, ProductRecord};
use crate::reports::{ReportWriter, RunSummary};
use crate::snapshot::SnapshotStore;
use crate::utils::error::{AppError, Result};

/// Everything one run produced.
pub struct RunOutcome {
    pub records: Vec<ProductRecord>,
    pub events: Vec<ChangeEvent>,
    pub summary: RunSummary,
    pub alerts_sent: usize,
}

pub struct Pipeline {
    registry: AdapterRegistry,
    fetcher: FetchEngine,
    detector: ChangeDetector,
    dispatcher: AlertDispatcher,
    store: SnapshotStore,
    reports: ReportWriter,
    data_dir: PathBuf,
}

impl Pipeline {
    /// Build the pipeline from configuration, seeding the snapshot
    /// baseline from disk. Falls back to log-only alerting when SMTP is
    /// not fully configured.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let notifier: Arc<dyn Notifier> = if config.email_configured() {
            Arc::new(EmailNotifier::new(
                &config.alerts.smtp,
                &config.alerts.recipients,
            )?)
        } else {
            info!("SMTP not configured, alerts will be logged only");
            Arc::new(LogNotifier)
        };

        Self::with_components(config, AdapterRegistry::new(), notifier)
    }

    /// Variant with an injectable registry and channel, used by tests to
    /// route a local server to a real adapter.
    pub fn with_components(
        config: &AppConfig,
        registry: AdapterRegistry,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        Ok(Pipeline {
            registry,
            fetcher: FetchEngine::new(config.fetch.clone())?,
            detector: ChangeDetector::new(config.alerts.policy.clone()),
            dispatcher: AlertDispatcher::new(config.alerts.policy.clone(), notifier),
            store: SnapshotStore::load(&config.storage.data_dir)?,
            reports: ReportWriter::new(config.storage.reports_dir.clone()),
            data_dir: config.storage.data_dir.clone(),
        })
    }

    pub fn supported_sites(&self) -> Vec<&'static str> {
        self.registry.supported_sites()
    }

    /// Execute one full run. Change detection runs against the baseline
    /// BEFORE the run is committed, and the commit happens only after all
    /// URLs finished, so a crash mid-run never half-updates the baseline.
    ///
    /// Cancellation is honored between URLs: already scraped pages still
    /// produce reports and alerts.
    pub async fn run(
        &mut self,
        urls: &[MonitoredUrl],
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        let run_at = Utc::now();
        info!(urls = urls.len(), "monitoring run started");

        let mut records = Vec::with_capacity(urls.len());
        for (index, target) in urls.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(scraped = records.len(), total = urls.len(), "run cancelled");
                break;
            }
            info!(url = %target.url, position = index + 1, total = urls.len(), "scraping");

            match self.scrape_one(target, cancel).await {
                Ok(record) => records.push(record),
                Err(AppError::Cancelled) => {
                    warn!(scraped = records.len(), total = urls.len(), "run cancelled");
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        let events = self.detector.detect_run(&self.store, &records);
        if !records.is_empty() {
            self.store.commit(&records, run_at)?;
            self.store.persist(&self.data_dir, &records, run_at)?;
            self.reports.write_scrape_report(&records, run_at)?;
            self.reports.write_comparison_report(&events, run_at)?;
        }

        let alerts_sent = self.dispatcher.dispatch(&events).await?;

        let summary = RunSummary::from_records(&records);
        summary.log();

        Ok(RunOutcome {
            records,
            events,
            summary,
            alerts_sent,
        })
    }

    /// Emailed digest of a finished run.
    pub async fn send_summary(&self, summary: &RunSummary) -> Result<()> {
        self.dispatcher.send_digest(summary).await
    }

    /// Scrape one URL. Failures tied to the URL become a failed record;
    /// only cancellation propagates as an error.
    async fn scrape_one(
        &self,
        target: &MonitoredUrl,
        cancel: &CancellationToken,
    ) -> Result<ProductRecord> {
        let started = Instant::now();

        match self.try_scrape(target, cancel).await {
            Ok(mut record) => {
                record.duration_ms = started.elapsed().as_millis() as u64;
                Ok(record)
            }
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(err) => {
                let kind = err.report_kind().unwrap_or(ErrorKind::ExtractionFailed);
                warn!(url = %target.url, error = %err, "scrape failed");

                let site_family = self
                    .registry
                    .resolve(&target.url)
                    .map(|a| a.site_family())
                    .unwrap_or("unknown");
                let mut record = ProductRecord::failed(&target.url, site_family, kind);
                record.name = target.name.clone();
                record.category = target.category.clone();
                record.duration_ms = started.elapsed().as_millis() as u64;
                Ok(record)
            }
        }
    }

    async fn try_scrape(
        &self,
        target: &MonitoredUrl,
        cancel: &CancellationToken,
    ) -> Result<ProductRecord> {
        let adapter = self.registry.resolve(&target.url)?;
        let html = self.fetcher.fetch(&target.url, cancel).await?;

        let fields = adapter.extract(&html);
        if fields.is_empty() {
            return Err(AppError::Extraction(
                "no product fields recovered from page".to_string(),
            ));
        }

        let mut record = ProductRecord::empty(&target.url, adapter.site_family());
        record.name = target.name.clone();
        record.category = target.category.clone();
        record.title = fields.title;
        record.price = fields.price;
        record.currency = fields.currency;
        record.availability = fields.availability;
        record.rating = fields.rating;
        record.review_count = fields.review_count;
        record.description = fields.description;
        record.success = true;
        record.error_kind = None;
        Ok(record)
    }
}
