//! CSV run reports and the end-of-run summary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::models::{ChangeEvent, ProductRecord};
use crate::utils::error::Result;

const REPORT_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One row of the comparison report.
#[derive(Debug, Serialize)]
struct ComparisonRow<'a> {
    url: &'a str,
    kind: String,
    previous_value: &'a str,
    new_value: &'a str,
    percent_delta: String,
    timestamp: DateTime<Utc>,
}

pub struct ReportWriter {
    reports_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        ReportWriter {
            reports_dir: reports_dir.into(),
        }
    }

    /// Full observation dump for one run, one row per monitored URL.
    pub fn write_scrape_report(
        &self,
        records: &[ProductRecord],
        run_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        let path = self.report_path("competitive_report", run_at);
        fs::create_dir_all(&self.reports_dir)?;

        let mut writer = csv::Writer::from_path(&path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = records.len(), "scrape report written");
        Ok(path)
    }

    /// Detected changes for one run. Nothing is written when the run
    /// produced no events.
    pub fn write_comparison_report(
        &self,
        events: &[ChangeEvent],
        run_at: DateTime<Utc>,
    ) -> Result<Option<PathBuf>> {
        if events.is_empty() {
            return Ok(None);
        }

        let path = self.report_path("comparison_report", run_at);
        fs::create_dir_all(&self.reports_dir)?;

        let mut writer = csv::Writer::from_path(&path)?;
        for event in events {
            writer.serialize(ComparisonRow {
                url: &event.url,
                kind: event.kind.to_string(),
                previous_value: event.previous_value.as_deref().unwrap_or(""),
                new_value: event.new_value.as_deref().unwrap_or(""),
                percent_delta: event
                    .percent_delta
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                timestamp: event.detected_at,
            })?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = events.len(), "comparison report written");
        Ok(Some(path))
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    fn report_path(&self, stem: &str, run_at: DateTime<Utc>) -> PathBuf {
        self.reports_dir.join(format!(
            "{stem}_{}.csv",
            run_at.format(REPORT_TIMESTAMP_FORMAT)
        ))
    }
}

/// Aggregate statistics over one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub distinct_sites: usize,
    pub average_price: Option<Decimal>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl RunSummary {
    pub fn from_records(records: &[ProductRecord]) -> Self {
        let succeeded = records.iter().filter(|r| r.success).count();
        let sites: BTreeSet<&str> = records.iter().map(|r| r.site_family.as_str()).collect();

        let prices: Vec<Decimal> = records.iter().filter_map(|r| r.comparable_price()).collect();
        let average_price = if prices.is_empty() {
            None
        } else {
            Some(
                (prices.iter().copied().sum::<Decimal>() / Decimal::from(prices.len()))
                    .round_dp(2),
            )
        };

        RunSummary {
            total: records.len(),
            succeeded,
            failed: records.len() - succeeded,
            distinct_sites: sites.len(),
            average_price,
            min_price: prices.iter().copied().min(),
            max_price: prices.iter().copied().max(),
        }
    }

    pub fn log(&self) {
        info!(
            total = self.total,
            succeeded = self.succeeded,
            failed = self.failed,
            distinct_sites = self.distinct_sites,
            average_price = %self.average_price.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
            "run summary"
        );
    }

    /// Plain-text rendering used for the emailed digest.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        text.push_str(&format!("Produits analysés: {}\n", self.total));
        text.push_str(&format!("Scraping réussi: {}\n", self.succeeded));
        text.push_str(&format!("Scraping échoué: {}\n", self.failed));
        text.push_str(&format!("Sites différents: {}\n", self.distinct_sites));
        if let Some(average) = self.average_price {
            text.push_str(&format!("Prix moyen: {average}\n"));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Availability, ChangeKind, ErrorKind};
    use std::str::FromStr;
    use tempfile::TempDir;

    fn record(url: &str, site: &str, price: Option<&str>) -> ProductRecord {
        let mut record = ProductRecord::empty(url, site);
        record.price = price.map(|p| Decimal::from_str(p).unwrap());
        record.availability = Availability::InStock;
        record.success = true;
        record
    }

    #[test]
    fn test_scrape_report_has_one_row_per_record() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());

        let records = vec![
            record("https://a.test/p", "shopify", Some("10.00")),
            ProductRecord::failed("https://b.test/p", "amazon", ErrorKind::Blocked),
        ];
        let path = writer.write_scrape_report(&records, Utc::now()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        // Header plus two data rows.
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains("https://a.test/p"));
        assert!(content.contains("blocked"));
    }

    #[test]
    fn test_comparison_report_skipped_without_events() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());

        let path = writer.write_comparison_report(&[], Utc::now()).unwrap();
        assert!(path.is_none());
    }

    #[test]
    fn test_comparison_report_rows() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());

        let events = vec![
            ChangeEvent::new("https://a.test/p", ChangeKind::PriceIncrease)
                .with_values(Some("100".to_string()), Some("110".to_string()))
                .with_delta(Decimal::from_str("10.00").unwrap()),
            ChangeEvent::new("https://b.test/p", ChangeKind::AvailabilityChanged)
                .with_values(Some("in_stock".to_string()), Some("out_of_stock".to_string())),
        ];

        let path = writer
            .write_comparison_report(&events, Utc::now())
            .unwrap()
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();

        let header = content.lines().next().unwrap();
        assert_eq!(
            header,
            "url,kind,previous_value,new_value,percent_delta,timestamp"
        );
        assert!(content.contains("price_increase"));
        assert!(content.contains("availability_changed"));
        assert!(content.contains("10.00"));
        // Each row carries the detection timestamp.
        let year = Utc::now().format("%Y").to_string();
        assert!(content.lines().skip(1).all(|row| row.contains(&year)));
    }

    #[test]
    fn test_run_summary_statistics() {
        let records = vec![
            record("https://a.test/p", "shopify", Some("10.00")),
            record("https://b.test/p", "amazon", Some("30.00")),
            ProductRecord::failed("https://c.test/p", "amazon", ErrorKind::NetworkError),
        ];

        let summary = RunSummary::from_records(&records);

        assert_eq!(summary.total, 3);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.distinct_sites, 2);
        assert_eq!(
            summary.average_price,
            Some(Decimal::from_str("20.00").unwrap())
        );
        assert_eq!(summary.min_price, Some(Decimal::from_str("10.00").unwrap()));
        assert_eq!(summary.max_price, Some(Decimal::from_str("30.00").unwrap()));
    }

    #[test]
    fn test_run_summary_without_prices() {
        let records = vec![ProductRecord::failed(
            "https://a.test/p",
            "shopify",
            ErrorKind::Blocked,
        )];
        let summary = RunSummary::from_records(&records);
        assert_eq!(summary.average_price, None);
        assert!(summary.to_text().contains("Produits analysés: 1"));
    }
}
