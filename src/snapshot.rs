//! Persistent snapshot store backing change detection. Each run is written
//! as a timestamped CSV under the data directory; on startup the most
//! recent file seeds the in-memory baseline so deltas survive restarts.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::models::ProductRecord;
use crate::utils::error::{AppError, Result};

const HISTORY_PREFIX: &str = "history_";
const HISTORY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Latest committed observation per URL.
///
/// Commits are whole-run and strictly ordered: a run whose start time does
/// not advance past the last committed run is rejected, so a replayed or
/// clock-skewed run can never roll the baseline backwards.
pub struct SnapshotStore {
    latest: HashMap<String, ProductRecord>,
    last_commit: Option<DateTime<Utc>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore {
            latest: HashMap::new(),
            last_commit: None,
        }
    }

    /// Seed the baseline from the most recent history file, if any.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut store = Self::new();

        let Some(path) = most_recent_history_file(data_dir)? else {
            info!("no snapshot history found, starting from an empty baseline");
            return Ok(store);
        };

        let mut reader = csv::Reader::from_path(&path)?;
        let mut loaded = 0usize;
        for row in reader.deserialize() {
            // A malformed row loses one record, not the whole baseline.
            match row {
                Ok(record) => {
                    store.insert(record);
                    loaded += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping malformed snapshot row"),
            }
        }

        store.last_commit = store.latest.values().map(|r| r.fetched_at).max();
        info!(path = %path.display(), records = loaded, "snapshot baseline loaded");
        Ok(store)
    }

    pub fn latest(&self, url: &str) -> Option<&ProductRecord> {
        self.latest.get(url)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Replace the baseline entries for every URL observed in this run.
    /// URLs absent from the run keep their previous snapshot.
    pub fn commit(&mut self, records: &[ProductRecord], run_at: DateTime<Utc>) -> Result<()> {
        if let Some(last) = self.last_commit {
            if run_at <= last {
                return Err(AppError::Snapshot(format!(
                    "run at {run_at} does not advance past last commit at {last}"
                )));
            }
        }

        for record in records {
            self.insert(record.clone());
        }
        self.last_commit = Some(run_at);
        Ok(())
    }

    /// Write one run's records as a new timestamped history file and
    /// return its path.
    pub fn persist(
        &self,
        data_dir: &Path,
        records: &[ProductRecord],
        run_at: DateTime<Utc>,
    ) -> Result<PathBuf> {
        fs::create_dir_all(data_dir)?;

        let filename = format!(
            "{HISTORY_PREFIX}{}.csv",
            run_at.format(HISTORY_TIMESTAMP_FORMAT)
        );
        let path = data_dir.join(filename);

        let mut writer = csv::Writer::from_path(&path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        info!(path = %path.display(), records = records.len(), "snapshot history written");
        Ok(path)
    }

    fn insert(&mut self, record: ProductRecord) {
        self.latest.insert(record.url.clone(), record);
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

/// History files sort lexicographically because the timestamp format is
/// fixed-width, so the maximum name is the newest run.
fn most_recent_history_file(data_dir: &Path) -> Result<Option<PathBuf>> {
    if !data_dir.exists() {
        return Ok(None);
    }

    let mut newest: Option<PathBuf> = None;
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(HISTORY_PREFIX) && name.ends_with(".csv") {
            if newest
                .as_ref()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .map_or(true, |current| name > current)
            {
                newest = Some(path);
            }
        }
    }
    Ok(newest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Availability;
    use chrono::Duration;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::TempDir;

    fn record(url: &str, price: &str) -> ProductRecord {
        let mut record = ProductRecord::empty(url, "shopify");
        record.price = Some(Decimal::from_str(price).unwrap());
        record.availability = Availability::InStock;
        record.success = true;
        record
    }

    #[test]
    fn test_commit_updates_latest() {
        let mut store = SnapshotStore::new();
        let t0 = Utc::now();

        store.commit(&[record("https://a.test/p", "10.00")], t0).unwrap();
        store
            .commit(&[record("https://a.test/p", "12.00")], t0 + Duration::seconds(60))
            .unwrap();

        let latest = store.latest("https://a.test/p").unwrap();
        assert_eq!(latest.price, Some(Decimal::from_str("12.00").unwrap()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_non_monotonic_commit_rejected() {
        let mut store = SnapshotStore::new();
        let t0 = Utc::now();

        store.commit(&[record("https://a.test/p", "10.00")], t0).unwrap();
        let err = store
            .commit(&[record("https://a.test/p", "9.00")], t0 - Duration::seconds(1))
            .unwrap_err();

        assert!(matches!(err, AppError::Snapshot(_)));
        // The baseline is untouched by the rejected commit.
        let latest = store.latest("https://a.test/p").unwrap();
        assert_eq!(latest.price, Some(Decimal::from_str("10.00").unwrap()));
    }

    #[test]
    fn test_urls_absent_from_run_keep_their_snapshot() {
        let mut store = SnapshotStore::new();
        let t0 = Utc::now();

        store
            .commit(
                &[record("https://a.test/p", "10.00"), record("https://b.test/p", "5.00")],
                t0,
            )
            .unwrap();
        store
            .commit(&[record("https://a.test/p", "11.00")], t0 + Duration::seconds(60))
            .unwrap();

        assert!(store.latest("https://b.test/p").is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_persist_and_reload_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = SnapshotStore::new();
        let t0 = Utc::now();

        let records = vec![record("https://a.test/p", "10.50")];
        store.commit(&records, t0).unwrap();
        store.persist(dir.path(), &records, t0).unwrap();

        let reloaded = SnapshotStore::load(dir.path()).unwrap();
        let latest = reloaded.latest("https://a.test/p").unwrap();
        assert_eq!(latest.price, Some(Decimal::from_str("10.50").unwrap()));
        assert_eq!(latest.availability, Availability::InStock);
        assert!(latest.success);
    }

    #[test]
    fn test_load_picks_most_recent_history_file() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new();
        let t0 = Utc::now();

        store
            .persist(dir.path(), &[record("https://a.test/p", "10.00")], t0)
            .unwrap();
        store
            .persist(
                dir.path(),
                &[record("https://a.test/p", "20.00")],
                t0 + Duration::seconds(90),
            )
            .unwrap();

        let reloaded = SnapshotStore::load(dir.path()).unwrap();
        let latest = reloaded.latest("https://a.test/p").unwrap();
        assert_eq!(latest.price, Some(Decimal::from_str("20.00").unwrap()));
    }

    #[test]
    fn test_load_from_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::load(&dir.path().join("absent")).unwrap();
        assert!(store.is_empty());
    }
}
