//! Loads the monitored URL list from a CSV or plain-text file.
//!
//! CSV files need a `url` column and may carry optional `name` and
//! `category` columns. Text files hold one URL per line; blank lines and
//! `#` comments are ignored. A malformed row is skipped with a warning
//! rather than failing the whole list.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use url::Url;

use crate::models::MonitoredUrl;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct CsvRow {
    url: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

pub fn load_urls(path: &Path) -> Result<Vec<MonitoredUrl>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    let urls = match extension.as_deref() {
        Some("csv") => load_csv(path)?,
        Some("txt") => load_txt(path)?,
        other => {
            return Err(AppError::UrlList(format!(
                "unsupported URL list format: {}",
                other.unwrap_or("none")
            )))
        }
    };

    info!(path = %path.display(), count = urls.len(), "URL list loaded");
    Ok(urls)
}

fn load_csv(path: &Path) -> Result<Vec<MonitoredUrl>> {
    let mut reader = csv::Reader::from_path(path)?;

    if !reader
        .headers()?
        .iter()
        .any(|h| h.trim().eq_ignore_ascii_case("url"))
    {
        return Err(AppError::UrlList(format!(
            "{} is missing the required `url` column",
            path.display()
        )));
    }

    let mut urls = Vec::new();
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        match row {
            Ok(row) => {
                let url = row.url.trim();
                if url.is_empty() {
                    warn!(line = index + 2, "skipping row with empty url");
                    continue;
                }
                if Url::parse(url).is_err() {
                    warn!(line = index + 2, url, "skipping row with invalid url");
                    continue;
                }
                urls.push(MonitoredUrl {
                    url: url.to_string(),
                    name: normalize(row.name),
                    category: normalize(row.category),
                });
            }
            Err(e) => warn!(line = index + 2, error = %e, "skipping malformed row"),
        }
    }
    Ok(urls)
}

fn load_txt(path: &Path) -> Result<Vec<MonitoredUrl>> {
    let content = fs::read_to_string(path)?;

    let mut urls = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if Url::parse(line).is_err() {
            warn!(line = index + 1, url = line, "skipping invalid url");
            continue;
        }
        urls.push(MonitoredUrl {
            url: line.to_string(),
            name: Some(format!("Product_{}", index + 1)),
            category: None,
        });
    }
    Ok(urls)
}

fn normalize(field: Option<String>) -> Option<String> {
    field
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
}
