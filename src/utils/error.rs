use thiserror::Error;

use crate::models::ErrorKind;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No adapter matches host: {host}")]
    UnsupportedSite { host: String },

    #[error("Request blocked (HTTP {status}) after {attempts} attempts")]
    Blocked { status: u16, attempts: u32 },

    #[error("Network error after {attempts} attempts: {summary}")]
    Network { attempts: u32, summary: String },

    #[error("HTTP error status {status}")]
    HttpStatus { status: u16 },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("URL list error: {0}")]
    UrlList(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Classify a per-URL failure for the scrape report. Errors that are not
    /// tied to a single URL (config, cancellation) have no report kind.
    pub fn report_kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::UnsupportedSite { .. } => Some(ErrorKind::UnsupportedSite),
            AppError::Blocked { .. } => Some(ErrorKind::Blocked),
            AppError::Network { .. } | AppError::Http(_) => Some(ErrorKind::NetworkError),
            AppError::HttpStatus { .. } => Some(ErrorKind::HttpError),
            AppError::Extraction(_) => Some(ErrorKind::ExtractionFailed),
            _ => None,
        }
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
