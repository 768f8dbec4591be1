use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub alerts: AlertsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-attempt request timeout in seconds.
    pub timeout_secs: u64,
    /// Total attempts for retryable failures (403/429, connect, timeout).
    pub max_retries: u32,
    /// Politeness delay window applied before every attempt, in milliseconds.
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    /// Multiplier for the exponential backoff between retry attempts.
    pub backoff_base_ms: u64,
    /// User-Agent rotation pool; one is picked pseudo-randomly per attempt.
    pub user_agents: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: 10,
            max_retries: 3,
            delay_min_ms: 2000,
            delay_max_ms: 5000,
            backoff_base_ms: 1000,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            ],
        }
    }
}

/// Threshold policy consumed by the change detector and the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    pub price_threshold_percent: Decimal,
    pub enabled: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        AlertPolicy {
            price_threshold_percent: Decimal::from(5),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub policy: AlertPolicy,
    pub smtp: SmtpConfig,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: Option<String>,
    pub from_name: String,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: None,
            password: None,
            from_address: None,
            from_name: "Pricewatch".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub reports_dir: PathBuf,
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            reports_dir: PathBuf::from("reports_output"),
            data_dir: PathBuf::from("data"),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "PRICEWATCH_"
            .add_source(Environment::with_prefix("PRICEWATCH").separator("__"))
            .build()?;

        let config: AppConfig = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Fetch timeout_secs must be greater than 0".into(),
            ));
        }

        if self.fetch.max_retries == 0 {
            return Err(ConfigError::Message(
                "Fetch max_retries must be greater than 0".into(),
            ));
        }

        if self.fetch.delay_min_ms > self.fetch.delay_max_ms {
            return Err(ConfigError::Message(
                "Fetch delay_min_ms cannot exceed delay_max_ms".into(),
            ));
        }

        if self.fetch.user_agents.is_empty() {
            return Err(ConfigError::Message(
                "Fetch user_agents pool cannot be empty".into(),
            ));
        }

        if self.alerts.policy.price_threshold_percent < Decimal::ZERO {
            return Err(ConfigError::Message(
                "Alert price_threshold_percent cannot be negative".into(),
            ));
        }

        if self.alerts.smtp.port == 0 {
            return Err(ConfigError::Message(
                "SMTP port must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// True when the SMTP section carries enough detail to build a mailer.
    pub fn email_configured(&self) -> bool {
        let smtp = &self.alerts.smtp;
        smtp.username.is_some() && smtp.password.is_some() && !self.alerts.recipients.is_empty()
    }
}
