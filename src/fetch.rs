use rand::Rng;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect, Client, StatusCode};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::utils::error::{AppError, Result};

/// HTTP retrieval with rotating identity headers, politeness pacing, and
/// retry/backoff for transient blocks.
///
/// Retry applies to HTTP 403/429 and to connection/timeout failures only;
/// any other non-2xx status is a permanent page-level error and fails on the
/// first attempt.
pub struct FetchEngine {
    client: Client,
    config: FetchConfig,
}

enum AttemptError {
    /// 403 or 429, worth retrying with a longer pause.
    Blocked(u16),
    /// Connection or timeout failure, worth retrying.
    Transient(String),
    /// Permanent page-level failure, no retry.
    Fatal(AppError),
}

impl FetchEngine {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            header::ACCEPT_LANGUAGE,
            HeaderValue::from_static("fr-FR,fr;q=0.9,en;q=0.8"),
        );
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert(
            header::UPGRADE_INSECURE_REQUESTS,
            HeaderValue::from_static("1"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect::Policy::limited(10))
            .build()?;

        Ok(FetchEngine { client, config })
    }

    /// Fetch the raw document body for `url`.
    ///
    /// The politeness delay runs before every attempt, the first included.
    /// Cancellation is honored before each attempt and during waits.
    pub async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<String> {
        let mut backoff = ExponentialBackoff::from_millis(2)
            .factor(self.config.backoff_base_ms)
            .max_delay(Duration::from_secs(30))
            .map(jitter);

        let mut last_error = AttemptError::Transient("no attempt made".to_string());

        for attempt in 1..=self.config.max_retries {
            if cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            if attempt > 1 {
                let wait = backoff.next().unwrap_or_else(|| Duration::from_secs(30));
                debug!(url, attempt, ?wait, "backing off before retry");
                self.sleep_or_cancel(wait, cancel).await?;
            }

            self.politeness_delay(cancel).await?;

            match self.attempt(url).await {
                Ok(body) => {
                    debug!(url, attempt, "fetch succeeded");
                    return Ok(body);
                }
                Err(AttemptError::Fatal(err)) => return Err(err),
                Err(err) => {
                    match &err {
                        AttemptError::Blocked(status) => {
                            warn!(url, attempt, status, "blocking response, will retry")
                        }
                        AttemptError::Transient(summary) => {
                            warn!(url, attempt, %summary, "request failed, will retry")
                        }
                        AttemptError::Fatal(_) => unreachable!(),
                    }
                    last_error = err;
                }
            }
        }

        let attempts = self.config.max_retries;
        match last_error {
            AttemptError::Blocked(status) => Err(AppError::Blocked { status, attempts }),
            AttemptError::Transient(summary) => Err(AppError::Network { attempts, summary }),
            AttemptError::Fatal(err) => Err(err),
        }
    }

    async fn attempt(&self, url: &str) -> std::result::Result<String, AttemptError> {
        let user_agent = self.pick_user_agent();

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, user_agent)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    resp.text()
                        .await
                        .map_err(|e| AttemptError::Transient(e.to_string()))
                } else if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS
                {
                    Err(AttemptError::Blocked(status.as_u16()))
                } else {
                    Err(AttemptError::Fatal(AppError::HttpStatus {
                        status: status.as_u16(),
                    }))
                }
            }
            Err(e) => Err(AttemptError::Transient(e.to_string())),
        }
    }

    fn pick_user_agent(&self) -> &str {
        let index = rand::thread_rng().gen_range(0..self.config.user_agents.len());
        &self.config.user_agents[index]
    }

    async fn politeness_delay(&self, cancel: &CancellationToken) -> Result<()> {
        let ms = if self.config.delay_min_ms == self.config.delay_max_ms {
            self.config.delay_min_ms
        } else {
            rand::thread_rng().gen_range(self.config.delay_min_ms..=self.config.delay_max_ms)
        };
        self.sleep_or_cancel(Duration::from_millis(ms), cancel)
            .await
    }

    async fn sleep_or_cancel(&self, duration: Duration, cancel: &CancellationToken) -> Result<()> {
        tokio::select! {
            _ = cancel.cancelled() => Err(AppError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> FetchConfig {
        FetchConfig {
            timeout_secs: 5,
            max_retries: 3,
            delay_min_ms: 0,
            delay_max_ms: 1,
            backoff_base_ms: 1,
            ..FetchConfig::default()
        }
    }

    #[tokio::test]
    async fn test_successful_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/product"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let engine = FetchEngine::new(test_config()).unwrap();
        let cancel = CancellationToken::new();
        let body = engine
            .fetch(&format!("{}/product", server.uri()), &cancel)
            .await
            .unwrap();

        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_429_exhausts_retries_then_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let engine = FetchEngine::new(test_config()).unwrap();
        let cancel = CancellationToken::new();
        let err = engine.fetch(&server.uri(), &cancel).await.unwrap_err();

        match err {
            AppError::Blocked { status, attempts } => {
                assert_eq!(status, 429);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected Blocked, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_404_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let engine = FetchEngine::new(test_config()).unwrap();
        let cancel = CancellationToken::new();
        let err = engine.fetch(&server.uri(), &cancel).await.unwrap_err();

        assert!(matches!(err, AppError::HttpStatus { status: 404 }));
    }

    #[tokio::test]
    async fn test_403_then_success_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let engine = FetchEngine::new(test_config()).unwrap();
        let cancel = CancellationToken::new();
        let body = engine.fetch(&server.uri(), &cancel).await.unwrap();

        assert_eq!(body, "recovered");
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let engine = FetchEngine::new(test_config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine.fetch(&server.uri(), &cancel).await.unwrap_err();
        assert!(matches!(err, AppError::Cancelled));
    }

    #[tokio::test]
    async fn test_connection_refused_surfaces_network_error() {
        // Port 1 is never bound in test environments.
        let engine = FetchEngine::new(test_config()).unwrap();
        let cancel = CancellationToken::new();
        let err = engine
            .fetch("http://127.0.0.1:1/unreachable", &cancel)
            .await
            .unwrap_err();

        match err {
            AppError::Network { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected Network, got {other:?}"),
        }
    }
}
