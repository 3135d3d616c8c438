//! Polite fetcher
//!
//! Wraps a `Transport` with the politeness and failure policy every request
//! goes through:
//! - a global minimum delay between requests (`RateLimiter`)
//! - a hard timeout per attempt
//! - exponential backoff for transient failures (`RetryPolicy`)
//! - classification of HTTP statuses into transient, permanent and blocked
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | 2xx | `Document` |
//! | timeout, connection error, 408, 5xx | retried, then `Permanent` |
//! | 429, or 403 with `Retry-After` | `Blocked` (handled by the session) |
//! | any other status | `Permanent` immediately |

use crate::config::{Config, FetchStrategy, UserAgentConfig};
use crate::crawler::rate_limit::RateLimiter;
use crate::crawler::retry::RetryPolicy;
use crate::crawler::transport::{HttpTransport, RawResponse, RenderTransport, Transport};
use crate::extract::Document;
use crate::{ConfigError, DokkanError};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a fetch did not produce a document
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Worth retrying: timeouts, connection failures, 5xx
    #[error("transient failure fetching {url}: {reason}")]
    Transient {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// Not worth retrying within this run
    #[error("permanent failure fetching {url}: {reason}")]
    Permanent {
        url: String,
        reason: String,
        status: Option<u16>,
    },

    /// The source is throttling or blocking us
    #[error("blocked by source fetching {url} (HTTP {status})")]
    Blocked {
        url: String,
        status: u16,
        retry_after: Option<Duration>,
    },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Transient { url, .. } | Self::Permanent { url, .. } | Self::Blocked { url, .. } => {
                url
            }
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Permanent { status, .. } => *status,
            Self::Blocked { status, .. } => Some(*status),
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }
}

/// Capability to turn a URL into a `Document`
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError>;
}

/// Builds an HTTP client with the crawler's user agent
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `timeout` - Overall timeout for one request
///
/// # Example
///
/// ```no_run
/// use dokkan_archive::config::UserAgentConfig;
/// use dokkan_archive::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "DokkanArchive".to_string(),
///     crawler_version: "0.3".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Builds the fetcher selected by `[source] strategy`
pub fn build_fetcher(config: &Config) -> Result<Arc<dyn Fetcher>, DokkanError> {
    let client = build_http_client(&config.user_agent, config.crawler.request_timeout())?;
    let limiter = Arc::new(RateLimiter::new(config.crawler.rate_limit()));
    let policy = RetryPolicy::from_config(&config.crawler);
    let timeout = config.crawler.request_timeout();

    let fetcher: Arc<dyn Fetcher> = match config.source.strategy {
        FetchStrategy::Static => Arc::new(PoliteFetcher::new(
            HttpTransport::new(client),
            limiter,
            policy,
            timeout,
        )),
        FetchStrategy::Rendered => {
            let endpoint = config.source.render_endpoint.clone().ok_or_else(|| {
                ConfigError::Validation("render_endpoint is required".to_string())
            })?;
            Arc::new(PoliteFetcher::new(
                RenderTransport::new(client, endpoint),
                limiter,
                policy,
                timeout,
            ))
        }
    };

    Ok(fetcher)
}

/// Fetcher applying rate limiting, per-attempt timeouts and retries
pub struct PoliteFetcher<T> {
    transport: T,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    attempt_timeout: Duration,
}

impl<T: Transport> PoliteFetcher<T> {
    pub fn new(
        transport: T,
        limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            limiter,
            policy,
            attempt_timeout,
        }
    }

    async fn attempt(&self, url: &str) -> Result<Document, FetchError> {
        self.limiter.acquire().await;

        match tokio::time::timeout(self.attempt_timeout, self.transport.get(url)).await {
            Err(_) => Err(FetchError::Transient {
                url: url.to_string(),
                reason: format!("no response within {:?}", self.attempt_timeout),
                status: None,
            }),
            Ok(Err(e)) => Err(FetchError::Transient {
                url: url.to_string(),
                reason: e.to_string(),
                status: None,
            }),
            Ok(Ok(response)) => classify(url, response),
        }
    }
}

#[async_trait]
impl<T: Transport> Fetcher for PoliteFetcher<T> {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.attempt(url).await {
                Err(FetchError::Transient { reason, .. }) if self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::debug!(
                        "Attempt {} for {} failed ({}), retrying in {:?}",
                        attempt,
                        url,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(FetchError::Transient {
                    url,
                    reason,
                    status,
                }) => {
                    return Err(FetchError::Permanent {
                        url,
                        reason: format!("gave up after {} attempts: {}", attempt, reason),
                        status,
                    });
                }
                other => return other,
            }
        }
    }
}

/// Maps a response onto a document or a fetch error
fn classify(url: &str, response: RawResponse) -> Result<Document, FetchError> {
    let status = response.status;

    match status {
        200..=299 => {
            let doc_url = Url::parse(&response.final_url)
                .or_else(|_| Url::parse(url))
                .map_err(|e| FetchError::Permanent {
                    url: url.to_string(),
                    reason: format!("unusable URL: {}", e),
                    status: Some(status),
                })?;
            Ok(Document::new(doc_url, response.body))
        }
        429 => Err(FetchError::Blocked {
            url: url.to_string(),
            status,
            retry_after: response.retry_after,
        }),
        403 if response.retry_after.is_some() => Err(FetchError::Blocked {
            url: url.to_string(),
            status,
            retry_after: response.retry_after,
        }),
        408 | 500..=599 => Err(FetchError::Transient {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
            status: Some(status),
        }),
        _ => Err(FetchError::Permanent {
            url: url.to_string(),
            reason: format!("HTTP {}", status),
            status: Some(status),
        }),
    }
}
