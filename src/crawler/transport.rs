//! Transports: how a URL becomes raw page bytes
//!
//! `HttpTransport` issues a plain GET. `RenderTransport` asks an external
//! rendering service for the fully rendered DOM. Both produce the same
//! `RawResponse`, and the fetcher above them never knows which one ran.

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Header a rendering service uses to report the upstream status code
pub const UPSTREAM_STATUS_HEADER: &str = "x-response-code";

/// A completed HTTP exchange, successful or not
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    pub body: String,
    /// Parsed `Retry-After` header, in seconds
    pub retry_after: Option<Duration>,
}

/// Failures below the HTTP layer
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// Retrieves one URL
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        (**self).get(url).await
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Static retrieval: one GET per request
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let retry_after = retry_after(&response);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            final_url,
            body,
            retry_after,
        })
    }
}

#[derive(Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
}

/// Rendered retrieval through an external rendering service
///
/// The service receives `{"url": "<target>"}` as a JSON POST and answers
/// with the rendered HTML. When it reports the upstream status in the
/// `x-response-code` header, that status is used instead of its own.
#[derive(Debug, Clone)]
pub struct RenderTransport {
    client: Client,
    endpoint: String,
}

impl RenderTransport {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Transport for RenderTransport {
    async fn get(&self, url: &str) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RenderRequest { url })
            .send()
            .await?;

        let upstream = response
            .headers()
            .get(UPSTREAM_STATUS_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u16>().ok());
        let status = upstream.unwrap_or_else(|| response.status().as_u16());
        let retry_after = retry_after(&response);
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            final_url: url.to_string(),
            body,
            retry_after,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_transport_reads_status_and_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cards"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("Retry-After", "7")
                    .set_body_string("slow down"),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(Client::new());
        let response = transport
            .get(&format!("{}/cards", server.uri()))
            .await
            .unwrap();

        assert_eq!(response.status, 429);
        assert_eq!(response.retry_after, Some(Duration::from_secs(7)));
        assert_eq!(response.body, "slow down");
    }

    #[tokio::test]
    async fn test_render_transport_posts_target() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/render"))
            .and(body_json(serde_json::json!({"url": "https://dokkaninfo.com/cards/1"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(UPSTREAM_STATUS_HEADER, "404")
                    .set_body_string("<h1>Not found</h1>"),
            )
            .mount(&server)
            .await;

        let transport = RenderTransport::new(Client::new(), format!("{}/render", server.uri()));
        let response = transport.get("https://dokkaninfo.com/cards/1").await.unwrap();

        assert_eq!(response.status, 404);
        assert_eq!(response.final_url, "https://dokkaninfo.com/cards/1");
        assert_eq!(response.body, "<h1>Not found</h1>");
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_connect() {
        let transport = HttpTransport::new(Client::new());
        let err = transport.get("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_) | TransportError::Other(_)));
    }
}
