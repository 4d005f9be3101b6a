//! Relay delivery adapter.
//!
//! Implements the [`pipeline::DeliveryTransport`] trait over HTTP: one call is
//! one `POST {server}/{endpoint}` carrying an already-serialized JSON body.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Request construction, header conventions, timeout
//! mapping, and response inspection live here. Whether a response is worth
//! retrying is decided by the caller through [`pipeline::RetryPolicy`]; this
//! crate only reports what happened.

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{
    DeliveryTransport, Endpoint, PostResponse, RelayError, TransportError, JSON_CONTENT_TYPE,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};

/// Longest response-body excerpt kept for diagnostics.
const DETAIL_LIMIT: usize = 256;

/// [`DeliveryTransport`] that POSTs to the relay server.
#[derive(Debug, Clone)]
pub struct HttpDeliveryTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDeliveryTransport {
    /// Creates a transport posting under `base_url` through the shared `client`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, RelayError> {
        reqwest::Url::parse(base_url)
            .map_err(|e| RelayError::config(format!("invalid server URL '{base_url}': {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }
}

#[async_trait]
impl DeliveryTransport for HttpDeliveryTransport {
    async fn post_json(
        &self,
        endpoint: Endpoint,
        body: &[u8],
        timeout: Duration,
    ) -> Result<PostResponse, TransportError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .timeout(timeout)
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(timeout)
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        tracing::debug!(%endpoint, status, "server responded");

        let detail = if response.status().is_success() {
            String::new()
        } else {
            read_detail(response).await
        };

        Ok(PostResponse {
            status,
            detail,
            retry_after,
        })
    }
}

/// `Retry-After` in delta-seconds form; HTTP dates are ignored.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// First line of the body, reading at most [`DETAIL_LIMIT`] bytes.
async fn read_detail(mut response: reqwest::Response) -> String {
    let mut bytes = Vec::new();
    while bytes.len() < DETAIL_LIMIT {
        match response.chunk().await {
            Ok(Some(chunk)) => bytes.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    bytes.truncate(DETAIL_LIMIT);
    first_line(&bytes)
}

fn first_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .lines()
        .next()
        .unwrap_or_default()
        .trim_end()
        .to_owned()
}
