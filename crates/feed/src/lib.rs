//! Relay event source infrastructure.
//!
//! Implements the [`pipeline::EventSource`] trait against the game client's
//! local live-data API:
//!
//! | Call | Request |
//! |------|---------|
//! | [`EventSource::fetch`] | `GET {base}/liveclientdata/eventdata` |
//! | [`EventSource::active_subject`] | `GET {base}/liveclientdata/activeplayername` |
//!
//! Every failure to reach the client, and every non-success status, is
//! reported as [`FetchError::Unavailable`]: the client simply is not running
//! until a game is loaded. Bodies that do not parse are
//! [`FetchError::Malformed`]. Nothing here retries; the controller's poll
//! cadence does.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport details and the upstream JSON layout live
//! here. The [`pipeline`] crate sees only [`pipeline::EventSource`] and
//! [`pipeline::EventBatch`].

pub mod wire;

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{EventBatch, EventSource, FetchError, RelayError, SubjectName, JSON_CONTENT_TYPE};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

const EVENT_DATA_PATH: &str = "liveclientdata/eventdata";
const ACTIVE_PLAYER_PATH: &str = "liveclientdata/activeplayername";

/// [`EventSource`] backed by the game client's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpEventSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEventSource {
    /// Creates a source polling `base_url` through the shared `client`.
    pub fn new(client: reqwest::Client, base_url: &str) -> Result<Self, RelayError> {
        reqwest::Url::parse(base_url)
            .map_err(|e| RelayError::config(format!("invalid client URL '{base_url}': {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get(&self, path: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let url = self.url(path);
        let response = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::Unavailable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Unavailable {
                reason: format!("{url} answered HTTP {}", status.as_u16()),
            });
        }

        let body = response.bytes().await.map_err(|e| FetchError::Unavailable {
            reason: e.to_string(),
        })?;
        Ok(body.to_vec())
    }
}

#[async_trait]
impl EventSource for HttpEventSource {
    async fn fetch(&self, timeout: Duration) -> Result<EventBatch, FetchError> {
        let body = self.get(EVENT_DATA_PATH, timeout).await?;
        let batch = wire::parse_batch(&body)?;
        tracing::debug!(events = batch.len(), "fetched event data");
        Ok(batch)
    }

    async fn active_subject(&self, timeout: Duration) -> Result<SubjectName, FetchError> {
        let body = self.get(ACTIVE_PLAYER_PATH, timeout).await?;
        wire::parse_active_player(&body)
    }
}
