//! Port traits implemented by infrastructure crates.
//!
//! The relay needs exactly two capabilities from the outside world: reading
//! the live feed and posting JSON to the delivery server. Each is a single
//! dyn-compatible trait so the controller can be wired to HTTP backends in
//! production and to in-memory fakes in tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::{Endpoint, EventBatch, FetchError, SubjectName, TransportError};

/// Value of both `Content-Type` and `Accept` on every outbound request.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Source of live feed batches.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetches the current batch, bounded by `timeout`.
    ///
    /// Performs no retries; the poll cadence is the retry.
    async fn fetch(&self, timeout: Duration) -> Result<EventBatch, FetchError>;

    /// Asks the feed who the local player is.
    ///
    /// Used when no subject name was configured.
    async fn active_subject(&self, timeout: Duration) -> Result<SubjectName, FetchError>;
}

/// Response to one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    pub status: u16,
    /// First line of the response body (at most 256 bytes), for diagnostics.
    pub detail: String,
    /// Parsed `Retry-After` header, when present in whole seconds.
    pub retry_after: Option<Duration>,
}

impl PostResponse {
    /// A bare response with no body and no retry hint.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            detail: String::new(),
            retry_after: None,
        }
    }
}

/// Sink for serialized delivery records.
///
/// One call is one attempt; retry policy lives in the caller.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// POSTs `body` as JSON to `endpoint`, bounded by `timeout`.
    ///
    /// Any HTTP response, successful or not, is `Ok`; `Err` means no response
    /// was received.
    async fn post_json(
        &self,
        endpoint: Endpoint,
        body: &[u8],
        timeout: Duration,
    ) -> Result<PostResponse, TransportError>;
}
