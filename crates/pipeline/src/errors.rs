//! Error and retry-policy types for the relay domain.
//!
//! [`RelayError`] covers conditions that stop the relay from starting at all.
//! Everything that can go wrong while running (an unreachable feed, a rejected
//! delivery) has its own type and is handled without stopping the process:
//!
//! | Type | Produced by | Controller reaction |
//! |------|-------------|---------------------|
//! | [`FetchError::Unavailable`] | feed poll | log, treat tick as empty |
//! | [`FetchError::Malformed`] | feed poll | log, treat tick as empty |
//! | [`DeliveryError::RetriesExhausted`] | delivery | log, continue next tick |
//! | [`DeliveryError::Rejected`] | delivery | log, continue next tick |
//! | [`DeliveryError::Cancelled`] | shutdown | unwind |
//!
//! [`RetryPolicy`] decides which delivery responses are worth another attempt.

use std::time::Duration;

use thiserror::Error;

use crate::Endpoint;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether a failed delivery attempt is safe to retry.
///
/// ## Rules
///
/// - `Retryable`: `429 Too Many Requests`, any `5xx`. Connection-level
///   failures (no status at all) are always retried by the caller.
/// - `NonRetryable`: every other non-success status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// The attempt may be repeated after a backoff wait.
    Retryable {
        /// Minimum wait requested by the server (`Retry-After`). `None` means
        /// apply the caller's own backoff schedule.
        after: Option<Duration>,
    },
    /// The attempt must not be repeated.
    NonRetryable,
}

impl RetryPolicy {
    /// Policy for a response with a non-success `status`.
    pub fn for_status(status: u16, retry_after: Option<Duration>) -> Self {
        if status == 429 || (500..600).contains(&status) {
            Self::Retryable { after: retry_after }
        } else {
            Self::NonRetryable
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

/// Returns `true` for `2xx` statuses.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

// ---------------------------------------------------------------------------
// Feed errors
// ---------------------------------------------------------------------------

/// Failure to obtain an event batch from the feed.
///
/// Never escalated: the next poll tick is the retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The feed could not be reached or answered with a non-success status.
    ///
    /// Normal while the game client is not running yet.
    #[error("feed unavailable: {reason}")]
    Unavailable { reason: String },

    /// The feed answered successfully but the body did not have the expected shape.
    #[error("feed returned a malformed body: {reason}")]
    Malformed { reason: String },
}

// ---------------------------------------------------------------------------
// Delivery errors
// ---------------------------------------------------------------------------

/// A single delivery attempt that produced no HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),
}

/// Terminal outcome of delivering one record.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The record could not be serialized.
    #[error("failed to encode {endpoint} payload: {source}")]
    Encode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },

    /// The server answered with a status that is not worth retrying.
    #[error("{endpoint} rejected with HTTP {status}: {detail}")]
    Rejected {
        endpoint: Endpoint,
        status: u16,
        /// First line of the response body, possibly empty.
        detail: String,
    },

    /// Every permitted attempt failed with a retryable error.
    #[error("{endpoint} delivery gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        endpoint: Endpoint,
        attempts: u32,
        /// Description of the final failed attempt.
        last: String,
    },

    /// Shutdown was requested before delivery completed.
    #[error("{endpoint} delivery cancelled")]
    Cancelled { endpoint: Endpoint },
}

impl DeliveryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

// ---------------------------------------------------------------------------
// Backoff errors
// ---------------------------------------------------------------------------

/// Why a [`crate::Backoff`] stopped permitting retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackoffError {
    #[error("backoff cancelled")]
    Cancelled,

    #[error("terminated after {retries} retries")]
    RetriesExhausted { retries: u32 },
}

// ---------------------------------------------------------------------------
// Startup errors
// ---------------------------------------------------------------------------

/// Errors that prevent the relay from starting.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; the relay never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl RelayError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}
