//! Reliable delivery of one record: serialize, POST, retry on transient failure.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    is_success, Backoff, BackoffConfig, BackoffError, DeliveryError, DeliveryRecord,
    DeliveryTransport, Endpoint, RetryPolicy,
};
use tokio_util::sync::CancellationToken;

/// Result of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub endpoint: Endpoint,
    pub status: u16,
    /// Total POST attempts, including the successful one.
    pub attempts: u32,
    /// Backoff waits taken between attempts.
    pub backoff_waits: u32,
}

/// Posts records through a [`DeliveryTransport`], retrying connection
/// failures, `429`, and `5xx` responses under a fresh [`Backoff`] per record.
///
/// Every other non-success status fails immediately without waiting.
pub struct Deliverer {
    transport: Arc<dyn DeliveryTransport>,
    backoff: BackoffConfig,
    request_timeout: Duration,
    cancel: CancellationToken,
}

impl Deliverer {
    pub fn new(
        transport: Arc<dyn DeliveryTransport>,
        backoff: BackoffConfig,
        request_timeout: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            backoff,
            request_timeout,
            cancel,
        }
    }

    /// Delivers `record` to `endpoint`.
    ///
    /// Returns the last failure once the backoff stops permitting retries, or
    /// [`DeliveryError::Cancelled`] as soon as shutdown is requested.
    pub async fn deliver(
        &self,
        record: &DeliveryRecord,
        endpoint: Endpoint,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let body = serde_json::to_vec(record)
            .map_err(|source| DeliveryError::Encode { endpoint, source })?;
        let mut backoff = Backoff::new(self.backoff, self.cancel.clone());
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            tracing::info!(
                %endpoint,
                attempt = attempts,
                event_id = %record.event_id(),
                "sending {}",
                record.kind()
            );

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(DeliveryError::Cancelled { endpoint });
                }
                outcome = self.transport.post_json(endpoint, &body, self.request_timeout) => {
                    outcome
                }
            };

            let (failure, retry_after) = match outcome {
                Ok(response) if is_success(response.status) => {
                    tracing::info!(%endpoint, status = response.status, attempts, "delivered");
                    return Ok(DeliveryReceipt {
                        endpoint,
                        status: response.status,
                        attempts,
                        backoff_waits: backoff.retries(),
                    });
                }
                Ok(response) => {
                    match RetryPolicy::for_status(response.status, response.retry_after) {
                        RetryPolicy::NonRetryable => {
                            return Err(DeliveryError::Rejected {
                                endpoint,
                                status: response.status,
                                detail: response.detail,
                            });
                        }
                        RetryPolicy::Retryable { after } => (
                            format!("HTTP {}: {}", response.status, response.detail),
                            after,
                        ),
                    }
                }
                // No response at all: always worth another attempt.
                Err(err) => (err.to_string(), None),
            };

            tracing::warn!(
                %endpoint,
                attempt = attempts,
                error = %failure,
                "delivery attempt failed"
            );
            backoff.wait_at_least(retry_after.unwrap_or_default()).await;

            if !backoff.ongoing() {
                return Err(match backoff.error() {
                    Some(BackoffError::Cancelled) => DeliveryError::Cancelled { endpoint },
                    _ => DeliveryError::RetriesExhausted {
                        endpoint,
                        attempts,
                        last: failure,
                    },
                });
            }
        }
    }
}
