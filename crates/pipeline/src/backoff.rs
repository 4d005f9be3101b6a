//! Jittered exponential backoff.
//!
//! A [`Backoff`] paces the retries of one logical operation. Each wait is drawn
//! uniformly from a window `[floor, ceiling)`; after every draw both edges of
//! the window double until the ceiling reaches the configured maximum, after
//! which the window stays fixed. Randomising within a window (rather than
//! around a single scalar) spreads the retries of operations that failed at
//! the same moment.
//!
//! A backoff is owned by exactly one in-flight operation and is never shared.
//! All suspensions observe a [`CancellationToken`]: once it fires, a pending
//! [`Backoff::wait`] returns immediately and [`Backoff::ongoing`] reports
//! `false`.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::{BackoffError, RelayError};

/// Retry pacing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    min_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
}

impl BackoffConfig {
    /// Creates a config; `max_retries == 0` means retry forever.
    ///
    /// Fails if `min_delay` exceeds `max_delay`.
    pub fn new(
        min_delay: Duration,
        max_delay: Duration,
        max_retries: u32,
    ) -> Result<Self, RelayError> {
        if min_delay > max_delay {
            return Err(RelayError::config(format!(
                "backoff minimum {min_delay:?} exceeds maximum {max_delay:?}"
            )));
        }
        Ok(Self {
            min_delay,
            max_delay,
            max_retries,
        })
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Retry limit; `0` is unlimited.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for BackoffConfig {
    /// 100ms growing to 5s, three retries.
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            max_retries: 3,
        }
    }
}

// ---------------------------------------------------------------------------

/// Retry state for a single operation.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    cancel: CancellationToken,
    retries: u32,
    delay_floor: Duration,
    delay_ceiling: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            cancel,
            retries: 0,
            delay_floor: config.min_delay,
            delay_ceiling: double_duration(config.min_delay, config.max_delay),
        }
    }

    /// Restores the initial window and retry count.
    pub fn reset(&mut self) {
        self.retries = 0;
        self.delay_floor = self.config.min_delay;
        self.delay_ceiling = double_duration(self.config.min_delay, self.config.max_delay);
    }

    /// `true` while not cancelled and the retry limit has not been reached.
    pub fn ongoing(&self) -> bool {
        !self.cancel.is_cancelled()
            && (self.config.max_retries == 0 || self.retries < self.config.max_retries)
    }

    /// Why retrying stopped, if it did.
    pub fn error(&self) -> Option<BackoffError> {
        if self.cancel.is_cancelled() {
            return Some(BackoffError::Cancelled);
        }
        if self.config.max_retries != 0 && self.retries >= self.config.max_retries {
            return Some(BackoffError::RetriesExhausted {
                retries: self.retries,
            });
        }
        None
    }

    /// Number of delays drawn so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// The current sampling window `[floor, ceiling)`.
    pub fn window(&self) -> (Duration, Duration) {
        (self.delay_floor, self.delay_ceiling)
    }

    /// Draws the next delay and advances the schedule.
    ///
    /// Counts as one retry.
    pub fn next_delay(&mut self) -> Duration {
        self.retries = self.retries.saturating_add(1);

        // min == max: nothing to jitter over.
        if self.delay_floor >= self.delay_ceiling {
            return self.delay_floor;
        }

        let span = u64::try_from((self.delay_ceiling - self.delay_floor).as_nanos())
            .unwrap_or(u64::MAX);
        let delay = self.delay_floor + Duration::from_nanos(rand::thread_rng().gen_range(0..span));

        if self.delay_ceiling < self.config.max_delay {
            self.delay_floor = double_duration(self.delay_floor, self.config.max_delay);
            self.delay_ceiling = double_duration(self.delay_ceiling, self.config.max_delay);
        }

        delay
    }

    /// Sleeps for the next delay, or until cancelled.
    ///
    /// Returns immediately when the retry that was just counted exhausted
    /// the limit.
    pub async fn wait(&mut self) {
        self.wait_at_least(Duration::ZERO).await;
    }

    /// Like [`Backoff::wait`], but never sleeps less than `floor`.
    ///
    /// `floor` is capped at the configured maximum delay, so a server hint
    /// cannot stretch one wait past the schedule's worst case.
    pub async fn wait_at_least(&mut self, floor: Duration) {
        let delay = self.next_delay().max(floor.min(self.config.max_delay));
        if !self.ongoing() {
            return;
        }

        tracing::debug!(delay_ms = delay.as_millis() as u64, retry = self.retries, "backing off");
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Doubles `current`, capped at `max`.
fn double_duration(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}
