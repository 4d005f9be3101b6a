//! The poll driver: one fetch → classify → deliver sequence per tick.
//!
//! Each tick's sequence is awaited inline, so a new tick can never start while
//! the previous one is still in flight and a game start is always delivered
//! before any death. The [`PipelineState`] is owned here and only changed
//! after a successful delivery.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    BackoffConfig, ChannelId, Classifier, DeliveryError, DeliveryTransport, Endpoint, EventSource,
    FetchError, Phase, PipelineState, RunId, SubjectName,
};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::delivery::Deliverer;

/// Runtime parameters for a [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Time between the start of consecutive ticks.
    pub poll_interval: Duration,
    /// Upper bound for every individual HTTP request.
    pub request_timeout: Duration,
    /// Retry pacing for deliveries.
    pub backoff: BackoffConfig,
    /// Tracked subject; resolved from the feed when `None`.
    pub subject: Option<SubjectName>,
    /// Channel forwarded in the game-start payload.
    pub channel: ChannelId,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The feed was unavailable or malformed, or the subject is not known yet.
    NoData,
    /// The batch contained nothing new.
    NothingToReport,
    Delivered(Endpoint),
    /// Delivery failed for good; the next tick carries on.
    DeliveryFailed(Endpoint),
    /// Shutdown was observed.
    Cancelled,
}

/// Owns the pipeline state and drives the relay.
pub struct Controller {
    source: Arc<dyn EventSource>,
    deliverer: Deliverer,
    config: ControllerConfig,
    classifier: Option<Classifier>,
    state: PipelineState,
    cancel: CancellationToken,
    run_id: RunId,
}

impl Controller {
    pub fn new(
        source: Arc<dyn EventSource>,
        transport: Arc<dyn DeliveryTransport>,
        config: ControllerConfig,
    ) -> Self {
        Self::with_cancel(source, transport, config, CancellationToken::new())
    }

    /// Creates a controller that stops when `cancel` fires.
    pub fn with_cancel(
        source: Arc<dyn EventSource>,
        transport: Arc<dyn DeliveryTransport>,
        config: ControllerConfig,
        cancel: CancellationToken,
    ) -> Self {
        let deliverer = Deliverer::new(
            transport,
            config.backoff,
            config.request_timeout,
            cancel.clone(),
        );
        let classifier = config
            .subject
            .clone()
            .map(|subject| Classifier::new(subject, config.channel.clone()));

        Self {
            source,
            deliverer,
            config,
            classifier,
            state: PipelineState::new(),
            cancel,
            run_id: RunId::new_random(),
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Runs one fetch → classify → deliver sequence.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.cancel.is_cancelled() {
            return TickOutcome::Cancelled;
        }

        let timeout = self.config.request_timeout;
        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return TickOutcome::Cancelled,
            fetched = self.source.fetch(timeout) => fetched,
        };

        let batch = match fetched {
            Ok(batch) => batch,
            Err(err @ FetchError::Unavailable { .. }) => {
                tracing::info!(error = %err, "waiting for game client");
                return TickOutcome::NoData;
            }
            Err(err @ FetchError::Malformed { .. }) => {
                tracing::warn!(error = %err, "ignoring feed response");
                return TickOutcome::NoData;
            }
        };
        tracing::debug!(events = batch.len(), phase = ?self.state.phase(), "polled feed");

        if batch.is_empty() {
            return TickOutcome::NothingToReport;
        }

        if self.classifier.is_none() {
            match self.resolve_subject().await {
                Some(subject) => {
                    tracing::info!(%subject, "tracking subject");
                    self.classifier = Some(Classifier::new(subject, self.config.channel.clone()));
                }
                None if self.cancel.is_cancelled() => return TickOutcome::Cancelled,
                None => return TickOutcome::NoData,
            }
        }

        let Some(record) = self
            .classifier
            .as_ref()
            .and_then(|classifier| classifier.classify(&batch, &self.state))
        else {
            return TickOutcome::NothingToReport;
        };

        let endpoint = record.endpoint();
        tracing::info!(kind = record.kind(), event_id = %record.event_id(), "detected transition");

        match self.deliverer.deliver(&record, endpoint).await {
            Ok(_) => {
                if self.state.record_delivered(&record) {
                    tracing::info!("session started; now tracking");
                }
                TickOutcome::Delivered(endpoint)
            }
            Err(err) if err.is_cancelled() => TickOutcome::Cancelled,
            Err(err @ DeliveryError::Rejected { .. }) => {
                tracing::error!(error = %err, "delivery rejected");
                self.state.record_abandoned(&record);
                TickOutcome::DeliveryFailed(endpoint)
            }
            Err(err) => {
                tracing::error!(error = %err, "delivery failed");
                TickOutcome::DeliveryFailed(endpoint)
            }
        }
    }

    async fn resolve_subject(&self) -> Option<SubjectName> {
        let resolved = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            resolved = self.source.active_subject(self.config.request_timeout) => resolved,
        };
        match resolved {
            Ok(subject) => Some(subject),
            Err(err) => {
                tracing::info!(error = %err, "active player not known yet");
                None
            }
        }
    }

    /// Ticks every `poll_interval` until cancelled, then returns the final state.
    ///
    /// A tick that overruns the interval delays the next one instead of
    /// bunching up.
    pub async fn run(mut self) -> PipelineState {
        let span = tracing::info_span!("relay", run_id = %self.run_id);
        async move {
            tracing::info!(
                interval_ms = self.config.poll_interval.as_millis() as u64,
                "controller started"
            );
            let mut ticker = tokio::time::interval(self.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                if self.tick().await == TickOutcome::Cancelled {
                    break;
                }
            }

            tracing::info!(phase = ?self.state.phase(), "controller stopped");
            self.state
        }
        .instrument(span)
        .await
    }

    /// Runs the controller on its own task.
    pub fn spawn(self) -> ControllerHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(self.run());
        ControllerHandle { cancel, task }
    }
}

/// Handle to a spawned [`Controller`].
pub struct ControllerHandle {
    cancel: CancellationToken,
    task: JoinHandle<PipelineState>,
}

impl ControllerHandle {
    /// Stops ticking, waits for the in-flight sequence to unwind, and returns
    /// the final state.
    pub async fn stop(self) -> Result<PipelineState, JoinError> {
        self.cancel.cancel();
        self.task.await
    }

    /// Returns `true` if the driver task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
