//! Relay orchestration.
//!
//! This crate provides the [`Controller`] that drives the poll → classify →
//! deliver loop and the [`Deliverer`] that wraps every outbound POST in the
//! status-aware retry policy.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The controller sequences calls between business
//! logic in the [`pipeline`] crate and the infrastructure ports
//! ([`pipeline::EventSource`], [`pipeline::DeliveryTransport`]). It contains no
//! domain rules of its own and never touches HTTP directly.
//!
//! ## Shutdown
//!
//! A single [`tokio_util::sync::CancellationToken`] reaches every suspension
//! point (feed fetch, delivery POST, backoff wait). [`ControllerHandle::stop`]
//! fires it and joins the driver task.

pub mod delivery;
pub mod driver;

pub use delivery::{Deliverer, DeliveryReceipt};
pub use driver::{Controller, ControllerConfig, ControllerHandle, TickOutcome};
