//! Core domain for the kill-feed relay.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, error type, and port trait used throughout the relay. Infrastructure
//! crates implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no network or file
//! I/O. It defines *what* is needed; infrastructure crates define *how* to
//! supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`EventId`, `SubjectName`, `ChannelId`, `RunId`) |
//! | [`types`] | Events, batches, delivery records, pipeline state |
//! | [`errors`] | Error taxonomy and retry policy |
//! | [`backoff`] | Jittered exponential backoff |
//! | [`classify`] | Batch + state → delivery record |
//! | [`ports`] | `EventSource` and `DeliveryTransport` traits |

pub mod backoff;
pub mod classify;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use backoff::{Backoff, BackoffConfig};
pub use classify::Classifier;
pub use errors::{
    is_success, BackoffError, DeliveryError, FetchError, RelayError, RetryPolicy, TransportError,
};
pub use identifiers::{ChannelId, EventId, RunId, SubjectName};
pub use ports::{DeliveryTransport, EventSource, PostResponse, JSON_CONTENT_TYPE};
pub use types::{
    DeliveryRecord, Endpoint, Event, EventBatch, EventTime, GameStart, Phase, PipelineState,
    PlayerDeath,
};
