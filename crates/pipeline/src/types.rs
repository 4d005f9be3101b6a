//! Shared value types for the relay domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. event times are finite and
//! non-negative, the pipeline state only ever moves forward) and participate in
//! domain computations.

use serde::Serialize;

use crate::{ChannelId, EventId, SubjectName};

// ---------------------------------------------------------------------------
// Feed events
// ---------------------------------------------------------------------------

/// Seconds elapsed since the session began, as reported by the feed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct EventTime(f64);

impl EventTime {
    /// Creates an [`EventTime`], returning `None` if `seconds` is negative,
    /// infinite, or NaN.
    #[must_use]
    pub fn new(seconds: f64) -> Option<Self> {
        if seconds.is_finite() && seconds >= 0.0 {
            Some(Self(seconds))
        } else {
            None
        }
    }

    /// Returns the time in seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for EventTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

// ---------------------------------------------------------------------------

/// One occurrence in the live feed. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Feed-assigned identifier.
    pub id: EventId,
    /// Event kind as named by the feed (e.g. `"GameStart"`, `"ChampionKill"`).
    pub name: String,
    /// When the event happened, relative to session start.
    pub time: EventTime,
    /// Who scored the kill, for kill events.
    pub killer: Option<String>,
    /// Who died, for kill events.
    pub victim: Option<String>,
}

impl Event {
    /// Returns `true` if `subject` is the victim of this event.
    pub fn is_death_of(&self, subject: &SubjectName) -> bool {
        self.victim.as_deref() == Some(subject.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Ordered events returned by one poll of the feed.
///
/// Ephemeral: created per poll and discarded after classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBatch(Vec<Event>);

impl EventBatch {
    /// Wraps events in poll order.
    pub fn new(events: Vec<Event>) -> Self {
        Self(events)
    }

    /// Returns an empty batch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Events in the order the feed returned them.
    pub fn events(&self) -> &[Event] {
        &self.0
    }

    /// The first event, if any.
    pub fn first(&self) -> Option<&Event> {
        self.0.first()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Event>> for EventBatch {
    fn from(events: Vec<Event>) -> Self {
        Self(events)
    }
}

// ---------------------------------------------------------------------------
// Delivery records
// ---------------------------------------------------------------------------

/// Payload announcing that the session has started.
///
/// Field names are fixed by the remote server's JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStart {
    #[serde(rename = "SummonerName")]
    pub summoner_name: SubjectName,
    #[serde(rename = "EventID")]
    pub event_id: EventId,
    #[serde(rename = "EventName")]
    pub event_name: String,
    #[serde(rename = "EventTime")]
    pub event_time: EventTime,
    #[serde(rename = "ChannelId")]
    pub channel_id: ChannelId,
}

/// Payload announcing that the tracked subject died.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerDeath {
    #[serde(rename = "EventID")]
    pub event_id: EventId,
    #[serde(rename = "EventName")]
    pub event_name: String,
    #[serde(rename = "EventTime")]
    pub event_time: EventTime,
    /// Empty when the feed did not name a killer.
    #[serde(rename = "KillerName")]
    pub killer_name: String,
    #[serde(rename = "VictimName")]
    pub victim_name: String,
}

/// A detected transition, ready for delivery.
///
/// Built by the [`crate::Classifier`] and consumed exactly once by delivery.
/// Serializes as the bare inner payload (no variant tag).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DeliveryRecord {
    GameStart(GameStart),
    PlayerDeath(PlayerDeath),
}

impl DeliveryRecord {
    /// The remote endpoint this record is posted to.
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::GameStart(_) => Endpoint::GameStarted,
            Self::PlayerDeath(_) => Endpoint::Death,
        }
    }

    /// Feed id of the event this record was built from.
    pub fn event_id(&self) -> EventId {
        match self {
            Self::GameStart(r) => r.event_id,
            Self::PlayerDeath(r) => r.event_id,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GameStart(_) => "game_start",
            Self::PlayerDeath(_) => "player_death",
        }
    }
}

// ---------------------------------------------------------------------------

/// Remote endpoints accepted by the delivery server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    GameStarted,
    Death,
}

impl Endpoint {
    /// Path segment appended to the server base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::GameStarted => "game_started",
            Self::Death => "death",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

// ---------------------------------------------------------------------------
// Pipeline state
// ---------------------------------------------------------------------------

/// Controller phase derived from [`PipelineState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Waiting for the session to start.
    Idle,
    /// Session start delivered; watching for deaths.
    Tracking,
}

/// The single piece of mutable pipeline state.
///
/// Owned by the controller, which mutates it only after a successful
/// delivery; the classifier reads it. `started` moves `false -> true` exactly
/// once and is never reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineState {
    started: bool,
    last_death: Option<EventId>,
}

impl PipelineState {
    /// Fresh state: not started, no deaths reported.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once the session start has been delivered.
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn phase(&self) -> Phase {
        if self.started {
            Phase::Tracking
        } else {
            Phase::Idle
        }
    }

    /// Id of the most recent death that was delivered.
    pub fn last_death(&self) -> Option<EventId> {
        self.last_death
    }

    /// Records a successful delivery of `record`.
    ///
    /// Returns `true` if this caused the `Idle -> Tracking` transition. A
    /// second game start leaves the state untouched.
    pub fn record_delivered(&mut self, record: &DeliveryRecord) -> bool {
        match record {
            DeliveryRecord::GameStart(_) => {
                let transitioned = !self.started;
                self.started = true;
                transitioned
            }
            DeliveryRecord::PlayerDeath(death) => {
                self.note_death(death.event_id);
                false
            }
        }
    }

    /// Records that the server refused `record` for good.
    ///
    /// A refused death counts as consumed so later polls of the same feed
    /// history do not send it again. A refused game start changes nothing:
    /// tracking cannot begin until one is delivered.
    pub fn record_abandoned(&mut self, record: &DeliveryRecord) {
        if let DeliveryRecord::PlayerDeath(death) = record {
            self.note_death(death.event_id);
        }
    }

    fn note_death(&mut self, id: EventId) {
        if self.last_death.map_or(true, |last| id > last) {
            self.last_death = Some(id);
        }
    }
}
