//! Upstream JSON format of the game client's live-data API.
//!
//! These types exist only to be converted into [`pipeline::Event`]; nothing
//! outside this crate sees them.

use serde::Deserialize;

use pipeline::{Event, EventBatch, EventId, EventTime, FetchError, SubjectName};

#[derive(Debug, Deserialize)]
struct EventsEnvelope {
    #[serde(rename = "Events")]
    events: Vec<WireEvent>,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "EventID")]
    id: u64,
    #[serde(rename = "EventName")]
    name: String,
    #[serde(rename = "EventTime")]
    time: f64,
    #[serde(rename = "KillerName", default)]
    killer: Option<String>,
    #[serde(rename = "VictimName", default)]
    victim: Option<String>,
}

impl WireEvent {
    fn into_event(self) -> Result<Event, FetchError> {
        let time = EventTime::new(self.time).ok_or_else(|| FetchError::Malformed {
            reason: format!("event {} has invalid EventTime {}", self.id, self.time),
        })?;
        Ok(Event {
            id: EventId::new(self.id),
            name: self.name,
            time,
            killer: self.killer.filter(|s| !s.is_empty()),
            victim: self.victim.filter(|s| !s.is_empty()),
        })
    }
}

/// Parses an `eventdata` response body.
///
/// A snapshot whose first event has no name is not a live game yet and
/// yields an empty batch. Unnamed events later in the list are dropped.
pub fn parse_batch(body: &[u8]) -> Result<EventBatch, FetchError> {
    let envelope: EventsEnvelope =
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed {
            reason: e.to_string(),
        })?;

    if envelope
        .events
        .first()
        .is_some_and(|first| first.name.is_empty())
    {
        return Ok(EventBatch::empty());
    }

    envelope
        .events
        .into_iter()
        .filter(|event| !event.name.is_empty())
        .map(WireEvent::into_event)
        .collect::<Result<Vec<_>, _>>()
        .map(EventBatch::new)
}

/// Parses an `activeplayername` response body: a single JSON string.
pub fn parse_active_player(body: &[u8]) -> Result<SubjectName, FetchError> {
    let name: String = serde_json::from_slice(body).map_err(|e| FetchError::Malformed {
        reason: e.to_string(),
    })?;
    SubjectName::new(name).ok_or_else(|| FetchError::Malformed {
        reason: "active player name is empty".into(),
    })
}
