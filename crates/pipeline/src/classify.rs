//! Maps an event batch plus the pipeline state to at most one delivery record.

use crate::{
    ChannelId, DeliveryRecord, Event, EventBatch, GameStart, PipelineState, PlayerDeath,
    SubjectName,
};

/// Decides which transition, if any, a batch represents.
///
/// - Before the session has started, any non-empty batch is a session start,
///   built from the first event.
/// - Once started, a batch yields a death when it contains an event whose
///   victim is the tracked subject and whose id is newer than the last
///   delivered death.
///
/// When several deaths of the subject appear in one batch, the last one in
/// feed order is reported and the earlier ones are skipped.
///
/// Classification never fails; `None` means "nothing to report yet". It
/// depends only on its inputs, so the caller owns every state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    subject: SubjectName,
    channel: ChannelId,
}

impl Classifier {
    pub fn new(subject: SubjectName, channel: ChannelId) -> Self {
        Self { subject, channel }
    }

    pub fn subject(&self) -> &SubjectName {
        &self.subject
    }

    pub fn classify(&self, batch: &EventBatch, state: &PipelineState) -> Option<DeliveryRecord> {
        if !state.is_started() {
            return batch.first().map(|event| self.game_start(event));
        }

        let already_reported = state.last_death();
        batch
            .events()
            .iter()
            .filter(|event| event.is_death_of(&self.subject))
            .filter(|event| already_reported.map_or(true, |id| event.id > id))
            .last()
            .map(|event| self.player_death(event))
    }

    fn game_start(&self, event: &Event) -> DeliveryRecord {
        DeliveryRecord::GameStart(GameStart {
            summoner_name: self.subject.clone(),
            event_id: event.id,
            event_name: event.name.clone(),
            event_time: event.time,
            channel_id: self.channel.clone(),
        })
    }

    fn player_death(&self, event: &Event) -> DeliveryRecord {
        DeliveryRecord::PlayerDeath(PlayerDeath {
            event_id: event.id,
            event_name: event.name.clone(),
            event_time: event.time,
            killer_name: event.killer.clone().unwrap_or_default(),
            victim_name: self.subject.as_str().to_owned(),
        })
    }
}
