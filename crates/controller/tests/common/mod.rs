//! In-memory feed and delivery fakes shared by the controller integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use controller::{Controller, ControllerConfig};
use pipeline::{
    BackoffConfig, ChannelId, DeliveryTransport, Endpoint, Event, EventBatch, EventId, EventSource,
    EventTime, FetchError, PostResponse, SubjectName, TransportError,
};
use tokio_util::sync::CancellationToken;

pub const SUBJECT: &str = "Paszymaja";

pub fn event(id: u64, name: &str, killer: Option<&str>, victim: Option<&str>) -> Event {
    Event {
        id: EventId::new(id),
        name: name.to_owned(),
        time: EventTime::new(id as f64).unwrap(),
        killer: killer.map(str::to_owned),
        victim: victim.map(str::to_owned),
    }
}

pub fn start_batch() -> EventBatch {
    EventBatch::new(vec![event(0, "GameStart", None, None)])
}

pub fn death_batch() -> EventBatch {
    EventBatch::new(vec![
        event(0, "GameStart", None, None),
        event(1, "MinionsSpawning", None, None),
        event(2, "ChampionKill", Some("Garen"), Some(SUBJECT)),
    ])
}

/// Feed that replays scripted poll results, then reports itself unavailable.
pub struct ScriptedSource {
    polls: Mutex<VecDeque<Result<EventBatch, FetchError>>>,
    subject: Mutex<VecDeque<Result<SubjectName, FetchError>>>,
    fetches: Mutex<u32>,
}

impl ScriptedSource {
    pub fn new(polls: Vec<Result<EventBatch, FetchError>>) -> Arc<Self> {
        Arc::new(Self {
            polls: Mutex::new(polls.into()),
            subject: Mutex::new(VecDeque::new()),
            fetches: Mutex::new(0),
        })
    }

    pub fn batches(batches: Vec<EventBatch>) -> Arc<Self> {
        Self::new(batches.into_iter().map(Ok).collect())
    }

    pub fn with_subject_answers(
        self: Arc<Self>,
        answers: Vec<Result<SubjectName, FetchError>>,
    ) -> Arc<Self> {
        *self.subject.lock().unwrap() = answers.into();
        self
    }

    pub fn fetch_count(&self) -> u32 {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn fetch(&self, _timeout: Duration) -> Result<EventBatch, FetchError> {
        *self.fetches.lock().unwrap() += 1;
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(FetchError::Unavailable {
                    reason: "script exhausted".into(),
                })
            })
    }

    async fn active_subject(&self, _timeout: Duration) -> Result<SubjectName, FetchError> {
        self.subject.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(FetchError::Unavailable {
                reason: "no answer scripted".into(),
            })
        })
    }
}

/// Delivery sink that records every POST and answers from a script
/// (defaulting to 200).
#[derive(Default)]
pub struct RecordingTransport {
    responses: Mutex<VecDeque<u16>>,
    posts: Mutex<Vec<(Endpoint, serde_json::Value)>>,
}

impl RecordingTransport {
    pub fn perfect() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn answering(statuses: &[u16]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(statuses.iter().copied().collect()),
            posts: Mutex::new(Vec::new()),
        })
    }

    pub fn posts(&self) -> Vec<(Endpoint, serde_json::Value)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.posts().into_iter().map(|(endpoint, _)| endpoint).collect()
    }
}

#[async_trait]
impl DeliveryTransport for RecordingTransport {
    async fn post_json(
        &self,
        endpoint: Endpoint,
        body: &[u8],
        _timeout: Duration,
    ) -> Result<PostResponse, TransportError> {
        let json = serde_json::from_slice(body).expect("delivery body is JSON");
        self.posts.lock().unwrap().push((endpoint, json));
        let status = self.responses.lock().unwrap().pop_front().unwrap_or(200);
        Ok(PostResponse::status(status))
    }
}

pub fn config(subject: Option<&str>) -> ControllerConfig {
    ControllerConfig {
        poll_interval: Duration::from_secs(1),
        request_timeout: Duration::from_secs(5),
        backoff: BackoffConfig::new(Duration::from_millis(100), Duration::from_secs(1), 3)
            .unwrap(),
        subject: subject.map(|s| SubjectName::new(s).unwrap()),
        channel: ChannelId::new("387298617431425025").unwrap(),
    }
}

pub fn controller(
    source: Arc<ScriptedSource>,
    transport: Arc<RecordingTransport>,
    cancel: CancellationToken,
) -> Controller {
    Controller::with_cancel(source, transport, config(Some(SUBJECT)), cancel)
}
