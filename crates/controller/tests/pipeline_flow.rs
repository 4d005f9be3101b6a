mod common;

use std::time::Duration;

use common::*;
use controller::{Controller, TickOutcome};
use pipeline::{BackoffConfig, Endpoint, EventBatch, EventId, FetchError, Phase, SubjectName};
use tokio_util::sync::CancellationToken;

#[tokio::test(start_paused = true)]
async fn start_then_death_are_posted_in_order() {
    let source = ScriptedSource::batches(vec![
        EventBatch::empty(),
        EventBatch::empty(),
        start_batch(),
        death_batch(),
    ]);
    let transport = RecordingTransport::perfect();
    let mut ctl = controller(source, transport.clone(), CancellationToken::new());

    assert_eq!(ctl.tick().await, TickOutcome::NothingToReport);
    assert_eq!(ctl.tick().await, TickOutcome::NothingToReport);
    assert_eq!(ctl.phase(), Phase::Idle);

    assert_eq!(ctl.tick().await, TickOutcome::Delivered(Endpoint::GameStarted));
    assert_eq!(ctl.phase(), Phase::Tracking);

    assert_eq!(ctl.tick().await, TickOutcome::Delivered(Endpoint::Death));

    assert_eq!(
        transport.endpoints(),
        vec![Endpoint::GameStarted, Endpoint::Death]
    );
    let posts = transport.posts();
    assert_eq!(posts[0].1["SummonerName"], SUBJECT);
    assert_eq!(posts[0].1["ChannelId"], "387298617431425025");
    assert_eq!(posts[1].1["VictimName"], SUBJECT);
    assert_eq!(posts[1].1["KillerName"], "Garen");
    assert_eq!(posts[1].1["EventID"], 2);
}

#[tokio::test(start_paused = true)]
async fn unavailable_and_malformed_polls_are_empty_ticks() {
    let source = ScriptedSource::new(vec![
        Err(FetchError::Unavailable {
            reason: "connection refused".into(),
        }),
        Err(FetchError::Malformed {
            reason: "missing field `Events`".into(),
        }),
        Ok(start_batch()),
    ]);
    let transport = RecordingTransport::perfect();
    let mut ctl = controller(source, transport.clone(), CancellationToken::new());

    assert_eq!(ctl.tick().await, TickOutcome::NoData);
    assert_eq!(ctl.tick().await, TickOutcome::NoData);
    assert!(transport.posts().is_empty());

    assert_eq!(ctl.tick().await, TickOutcome::Delivered(Endpoint::GameStarted));
}

#[tokio::test(start_paused = true)]
async fn repeated_feed_snapshots_do_not_duplicate_deaths() {
    let source = ScriptedSource::batches(vec![start_batch(), death_batch(), death_batch()]);
    let transport = RecordingTransport::perfect();
    let mut ctl = controller(source, transport.clone(), CancellationToken::new());

    ctl.tick().await;
    ctl.tick().await;
    assert_eq!(ctl.tick().await, TickOutcome::NothingToReport);

    assert_eq!(
        transport.endpoints(),
        vec![Endpoint::GameStarted, Endpoint::Death]
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_start_keeps_controller_idle_and_retries_next_tick() {
    let source = ScriptedSource::batches(vec![start_batch(), start_batch()]);
    let transport = RecordingTransport::answering(&[400]);
    let mut ctl = controller(source, transport.clone(), CancellationToken::new());

    assert_eq!(
        ctl.tick().await,
        TickOutcome::DeliveryFailed(Endpoint::GameStarted)
    );
    assert_eq!(ctl.phase(), Phase::Idle);

    assert_eq!(ctl.tick().await, TickOutcome::Delivered(Endpoint::GameStarted));
    assert_eq!(ctl.phase(), Phase::Tracking);
}

#[tokio::test(start_paused = true)]
async fn rejected_death_is_not_resent_on_later_polls() {
    let source = ScriptedSource::batches(vec![
        start_batch(),
        death_batch(),
        death_batch(),
        death_batch(),
    ]);
    let transport = RecordingTransport::answering(&[200, 404]);
    let mut ctl = controller(source, transport.clone(), CancellationToken::new());

    assert_eq!(ctl.tick().await, TickOutcome::Delivered(Endpoint::GameStarted));
    assert_eq!(ctl.tick().await, TickOutcome::DeliveryFailed(Endpoint::Death));
    assert_eq!(ctl.tick().await, TickOutcome::NothingToReport);
    assert_eq!(ctl.tick().await, TickOutcome::NothingToReport);

    assert_eq!(
        transport.endpoints(),
        vec![Endpoint::GameStarted, Endpoint::Death]
    );
    assert_eq!(ctl.state().last_death(), Some(EventId::new(2)));
    assert_eq!(ctl.phase(), Phase::Tracking);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_do_not_stop_the_controller() {
    let source = ScriptedSource::batches(vec![start_batch(), death_batch()]);
    // Start: three 503s exhaust the retry limit of 3. Next tick succeeds.
    let transport = RecordingTransport::answering(&[503, 503, 503]);
    let mut ctl = controller(source, transport.clone(), CancellationToken::new());

    assert_eq!(
        ctl.tick().await,
        TickOutcome::DeliveryFailed(Endpoint::GameStarted)
    );
    // The death batch still starts with the game-start event.
    assert_eq!(ctl.tick().await, TickOutcome::Delivered(Endpoint::GameStarted));
    assert_eq!(transport.posts().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn subject_is_resolved_from_the_feed_when_not_configured() {
    let source = ScriptedSource::batches(vec![start_batch(), start_batch()]).with_subject_answers(
        vec![
            Err(FetchError::Unavailable {
                reason: "loading".into(),
            }),
            Ok(SubjectName::new("Teemo").unwrap()),
        ],
    );
    let transport = RecordingTransport::perfect();
    let mut ctl = Controller::with_cancel(
        source,
        transport.clone(),
        config(None),
        CancellationToken::new(),
    );

    assert_eq!(ctl.tick().await, TickOutcome::NoData);
    assert_eq!(ctl.tick().await, TickOutcome::Delivered(Endpoint::GameStarted));
    assert_eq!(transport.posts()[0].1["SummonerName"], "Teemo");
}

#[tokio::test(start_paused = true)]
async fn spawned_controller_runs_until_stopped() {
    let source = ScriptedSource::batches(vec![
        EventBatch::empty(),
        EventBatch::empty(),
        start_batch(),
        death_batch(),
    ]);
    let transport = RecordingTransport::perfect();
    let handle = controller(source.clone(), transport.clone(), CancellationToken::new()).spawn();

    tokio::time::sleep(Duration::from_millis(5500)).await;
    let state = handle.stop().await.expect("driver task joins cleanly");

    assert_eq!(state.phase(), Phase::Tracking);
    assert_eq!(
        transport.endpoints(),
        vec![Endpoint::GameStarted, Endpoint::Death]
    );
    // First tick fires immediately, then one per second.
    assert_eq!(source.fetch_count(), 6);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.fetch_count(), 6, "no ticks after stop");
}

#[tokio::test(start_paused = true)]
async fn stop_interrupts_a_delivery_stuck_in_backoff() {
    let source = ScriptedSource::batches(vec![start_batch()]);
    let transport = RecordingTransport::answering(&[500; 32]);
    let cancel = CancellationToken::new();
    let mut cfg = config(Some(SUBJECT));
    cfg.backoff = BackoffConfig::new(Duration::from_secs(60), Duration::from_secs(60), 0).unwrap();
    let handle = Controller::with_cancel(source, transport.clone(), cfg, cancel).spawn();

    tokio::time::sleep(Duration::from_secs(1)).await;
    let stopped = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await;

    let state = stopped
        .expect("stop returns promptly")
        .expect("driver task joins cleanly");
    assert_eq!(state.phase(), Phase::Idle);
    assert_eq!(transport.posts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_delivery_holds_back_the_next_poll() {
    let source = ScriptedSource::batches(vec![start_batch(), start_batch()]);
    // One 500 then success: the start delivery spans three poll intervals.
    let transport = RecordingTransport::answering(&[500]);
    let mut cfg = config(Some(SUBJECT));
    cfg.backoff = BackoffConfig::new(Duration::from_secs(3), Duration::from_secs(3), 0).unwrap();
    let handle = Controller::with_cancel(
        source.clone(),
        transport.clone(),
        cfg,
        CancellationToken::new(),
    )
    .spawn();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(source.fetch_count(), 1, "no poll while a delivery is in flight");
    assert_eq!(transport.posts().len(), 1);

    // Delivery completes at 3s; the overdue tick fires once, not once per
    // missed interval.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(transport.posts().len(), 2);
    assert_eq!(source.fetch_count(), 2);

    // Cadence resumes one interval after the late tick.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(source.fetch_count(), 3);

    let state = handle.stop().await.expect("driver task joins cleanly");
    assert_eq!(state.phase(), Phase::Tracking);
}
