//! Session controller behavior against a scriptable engine.

mod common;

use common::{
    controller, controller_on_bus, controller_with, current_id, queue, settle, track, Call,
    FakeEngine,
};
use core_playback::{PlaybackError, RepeatMode, SessionConfig, SessionStatus, Track};
use core_runtime::events::{CoreEvent, PlaybackEvent, QueueEvent};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// play
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_play_publishes_track_queue_and_index_together() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    let mut updates = controller.subscribe();
    let tracks = queue(&["s1", "s2", "s3"]);

    controller
        .play_queue(tracks[1].clone(), tracks.clone(), 1)
        .await
        .unwrap();

    updates.changed().await.unwrap();
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.current.as_ref().map(|t| t.id.as_str()), Some("s2"));
    assert_eq!(snapshot.queue.len(), 3);
    assert_eq!(snapshot.index, Some(1));
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(snapshot.status, SessionStatus::Playing);

    assert_eq!(
        engine.calls(),
        vec![Call::Stop, Call::Load("s2".to_string()), Call::Play]
    );
    assert!(controller.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_play_single_track_builds_one_item_queue() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());

    controller.play(track("solo")).await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.queue.len(), 1);
    assert_eq!(snapshot.index, Some(0));
    assert_eq!(current_id(&controller).as_deref(), Some("solo"));
}

#[tokio::test(start_paused = true)]
async fn test_play_uses_duration_hint_until_engine_reports() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());

    controller
        .play(track("a").with_duration_hint(215_000))
        .await
        .unwrap();
    assert_eq!(controller.snapshot().duration_ms, 215_000);

    engine.set_duration(214_500);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(controller.snapshot().duration_ms, 214_500);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_requests_touch_neither_engine_nor_state() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    let tracks = queue(&["a", "b"]);

    let missing_url = controller.play(Track::new("x", "")).await;
    assert!(matches!(missing_url, Err(PlaybackError::InvalidTrack(_))));

    let wrong_index = controller
        .play_queue(tracks[0].clone(), tracks.clone(), 1)
        .await;
    assert!(matches!(wrong_index, Err(PlaybackError::InvalidQueue(_))));

    let out_of_bounds = controller
        .play_queue(tracks[0].clone(), tracks.clone(), 9)
        .await;
    assert!(matches!(out_of_bounds, Err(PlaybackError::InvalidQueue(_))));

    assert!(engine.calls().is_empty());
    assert!(controller.snapshot().is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_failed_play_keeps_previous_track_and_clears_playing() {
    let engine = FakeEngine::new();
    let (controller, bus) = controller_on_bus(engine.clone());
    let mut events = bus.subscribe();
    let tracks = queue(&["good", "broken"]);

    controller
        .play_queue(tracks[0].clone(), tracks.clone(), 0)
        .await
        .unwrap();
    engine.fail_load("broken");

    let result = controller
        .play_queue(tracks[1].clone(), tracks.clone(), 1)
        .await;

    match result {
        Err(PlaybackError::LoadFailed { track_id, .. }) => assert_eq!(track_id, "broken"),
        other => panic!("expected LoadFailed, got {:?}", other),
    }

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.current.as_ref().map(|t| t.id.as_str()), Some("good"));
    assert_eq!(snapshot.index, Some(0));
    assert!(!snapshot.is_playing);
    assert!(!controller.is_polling());
    assert_eq!(engine.count(&Call::Play), 1);

    let saw_error = std::iter::from_fn(|| events.try_recv().ok()).any(|event| {
        matches!(
            event,
            CoreEvent::Playback(PlaybackEvent::Error { track_id: Some(ref id), .. }) if id == "broken"
        )
    });
    assert!(saw_error);
}

#[tokio::test(start_paused = true)]
async fn test_failed_first_play_leaves_session_idle() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    engine.fail_load("a");

    assert!(controller.play(track("a")).await.is_err());

    let snapshot = controller.snapshot();
    assert!(snapshot.is_idle());
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.status, SessionStatus::Idle);
}

// ============================================================================
// Races
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_stop_wins_over_in_flight_load() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller.play(track("first")).await.unwrap();
    let gate = engine.gate_load("a");

    let play = tokio::spawn({
        let controller = controller.clone();
        async move { controller.play(track("a")).await }
    });
    gate.entered().await;

    let stop = tokio::spawn({
        let controller = controller.clone();
        async move { controller.stop().await }
    });
    settle().await;
    assert!(controller.snapshot().is_idle());

    gate.release();
    play.await.unwrap().unwrap();
    stop.await.unwrap().unwrap();

    let snapshot = controller.snapshot();
    assert!(snapshot.current.is_none());
    assert!(!snapshot.is_playing);
    assert_eq!(engine.count(&Call::Play), 1);
    assert_eq!(engine.loaded(), None);
    assert!(!controller.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_latest_play_wins_over_slow_earlier_play() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    let tracks = queue(&["s1", "s2"]);
    let gate = engine.gate_load("s1");

    let first = tokio::spawn({
        let controller = controller.clone();
        let tracks = tracks.clone();
        async move { controller.play_queue(tracks[0].clone(), tracks, 0).await }
    });
    gate.entered().await;

    let second = tokio::spawn({
        let controller = controller.clone();
        let tracks = tracks.clone();
        async move { controller.play_queue(tracks[1].clone(), tracks, 1).await }
    });
    settle().await;

    gate.release();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.current.as_ref().map(|t| t.id.as_str()), Some("s2"));
    assert_eq!(snapshot.index, Some(1));
    assert!(snapshot.is_playing);
    assert_eq!(engine.count(&Call::Play), 1);
    assert_eq!(engine.loaded().as_deref(), Some("s2"));
}

// ============================================================================
// Transport
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_toggle_playing_and_polling() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller.play(track("a")).await.unwrap();

    controller.pause().await.unwrap();
    let paused = controller.snapshot();
    assert!(!paused.is_playing);
    assert_eq!(paused.status, SessionStatus::Paused);
    assert!(!controller.is_polling());

    controller.resume().await.unwrap();
    assert!(controller.snapshot().is_playing);
    assert!(controller.is_polling());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_resume_keeps_a_single_poll() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller.play(track("a")).await.unwrap();

    for _ in 0..4 {
        controller.resume().await.unwrap();
    }
    let before = engine.reads();
    tokio::time::sleep(Duration::from_millis(3500)).await;

    assert_eq!(engine.reads() - before, 3);
}

#[tokio::test(start_paused = true)]
async fn test_transport_without_track_reports_no_track_loaded() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());

    assert_eq!(controller.pause().await, Err(PlaybackError::NoTrackLoaded));
    assert_eq!(controller.resume().await, Err(PlaybackError::NoTrackLoaded));
    assert_eq!(controller.seek(1000).await, Err(PlaybackError::NoTrackLoaded));
    assert!(engine.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stop_clears_everything_and_halts_polling() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    let tracks = queue(&["a", "b"]);
    controller
        .play_queue(tracks[0].clone(), tracks.clone(), 0)
        .await
        .unwrap();
    engine.set_position(5_000);
    engine.set_duration(100_000);
    tokio::time::sleep(Duration::from_millis(1100)).await;

    controller.stop().await.unwrap();

    let snapshot = controller.snapshot();
    assert!(snapshot.current.is_none());
    assert!(snapshot.queue.is_empty());
    assert_eq!(snapshot.index, None);
    assert_eq!(snapshot.position_ms, 0);
    assert_eq!(snapshot.duration_ms, 0);
    assert!(!controller.is_polling());

    let reads = engine.reads();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.reads(), reads);
}

#[tokio::test(start_paused = true)]
async fn test_seek_clamps_and_publishes_immediately() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(60_000))
        .await
        .unwrap();

    controller.seek(30_000).await.unwrap();
    assert_eq!(controller.snapshot().position_ms, 30_000);

    controller.seek(90_000).await.unwrap();
    assert_eq!(controller.snapshot().position_ms, 60_000);
    assert_eq!(engine.seeks(), vec![30_000, 60_000]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_seek_leaves_position_unchanged() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(60_000))
        .await
        .unwrap();
    controller.seek(10_000).await.unwrap();
    engine.fail_seek(true);

    let result = controller.seek(20_000).await;

    assert!(matches!(
        result,
        Err(PlaybackError::SeekFailed {
            position_ms: 20_000,
            ..
        })
    ));
    assert_eq!(controller.snapshot().position_ms, 10_000);
}

// ============================================================================
// Queue stepping and mode
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_next_and_previous_step_through_queue() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    let tracks = queue(&["a", "b", "c"]);
    controller
        .play_queue(tracks[0].clone(), tracks.clone(), 0)
        .await
        .unwrap();
    let shared_queue = controller.snapshot().queue;

    controller.next().await.unwrap();
    assert_eq!(current_id(&controller).as_deref(), Some("b"));
    assert!(Arc::ptr_eq(&shared_queue, &controller.snapshot().queue));

    controller.next().await.unwrap();
    controller.next().await.unwrap();
    assert_eq!(current_id(&controller).as_deref(), Some("c"));

    controller.previous().await.unwrap();
    assert_eq!(current_id(&controller).as_deref(), Some("b"));
}

#[tokio::test(start_paused = true)]
async fn test_previous_at_head_is_a_no_op_for_every_repeat_mode() {
    for repeat in [RepeatMode::Off, RepeatMode::One, RepeatMode::All] {
        let engine = FakeEngine::new();
        let controller = controller(engine.clone());
        let tracks = queue(&["a", "b", "c"]);
        controller
            .play_queue(tracks[0].clone(), tracks.clone(), 0)
            .await
            .unwrap();
        controller.set_repeat_mode(repeat);
        controller.set_shuffle(true);
        engine.clear_calls();
        let before = controller.snapshot();

        controller.previous().await.unwrap();

        assert!(engine.calls().is_empty(), "repeat {:?}", repeat);
        assert_eq!(controller.snapshot(), before);
    }
}

#[tokio::test(start_paused = true)]
async fn test_manual_next_under_repeat_all_wraps_but_repeat_one_does_not_replay() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    let tracks = queue(&["a", "b"]);
    controller
        .play_queue(tracks[1].clone(), tracks.clone(), 1)
        .await
        .unwrap();

    controller.set_repeat_mode(RepeatMode::One);
    engine.clear_calls();
    controller.next().await.unwrap();
    assert!(engine.calls().is_empty());
    assert_eq!(current_id(&controller).as_deref(), Some("b"));

    controller.set_repeat_mode(RepeatMode::All);
    controller.next().await.unwrap();
    assert_eq!(current_id(&controller).as_deref(), Some("a"));
}

#[tokio::test(start_paused = true)]
async fn test_shuffle_next_never_replays_current() {
    let engine = FakeEngine::new();
    let controller = controller_with(
        engine.clone(),
        SessionConfig::default().with_shuffle_seed(11),
    );
    let tracks = queue(&["a", "b", "c", "d"]);
    controller
        .play_queue(tracks[0].clone(), tracks.clone(), 0)
        .await
        .unwrap();
    controller.set_shuffle(true);

    for _ in 0..25 {
        let before = controller.snapshot().index;
        controller.next().await.unwrap();
        assert_ne!(controller.snapshot().index, before);
    }
}

#[tokio::test(start_paused = true)]
async fn test_mode_setters_publish_and_emit() {
    let engine = FakeEngine::new();
    let (controller, bus) = controller_on_bus(engine.clone());
    let mut events = bus.subscribe();

    assert!(controller.toggle_shuffle());
    assert_eq!(controller.cycle_repeat_mode(), RepeatMode::All);
    assert_eq!(controller.cycle_repeat_mode(), RepeatMode::One);
    assert_eq!(controller.cycle_repeat_mode(), RepeatMode::Off);

    let snapshot = controller.snapshot();
    assert!(snapshot.shuffle);
    assert_eq!(snapshot.repeat, RepeatMode::Off);
    assert!(engine.calls().is_empty());

    match events.try_recv().unwrap() {
        CoreEvent::Queue(QueueEvent::ModeChanged {
            shuffle, repeat, ..
        }) => {
            assert!(shuffle);
            assert_eq!(repeat, "off");
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_mode_comes_from_config() {
    let engine = FakeEngine::new();
    let controller = controller_with(
        engine,
        SessionConfig::battery_saver().with_mode(true, RepeatMode::All),
    );

    let snapshot = controller.snapshot();
    assert!(snapshot.shuffle);
    assert_eq!(snapshot.repeat, RepeatMode::All);
}

#[test]
fn test_invalid_config_is_rejected() {
    let engine = FakeEngine::new();
    let result = core_playback::PlaybackSessionController::new(
        engine,
        SessionConfig::default().with_poll_interval(Duration::from_millis(1)),
        core_runtime::events::EventBus::default(),
    );
    assert!(matches!(result, Err(PlaybackError::Config(_))));
}
