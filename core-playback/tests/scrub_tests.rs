//! Scrub gestures against the live session.

mod common;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, EngineEvent, EngineState, LoadRequest, MediaEngine};
use common::{controller, current_id, queue, track, Call, FakeEngine};
use core_async::sync::broadcast;
use core_playback::{PlaybackError, PlaybackSessionController, SessionConfig};
use core_runtime::events::EventBus;
use mockall::mock;
use mockall::predicate::eq;
use std::sync::Arc;
use std::time::Duration;

mock! {
    Engine {}

    #[async_trait]
    impl MediaEngine for Engine {
        async fn load(&self, request: LoadRequest) -> BridgeResult<()>;
        async fn play(&self) -> BridgeResult<()>;
        async fn pause(&self) -> BridgeResult<()>;
        async fn stop(&self) -> BridgeResult<()>;
        async fn seek(&self, position: Duration) -> BridgeResult<()>;
        async fn position(&self) -> BridgeResult<Duration>;
        async fn duration(&self) -> BridgeResult<Duration>;
        async fn state(&self) -> BridgeResult<EngineState>;
        fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
    }
}

/// A mock that accepts transport commands and reports a quiet engine.
fn permissive_engine() -> MockEngine {
    let mut engine = MockEngine::new();
    engine.expect_stop().returning(|| Ok(()));
    engine.expect_load().returning(|_| Ok(()));
    engine.expect_play().returning(|| Ok(()));
    engine.expect_position().returning(|| Ok(Duration::ZERO));
    engine.expect_duration().returning(|| Ok(Duration::ZERO));
    engine
        .expect_state()
        .returning(|| Ok(EngineState::Playing));
    engine
}

fn mock_controller(engine: MockEngine) -> PlaybackSessionController {
    PlaybackSessionController::new(Arc::new(engine), SessionConfig::default(), EventBus::default())
        .expect("valid session config")
}

#[tokio::test(start_paused = true)]
async fn test_many_moves_then_release_issue_exactly_one_seek() {
    let mut engine = permissive_engine();
    engine
        .expect_seek()
        .with(eq(Duration::from_millis(90_000)))
        .times(1)
        .returning(|_| Ok(()));
    let controller = mock_controller(engine);
    controller
        .play(track("a").with_duration_hint(180_000))
        .await
        .unwrap();
    let scrubber = controller.scrubber();

    scrubber.grant();
    for fraction in [0.1, 0.2, 0.35, 0.8, 0.5] {
        scrubber.move_to(fraction);
    }
    assert_eq!(scrubber.preview_position_ms(), Some(90_000));
    scrubber.release(0.5).await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.position_ms, 90_000);
    assert!(!snapshot.is_scrubbing);
    assert!(!scrubber.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_moves_publish_optimistic_position_without_engine_calls() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(200_000))
        .await
        .unwrap();
    engine.clear_calls();
    let scrubber = controller.scrubber();

    scrubber.grant();
    assert!(controller.snapshot().is_scrubbing);

    scrubber.move_to(0.25);
    assert_eq!(controller.snapshot().position_ms, 50_000);
    scrubber.move_to(1.5);
    assert_eq!(controller.snapshot().position_ms, 200_000);
    scrubber.move_to(-3.0);
    assert_eq!(controller.snapshot().position_ms, 0);

    assert!(engine.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_poll_does_not_overwrite_position_while_scrubbing() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller.play(track("a")).await.unwrap();
    engine.set_duration(180_000);
    engine.set_position(10_000);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(controller.snapshot().position_ms, 10_000);

    let scrubber = controller.scrubber();
    scrubber.grant();
    scrubber.move_to(0.5);
    tokio::time::sleep(Duration::from_secs(3)).await;

    let during = controller.snapshot();
    assert!(during.is_scrubbing);
    assert_eq!(during.position_ms, 90_000);

    scrubber.release(0.5).await.unwrap();
    assert_eq!(engine.seeks(), vec![90_000]);
    tokio::time::sleep(Duration::from_secs(2)).await;

    let after = controller.snapshot();
    assert!(!after.is_scrubbing);
    assert_eq!(after.position_ms, 90_000);
}

#[tokio::test(start_paused = true)]
async fn test_release_with_unknown_duration_resets_without_seeking() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller.play(track("live")).await.unwrap();
    let scrubber = controller.scrubber();

    scrubber.grant();
    scrubber.move_to(0.4);
    scrubber.release(0.4).await.unwrap();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.position_ms, 0);
    assert!(!snapshot.is_scrubbing);
    assert!(engine.seeks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_release_without_grant_still_commits() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(100_000))
        .await
        .unwrap();

    controller.scrubber().release(0.75).await.unwrap();

    assert_eq!(engine.seeks(), vec![75_000]);
    assert_eq!(controller.snapshot().position_ms, 75_000);
    assert!(!controller.snapshot().is_scrubbing);
}

#[tokio::test(start_paused = true)]
async fn test_move_without_grant_is_ignored() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(100_000))
        .await
        .unwrap();
    let scrubber = controller.scrubber();

    scrubber.move_to(0.9);

    assert_eq!(controller.snapshot().position_ms, 0);
    assert!(!controller.snapshot().is_scrubbing);
    assert_eq!(scrubber.preview_position_ms(), None);
}

#[tokio::test(start_paused = true)]
async fn test_terminate_commits_last_fraction() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(100_000))
        .await
        .unwrap();
    let scrubber = controller.scrubber();

    scrubber.terminate().await.unwrap();
    assert!(engine.seeks().is_empty());

    scrubber.grant();
    scrubber.move_to(0.3);
    scrubber.terminate().await.unwrap();

    assert_eq!(engine.seeks(), vec![30_000]);
    assert!(!scrubber.is_active());
    assert!(!controller.snapshot().is_scrubbing);
}

#[tokio::test(start_paused = true)]
async fn test_failed_seek_on_release_still_ends_scrub() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(100_000))
        .await
        .unwrap();
    engine.fail_seek(true);
    let scrubber = controller.scrubber();

    scrubber.grant();
    let result = scrubber.release(0.6).await;

    assert!(matches!(result, Err(PlaybackError::SeekFailed { .. })));
    assert!(!controller.snapshot().is_scrubbing);
    assert_eq!(engine.count(&Call::Seek(60_000)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_abandons_gesture() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(100_000))
        .await
        .unwrap();
    let scrubber = controller.scrubber();

    scrubber.grant();
    scrubber.move_to(0.5);
    controller.stop().await.unwrap();

    assert!(!scrubber.is_active());
    assert!(!controller.snapshot().is_scrubbing);
    scrubber.terminate().await.unwrap();
    assert!(engine.seeks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_track_change_abandons_gesture() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    let tracks: Vec<_> = queue(&["a", "b"])
        .into_iter()
        .map(|t| t.with_duration_hint(100_000))
        .collect();
    controller
        .play_queue(tracks[0].clone(), tracks.clone(), 0)
        .await
        .unwrap();
    let scrubber = controller.scrubber();

    scrubber.grant();
    scrubber.move_to(0.5);
    assert_eq!(controller.snapshot().position_ms, 50_000);

    controller
        .handle_engine_event(EngineEvent::QueueEnded)
        .await
        .unwrap();
    assert_eq!(current_id(&controller).as_deref(), Some("b"));
    assert!(!scrubber.is_active());
    assert!(!controller.snapshot().is_scrubbing);

    // The poll owns the new track's position again.
    engine.set_position(7_000);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    scrubber.move_to(0.9);
    assert_eq!(controller.snapshot().position_ms, 7_000);

    scrubber.terminate().await.unwrap();
    assert!(engine.seeks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_queue_exhaustion_abandons_gesture() {
    let engine = FakeEngine::new();
    let controller = controller(engine.clone());
    controller
        .play(track("a").with_duration_hint(100_000))
        .await
        .unwrap();
    let scrubber = controller.scrubber();
    scrubber.grant();

    controller
        .handle_engine_event(EngineEvent::QueueEnded)
        .await
        .unwrap();

    assert!(controller.snapshot().current.is_none());
    assert!(!scrubber.is_active());
    scrubber.terminate().await.unwrap();
    assert!(engine.seeks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scrubbers_of_one_session_share_the_gesture() {
    let mut engine = permissive_engine();
    engine.expect_seek().times(1).returning(|_| {
        Err(BridgeError::OperationFailed("seek rejected".to_string()))
    });
    let controller = mock_controller(engine);
    controller
        .play(track("a").with_duration_hint(10_000))
        .await
        .unwrap();

    let first = controller.scrubber();
    let second = controller.scrubber();
    first.grant();
    assert!(second.is_active());

    assert!(second.release(0.1).await.is_err());
    assert!(!first.is_active());
}
