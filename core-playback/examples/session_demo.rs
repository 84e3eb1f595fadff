//! # Playback Session Demo
//!
//! Drives a session against a simulated engine whose tracks last a few
//! seconds: plays a queue, scrubs, lets tracks finish on their own and
//! watches the snapshot stream.
//!
//! Run with: `cargo run --example session_demo --package core-playback`

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, EngineEvent, EngineState, LoadRequest, MediaEngine};
use core_async::sync::broadcast;
use core_async::time::{Duration, Instant};
use core_playback::{PlaybackSessionController, RepeatMode, SessionConfig, Track};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::sync::Arc;

// ============================================================================
// Simulated engine
// ============================================================================

const TRACK_LENGTH: Duration = Duration::from_secs(2);

#[derive(Default)]
struct Transport {
    loaded: Option<(String, Duration)>,
    /// Position accumulated before the last resume.
    offset: Duration,
    started_at: Option<Instant>,
    ended: bool,
}

impl Transport {
    fn position(&self) -> Duration {
        let running = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        self.offset + running
    }
}

/// Plays nothing, but keeps time like a real engine would.
struct SimulatedEngine {
    transport: Mutex<Transport>,
    events: broadcast::Sender<EngineEvent>,
}

impl SimulatedEngine {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            transport: Mutex::new(Transport::default()),
            events: broadcast::channel(8).0,
        })
    }
}

#[async_trait]
impl MediaEngine for SimulatedEngine {
    async fn load(&self, request: LoadRequest) -> BridgeResult<()> {
        if !request.url.starts_with("https://") {
            return Err(BridgeError::Unsupported(request.url));
        }
        let mut transport = self.transport.lock();
        *transport = Transport {
            loaded: Some((request.metadata.track_id, TRACK_LENGTH)),
            offset: request.start_position,
            ..Default::default()
        };
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        let mut transport = self.transport.lock();
        if transport.loaded.is_none() {
            return Err(BridgeError::NotAvailable("nothing loaded".to_string()));
        }
        transport.started_at.get_or_insert_with(Instant::now);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        let mut transport = self.transport.lock();
        transport.offset = transport.position();
        transport.started_at = None;
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        *self.transport.lock() = Transport::default();
        Ok(())
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        let mut transport = self.transport.lock();
        transport.offset = position;
        if transport.started_at.is_some() {
            transport.started_at = Some(Instant::now());
        }
        Ok(())
    }

    async fn position(&self) -> BridgeResult<Duration> {
        let mut transport = self.transport.lock();
        let Some((_, length)) = transport.loaded.clone() else {
            return Ok(Duration::ZERO);
        };
        let position = transport.position();
        if position >= length && !transport.ended {
            transport.ended = true;
            self.events.send(EngineEvent::QueueEnded).ok();
        }
        Ok(position.min(length))
    }

    async fn duration(&self) -> BridgeResult<Duration> {
        Ok(self
            .transport
            .lock()
            .loaded
            .as_ref()
            .map(|(_, length)| *length)
            .unwrap_or_default())
    }

    async fn state(&self) -> BridgeResult<EngineState> {
        let transport = self.transport.lock();
        Ok(match (&transport.loaded, transport.started_at, transport.ended) {
            (None, _, _) => EngineState::Idle,
            (Some(_), Some(_), false) => EngineState::Playing,
            (Some(_), _, _) => EngineState::Paused,
        })
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// Demo
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("warn,core_playback=info")
        .init();

    let engine = SimulatedEngine::new();
    let controller = PlaybackSessionController::new(
        engine.clone(),
        SessionConfig::responsive(),
        EventBus::default(),
    )?;

    // Forward engine events to the session.
    let mut engine_events = engine.subscribe();
    let pump = {
        let controller = controller.clone();
        tokio::spawn(async move {
            while let Ok(event) = engine_events.recv().await {
                if let Err(err) = controller.handle_engine_event(event).await {
                    eprintln!("engine event failed: {}", err);
                }
            }
        })
    };

    // Render snapshots as they change.
    let mut updates = controller.subscribe();
    let render = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let title = snapshot
                .current
                .as_ref()
                .map(|t| t.title.as_str())
                .unwrap_or("-");
            println!(
                "[{:?}] {:<12} {:>5}/{:<5} ms scrubbing={}",
                snapshot.status, title, snapshot.position_ms, snapshot.duration_ms, snapshot.is_scrubbing
            );
        }
    });

    let queue: Vec<Track> = ["Intro", "Theme", "Outro"]
        .iter()
        .enumerate()
        .map(|(i, title)| {
            Track::new(format!("{}", i + 1), format!("https://cdn.example.com/{}.mp3", i + 1))
                .with_title(*title)
                .with_duration_hint(TRACK_LENGTH.as_millis() as u64)
        })
        .collect();

    println!("== play queue ==");
    controller.play_queue(queue[0].clone(), queue, 0).await?;
    tokio::time::sleep(Duration::from_millis(800)).await;

    println!("== scrub to 75% ==");
    let scrubber = controller.scrubber();
    scrubber.grant();
    for step in 1..=5 {
        scrubber.move_to(step as f64 * 0.15);
    }
    scrubber.release(0.75).await?;

    println!("== let the queue run out ==");
    tokio::time::sleep(Duration::from_secs(5)).await;

    println!("== repeat all, next ==");
    controller.set_repeat_mode(RepeatMode::All);
    controller.next().await?;
    tokio::time::sleep(Duration::from_millis(600)).await;

    controller.stop().await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    pump.abort();
    render.abort();
    Ok(())
}
