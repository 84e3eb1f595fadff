//! Shared fixtures for session controller tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{BridgeError, EngineEvent, EngineState, LoadRequest, MediaEngine};
use core_async::sync::{broadcast, Notify};
use core_playback::{PlaybackSessionController, SessionConfig, Track};
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Engine call log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Load(String),
    Play,
    Pause,
    Stop,
    Seek(u64),
}

/// Holds a load open until released.
#[derive(Default)]
pub struct LoadGate {
    entered: Notify,
    release: Notify,
}

impl LoadGate {
    /// Resolves once the engine is blocked inside `load`.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct EngineInner {
    calls: Vec<Call>,
    state: Option<EngineState>,
    loaded: Option<String>,
    position: Duration,
    duration: Duration,
    failing_loads: HashSet<String>,
    fail_seek: bool,
    fail_reads: bool,
    reads: usize,
    gates: HashMap<String, Arc<LoadGate>>,
}

/// Scriptable in-memory engine.
pub struct FakeEngine {
    inner: Mutex<EngineInner>,
    events: broadcast::Sender<EngineEvent>,
}

impl FakeEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(EngineInner::default()),
            events: broadcast::channel(16).0,
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.inner.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn seeks(&self) -> Vec<u64> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Seek(ms) => Some(*ms),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> usize {
        self.inner.lock().reads
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn loaded(&self) -> Option<String> {
        self.inner.lock().loaded.clone()
    }

    pub fn set_position(&self, ms: u64) {
        self.inner.lock().position = Duration::from_millis(ms);
    }

    pub fn set_duration(&self, ms: u64) {
        self.inner.lock().duration = Duration::from_millis(ms);
    }

    pub fn fail_load(&self, track_id: &str) {
        self.inner.lock().failing_loads.insert(track_id.to_string());
    }

    pub fn fail_seek(&self, fail: bool) {
        self.inner.lock().fail_seek = fail;
    }

    pub fn fail_reads(&self, fail: bool) {
        self.inner.lock().fail_reads = fail;
    }

    /// The next load of `track_id` blocks until the gate is released.
    pub fn gate_load(&self, track_id: &str) -> Arc<LoadGate> {
        let gate = Arc::new(LoadGate::default());
        self.inner
            .lock()
            .gates
            .insert(track_id.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn emit(&self, event: EngineEvent) {
        self.events.send(event).ok();
    }

    fn record(&self, call: Call) {
        self.inner.lock().calls.push(call);
    }
}

#[async_trait]
impl MediaEngine for FakeEngine {
    async fn load(&self, request: LoadRequest) -> BridgeResult<()> {
        let track_id = request.metadata.track_id.clone();
        self.record(Call::Load(track_id.clone()));

        let gate = self.inner.lock().gates.remove(&track_id);
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let mut inner = self.inner.lock();
        if inner.failing_loads.contains(&track_id) {
            inner.loaded = None;
            return Err(BridgeError::OperationFailed(format!(
                "unsupported codec for {}",
                track_id
            )));
        }
        inner.loaded = Some(track_id);
        inner.position = request.start_position;
        inner.state = Some(EngineState::Paused);
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        self.record(Call::Play);
        let mut inner = self.inner.lock();
        if inner.loaded.is_none() {
            return Err(BridgeError::NotAvailable("nothing loaded".to_string()));
        }
        inner.state = Some(EngineState::Playing);
        Ok(())
    }

    async fn pause(&self) -> BridgeResult<()> {
        self.record(Call::Pause);
        self.inner.lock().state = Some(EngineState::Paused);
        Ok(())
    }

    async fn stop(&self) -> BridgeResult<()> {
        self.record(Call::Stop);
        let mut inner = self.inner.lock();
        inner.loaded = None;
        inner.state = Some(EngineState::Idle);
        inner.position = Duration::ZERO;
        Ok(())
    }

    async fn seek(&self, position: Duration) -> BridgeResult<()> {
        self.record(Call::Seek(position.as_millis() as u64));
        let mut inner = self.inner.lock();
        if inner.fail_seek {
            return Err(BridgeError::OperationFailed("engine not ready".to_string()));
        }
        inner.position = position;
        Ok(())
    }

    async fn position(&self) -> BridgeResult<Duration> {
        let mut inner = self.inner.lock();
        inner.reads += 1;
        if inner.fail_reads {
            return Err(BridgeError::Timeout(Duration::from_millis(500)));
        }
        Ok(inner.position)
    }

    async fn duration(&self) -> BridgeResult<Duration> {
        Ok(self.inner.lock().duration)
    }

    async fn state(&self) -> BridgeResult<EngineState> {
        Ok(self.inner.lock().state.unwrap_or(EngineState::Idle))
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

pub fn track(id: &str) -> Track {
    Track::new(id, format!("https://cdn.example.com/{}.mp3", id)).with_title(format!("Song {}", id))
}

pub fn queue(ids: &[&str]) -> Vec<Track> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn controller(engine: Arc<FakeEngine>) -> PlaybackSessionController {
    controller_with(engine, SessionConfig::default().with_shuffle_seed(7))
}

pub fn controller_with(
    engine: Arc<FakeEngine>,
    config: SessionConfig,
) -> PlaybackSessionController {
    PlaybackSessionController::new(engine, config, EventBus::default())
        .expect("valid session config")
}

/// Builds a controller whose events can be observed by the caller.
pub fn controller_on_bus(engine: Arc<FakeEngine>) -> (PlaybackSessionController, EventBus) {
    let bus = EventBus::new(64);
    let controller = PlaybackSessionController::new(
        engine,
        SessionConfig::default().with_shuffle_seed(7),
        bus.clone(),
    )
    .expect("valid session config");
    (controller, bus)
}

/// Lets spawned tasks run up to their next suspension point.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

pub fn current_id(controller: &PlaybackSessionController) -> Option<String> {
    controller.snapshot().current.map(|t| t.id)
}
