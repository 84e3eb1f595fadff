//! # Progress Synchronizer
//!
//! Periodically reads position, duration and transport state from the
//! engine and merges them into the published snapshot.
//!
//! - One poll task at a time. `start` cancels the previous task before
//!   spawning a new one, so rapid play/pause/resume never leaks a timer.
//! - Ticks run sequentially inside the task and missed ticks are skipped,
//!   so a slow engine read can never be followed by a burst of old reads.
//! - Each task is tagged with the generation it was started for. Its writes
//!   are dropped once a newer transition has happened, and the task exits.
//! - While a scrub gesture owns the position, ticks still refresh duration
//!   and the playing flag but leave `position_ms` alone.

use crate::models::SessionId;
use crate::state::SessionState;
use bridge_traits::{BridgeError, EngineState, MediaEngine};
use core_async::sync::CancellationToken;
use core_async::task::{self, JoinHandle};
use core_async::time::{duration_to_millis, interval, Duration, MissedTickBehavior};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// One engine reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EngineReading {
    position_ms: u64,
    duration_ms: u64,
    state: EngineState,
}

struct PollTask {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Owns the recurring engine poll for one session.
pub struct ProgressSynchronizer {
    session_id: SessionId,
    engine: Arc<dyn MediaEngine>,
    state: Arc<SessionState>,
    period: Duration,
    position_events: Option<EventBus>,
    task: Mutex<Option<PollTask>>,
}

impl ProgressSynchronizer {
    pub(crate) fn new(
        session_id: SessionId,
        engine: Arc<dyn MediaEngine>,
        state: Arc<SessionState>,
        period: Duration,
        position_events: Option<EventBus>,
    ) -> Self {
        Self {
            session_id,
            engine,
            state,
            period,
            position_events,
            task: Mutex::new(None),
        }
    }

    /// Starts polling on behalf of `generation`, replacing any running poll.
    pub fn start(&self, generation: u64) {
        let token = CancellationToken::new();
        let poll = PollLoop {
            session_id: self.session_id,
            engine: Arc::clone(&self.engine),
            state: Arc::clone(&self.state),
            period: self.period,
            generation,
            token: token.clone(),
            position_events: self.position_events.clone(),
        };

        let mut slot = self.task.lock();
        if let Some(previous) = slot.take() {
            previous.token.cancel();
            debug!(
                session_id = %self.session_id,
                previous_generation = previous.generation,
                "Replacing progress poll"
            );
        }

        let handle = task::spawn(poll.run());
        *slot = Some(PollTask {
            generation,
            token,
            handle,
        });
        debug!(session_id = %self.session_id, generation, "Progress poll started");
    }

    /// Cancels the running poll. Safe to call when nothing is running.
    pub fn stop(&self) {
        if let Some(previous) = self.task.lock().take() {
            previous.token.cancel();
            debug!(
                session_id = %self.session_id,
                generation = previous.generation,
                "Progress poll stopped"
            );
        }
    }

    /// Whether a poll task is alive.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map_or(false, |t| !t.token.is_cancelled() && !t.handle.is_finished())
    }

    /// Generation the running poll was started for.
    pub fn generation(&self) -> Option<u64> {
        self.task.lock().as_ref().map(|t| t.generation)
    }
}

impl Drop for ProgressSynchronizer {
    fn drop(&mut self) {
        if let Some(previous) = self.task.get_mut().take() {
            previous.token.cancel();
        }
    }
}

struct PollLoop {
    session_id: SessionId,
    engine: Arc<dyn MediaEngine>,
    state: Arc<SessionState>,
    period: Duration,
    generation: u64,
    token: CancellationToken,
    position_events: Option<EventBus>,
}

impl PollLoop {
    async fn run(self) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the snapshot was just written
        // by the transition that started this poll.
        ticker.tick().await;

        loop {
            core_async::select! {
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let reading = core_async::select! {
                _ = self.token.cancelled() => break,
                reading = read_engine(self.engine.as_ref()) => reading,
            };

            match reading {
                Ok(reading) => {
                    if !self.apply(reading) {
                        debug!(
                            session_id = %self.session_id,
                            generation = self.generation,
                            "Progress poll superseded"
                        );
                        break;
                    }
                }
                Err(err) => {
                    warn!(
                        session_id = %self.session_id,
                        generation = self.generation,
                        error = %err,
                        "Position poll failed"
                    );
                }
            }
        }
    }

    /// Returns `false` when the poll's generation is stale.
    fn apply(&self, reading: EngineReading) -> bool {
        let mut published_position = None;
        let applied = self.state.write_if_current(self.generation, |snapshot| {
            // Zero means the engine does not know yet; keep the hint.
            if reading.duration_ms > 0 {
                snapshot.duration_ms = reading.duration_ms;
            }
            snapshot.set_playing(reading.state.is_playing());
            if !snapshot.is_scrubbing {
                snapshot.position_ms = clamp_position(reading.position_ms, snapshot.duration_ms);
                published_position = snapshot
                    .current
                    .as_ref()
                    .map(|track| (track.id.clone(), snapshot.position_ms, snapshot.duration_ms));
            }
        });

        if applied {
            trace!(
                session_id = %self.session_id,
                position_ms = reading.position_ms,
                duration_ms = reading.duration_ms,
                "Position tick"
            );
            if let (Some(events), Some((track_id, position_ms, duration_ms))) =
                (&self.position_events, published_position)
            {
                events
                    .emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
                        session_id: self.session_id.to_string(),
                        track_id,
                        position_ms,
                        duration_ms,
                    }))
                    .ok();
            }
        }

        applied
    }
}

async fn read_engine(engine: &dyn MediaEngine) -> Result<EngineReading, BridgeError> {
    let position = engine.position().await?;
    let duration = engine.duration().await?;
    let state = engine.state().await?;
    Ok(EngineReading {
        position_ms: duration_to_millis(position),
        duration_ms: duration_to_millis(duration),
        state,
    })
}

fn clamp_position(position_ms: u64, duration_ms: u64) -> u64 {
    if duration_ms == 0 {
        position_ms
    } else {
        position_ms.min(duration_ms)
    }
}
