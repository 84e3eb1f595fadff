//! # Playback Session Controller
//!
//! Owns "what is currently playing" for one session and drives the host
//! [`MediaEngine`] through queue, transport and mode changes.
//!
//! ## State machine
//!
//! ```text
//!            play                 pause
//!   Idle ──────────> Playing ─────────────> Paused
//!    ^                 │  ^                   │
//!    │    stop         │  └──── resume ───────┘
//!    └─────────────────┤
//!                      │ QueueEnded
//!                      v
//!            queue-end resolution ──> Playing (repeat one, shuffle, advance, wrap)
//!                                 └─> Idle    (end of queue, repeat off)
//! ```
//!
//! ## Concurrency
//!
//! - Every play-like transition starts a new generation. Completions carry
//!   the generation they were issued for and are dropped once stale.
//! - Engine transport commands are serialized by an async transport lock.
//!   The generation is re-checked after acquiring it and after the load
//!   returns, so a superseded play never starts the engine.
//! - `stop()` supersedes and publishes Idle before it waits for the
//!   transport lock, so it always wins over an in-flight load.

use crate::config::SessionConfig;
use crate::error::{PlaybackError, Result};
use crate::models::{PlaybackMode, PlaybackSnapshot, RepeatMode, SessionId, Track};
use crate::progress::ProgressSynchronizer;
use crate::resolver::{Advance, QueueModeResolver};
use crate::scrub::{ScrubReconciler, ScrubSlot};
use crate::state::SessionState;
use bridge_traits::{EngineEvent, MediaEngine};
use core_async::sync::{watch, Mutex as TransportLock};
use core_async::time::Duration;
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent, QueueEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Playback session controller.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct PlaybackSessionController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    id: SessionId,
    engine: Arc<dyn MediaEngine>,
    state: Arc<SessionState>,
    progress: ProgressSynchronizer,
    resolver: Mutex<QueueModeResolver>,
    transport: TransportLock<()>,
    scrub: ScrubSlot,
    events: EventBus,
}

impl PlaybackSessionController {
    /// Creates an idle session.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::Config`] if `config` fails validation.
    pub fn new(
        engine: Arc<dyn MediaEngine>,
        config: SessionConfig,
        events: EventBus,
    ) -> Result<Self> {
        config.validate()?;

        let id = SessionId::new();
        let mode = PlaybackMode::new(config.shuffle, config.repeat);
        let state = Arc::new(SessionState::new(PlaybackSnapshot::with_mode(mode)));
        let position_events = config.emit_position_events.then(|| events.clone());
        let progress = ProgressSynchronizer::new(
            id,
            Arc::clone(&engine),
            Arc::clone(&state),
            config.poll_interval,
            position_events,
        );

        info!(
            session_id = %id,
            poll_interval_ms = config.poll_interval.as_millis() as u64,
            "Playback session created"
        );

        Ok(Self {
            inner: Arc::new(ControllerInner {
                id,
                engine,
                state,
                progress,
                resolver: Mutex::new(QueueModeResolver::from_seed(config.shuffle_seed)),
                transport: TransportLock::new(()),
                scrub: ScrubSlot::default(),
                events,
            }),
        })
    }

    pub fn session_id(&self) -> SessionId {
        self.inner.id
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.state.snapshot()
    }

    /// Change notifications for the published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.inner.state.subscribe()
    }

    /// Scrub gesture handle bound to this session.
    pub fn scrubber(&self) -> ScrubReconciler {
        ScrubReconciler::new(self.clone())
    }

    /// Whether the progress poll is running.
    pub fn is_polling(&self) -> bool {
        self.inner.progress.is_running()
    }

    pub(crate) fn state(&self) -> &SessionState {
        &self.inner.state
    }

    pub(crate) fn scrub_slot(&self) -> &ScrubSlot {
        &self.inner.scrub
    }

    // ========================================================================
    // Queue
    // ========================================================================

    /// Plays a single track as a one-item queue.
    pub async fn play(&self, track: Track) -> Result<()> {
        let queue = vec![track.clone()];
        self.play_queue(track, queue, 0).await
    }

    /// Replaces the current track, queue and index, then starts playback.
    ///
    /// The most recent call wins: a call superseded by a newer play or by
    /// `stop()` returns `Ok(())` without starting the engine.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidTrack`] / [`PlaybackError::InvalidQueue`]
    ///   before anything is touched
    /// - [`PlaybackError::LoadFailed`] when the engine rejects the track; the
    ///   previous track and queue stay published with `is_playing == false`
    pub async fn play_queue(
        &self,
        track: Track,
        queue: impl Into<Arc<[Track]>>,
        index: usize,
    ) -> Result<()> {
        let queue = queue.into();
        validate_request(&track, &queue, index)?;
        let generation = self.inner.state.advance();
        self.start_playback(track, queue, index, generation).await
    }

    /// Steps forward through the queue under the current mode. No-op at the
    /// end of the queue unless repeat all is on.
    pub async fn next(&self) -> Result<()> {
        let snapshot = self.inner.state.snapshot();
        let next = self.inner.resolver.lock().next_index(
            snapshot.queue.len(),
            snapshot.index,
            snapshot.mode(),
            Advance::Manual,
        );

        match next {
            Some(index) => self.advance_to(None, snapshot.queue, index).await,
            None => {
                debug!(session_id = %self.inner.id, "Next: end of queue");
                Ok(())
            }
        }
    }

    /// Steps back one track. Never shuffles and never wraps.
    pub async fn previous(&self) -> Result<()> {
        let snapshot = self.inner.state.snapshot();
        let previous = self.inner.resolver.lock().previous_index(snapshot.index);

        match previous {
            Some(index) => self.advance_to(None, snapshot.queue, index).await,
            None => {
                debug!(session_id = %self.inner.id, "Previous: start of queue");
                Ok(())
            }
        }
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Pauses the engine and the progress poll.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn pause(&self) -> Result<()> {
        let track_id = self.current_track_id()?;
        let _transport = self.inner.transport.lock().await;
        let generation = self.inner.state.generation();

        self.inner.engine.pause().await.map_err(|e| {
            error!(track_id = %track_id, error = %e, "Pause failed");
            PlaybackError::EngineCommandFailed {
                command: "pause",
                reason: e.to_string(),
            }
        })?;

        self.inner.progress.stop();
        let mut position_ms = 0;
        self.inner.state.write_if_current(generation, |snapshot| {
            snapshot.set_playing(false);
            position_ms = snapshot.position_ms;
        });

        info!(track_id = %track_id, position_ms, "Playback paused");
        self.emit(CoreEvent::Playback(PlaybackEvent::Paused {
            session_id: self.inner.id.to_string(),
            track_id,
            position_ms,
        }));
        Ok(())
    }

    /// Resumes the engine and restarts the progress poll.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn resume(&self) -> Result<()> {
        let track_id = self.current_track_id()?;
        let _transport = self.inner.transport.lock().await;
        let generation = self.inner.state.generation();

        self.inner.engine.play().await.map_err(|e| {
            error!(track_id = %track_id, error = %e, "Resume failed");
            PlaybackError::EngineCommandFailed {
                command: "play",
                reason: e.to_string(),
            }
        })?;

        let mut position_ms = 0;
        let applied = self.inner.state.write_if_current(generation, |snapshot| {
            snapshot.set_playing(true);
            position_ms = snapshot.position_ms;
        });
        if applied {
            self.inner.progress.start(generation);
        }

        info!(track_id = %track_id, position_ms, "Playback resumed");
        self.emit(CoreEvent::Playback(PlaybackEvent::Resumed {
            session_id: self.inner.id.to_string(),
            track_id,
            position_ms,
        }));
        Ok(())
    }

    /// Halts playback and clears the queue.
    ///
    /// The published state is Idle as soon as this is called, even if the
    /// engine stop itself fails.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn stop(&self) -> Result<()> {
        let generation = self.inner.state.supersede(|snapshot| snapshot.reset(false));
        self.inner.progress.stop();
        self.inner.scrub.clear();

        let _transport = self.inner.transport.lock().await;
        let result = self.inner.engine.stop().await.map_err(|e| {
            error!(generation, error = %e, "Engine stop failed");
            PlaybackError::EngineCommandFailed {
                command: "stop",
                reason: e.to_string(),
            }
        });

        info!(generation, "Playback stopped");
        self.emit(CoreEvent::Playback(PlaybackEvent::Stopped {
            session_id: self.inner.id.to_string(),
        }));
        result
    }

    /// Seeks within the current track and publishes the new position without
    /// waiting for the next poll. Clamped to the duration when known.
    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        let track_id = self.current_track_id()?;
        let _transport = self.inner.transport.lock().await;
        let (generation, snapshot) = self.inner.state.observe();

        let target_ms = if snapshot.duration_ms > 0 {
            position_ms.min(snapshot.duration_ms)
        } else {
            position_ms
        };

        self.inner
            .engine
            .seek(Duration::from_millis(target_ms))
            .await
            .map_err(|e| {
                error!(track_id = %track_id, position_ms = target_ms, error = %e, "Seek failed");
                PlaybackError::SeekFailed {
                    position_ms: target_ms,
                    reason: e.to_string(),
                }
            })?;

        let applied = self
            .inner
            .state
            .write_if_current(generation, |snapshot| snapshot.position_ms = target_ms);
        if !applied {
            debug!(track_id = %track_id, "Seek completion superseded");
            return Ok(());
        }

        debug!(track_id = %track_id, position_ms = target_ms, "Seek committed");
        self.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
            session_id: self.inner.id.to_string(),
            track_id,
            position_ms: target_ms,
            duration_ms: snapshot.duration_ms,
        }));
        Ok(())
    }

    // ========================================================================
    // Mode
    // ========================================================================

    /// Takes effect on the next advance decision.
    pub fn set_shuffle(&self, shuffle: bool) {
        let mode = self.inner.state.update(|snapshot| {
            snapshot.shuffle = shuffle;
            snapshot.mode()
        });
        self.mode_changed(mode);
    }

    /// Takes effect on the next advance decision.
    pub fn set_repeat_mode(&self, repeat: RepeatMode) {
        let mode = self.inner.state.update(|snapshot| {
            snapshot.repeat = repeat;
            snapshot.mode()
        });
        self.mode_changed(mode);
    }

    /// Flips shuffle and returns the new value.
    pub fn toggle_shuffle(&self) -> bool {
        let mode = self.inner.state.update(|snapshot| {
            snapshot.shuffle = !snapshot.shuffle;
            snapshot.mode()
        });
        self.mode_changed(mode);
        mode.shuffle
    }

    /// Advances repeat Off → All → One → Off and returns the new mode.
    pub fn cycle_repeat_mode(&self) -> RepeatMode {
        let mode = self.inner.state.update(|snapshot| {
            snapshot.repeat = snapshot.repeat.cycle();
            snapshot.mode()
        });
        self.mode_changed(mode);
        mode.repeat
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    /// Reacts to an event pushed by the engine.
    pub async fn handle_engine_event(&self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::QueueEnded => self.resolve_queue_end().await,
            EngineEvent::Error { message } => {
                self.engine_failed(message);
                Ok(())
            }
        }
    }

    #[instrument(skip(self), fields(session_id = %self.inner.id))]
    async fn resolve_queue_end(&self) -> Result<()> {
        let (observed, snapshot) = self.inner.state.observe();
        let Some(finished) = snapshot.current.as_ref() else {
            debug!("Queue ended with no current track");
            return Ok(());
        };

        self.emit(CoreEvent::Playback(PlaybackEvent::Completed {
            session_id: self.inner.id.to_string(),
            track_id: finished.id.clone(),
        }));

        let next = self.inner.resolver.lock().next_index(
            snapshot.queue.len(),
            snapshot.index,
            snapshot.mode(),
            Advance::QueueEnded,
        );

        match next {
            Some(index) => self.advance_to(Some(observed), snapshot.queue, index).await,
            None => {
                let exhausted = self.inner.scrub.abandon_with(|| {
                    self.inner
                        .state
                        .supersede_from(observed, |snapshot| snapshot.reset(true))
                });
                if exhausted.is_none() {
                    debug!("Queue end superseded");
                    return Ok(());
                }
                self.inner.progress.stop();
                info!(queue_len = snapshot.queue.len(), "Queue exhausted");
                self.emit(CoreEvent::Queue(QueueEvent::Exhausted {
                    session_id: self.inner.id.to_string(),
                }));
                Ok(())
            }
        }
    }

    fn engine_failed(&self, message: String) {
        self.inner.progress.stop();
        let track_id = self.inner.state.update(|snapshot| {
            snapshot.set_playing(false);
            snapshot.current.as_ref().map(|t| t.id.clone())
        });

        error!(
            session_id = %self.inner.id,
            track_id = track_id.as_deref().unwrap_or(""),
            error = %message,
            "Engine reported playback error"
        );
        self.emit(CoreEvent::Playback(PlaybackEvent::Error {
            session_id: self.inner.id.to_string(),
            track_id,
            message,
            recoverable: false,
        }));
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Plays `queue[index]`. With `observed` set, the step is dropped if that
    /// generation has been superseded.
    async fn advance_to(
        &self,
        observed: Option<u64>,
        queue: Arc<[Track]>,
        index: usize,
    ) -> Result<()> {
        let Some(track) = queue.get(index).cloned() else {
            return Err(PlaybackError::InvalidQueue(format!(
                "index {} out of bounds for queue of {}",
                index,
                queue.len()
            )));
        };
        validate_request(&track, &queue, index)?;

        let generation = match observed {
            Some(expected) => self.inner.state.advance_from(expected),
            None => Some(self.inner.state.advance()),
        };

        match generation {
            Some(generation) => self.start_playback(track, queue, index, generation).await,
            None => {
                debug!(session_id = %self.inner.id, "Advance superseded");
                Ok(())
            }
        }
    }

    #[instrument(
        skip(self, track, queue),
        fields(session_id = %self.inner.id, track_id = %track.id)
    )]
    async fn start_playback(
        &self,
        track: Track,
        queue: Arc<[Track]>,
        index: usize,
        generation: u64,
    ) -> Result<()> {
        let _transport = self.inner.transport.lock().await;

        match self.load_and_start(&track, generation).await {
            Ok(()) => {
                let published = self.inner.scrub.abandon_with(|| {
                    self.inner
                        .state
                        .write_if_current(generation, |snapshot| {
                            snapshot.begin_track(track.clone(), Arc::clone(&queue), index)
                        })
                        .then_some(())
                });
                if published.is_none() {
                    debug!("Play completion superseded after start");
                    return Ok(());
                }

                self.inner.progress.start(generation);
                info!(title = %track.title, queue_len = queue.len(), "Playback started");
                self.emit(CoreEvent::Queue(QueueEvent::Replaced {
                    session_id: self.inner.id.to_string(),
                    length: queue.len(),
                }));
                self.emit(CoreEvent::Playback(PlaybackEvent::Started {
                    session_id: self.inner.id.to_string(),
                    track_id: track.id.clone(),
                    title: track.title.clone(),
                    index,
                }));
                Ok(())
            }
            Err(PlaybackError::StaleCompletion { generation }) => {
                debug!(generation, "Stale load completion dropped");
                Ok(())
            }
            Err(err) => {
                error!(error = %err, "Load failed");
                self.inner.progress.stop();
                self.inner
                    .state
                    .write_if_current(generation, |snapshot| snapshot.set_playing(false));
                self.emit(CoreEvent::Playback(PlaybackEvent::Error {
                    session_id: self.inner.id.to_string(),
                    track_id: Some(track.id.clone()),
                    message: err.to_string(),
                    recoverable: err.is_transient(),
                }));
                Err(err)
            }
        }
    }

    /// Resets the engine, loads `track` and starts it. Must be called with
    /// the transport lock held.
    async fn load_and_start(&self, track: &Track, generation: u64) -> Result<()> {
        let stale = || PlaybackError::StaleCompletion { generation };
        let load_failed = |reason: String| PlaybackError::LoadFailed {
            track_id: track.id.clone(),
            reason,
        };

        if !self.inner.state.is_current(generation) {
            return Err(stale());
        }
        self.inner.progress.stop();

        if let Err(e) = self.inner.engine.stop().await {
            warn!(error = %e, "Engine reset before load failed");
        }

        debug!(url = %track.url, "Loading track");
        self.inner
            .engine
            .load(track.load_request())
            .await
            .map_err(|e| load_failed(e.to_string()))?;

        if !self.inner.state.is_current(generation) {
            return Err(stale());
        }

        self.inner
            .engine
            .play()
            .await
            .map_err(|e| load_failed(e.to_string()))
    }

    fn current_track_id(&self) -> Result<String> {
        self.inner
            .state
            .snapshot()
            .current
            .map(|track| track.id)
            .ok_or(PlaybackError::NoTrackLoaded)
    }

    fn mode_changed(&self, mode: PlaybackMode) {
        info!(
            session_id = %self.inner.id,
            shuffle = mode.shuffle,
            repeat = %mode.repeat,
            "Playback mode changed"
        );
        self.emit(CoreEvent::Queue(QueueEvent::ModeChanged {
            session_id: self.inner.id.to_string(),
            shuffle: mode.shuffle,
            repeat: mode.repeat.as_str().to_string(),
        }));
    }

    fn emit(&self, event: CoreEvent) {
        // No subscribers is not an error for the session.
        self.inner.events.emit(event).ok();
    }
}

impl std::fmt::Debug for PlaybackSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSessionController")
            .field("session_id", &self.inner.id)
            .field("polling", &self.is_polling())
            .finish()
    }
}

fn validate_request(track: &Track, queue: &[Track], index: usize) -> Result<()> {
    if !track.is_playable() {
        return Err(PlaybackError::InvalidTrack(track.id.clone()));
    }

    match queue.get(index) {
        Some(entry) if entry.same_as(track) => Ok(()),
        Some(entry) => Err(PlaybackError::InvalidQueue(format!(
            "queue[{}] is {}, expected {}",
            index, entry.id, track.id
        ))),
        None => Err(PlaybackError::InvalidQueue(format!(
            "index {} out of bounds for queue of {}",
            index,
            queue.len()
        ))),
    }
}
