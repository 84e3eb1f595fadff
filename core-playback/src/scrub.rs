//! # Scrub Reconciler
//!
//! Lets a user drag the progress indicator without fighting the progress
//! poll, and commits exactly one seek when the gesture ends.
//!
//! ```text
//! grant() ──> move_to(f)* ──> release(f) ──> controller.seek(ms) ──> scrubbing cleared
//!                        └──> terminate() ─┘
//! ```
//!
//! While a gesture is active the snapshot's `is_scrubbing` flag is set and
//! the poll leaves `position_ms` alone. The flag is cleared only once the
//! seek has returned, so a tick racing the seek cannot publish the pre-seek
//! position.

use crate::controller::PlaybackSessionController;
use crate::error::Result;
use parking_lot::Mutex;
use tracing::debug;

/// The in-progress gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScrubSession {
    start_fraction: f64,
    current_fraction: f64,
}

#[derive(Debug, Default)]
struct SlotInner {
    session: Option<ScrubSession>,
    /// Bumped by every grant and clear, so a release only clears the flag
    /// for its own gesture.
    epoch: u64,
}

/// Scrub session storage shared by every reconciler of one controller.
#[derive(Debug, Default)]
pub(crate) struct ScrubSlot {
    inner: Mutex<SlotInner>,
}

impl ScrubSlot {
    /// Drops any gesture. Used by `stop()`.
    pub(crate) fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.session = None;
        inner.epoch += 1;
    }

    /// Runs `publish` under the slot lock and drops any gesture if it
    /// published. A track change and the gesture it abandons are seen
    /// together by `grant`, which takes the same lock first.
    pub(crate) fn abandon_with<T>(&self, publish: impl FnOnce() -> Option<T>) -> Option<T> {
        let mut inner = self.inner.lock();
        let published = publish()?;
        if inner.session.take().is_some() {
            debug!("Scrub abandoned by track change");
        }
        inner.epoch += 1;
        Some(published)
    }

    fn is_active(&self) -> bool {
        self.inner.lock().session.is_some()
    }
}

/// Gesture-driven seek bound to one controller.
#[derive(Clone)]
pub struct ScrubReconciler {
    controller: PlaybackSessionController,
}

impl ScrubReconciler {
    pub(crate) fn new(controller: PlaybackSessionController) -> Self {
        Self { controller }
    }

    /// Starts a gesture at the current playback fraction and takes ownership
    /// of the published position.
    pub fn grant(&self) {
        let state = self.controller.state();
        let slot = self.controller.scrub_slot();

        let mut inner = slot.inner.lock();
        let start_fraction = state.update(|snapshot| {
            snapshot.is_scrubbing = true;
            snapshot.progress_fraction()
        });
        inner.session = Some(ScrubSession {
            start_fraction,
            current_fraction: start_fraction,
        });
        inner.epoch += 1;
        debug!(
            session_id = %self.controller.session_id(),
            start_fraction,
            "Scrub granted"
        );
    }

    /// Moves the optimistic position. Never calls the engine. Ignored when no
    /// gesture is active.
    pub fn move_to(&self, fraction: f64) {
        let fraction = clamp_fraction(fraction);
        let slot = self.controller.scrub_slot();

        let mut inner = slot.inner.lock();
        let Some(session) = inner.session.as_mut() else {
            return;
        };
        session.current_fraction = fraction;

        self.controller.state().update(|snapshot| {
            if snapshot.is_scrubbing {
                snapshot.position_ms = fraction_to_ms(fraction, snapshot.duration_ms);
            }
        });
    }

    /// Ends the gesture at `fraction` and commits one seek.
    ///
    /// With an unknown duration the position is reset to 0 and no seek is
    /// issued. A release without a prior grant behaves as if the gesture had
    /// been granted at `fraction`.
    pub async fn release(&self, fraction: f64) -> Result<()> {
        let fraction = clamp_fraction(fraction);
        let state = self.controller.state();
        let slot = self.controller.scrub_slot();

        let (epoch, target_ms) = {
            let mut inner = slot.inner.lock();
            let session = inner.session.take();
            inner.epoch += 1;
            let epoch = inner.epoch;

            let target_ms = state.update(|snapshot| {
                if snapshot.duration_ms == 0 {
                    snapshot.position_ms = 0;
                    snapshot.is_scrubbing = false;
                    None
                } else {
                    let ms = fraction_to_ms(fraction, snapshot.duration_ms);
                    snapshot.position_ms = ms;
                    snapshot.is_scrubbing = true;
                    Some(ms)
                }
            });

            debug!(
                session_id = %self.controller.session_id(),
                granted = session.is_some(),
                start_fraction = session.map(|s| s.start_fraction),
                fraction,
                "Scrub released"
            );
            (epoch, target_ms)
        };

        let Some(target_ms) = target_ms else {
            return Ok(());
        };

        let result = self.controller.seek(target_ms).await;

        let inner = slot.inner.lock();
        if inner.epoch == epoch {
            state.update(|snapshot| snapshot.is_scrubbing = false);
        }
        result
    }

    /// The platform cancelled the gesture. Commits the last known fraction;
    /// no-op without an active gesture.
    pub async fn terminate(&self) -> Result<()> {
        let last = {
            let inner = self.controller.scrub_slot().inner.lock();
            inner.session.map(|s| s.current_fraction)
        };

        match last {
            Some(fraction) => self.release(fraction).await,
            None => Ok(()),
        }
    }

    /// Whether a gesture is in progress.
    pub fn is_active(&self) -> bool {
        self.controller.scrub_slot().is_active()
    }

    /// Position the gesture currently points at.
    pub fn preview_position_ms(&self) -> Option<u64> {
        let current = self
            .controller
            .scrub_slot()
            .inner
            .lock()
            .session
            .map(|s| s.current_fraction)?;
        Some(fraction_to_ms(current, self.controller.snapshot().duration_ms))
    }
}

fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

fn fraction_to_ms(fraction: f64, duration_ms: u64) -> u64 {
    (fraction * duration_ms as f64).round() as u64
}
