//! # Session State
//!
//! The published snapshot and the generation counter that guards it.
//!
//! Every write to the snapshot happens while the generation lock is held, so
//! "is this completion still current?" and the write it guards are one atomic
//! step. Writers that may be stale (the progress poller, load completions)
//! use [`SessionState::write_if_current`]; transitions that supersede
//! everything in flight use [`SessionState::supersede`].

use crate::models::PlaybackSnapshot;
use core_async::sync::watch;
use parking_lot::Mutex;

#[derive(Debug)]
pub(crate) struct SessionState {
    generation: Mutex<u64>,
    published: watch::Sender<PlaybackSnapshot>,
}

impl SessionState {
    pub(crate) fn new(initial: PlaybackSnapshot) -> Self {
        let (published, _) = watch::channel(initial);
        Self {
            generation: Mutex::new(0),
            published,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        *self.generation.lock() == generation
    }

    pub(crate) fn snapshot(&self) -> PlaybackSnapshot {
        self.published.borrow().clone()
    }

    /// Snapshot together with the generation it was observed at.
    pub(crate) fn observe(&self) -> (u64, PlaybackSnapshot) {
        let generation = self.generation.lock();
        (*generation, self.published.borrow().clone())
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.published.subscribe()
    }

    /// Starts a new generation without touching the snapshot.
    pub(crate) fn advance(&self) -> u64 {
        let mut generation = self.generation.lock();
        *generation += 1;
        *generation
    }

    /// Starts a new generation only if nothing superseded `expected`.
    pub(crate) fn advance_from(&self, expected: u64) -> Option<u64> {
        let mut generation = self.generation.lock();
        if *generation != expected {
            return None;
        }
        *generation += 1;
        Some(*generation)
    }

    /// Starts a new generation and applies `f` in the same critical section.
    pub(crate) fn supersede<F>(&self, f: F) -> u64
    where
        F: FnOnce(&mut PlaybackSnapshot),
    {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.published.send_modify(f);
        *generation
    }

    /// Like [`supersede`](Self::supersede) but only when `expected` is still
    /// the current generation.
    pub(crate) fn supersede_from<F>(&self, expected: u64, f: F) -> Option<u64>
    where
        F: FnOnce(&mut PlaybackSnapshot),
    {
        let mut generation = self.generation.lock();
        if *generation != expected {
            return None;
        }
        *generation += 1;
        self.published.send_modify(f);
        Some(*generation)
    }

    /// Applies `f` if `generation` is still current. Returns whether it did.
    pub(crate) fn write_if_current<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut PlaybackSnapshot),
    {
        let current = self.generation.lock();
        if *current != generation {
            return false;
        }
        self.published.send_modify(f);
        true
    }

    /// Generation-independent write (mode flags, scrub ownership).
    pub(crate) fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut PlaybackSnapshot) -> R,
    {
        let _generation = self.generation.lock();
        let mut next = self.published.borrow().clone();
        let result = f(&mut next);
        self.published.send_replace(next);
        result
    }
}
