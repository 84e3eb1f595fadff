//! # Queue Mode Resolver
//!
//! Chooses the next or previous queue index from the queue length, the
//! current index and the shuffle/repeat mode.
//!
//! | Trigger | Repeat | Shuffle | Result |
//! |---------|--------|---------|--------|
//! | queue ended | one | any | current index |
//! | any | any | on, len > 1 | random index other than current |
//! | any | any | on, len == 1 | 0 |
//! | any | any | off | `current + 1`, else 0 under repeat all, else none |
//!
//! Previous never shuffles and never wraps. Manual steps ignore repeat one;
//! replaying the same track is queue-end behavior only.

use crate::models::{PlaybackMode, RepeatMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// What asked for the next index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// User pressed next.
    Manual,
    /// The engine finished the current track.
    QueueEnded,
}

/// Index selection with an owned RNG.
#[derive(Debug)]
pub struct QueueModeResolver {
    rng: StdRng,
}

impl QueueModeResolver {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic shuffle sequence for tests and previews.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::with_seed)
    }

    /// Next index to play, or `None` when playback should not move.
    pub fn next_index(
        &mut self,
        len: usize,
        current: Option<usize>,
        mode: PlaybackMode,
        advance: Advance,
    ) -> Option<usize> {
        if len == 0 {
            return None;
        }

        if advance == Advance::QueueEnded && mode.repeat == RepeatMode::One {
            if let Some(index) = current.filter(|&i| i < len) {
                return Some(index);
            }
        }

        if mode.shuffle {
            // A single-track queue shuffles to itself.
            return Some(if len > 1 {
                self.random_excluding(len, current)
            } else {
                0
            });
        }

        let next = current.map_or(0, |i| i + 1);
        if next < len {
            Some(next)
        } else if mode.repeat == RepeatMode::All {
            Some(0)
        } else {
            None
        }
    }

    /// Previous index, `None` at the head of the queue for every mode.
    pub fn previous_index(&self, current: Option<usize>) -> Option<usize> {
        current.and_then(|i| i.checked_sub(1))
    }

    /// Uniform draw from `[0, len)` without `excluded`. Draws from one fewer
    /// slot and shifts past the excluded index, so it never retries.
    fn random_excluding(&mut self, len: usize, excluded: Option<usize>) -> usize {
        match excluded.filter(|&i| i < len) {
            Some(skip) => {
                let draw = self.rng.gen_range(0..len - 1);
                if draw >= skip {
                    draw + 1
                } else {
                    draw
                }
            }
            None => self.rng.gen_range(0..len),
        }
    }
}

impl Default for QueueModeResolver {
    fn default() -> Self {
        Self::new()
    }
}
