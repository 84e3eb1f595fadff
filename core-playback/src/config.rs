//! # Session Configuration
//!
//! Configuration for a playback session: polling cadence and the initial
//! shuffle/repeat mode.

use crate::error::{PlaybackError, Result};
use crate::models::RepeatMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest accepted poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Longest accepted poll interval.
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Playback session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How often the progress synchronizer reads the engine.
    ///
    /// Shorter intervals give a smoother progress bar at the cost of battery.
    ///
    /// Default: 1 second.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Initial shuffle flag.
    ///
    /// Default: false.
    #[serde(default)]
    pub shuffle: bool,

    /// Initial repeat mode.
    ///
    /// Default: [`RepeatMode::Off`].
    #[serde(default)]
    pub repeat: RepeatMode,

    /// Seed for the shuffle RNG. `None` seeds from OS entropy.
    ///
    /// Set this in tests and previews that need reproducible shuffles.
    #[serde(default)]
    pub shuffle_seed: Option<u64>,

    /// Publish a `PositionChanged` event on every poll tick in addition to
    /// the watch channel update.
    ///
    /// Default: false.
    #[serde(default = "default_emit_position_events")]
    pub emit_position_events: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            shuffle: false,
            repeat: RepeatMode::default(),
            shuffle_seed: None,
            emit_position_events: default_emit_position_events(),
        }
    }
}

impl SessionConfig {
    /// Configuration for a foreground "now playing" screen.
    ///
    /// - 250ms polling for a smooth progress bar
    pub fn responsive() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            ..Default::default()
        }
    }

    /// Configuration for background or low-power playback.
    ///
    /// - 2s polling
    pub fn battery_saver() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            ..Default::default()
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn with_mode(mut self, shuffle: bool, repeat: RepeatMode) -> Self {
        self.shuffle = shuffle;
        self.repeat = repeat;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(PlaybackError::Config(format!(
                "poll_interval must be at least {}ms",
                MIN_POLL_INTERVAL.as_millis()
            )));
        }

        if self.poll_interval > MAX_POLL_INTERVAL {
            return Err(PlaybackError::Config(format!(
                "poll_interval must not exceed {}s",
                MAX_POLL_INTERVAL.as_secs()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_poll_interval() -> Duration {
    Duration::from_millis(1000)
}

fn default_emit_position_events() -> bool {
    false
}
