//! # Playback Error Types
//!
//! Error types for playback session operations.

use thiserror::Error;

/// Errors that can occur during playback session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// The engine rejected `load` or `play` for a track (unplayable source,
    /// network failure, unsupported codec).
    #[error("Failed to load track {track_id}: {reason}")]
    LoadFailed { track_id: String, reason: String },

    /// The engine rejected a seek (out of range, engine not ready).
    #[error("Failed to seek to {position_ms}ms: {reason}")]
    SeekFailed { position_ms: u64, reason: String },

    /// A transport command other than load/seek failed.
    #[error("Engine command '{command}' failed: {reason}")]
    EngineCommandFailed {
        command: &'static str,
        reason: String,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Track cannot be played (missing source URL).
    #[error("Invalid track {0}: source URL is required")]
    InvalidTrack(String),

    /// Queue and index do not describe the requested track.
    #[error("Invalid queue: {0}")]
    InvalidQueue(String),

    /// Session configuration rejected.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An asynchronous completion arrived after a newer operation superseded
    /// it. Never returned to callers.
    #[error("Stale completion for generation {generation}")]
    StaleCompletion { generation: u64 },
}

impl PlaybackError {
    /// Returns `true` if the failed operation may succeed when retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed { .. }
                | PlaybackError::SeekFailed { .. }
                | PlaybackError::EngineCommandFailed { .. }
        )
    }

    /// Returns `true` if hosts are expected to surface this error to the user.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            PlaybackError::LoadFailed { .. } | PlaybackError::SeekFailed { .. }
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
