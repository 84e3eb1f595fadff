//! Media engine bridge trait and supporting types.
//!
//! The native audio engine (AVPlayer, ExoPlayer, a desktop preview engine) is
//! owned by the host. The core drives it through [`MediaEngine`]: one item is
//! loaded at a time, transport commands are asynchronous and may fail, and
//! the engine announces that the loaded item finished through
//! [`EngineEvent::QueueEnded`].

use crate::error::Result;
use core_async::sync::broadcast;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Display metadata handed to the engine alongside a source URL.
///
/// Engines use it for lock-screen and notification-center entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Opaque track identifier.
    pub track_id: String,
    /// Display title (may be empty).
    pub title: String,
    /// Display artist (may be empty).
    pub artist: String,
    /// Album or collection name.
    pub album: Option<String>,
    /// Artwork URL for platform media sessions.
    pub artwork_url: Option<String>,
}

/// Request describing the single item an engine should load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Playable source URL (remote stream or local file URL).
    pub url: String,
    /// Position to start from once loaded.
    pub start_position: Duration,
    /// Metadata surfaced to the host media session.
    pub metadata: MediaMetadata,
}

impl LoadRequest {
    /// Create a request that starts at the beginning of the stream.
    pub fn new(url: impl Into<String>, metadata: MediaMetadata) -> Self {
        Self {
            url: url.into(),
            start_position: Duration::ZERO,
            metadata,
        }
    }

    /// Start playback from `position` instead of zero.
    pub fn with_start_position(mut self, position: Duration) -> Self {
        self.start_position = position;
        self
    }
}

/// Transport state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Playing,
    Paused,
}

impl EngineState {
    pub fn is_playing(&self) -> bool {
        matches!(self, EngineState::Playing)
    }
}

/// Events pushed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// The loaded item finished and nothing else is queued inside the engine.
    QueueEnded,
    /// The engine hit an unrecoverable playback error (stream dropped,
    /// decoder failure) outside of any command call.
    Error { message: String },
}

/// Trait for platform audio engines.
///
/// All commands are asynchronous and fail-capable. The core never assumes
/// ordering between two calls issued from different tasks; it serializes its
/// own commands and treats late completions as stale.
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Replace whatever is loaded with the requested item. Does not start
    /// playback.
    async fn load(&self, request: LoadRequest) -> Result<()>;

    /// Start or resume playback of the loaded item.
    async fn play(&self) -> Result<()>;

    /// Pause without unloading.
    async fn pause(&self) -> Result<()>;

    /// Halt playback and release the loaded item.
    async fn stop(&self) -> Result<()>;

    /// Seek to an absolute position within the loaded item.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Current playback position.
    async fn position(&self) -> Result<Duration>;

    /// Duration of the loaded item; [`Duration::ZERO`] when unknown.
    async fn duration(&self) -> Result<Duration>;

    /// Current transport state.
    async fn state(&self) -> Result<EngineState>;

    /// Subscribe to engine events. Each call returns an independent receiver.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}
