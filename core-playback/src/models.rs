//! # Playback Domain Models
//!
//! Value types shared by the session controller and its collaborators.

use bridge_traits::{LoadRequest, MediaMetadata};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of one controller instance.
///
/// Attached to tracing fields and emitted events so logs from several
/// sessions (tests, previews) stay distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A playable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Identifier, unique within a queue.
    pub id: String,
    /// Playable source: remote stream or local file URL.
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    /// Duration reported by the catalog, in milliseconds. Informational only;
    /// the engine is authoritative once the track is loaded.
    #[serde(default)]
    pub duration_hint: Option<u64>,
}

impl Track {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: String::new(),
            artist: String::new(),
            album: None,
            artwork_url: None,
            duration_hint: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    pub fn with_artwork_url(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn with_duration_hint(mut self, duration_ms: u64) -> Self {
        self.duration_hint = Some(duration_ms);
        self
    }

    /// Queue identity: two tracks are the same queue entry when their ids match.
    pub fn same_as(&self, other: &Track) -> bool {
        self.id == other.id
    }

    /// A track can only be handed to the engine with a source URL.
    pub fn is_playable(&self) -> bool {
        !self.url.trim().is_empty()
    }

    pub(crate) fn load_request(&self) -> LoadRequest {
        LoadRequest::new(
            self.url.clone(),
            MediaMetadata {
                track_id: self.id.clone(),
                title: self.title.clone(),
                artist: self.artist.clone(),
                album: self.album.clone(),
                artwork_url: self.artwork_url.clone(),
            },
        )
    }
}

/// Repeat policy applied when the queue advances on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Stop after the last track.
    #[default]
    Off,
    /// Replay the current track when it ends.
    One,
    /// Wrap to the first track after the last.
    All,
}

impl RepeatMode {
    /// Repeat button order: Off → All → One → Off.
    pub fn cycle(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::One,
            RepeatMode::One => RepeatMode::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shuffle and repeat flags. Orthogonal; repeat one wins over shuffle at
/// queue end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackMode {
    pub shuffle: bool,
    pub repeat: RepeatMode,
}

impl PlaybackMode {
    pub fn new(shuffle: bool, repeat: RepeatMode) -> Self {
        Self { shuffle, repeat }
    }
}

/// Coarse session state derived from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// The published playback state.
///
/// `current`, `queue` and `index` are always replaced together, so
/// `current == queue[index]` holds whenever `index` is `Some`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub current: Option<Track>,
    pub queue: Arc<[Track]>,
    pub index: Option<usize>,
    pub is_playing: bool,
    pub position_ms: u64,
    /// Zero when unknown.
    pub duration_ms: u64,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    /// A scrub gesture currently owns `position_ms`.
    pub is_scrubbing: bool,
    pub status: SessionStatus,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            current: None,
            queue: empty_queue(),
            index: None,
            is_playing: false,
            position_ms: 0,
            duration_ms: 0,
            shuffle: false,
            repeat: RepeatMode::Off,
            is_scrubbing: false,
            status: SessionStatus::Idle,
        }
    }
}

impl PlaybackSnapshot {
    /// Empty snapshot carrying the given mode.
    pub fn with_mode(mode: PlaybackMode) -> Self {
        Self {
            shuffle: mode.shuffle,
            repeat: mode.repeat,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        PlaybackMode::new(self.shuffle, self.repeat)
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Position as a fraction of the duration; 0 when the duration is unknown.
    pub fn progress_fraction(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    /// Installs a freshly started track.
    pub(crate) fn begin_track(&mut self, track: Track, queue: Arc<[Track]>, index: usize) {
        self.duration_ms = track.duration_hint.unwrap_or(0);
        self.current = Some(track);
        self.queue = queue;
        self.index = Some(index);
        self.is_playing = true;
        self.position_ms = 0;
        self.is_scrubbing = false;
        self.status = SessionStatus::Playing;
    }

    pub(crate) fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
        self.status = match (&self.current, playing) {
            (None, _) => SessionStatus::Idle,
            (Some(_), true) => SessionStatus::Playing,
            (Some(_), false) => SessionStatus::Paused,
        };
    }

    /// Back to idle. `keep_queue` leaves the queue in place so the host can
    /// still render it after the last track finished.
    pub(crate) fn reset(&mut self, keep_queue: bool) {
        self.current = None;
        self.index = None;
        if !keep_queue {
            self.queue = empty_queue();
        }
        self.is_playing = false;
        self.position_ms = 0;
        self.duration_ms = 0;
        self.is_scrubbing = false;
        self.status = SessionStatus::Idle;
    }
}

fn empty_queue() -> Arc<[Track]> {
    Arc::from(Vec::new())
}
