//! # Playback Session Core
//!
//! Owns what is currently playing and keeps the published state consistent
//! with an asynchronous host media engine.
//!
//! ## Overview
//!
//! - [`PlaybackSessionController`] - play/pause/resume/stop/seek, queue
//!   stepping and shuffle/repeat, engine event handling
//! - [`QueueModeResolver`] - next/previous index selection
//! - [`ProgressSynchronizer`] - periodic position polling
//! - [`ScrubReconciler`] - gesture-driven seek with exactly one commit
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{PlaybackSessionController, SessionConfig, Track};
//! use core_runtime::events::EventBus;
//!
//! let controller = PlaybackSessionController::new(engine, SessionConfig::default(), EventBus::default())?;
//! let queue = vec![
//!     Track::new("1", "https://cdn.example.com/1.mp3").with_title("Intro"),
//!     Track::new("2", "https://cdn.example.com/2.mp3").with_title("Theme"),
//! ];
//! controller.play_queue(queue[0].clone(), queue, 0).await?;
//!
//! let mut updates = controller.subscribe();
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow().clone();
//!     render(snapshot.position_ms, snapshot.duration_ms);
//! }
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod progress;
pub mod resolver;
pub mod scrub;

mod state;

pub use config::SessionConfig;
pub use controller::PlaybackSessionController;
pub use error::{PlaybackError, Result};
pub use models::{
    PlaybackMode, PlaybackSnapshot, RepeatMode, SessionId, SessionStatus, Track,
};
pub use progress::ProgressSynchronizer;
pub use resolver::{Advance, QueueModeResolver};
pub use scrub::ScrubReconciler;
