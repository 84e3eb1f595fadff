//! # Host Bridge Traits
//!
//! Contracts between the playback core and the host platform.
//!
//! ## Overview
//!
//! The core never talks to a native audio engine or a platform logger
//! directly. Each host (iOS, Android, desktop preview, tests) supplies
//! implementations of the traits below and hands them to the core at
//! construction time.
//!
//! ## Traits
//!
//! - [`MediaEngine`](playback::MediaEngine) - Native audio engine: load one
//!   item, transport control, position/duration/state queries and a
//!   queue-ended event stream
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! should convert platform errors into it with an actionable message (codec
//! name, URL host, engine state) rather than a bare status code.
//!
//! ## Thread Safety
//!
//! Bridge traits require `Send + Sync` so a single engine handle can be shared
//! by the controller, the progress poller and the engine-event pump.

pub mod error;
pub mod logging;
pub mod playback;

pub use error::BridgeError;

pub use logging::{LogEntry, LogLevel, LoggerSink, RecordingLogger};
pub use playback::{EngineEvent, EngineState, LoadRequest, MediaEngine, MediaMetadata};
