//! # Core Configuration Module
//!
//! Provides configuration management for the playback core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance holding the host bridges and runtime settings. It enforces
//! fail-fast validation so a missing engine is reported at startup instead of
//! on the first play call.
//!
//! ## Required Dependencies
//!
//! - `MediaEngine` - the host audio engine the session drives
//!
//! ## Optional Dependencies
//!
//! - `LoggerSink` - mirrors core logs into the host logging pipeline
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_engine(Arc::new(MyEngine::new()))
//!     .event_buffer_size(256)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use core_runtime::Error;
//!
//! let result = CoreConfig::builder().build();
//! assert!(matches!(result, Err(Error::CapabilityMissing { .. })));
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{LoggerSink, MediaEngine};
use std::sync::Arc;

/// Upper bound for the event bus buffer.
pub const MAX_EVENT_BUFFER_SIZE: usize = 10_000;

/// Core configuration for the playback core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Host audio engine (required)
    pub media_engine: Arc<dyn MediaEngine>,

    /// Host log sink (optional)
    pub logger_sink: Option<Arc<dyn LoggerSink>>,

    /// Per-subscriber buffer of the playback event bus
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_engine", &"MediaEngine { ... }")
            .field(
                "logger_sink",
                &self.logger_sink.as_ref().map(|_| "LoggerSink { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_buffer_size > MAX_EVENT_BUFFER_SIZE {
            return Err(Error::Config(format!(
                "Event buffer size exceeds maximum of {}",
                MAX_EVENT_BUFFER_SIZE
            )));
        }

        Ok(())
    }
}

fn media_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaEngine".to_string(),
        message: "MediaEngine implementation is required to drive playback. \
                 iOS: inject an AVPlayer-backed engine. \
                 Android: inject an ExoPlayer-backed engine. \
                 Desktop preview: inject a simulated or rodio-backed engine."
            .to_string(),
    }
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    media_engine: Option<Arc<dyn MediaEngine>>,
    logger_sink: Option<Arc<dyn LoggerSink>>,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the media engine implementation (required).
    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    /// Sets the host logger sink (optional).
    pub fn logger_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.logger_sink = Some(sink);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100 events per subscriber
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no `MediaEngine` was provided
    /// - [`Error::Config`] when the event buffer size is out of range
    pub fn build(self) -> Result<CoreConfig> {
        let media_engine = self.media_engine.ok_or_else(media_engine_missing_error)?;

        let config = CoreConfig {
            media_engine,
            logger_sink: self.logger_sink,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
