//! # Core Runtime Module
//!
//! Provides the ambient runtime infrastructure for the playback core:
//! - Logging and tracing infrastructure
//! - Configuration management with fail-fast capability checks
//! - Event bus for discrete playback events
//!
//! ## Overview
//!
//! The playback crates depend on this crate for their logging conventions,
//! their configuration entry point and the broadcast channel they publish
//! transitions on. Continuous state (position, queue) is published by the
//! controller itself; the event bus carries the discrete moments that hosts
//! want to react to (track started, playback error).

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
