//! Workspace umbrella crate.
//!
//! Re-exports the playback core so host applications can depend on a single
//! crate and opt into layers through features instead of wiring each
//! workspace crate individually.

#[cfg(feature = "service")]
pub use core_playback as playback;
#[cfg(feature = "service")]
pub use core_service as service;

#[cfg(feature = "service")]
pub use core_service::{bootstrap, CoreError, CoreService};
