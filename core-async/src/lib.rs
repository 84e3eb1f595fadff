//! Runtime facade for the playback core.
//!
//! Every `core-*` crate reaches the async runtime through this crate instead
//! of depending on tokio directly. Keeping the surface in one place means the
//! controller, the progress poller and the service layer all agree on which
//! timer, lock and channel types are in play.
//!
//! # Modules
//!
//! - `task`: Task spawning and join handles
//! - `time`: Sleep, intervals, timeouts
//! - `sync`: Async locks, channels and cancellation
//! - `runtime`: Blocking entry points for synchronous hosts
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

/// Waits on several branches and runs the first to complete.
pub use tokio::select;

pub use task::spawn;
pub use time::{sleep, Duration, Instant};
