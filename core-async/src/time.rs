//! Time-related abstractions.
//!
//! Polling loops in the playback core are built from [`interval`] with
//! [`MissedTickBehavior::Skip`], so a slow engine read delays the next tick
//! instead of producing a burst of catch-up ticks.
//!
//! # Examples
//!
//! ```rust
//! use core_async::time::{interval, Duration, MissedTickBehavior};
//!
//! # async fn example() {
//! let mut ticker = interval(Duration::from_millis(250));
//! ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
//! ticker.tick().await;
//! # }
//! ```

pub use tokio::time::{
    interval, interval_at, sleep, sleep_until, timeout, Instant, Interval, MissedTickBehavior,
    Sleep, Timeout,
};

pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
///
/// Engine adapters report positions as [`Duration`]; published playback
/// state works in milliseconds.
///
/// # Examples
///
/// ```rust
/// use core_async::time::{duration_to_millis, Duration};
///
/// assert_eq!(duration_to_millis(Duration::from_secs(3)), 3_000);
/// ```
pub fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Returns the current time as milliseconds since UNIX_EPOCH.
///
/// Returns 0 if the system clock reports a time before the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_to_millis)
        .unwrap_or(0)
}
