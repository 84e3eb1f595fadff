//! Synchronization primitives.
//!
//! Async-aware locks and channels from tokio plus tokio-util's
//! [`CancellationToken`]. Use the async [`Mutex`] only when the guard must be
//! held across an `.await`; short critical sections should use a blocking
//! lock instead.
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::{watch, CancellationToken};
//!
//! # async fn example() {
//! let (tx, mut rx) = watch::channel(0u64);
//! tx.send_modify(|value| *value += 1);
//! rx.changed().await.unwrap();
//! assert_eq!(*rx.borrow(), 1);
//!
//! let token = CancellationToken::new();
//! token.cancel();
//! assert!(token.is_cancelled());
//! # }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, OwnedMutexGuard, RwLock,
    Semaphore,
};

pub use tokio_util::sync::CancellationToken;
