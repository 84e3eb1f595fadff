//! Runtime utilities for synchronous hosts.
//!
//! Host shells that are not async themselves (FFI entry points, test
//! harnesses) use [`block_on`] to drive a single future to completion.

pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a fresh current-thread runtime.
///
/// # Errors
///
/// Returns the I/O error raised if the runtime could not be built.
pub fn block_on<F>(future: F) -> std::io::Result<F::Output>
where
    F: std::future::Future,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

/// Returns `true` when called from within a tokio runtime context.
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}
