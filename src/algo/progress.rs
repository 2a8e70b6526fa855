//! Progress reporting for iterative algorithms.
//!
//! Subdivision and relaxation loops report once per iteration. Every report
//! is also logged at `trace` level, so a caller without a callback still sees
//! progress with `RUST_LOG=topomesh=trace`.
//!
//! # Example
//!
//! ```
//! use topomesh::algo::progress::Progress;
//!
//! let progress = Progress::new(|current, total, message| {
//!     println!("[{}/{}] {}", current, total, message);
//! });
//! progress.report(1, 4, "smoothing");
//! ```

use log::trace;

/// A progress callback that receives updates during long-running operations.
///
/// The callback receives the current step (0-based), the total number of
/// steps and a description of the running operation.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Create a new progress reporter with the given callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report progress.
    #[inline]
    pub fn report(&self, current: usize, total: usize, message: &str) {
        trace!("{}: {}/{}", message, current, total);
        (self.callback)(current, total, message);
    }

    /// A reporter that only logs.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_callback_receives_reports() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let progress = Progress::new(move |current, total, _| {
            assert!(current <= total);
            seen.fetch_add(1, Ordering::SeqCst);
        });
        progress.report(0, 2, "step");
        progress.report(2, 2, "step");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
