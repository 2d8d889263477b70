//! Cancellation tokens for in-flight fetches
//!
//! A token is handed to every fetch started on behalf of a page. Replacing or
//! tearing down the page cancels the token; results that come back afterwards
//! are discarded by whoever checks it.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// Cooperative cancellation flag shared between a page and its fetches.
///
/// Clones observe the same state. Cancelling is idempotent.
///
/// # Example
///
/// ```
/// use scanview_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let fetch_token = token.clone();
///
/// token.cancel();
/// assert!(fetch_token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancels this token and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Sleep for `duration`, waking early if the token is cancelled.
    ///
    /// Returns `false` if the sleep was cut short by cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        const SLICE: Duration = Duration::from_millis(25);

        let mut remaining = duration;
        while !remaining.is_zero() {
            if self.is_cancelled() {
                return false;
            }

            let step = remaining.min(SLICE);
            std::thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }

        !self.is_cancelled()
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation() {
        let page_token = CancellationToken::new();
        let raster_fetch = page_token.clone();
        let text_fetch = page_token.clone();
        assert!(!raster_fetch.is_cancelled());

        page_token.cancel();
        page_token.cancel();

        assert!(raster_fetch.is_cancelled());
        assert!(text_fetch.is_cancelled());
    }

    #[test]
    fn sleep_is_cut_short_by_cancel() {
        let token = CancellationToken::new();
        token.cancel();

        let started = std::time::Instant::now();
        assert!(!token.sleep(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn sleep_runs_to_completion() {
        assert!(CancellationToken::default().sleep(Duration::from_millis(5)));
    }
}
