//! Scanview Scheduler Library
//!
//! Timing and cancellation primitives for the page viewer.
//!
//! The viewer runs its state machines on a single logical event loop. Delayed
//! work is expressed as entries in a [`TimerQueue`] that the owner polls with
//! the current time, rather than as free-running callbacks, so every pending
//! action can be enumerated and cancelled. Blocking I/O that must run
//! concurrently (continuous-mode preloading) goes through
//! [`load_in_batches`], which bounds concurrency and honours a
//! [`CancellationToken`].
//!
//! # Example
//!
//! ```
//! use scanview_scheduler::{Debouncer, TimerQueue};
//! use std::time::Duration;
//!
//! let mut timers = TimerQueue::new();
//! let retry = timers.schedule(Duration::ZERO, Duration::from_secs(1), "retry");
//!
//! // Navigating away cancels the pending retry.
//! assert!(timers.cancel(retry));
//!
//! let mut debouncer = Debouncer::new(Duration::from_millis(180));
//! debouncer.trigger(Duration::ZERO);
//! assert!(debouncer.fire(Duration::from_millis(180)));
//! ```

mod batch;
mod cancel;
mod debounce;
mod retry;
mod timer;

// Re-export public API
pub use batch::{load_in_batches, BatchConfig, BatchOutcome, BatchProgress};
pub use cancel::CancellationToken;
pub use debounce::Debouncer;
pub use retry::RetryPolicy;
pub use timer::{TimerId, TimerQueue};
