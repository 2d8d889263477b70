//! Chunked concurrent loading for continuous scroll
//!
//! Fetching every page of a long document at once would open thousands of
//! requests. Pages are instead split into fixed-size batches: batches run one
//! after another, the requests inside a batch run concurrently on scoped
//! threads, and each request retries on its own so one bad page never fails
//! its batch.

use crate::cancel::CancellationToken;
use crate::retry::RetryPolicy;
use std::fmt::Display;
use std::thread;

/// Configuration for [`load_in_batches`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum number of concurrent requests
    pub batch_size: usize,
    pub retry: RetryPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            retry: RetryPolicy::default(),
        }
    }
}

/// Progress reported after every completed batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub batch_index: usize,
    pub batch_count: usize,
    /// Items settled so far, loaded or failed
    pub completed: usize,
    pub total: usize,
}

/// Final result of a batch load
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// Successfully loaded items, in input order
    pub loaded: Vec<(u32, T)>,
    /// Items that exhausted their retries, in input order
    pub failed: Vec<u32>,
    /// Whether the load stopped early because the token was cancelled
    pub cancelled: bool,
}

impl<T> BatchOutcome<T> {
    fn new() -> Self {
        Self {
            loaded: Vec::new(),
            failed: Vec::new(),
            cancelled: false,
        }
    }
}

enum ItemResult<T> {
    Loaded(T),
    Failed,
    Cancelled,
}

/// Load `items` in sequential batches of concurrent requests.
///
/// `fetch` is called with the item key; it should honour the per-attempt
/// timeout in `config.retry`. `on_batch` is invoked after each batch with
/// the items it loaded, so callers can surface partial results early.
/// Results that arrive after `token` is cancelled are dropped.
pub fn load_in_batches<T, E, F, P>(
    items: &[u32],
    config: &BatchConfig,
    token: &CancellationToken,
    fetch: F,
    mut on_batch: P,
) -> BatchOutcome<T>
where
    T: Send,
    E: Display,
    F: Fn(u32) -> Result<T, E> + Sync,
    P: FnMut(BatchProgress, &[(u32, T)]),
{
    let mut outcome = BatchOutcome::new();
    let batch_size = config.batch_size.max(1);
    let batch_count = items.len().div_ceil(batch_size);
    let mut completed = 0;

    for (batch_index, chunk) in items.chunks(batch_size).enumerate() {
        if token.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        let results: Vec<(u32, ItemResult<T>)> = thread::scope(|scope| {
            let handles: Vec<_> = chunk
                .iter()
                .map(|&item| {
                    let fetch = &fetch;
                    let handle =
                        scope.spawn(move || fetch_with_retry(item, &config.retry, token, fetch));
                    (item, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(item, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        log::error!("fetch for item {item} panicked");
                        ItemResult::Failed
                    });
                    (item, result)
                })
                .collect()
        });

        if token.is_cancelled() {
            outcome.cancelled = true;
            break;
        }

        let first_new = outcome.loaded.len();
        for (item, result) in results {
            match result {
                ItemResult::Loaded(value) => outcome.loaded.push((item, value)),
                ItemResult::Failed => outcome.failed.push(item),
                ItemResult::Cancelled => {}
            }
            completed += 1;
        }

        let progress = BatchProgress {
            batch_index,
            batch_count,
            completed,
            total: items.len(),
        };
        log::debug!(
            "batch {}/{} settled, {} of {} items done",
            batch_index + 1,
            batch_count,
            completed,
            items.len()
        );
        on_batch(progress, &outcome.loaded[first_new..]);
    }

    if !outcome.failed.is_empty() {
        log::warn!("{} item(s) failed after retries", outcome.failed.len());
    }

    outcome
}

fn fetch_with_retry<T, E, F>(
    item: u32,
    policy: &RetryPolicy,
    token: &CancellationToken,
    fetch: &F,
) -> ItemResult<T>
where
    E: Display,
    F: Fn(u32) -> Result<T, E>,
{
    let mut attempts = 0;

    loop {
        if token.is_cancelled() {
            return ItemResult::Cancelled;
        }

        attempts += 1;
        match fetch(item) {
            Ok(value) if !token.is_cancelled() => return ItemResult::Loaded(value),
            Ok(_) => return ItemResult::Cancelled,
            Err(error) => {
                if token.is_cancelled() {
                    return ItemResult::Cancelled;
                }

                if !policy.allows_retry(attempts) {
                    log::debug!("item {item} failed after {attempts} attempt(s): {error}");
                    return ItemResult::Failed;
                }

                log::debug!("item {item} attempt {attempts} failed, retrying: {error}");
                if !token.sleep(policy.backoff) {
                    return ItemResult::Cancelled;
                }
            }
        }
    }
}
