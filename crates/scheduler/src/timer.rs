//! Virtual-time timer queue
//!
//! Every delayed action in the viewer (retry backoff, re-measurement passes,
//! debounced recomputation, transient acknowledgements) is a timer in a
//! `TimerQueue`. Time is passed in explicitly as a [`Duration`] since an
//! arbitrary epoch, so the owner decides whether it is wall-clock or
//! simulated. Timers are keyed by id, which makes cancelling a pending timer
//! exact and leaves no stray callbacks behind.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Identifier returned by [`TimerQueue::schedule`]
pub type TimerId = u64;

/// Deadline-ordered queue of pending events
///
/// Events with equal deadlines fire in scheduling order.
///
/// # Example
///
/// ```
/// use scanview_scheduler::TimerQueue;
/// use std::time::Duration;
///
/// let mut timers = TimerQueue::new();
/// let now = Duration::ZERO;
/// timers.schedule(now, Duration::from_millis(80), "measure");
///
/// assert!(timers.drain_due(Duration::from_millis(79)).is_empty());
/// assert_eq!(timers.drain_due(Duration::from_millis(80)).len(), 1);
/// ```
#[derive(Debug)]
pub struct TimerQueue<E> {
    next_id: TimerId,
    entries: BTreeMap<(Duration, TimerId), E>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    /// Schedule `event` to fire `delay` after `now`
    pub fn schedule(&mut self, now: Duration, delay: Duration, event: E) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;

        let deadline = now.saturating_add(delay);
        self.entries.insert((deadline, id), event);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Cancel a pending timer. Returns `true` if it was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.entries.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Cancel every pending timer whose event matches `predicate`
    ///
    /// Returns the number of timers removed.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&E) -> bool) -> usize {
        let doomed: Vec<(Duration, TimerId)> = self
            .entries
            .iter()
            .filter(|(_, event)| predicate(event))
            .map(|(key, _)| *key)
            .collect();

        for key in &doomed {
            self.entries.remove(key);
            self.deadlines.remove(&key.1);
        }

        doomed.len()
    }

    /// Drop every pending timer. Returns how many were pending.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.deadlines.clear();
        count
    }

    /// Remove and return the earliest timer due at `now`
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, E)> {
        let key = *self.entries.keys().next()?;
        if key.0 > now {
            return None;
        }

        let event = self.entries.remove(&key)?;
        self.deadlines.remove(&key.1);
        Some((key.1, event))
    }

    /// Remove and return all timers due at `now`, earliest first
    pub fn drain_due(&mut self, now: Duration) -> Vec<(TimerId, E)> {
        let mut due = Vec::new();
        while let Some(entry) = self.pop_due(now) {
            due.push(entry);
        }
        due
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(ms(0), ms(600), "third");
        timers.schedule(ms(0), ms(80), "first");
        timers.schedule(ms(0), ms(240), "second");

        let fired: Vec<_> = timers
            .drain_due(ms(1000))
            .into_iter()
            .map(|(_, e)| e)
            .collect();
        assert_eq!(fired, vec!["first", "second", "third"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_equal_deadlines_keep_scheduling_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(ms(10), ms(5), 1);
        timers.schedule(ms(0), ms(15), 2);

        let fired: Vec<_> = timers
            .drain_due(ms(15))
            .into_iter()
            .map(|(_, e)| e)
            .collect();
        assert_eq!(fired, vec![1, 2]);
    }

    #[test]
    fn test_timers_not_yet_due_stay_pending() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule(ms(100), ms(1000), ());

        assert!(timers.pop_due(ms(1099)).is_none());
        assert!(timers.is_pending(id));
        assert_eq!(timers.next_deadline(), Some(ms(1100)));
    }

    #[test]
    fn test_cancel_removes_single_timer() {
        let mut timers = TimerQueue::new();
        let keep = timers.schedule(ms(0), ms(10), "keep");
        let drop = timers.schedule(ms(0), ms(10), "drop");

        assert!(timers.cancel(drop));
        assert!(!timers.cancel(drop));
        assert!(timers.is_pending(keep));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_cancel_where_filters_by_event() {
        let mut timers = TimerQueue::new();
        timers.schedule(ms(0), ms(10), ("retry", 1));
        timers.schedule(ms(0), ms(20), ("measure", 1));
        timers.schedule(ms(0), ms(30), ("measure", 2));

        assert_eq!(timers.cancel_where(|(kind, _)| *kind == "measure"), 2);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.pending().next(), Some(&("retry", 1)));
    }

    #[test]
    fn test_clear_reports_dropped_count() {
        let mut timers = TimerQueue::new();
        timers.schedule(ms(0), ms(1), ());
        timers.schedule(ms(0), ms(2), ());

        assert_eq!(timers.clear(), 2);
        assert!(timers.is_empty());
        assert_eq!(timers.next_deadline(), None);
    }
}
