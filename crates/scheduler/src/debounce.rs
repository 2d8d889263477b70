//! Trailing-edge debouncer driven by explicit timestamps

use std::time::Duration;

/// Collapses a burst of triggers into one firing `delay` after the last one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Duration>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the quiet period from `now`
    pub fn trigger(&mut self, now: Duration) {
        self.deadline = Some(now.saturating_add(self.delay));
    }

    /// Returns `true` exactly once when the quiet period has elapsed
    pub fn fire(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_burst_collapses_into_one_firing() {
        let mut debouncer = Debouncer::new(ms(180));

        debouncer.trigger(ms(0));
        debouncer.trigger(ms(100));
        debouncer.trigger(ms(200));

        assert!(!debouncer.fire(ms(300)));
        assert!(debouncer.fire(ms(380)));
        assert!(!debouncer.fire(ms(500)));
    }

    #[test]
    fn test_cancel_discards_pending_firing() {
        let mut debouncer = Debouncer::new(ms(50));
        debouncer.trigger(ms(0));
        debouncer.cancel();

        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(ms(1000)));
    }
}
