use std::time::{Duration, Instant};

/// Reschedule-on-new-event deadline timer.
///
/// `schedule` replaces any pending deadline instead of stacking callbacks; the
/// host polls `fire_if_due` from its frame/timer callback.
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Cancel-and-restart from `now`
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    /// Yields the deadline exactly once, when `now` reaches it.
    ///
    /// The returned instant is when the debounce logically fired, which
    /// precedes `now` whenever the host polls late.
    pub fn fire_if_due(&mut self, now: Instant) -> Option<Instant> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                Some(deadline)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_fires_once_after_delay() {
        let t0 = Instant::now();
        let mut t = DebounceTimer::new(ms(100));
        t.schedule(t0);
        assert_eq!(t.fire_if_due(t0 + ms(99)), None);
        assert_eq!(t.fire_if_due(t0 + ms(100)), Some(t0 + ms(100)));
        assert_eq!(t.fire_if_due(t0 + ms(200)), None);
    }

    #[test]
    fn test_reschedule_resets_deadline() {
        let t0 = Instant::now();
        let mut t = DebounceTimer::new(ms(100));
        t.schedule(t0);
        t.schedule(t0 + ms(80));
        assert_eq!(t.fire_if_due(t0 + ms(100)), None);
        assert_eq!(t.fire_if_due(t0 + ms(180)), Some(t0 + ms(180)));
    }

    #[test]
    fn test_late_poll_reports_deadline() {
        let t0 = Instant::now();
        let mut t = DebounceTimer::new(ms(100));
        t.schedule(t0);
        assert_eq!(t.fire_if_due(t0 + ms(170)), Some(t0 + ms(100)));
    }
}
