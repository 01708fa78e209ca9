use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dsp5680xx_target::PollSettings;

/// Source of time for bounded polling loops.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when asked to, or by a fixed step on every reading.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
    step: Duration,
}

impl ManualClock {
    pub fn new(step: Duration) -> Self {
        ManualClock {
            now: Mutex::new(Instant::now()),
            step,
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += duration;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *now;
        *now += self.step;
        current
    }
}

/// Bounds a polling loop by a number of attempts and a deadline.
#[derive(Debug)]
pub struct Watchdog {
    clock: Arc<dyn Clock>,
    remaining: u32,
    deadline: Instant,
    timed_out: bool,
}

impl Watchdog {
    pub fn new(clock: Arc<dyn Clock>, settings: PollSettings) -> Self {
        let deadline = clock.now() + settings.timeout();
        Watchdog {
            clock,
            remaining: settings.attempts,
            deadline,
            timed_out: false,
        }
    }

    /// Take the next attempt. Returns `false` once the budget is used up.
    pub fn attempt(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        if self.clock.now() > self.deadline {
            self.timed_out = true;
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Whether the loop ended because of the deadline rather than the attempt limit.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(attempts: u32, timeout_ms: u64) -> PollSettings {
        PollSettings {
            attempts,
            timeout_ms,
        }
    }

    #[test]
    fn attempts_are_counted() {
        let mut watchdog = Watchdog::new(Arc::new(SystemClock), settings(3, 60_000));

        let taken = std::iter::from_fn(|| watchdog.attempt().then_some(())).count();

        assert_eq!(taken, 3);
        assert!(!watchdog.timed_out());
    }

    #[test]
    fn deadline_ends_the_loop() {
        let clock = Arc::new(ManualClock::new(Duration::from_millis(300)));
        let mut watchdog = Watchdog::new(clock, settings(100, 1000));

        let taken = std::iter::from_fn(|| watchdog.attempt().then_some(())).count();

        // Readings at 300, 600 and 900 ms are within the deadline, 1200 ms is not.
        assert_eq!(taken, 3);
        assert!(watchdog.timed_out());
    }

    #[test]
    fn manual_advance() {
        let clock = ManualClock::new(Duration::ZERO);
        let start = clock.now();
        clock.advance(Duration::from_secs(2));

        assert_eq!(clock.now() - start, Duration::from_secs(2));
    }
}
