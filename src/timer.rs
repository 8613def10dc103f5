//! Timers driven by an injected virtual clock.
//!
//! Nothing here reads the wall clock. Callers pass `now` as the elapsed time
//! since some fixed origin, which keeps every timeout testable.

use core::time::Duration;

/// Fires every `period` once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    period: Duration,
    next_due: Option<Duration>,
}

impl IntervalTimer {
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            next_due: None,
        }
    }

    /// Arm the timer. The first firing is one period after `now`.
    pub fn start(&mut self, now: Duration) {
        self.next_due = Some(now + self.period);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// Number of periods that elapsed up to `now`. The timer keeps its phase,
    /// so a late poll reports every missed firing.
    pub fn poll(&mut self, now: Duration) -> u32 {
        let Some(mut due) = self.next_due else {
            return 0;
        };
        if self.period.is_zero() {
            self.next_due = Some(now);
            return if now >= due { 1 } else { 0 };
        }
        let mut fired = 0;
        while now >= due {
            fired += 1;
            due += self.period;
        }
        self.next_due = Some(due);
        fired
    }
}

/// One-shot deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline {
    at: Option<Duration>,
}

impl Deadline {
    pub const fn new() -> Self {
        Self { at: None }
    }

    pub fn arm(&mut self, now: Duration, after: Duration) {
        self.at = Some(now + after);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn expired(&self, now: Duration) -> bool {
        matches!(self.at, Some(at) if now >= at)
    }
}

