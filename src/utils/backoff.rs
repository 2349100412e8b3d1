use std::time::Duration;

/// Exponential backoff schedule with a ceiling.
///
/// Each call to [`next_delay`](Backoff::next_delay) returns the current delay
/// and doubles it for the following step, never exceeding `max`. Delays are
/// monotonically non-decreasing until [`reset`](Backoff::reset).
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(
        base: Duration,
        max: Duration,
    ) -> Self {
        // A ceiling below the base would make the schedule shrink
        let max = max.max(base);
        Self {
            base,
            max,
            current: base,
            attempts: 0,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        self.attempts = self.attempts.saturating_add(1);
        delay
    }

    /// Delay the next call to `next_delay` will return
    pub fn peek(&self) -> Duration {
        self.current
    }

    /// Number of delays handed out since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.current = self.base;
        self.attempts = 0;
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_delay())
    }
}
