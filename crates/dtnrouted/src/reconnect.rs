//! Reconnect policy — exponential backoff between connection attempts.

use std::time::Duration;

use dtnroute_core::config::ReconnectConfig;

#[derive(Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    next: Duration,
    max_attempts: u32,
    failures: u32,
}

impl Backoff {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            initial: config.initial_delay(),
            max: config.max_delay(),
            next: config.initial_delay(),
            max_attempts: config.max_attempts,
            failures: 0,
        }
    }

    /// A session got connected; start over from the initial delay.
    pub fn reset(&mut self) {
        self.next = self.initial;
        self.failures = 0;
    }

    /// Record a failed connect. Returns the delay before the next attempt,
    /// or `None` once `max_attempts` consecutive failures are reached.
    pub fn failed(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.max_attempts != 0 && self.failures >= self.max_attempts {
            return None;
        }
        Some(self.advance())
    }

    /// Delay after a session that was connected and then closed.
    pub fn closed(&mut self) -> Duration {
        self.reset();
        self.advance()
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn advance(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }
}
