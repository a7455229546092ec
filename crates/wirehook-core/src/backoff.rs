//! Reconnect backoff state.

use std::time::Duration;

/// Default initial delay between reconnect attempts.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Default cap on the delay between reconnect attempts.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(30_000);

/// Exponential backoff for the reconnect loop.
///
/// The delay starts at the initial value, doubles on each consecutive
/// failure, caps at the maximum, and resets on the first success. The
/// sequence is deterministic — no jitter — so the waits a disconnected
/// client observes are exactly `1s, 2s, 4s, … 30s, 30s, …` under the
/// defaults.
#[derive(Clone, Debug)]
pub struct ReconnectBackoff {
    initial: Duration,
    max: Duration,
    delay: Duration,
    attempt: u32,
}

impl ReconnectBackoff {
    /// Backoff with explicit bounds.
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            delay: initial,
            attempt: 0,
        }
    }

    /// The delay to wait before the next attempt; advances the state.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay;
        self.delay = (self.delay * 2).min(self.max);
        self.attempt += 1;
        delay
    }

    /// Attempts since the last success.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reset after a successful reconnect.
    pub fn reset(&mut self) {
        self.delay = self.initial;
        self.attempt = 0;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY)
    }
}
