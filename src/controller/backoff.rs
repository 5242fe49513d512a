//! # Fibonacci Backoff
//!
//! Retry spacing for failed reconciliation passes. Grows more slowly than
//! exponential backoff: with a 1 minute floor and 10 minute ceiling the
//! sequence is 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...
//!
//! ```rust
//! use secret_sync_controller::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 120);
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator, tracked in minutes and returned in seconds
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// `min_minutes` is used for the first two steps, `max_minutes` caps the sequence
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        let min_minutes = min_minutes.max(1);
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes: max_minutes.max(min_minutes),
        }
    }

    /// Current step in seconds; advances the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_minutes * 60;

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next_minutes.min(self.max_minutes);

        result_seconds
    }

    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Back to the first step, after a successful pass
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}
