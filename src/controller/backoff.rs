//! # Fibonacci Backoff
//!
//! Progressive retry delay for reconciliations that return an error (API
//! conflicts, status patch failures, invalid specs). Grows more slowly than
//! exponential backoff and is capped.
//!
//! Terraform and credential failures do not go through here; they requeue after
//! the fixed retry delay from the controller configuration.
//!
//! Sequence with the defaults: 1m, 1m, 2m, 3m, 5m, 8m, 10m (max).
//!
//! ```rust
//! use sql_instance_controller::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10); // 1 minute min, 10 minutes max
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 120);
//! assert_eq!(backoff.next_backoff_seconds(), 180);
//! assert_eq!(backoff.next_backoff_seconds(), 300);
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Values are tracked in minutes and handed out in seconds.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in minutes (for reset)
    min_minutes: u64,
    /// Previous backoff value in minutes
    prev_minutes: u64,
    /// Current backoff value in minutes
    current_minutes: u64,
    /// Maximum backoff value in minutes
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with minimum and maximum values in minutes
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_minutes * 60;

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);

        result_seconds
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence
    ///
    /// ```
    /// use sql_instance_controller::controller::backoff::FibonacciBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = FibonacciBackoff::new(1, 10);
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(60));
    /// ```
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Reset the backoff to the initial state after a successful pass
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fibonacci_backoff_sequence_is_capped() {
        let mut backoff = FibonacciBackoff::new(1, 10);

        let sequence: Vec<u64> = (0..9).map(|_| backoff.next_backoff_seconds()).collect();

        assert_eq!(sequence, vec![60, 60, 120, 180, 300, 480, 600, 600, 600]);
    }

    #[test]
    fn test_fibonacci_backoff_reset() {
        let mut backoff = FibonacciBackoff::new(1, 10);
        for _ in 0..4 {
            backoff.next_backoff_seconds();
        }

        backoff.reset();

        assert_eq!(backoff.next_backoff(), Duration::from_secs(60));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(60));
        assert_eq!(backoff.next_backoff(), Duration::from_secs(120));
    }

    #[test]
    fn test_independent_backoffs_do_not_interfere() {
        let mut first = FibonacciBackoff::new(1, 10);
        let mut second = FibonacciBackoff::new(1, 10);

        for _ in 0..5 {
            first.next_backoff_seconds();
        }

        assert_eq!(second.next_backoff_seconds(), 60);
        assert_eq!(first.next_backoff_seconds(), 480);
    }
}
