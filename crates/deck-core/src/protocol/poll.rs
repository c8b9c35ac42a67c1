//! Bounded polling primitive shared by both handshake waits.
//!
//! The acknowledgment wait and the completion wait differ only in their
//! timeout, so both go through [`poll_until`] with their own [`PollWindow`].

use std::thread;
use std::time::{Duration, Instant};

/// A timeout together with the pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollWindow {
    /// Total time to keep probing.
    pub timeout: Duration,
    /// Pause between two attempts that found nothing.
    pub interval: Duration,
}

impl PollWindow {
    /// Creates a window.  A zero interval is bumped to one millisecond so the
    /// loop can never spin.
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}

/// Calls `attempt` until it yields a value, fails, or the window elapses.
///
/// The attempt always runs at least once, even with a zero timeout.  Between
/// unsuccessful attempts the calling thread sleeps for `window.interval`
/// (never past the deadline).  This blocks, so async callers must run it on
/// a blocking-capable thread.
///
/// Returns `Ok(None)` on timeout.
///
/// # Errors
///
/// Propagates the first error returned by `attempt`.
pub fn poll_until<T, E>(
    window: PollWindow,
    mut attempt: impl FnMut() -> Result<Option<T>, E>,
) -> Result<Option<T>, E> {
    let deadline = Instant::now() + window.timeout;
    loop {
        if let Some(value) = attempt()? {
            return Ok(Some(value));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(window.interval.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(timeout_ms: u64, interval_ms: u64) -> PollWindow {
        PollWindow::new(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(interval_ms),
        )
    }

    #[test]
    fn test_returns_first_value_found() {
        // Arrange
        let mut calls = 0;

        // Act
        let result: Result<Option<u32>, ()> = poll_until(window(1_000, 1), || {
            calls += 1;
            Ok((calls == 3).then_some(7))
        });

        // Assert
        assert_eq!(result, Ok(Some(7)));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_times_out_with_none() {
        let started = Instant::now();
        let result: Result<Option<u32>, ()> = poll_until(window(30, 5), || Ok(None));
        assert_eq!(result, Ok(None));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_zero_timeout_still_attempts_once() {
        let mut calls = 0;
        let _: Result<Option<u32>, ()> = poll_until(window(0, 5), || {
            calls += 1;
            Ok(None)
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_attempt_error_is_propagated_immediately() {
        let mut calls = 0;
        let result: Result<Option<u32>, &str> = poll_until(window(1_000, 1), || {
            calls += 1;
            Err("port gone")
        });
        assert_eq!(result, Err("port gone"));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_interval_is_bumped() {
        assert_eq!(window(10, 0).interval, Duration::from_millis(1));
    }
}
