//! Bounded fixed-interval retry with an injectable clock.

use std::time::Duration;

use crate::error::{Error, Result, RetryExhaustedDetails};
use crate::log_status;

/// Blocks the caller between attempts. Tests substitute a virtual clock.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    pub fn from_millis(attempts: u32, delay_ms: u64) -> Self {
        Self::new(attempts, Duration::from_millis(delay_ms))
    }
}

/// Call `action` until it succeeds or `policy.attempts` calls have been made.
///
/// `action` receives the 1-based attempt number. The sleeper is called
/// between attempts only, never after the last one. When every attempt fails
/// the result is a `retry.exhausted` error carrying the last failure.
pub fn retry<T, F>(
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
    operation: &str,
    mut action: F,
) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error: Option<Error> = None;

    for attempt in 1..=attempts {
        match action(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < attempts {
                    log_status!(
                        "retry",
                        "{} not ready (attempt {}/{}), retrying in {}ms...",
                        operation,
                        attempt,
                        attempts,
                        policy.delay.as_millis()
                    );
                    sleeper.sleep(policy.delay);
                }
                last_error = Some(err);
            }
        }
    }

    Err(Error::retry_exhausted(RetryExhaustedDetails {
        operation: operation.to_string(),
        attempts,
        delay_ms: policy.delay.as_millis() as u64,
        last_error: last_error.map(|e| e.summary()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSleeper {
        calls: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.calls.borrow_mut().push(duration);
        }
    }

    #[test]
    fn first_success_never_sleeps() {
        let sleeper = RecordingSleeper::default();
        let value = retry(RetryPolicy::from_millis(5, 100), &sleeper, "wait for bundle", |_| Ok(7)).unwrap();

        assert_eq!(value, 7);
        assert!(sleeper.calls.borrow().is_empty());
    }

    #[test]
    fn succeeds_on_later_attempt() {
        let sleeper = RecordingSleeper::default();
        let value = retry(RetryPolicy::from_millis(5, 100), &sleeper, "wait for bundle", |attempt| {
            if attempt < 3 {
                Err(Error::other("not yet"))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();

        assert_eq!(value, 3);
        assert_eq!(sleeper.calls.borrow().len(), 2);
    }

    #[test]
    fn exhaustion_reports_attempts_and_last_error() {
        let sleeper = RecordingSleeper::default();
        let mut calls = 0;
        let err = retry::<(), _>(RetryPolicy::from_millis(4, 250), &sleeper, "wait for bundle", |_| {
            calls += 1;
            Err(Error::other("still missing"))
        })
        .unwrap_err();

        assert_eq!(calls, 4);
        assert_eq!(sleeper.calls.borrow().len(), 3);
        assert_eq!(err.code.as_str(), "retry.exhausted");
        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.details["attempts"], 4);
        assert_eq!(err.details["delayMs"], 250);
        assert!(err.details["lastError"]
            .as_str()
            .unwrap()
            .contains("still missing"));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.attempts, 1);
    }
}
