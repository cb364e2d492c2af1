use std::thread;
use std::time::Duration;

use super::Result;

/// Bounded exponential backoff for catalog requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. 0 is treated as 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each later retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempts run out. The last error is returned.
    pub fn run<T, F>(&self, what: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        self.run_with_sleep(what, op, thread::sleep)
    }

    fn run_with_sleep<T, F, S>(&self, what: &str, mut op: F, mut sleep: S) -> Result<T>
    where
        F: FnMut() -> Result<T>,
        S: FnMut(Duration),
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if attempt < attempts && e.is_transient() => {
                    let delay = self.delay_for(attempt);
                    log::warn!(
                        "{what}: attempt {attempt}/{attempts} failed ({e}), retrying in {}ms",
                        delay.as_millis()
                    );
                    sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl From<&crate::config::CatalogConfig> for RetryPolicy {
    fn from(c: &crate::config::CatalogConfig) -> Self {
        Self::new(c.max_attempts, Duration::from_millis(c.retry_base_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogError;

    fn unavailable() -> CatalogError {
        CatalogError::Http {
            what: "audio analysis t1".into(),
            source: ureq::Error::StatusCode(503),
        }
    }

    #[test]
    fn test_delays_double() {
        let p = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(p.delay_for(1), Duration::from_millis(100));
        assert_eq!(p.delay_for(2), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_recovers_after_transient_failure() {
        let p = RetryPolicy::new(3, Duration::from_millis(10));
        let mut calls = 0;
        let mut slept = Vec::new();
        let r = p.run_with_sleep(
            "t1",
            || {
                calls += 1;
                if calls == 1 { Err(unavailable()) } else { Ok(42) }
            },
            |d| slept.push(d),
        );
        assert_eq!(r.unwrap(), 42);
        assert_eq!(calls, 2);
        assert_eq!(slept, vec![Duration::from_millis(10)]);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let p = RetryPolicy::new(3, Duration::from_millis(10));
        let mut calls = 0;
        let mut slept = Vec::new();
        let r: Result<()> = p.run_with_sleep(
            "t1",
            || {
                calls += 1;
                Err(unavailable())
            },
            |d| slept.push(d),
        );
        assert!(r.is_err());
        assert_eq!(calls, 3);
        assert_eq!(slept, vec![Duration::from_millis(10), Duration::from_millis(20)]);
    }

    #[test]
    fn test_permanent_error_not_retried() {
        let p = RetryPolicy::default();
        let mut calls = 0;
        let r: Result<()> = p.run_with_sleep(
            "t1",
            || {
                calls += 1;
                Err(CatalogError::Response {
                    what: "t1".into(),
                    message: "not found".into(),
                })
            },
            |_| panic!("no sleep expected"),
        );
        assert!(r.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        let p = RetryPolicy::new(0, Duration::ZERO);
        let mut calls = 0;
        let _: Result<()> = p.run_with_sleep(
            "t1",
            || {
                calls += 1;
                Err(unavailable())
            },
            |_| {},
        );
        assert_eq!(calls, 1);
    }
}
