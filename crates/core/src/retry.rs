//! Retry policy and request spacing for outbound calls.
//!
//! Both are plain values owned by the orchestrator: a [`RetryPolicy`] decides
//! how often and how long to back off after a transient failure, and a
//! [`Throttle`] keeps a minimum gap between the end of one physical request
//! and the start of the next.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::Result;

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one; at least 1.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each further retry.
    pub base_delay: Duration,
    /// Cap for a single delay.
    pub max_delay: Duration,
    /// Randomize each delay within `[delay / 2, delay]`.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(30), jitter: true }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self { max_attempts: 1, base_delay: Duration::ZERO, max_delay: Duration::ZERO, jitter: false }
    }

    /// Backoff before retry number `retry` (1 for the first retry).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        let delay = self.base_delay.saturating_mul(1 << exp).min(self.max_delay);

        if self.jitter && !delay.is_zero() {
            let max = delay.as_millis() as u64;
            Duration::from_millis(rand::thread_rng().gen_range(max / 2..=max))
        } else {
            delay
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// unchanged; callers decide how to wrap it.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(what, attempt, max_attempts, ?delay, error = %e, "transient failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::debug!(what, attempt, error = %e, "giving up");
                    return Err(e);
                }
            }
        }
    }
}

/// Enforces a minimum interval between physical requests.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_finished: Mutex::new(None) }
    }

    /// Wait out the interval, run one request, and record when it ended.
    pub async fn run<T, Fut>(&self, request: Fut) -> T
    where
        Fut: Future<Output = T>,
    {
        let mut last = self.last_finished.lock().await;
        if let Some(finished) = *last {
            let elapsed = finished.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                tracing::debug!(?wait, "sleeping before next request");
                tokio::time::sleep(wait).await;
            }
        }

        let output = request.await;
        *last = Some(Instant::now());
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::cell::Cell;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(250),
            jitter: false,
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = fast_policy(5);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(250));
        assert_eq!(policy.delay_for(40), Duration::from_millis(250));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy { jitter: true, ..fast_policy(5) };
        for _ in 0..50 {
            let d = policy.delay_for(2);
            assert!(d >= Duration::from_millis(100) && d <= Duration::from_millis(200), "{d:?}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let calls = Cell::new(0);
        let result = fast_policy(3)
            .run("test", |_| {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move { if n < 3 { Err(Error::FetchTimeout("slow".into())) } else { Ok(n) } }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = Cell::new(0);
        let result: Result<()> = fast_policy(2)
            .run("test", |attempt| {
                calls.set(calls.get() + 1);
                async move { Err(Error::Network(format!("attempt {attempt}"))) }
            })
            .await;

        assert!(matches!(result, Err(Error::Network(msg)) if msg == "attempt 2"));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let calls = Cell::new(0);
        let result: Result<()> = fast_policy(5)
            .run("test", |_| {
                calls.set(calls.get() + 1);
                async { Err(Error::HttpStatus { url: "https://example.com".into(), status: 404 }) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_spaces_requests() {
        let throttle = Throttle::new(Duration::from_secs(2));
        let start = Instant::now();

        throttle.run(async {}).await;
        assert!(start.elapsed() < Duration::from_millis(10), "first request must not wait");

        throttle.run(async {}).await;
        assert!(start.elapsed() >= Duration::from_secs(2));

        tokio::time::sleep(Duration::from_secs(5)).await;
        let before = Instant::now();
        throttle.run(async {}).await;
        assert!(before.elapsed() < Duration::from_millis(10), "interval already elapsed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_zero_interval() {
        let throttle = Throttle::new(Duration::ZERO);
        let start = Instant::now();
        for _ in 0..3 {
            throttle.run(async {}).await;
        }
        assert!(start.elapsed() < Duration::from_millis(10));
    }
}
