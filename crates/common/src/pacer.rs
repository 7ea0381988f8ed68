//! Adaptive retry scheduler
//!
//! Every remote round trip goes through [`Pacer::call`]. A retryable outcome
//! doubles a sleep shared by all callers of the same pacer (up to
//! `max_sleep`) and tries again; a success decays it back towards
//! `min_sleep`. Retries are unbounded by count: only cancellation stops them.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::FsError;

/// Classification of a failed attempt
pub trait Retryable {
    /// Whether another attempt may succeed
    fn is_retryable(&self) -> bool;

    /// The error returned when the cancellation token fires
    fn cancelled() -> Self;
}

impl Retryable for FsError {
    fn is_retryable(&self) -> bool {
        matches!(self, FsError::Transient { .. })
    }

    fn cancelled() -> Self {
        FsError::Cancelled
    }
}

/// Pacer tuning. Durations are expressed in milliseconds in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacerConfig {
    pub min_sleep_ms: u64,
    pub max_sleep_ms: u64,
    pub decay_constant: u32,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            min_sleep_ms: 10,
            max_sleep_ms: 5 * 60 * 1000,
            decay_constant: 1,
        }
    }
}

impl PacerConfig {
    pub fn min_sleep(&self) -> Duration {
        Duration::from_millis(self.min_sleep_ms)
    }

    pub fn max_sleep(&self) -> Duration {
        Duration::from_millis(self.max_sleep_ms.max(self.min_sleep_ms))
    }
}

pub struct Pacer {
    config: PacerConfig,
    sleep: Mutex<Duration>,
}

impl Pacer {
    pub fn new(config: PacerConfig) -> Self {
        Self {
            sleep: Mutex::new(config.min_sleep()),
            config,
        }
    }

    pub fn config(&self) -> &PacerConfig {
        &self.config
    }

    /// Sleep the next retry would start from
    pub fn current_sleep(&self) -> Duration {
        *self.sleep.lock()
    }

    /// Run `operation` until it succeeds, fails terminally, or `cancel` fires.
    ///
    /// An already-cancelled token returns the cancellation error without a
    /// single attempt. Cancellation during an attempt drops the in-flight
    /// future.
    pub async fn call<T, E, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T, E>
    where
        E: Retryable + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if cancel.is_cancelled() {
            return Err(E::cancelled());
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(E::cancelled()),
                outcome = operation() => outcome,
            };

            match outcome {
                Ok(value) => {
                    self.decay();
                    return Ok(value);
                }
                Err(err) if err.is_retryable() => {
                    let sleep = self.backoff();
                    tracing::debug!(attempt, ?sleep, error = %err, "retrying after transient failure");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(E::cancelled()),
                        _ = tokio::time::sleep(sleep) => {}
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn backoff(&self) -> Duration {
        let mut sleep = self.sleep.lock();
        *sleep = sleep.saturating_mul(2).min(self.config.max_sleep());
        *sleep
    }

    fn decay(&self) {
        let mut sleep = self.sleep.lock();
        let decay = self.config.decay_constant.min(31);
        let divisor = 1u32 << decay;
        let decayed = sleep.saturating_mul(divisor - 1) / divisor;
        *sleep = decayed.max(self.config.min_sleep());
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(PacerConfig::default())
    }
}

impl fmt::Debug for Pacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pacer")
            .field("config", &self.config)
            .field("sleep", &self.current_sleep())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Busy,
        Denied,
        Cancelled,
    }

    impl fmt::Display for TestError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            *self == TestError::Busy
        }

        fn cancelled() -> Self {
            TestError::Cancelled
        }
    }

    /// Operation that fails with `Busy` `failures` times, then succeeds
    fn flaky(
        attempts: Arc<AtomicUsize>,
        failures: usize,
    ) -> impl FnMut() -> std::future::Ready<Result<usize, TestError>> {
        move || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if n < failures {
                Err(TestError::Busy)
            } else {
                Ok(n)
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_with_doubling_sleep() {
        let pacer = Pacer::default();
        let attempts = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        let result = pacer
            .call(&CancellationToken::new(), flaky(attempts.clone(), 3))
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        // 20ms + 40ms + 80ms
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(140), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(150), "{elapsed:?}");
        // One success halves the 80ms sleep
        assert_eq!(pacer.current_sleep(), Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_error_is_not_retried() {
        let pacer = Pacer::default();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let result: Result<(), _> = pacer
            .call(&CancellationToken::new(), || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(TestError::Denied) }
            })
            .await;

        assert_eq!(result, Err(TestError::Denied));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(pacer.current_sleep(), Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_token_makes_zero_attempts() {
        let pacer = Pacer::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let attempts = Arc::new(AtomicUsize::new(0));

        let result = pacer.call(&cancel, flaky(attempts.clone(), 0)).await;

        assert_eq!(result, Err(TestError::Cancelled));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let pacer = Pacer::default();
        let cancel = CancellationToken::new();
        let attempts = Arc::new(AtomicUsize::new(0));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = pacer.call(&cancel, flaky(attempts.clone(), usize::MAX)).await;

        assert_eq!(result, Err(TestError::Cancelled));
        // Attempts at 0ms and 20ms; the 40ms sleep that follows is interrupted
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_in_flight_attempt() {
        let pacer = Pacer::default();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });

        let result: Result<(), TestError> = pacer
            .call(&cancel, || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .await;

        assert_eq!(result, Err(TestError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_is_capped_and_floored() {
        let pacer = Pacer::new(PacerConfig {
            min_sleep_ms: 10,
            max_sleep_ms: 50,
            decay_constant: 1,
        });
        let attempts = Arc::new(AtomicUsize::new(0));

        pacer
            .call(&CancellationToken::new(), flaky(attempts.clone(), 5))
            .await
            .unwrap();
        // 20, 40, 50, 50, 50 then decay to 25
        assert_eq!(pacer.current_sleep(), Duration::from_millis(25));

        for _ in 0..4 {
            pacer
                .call(&CancellationToken::new(), flaky(Arc::new(AtomicUsize::new(0)), 0))
                .await
                .unwrap();
        }
        assert_eq!(pacer.current_sleep(), Duration::from_millis(10));
    }

    #[test]
    fn test_fs_error_classification() {
        let transient = FsError::Transient {
            path: "/a".into(),
            status: Some(503),
            message: "unavailable".into(),
        };
        assert!(transient.is_retryable());
        assert!(!FsError::NotFound("/a".into()).is_retryable());
        assert!(matches!(<FsError as Retryable>::cancelled(), FsError::Cancelled));
    }
}
