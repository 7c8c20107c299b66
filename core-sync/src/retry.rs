//! Exponential backoff for destination calls
//!
//! Transient failures are retried forever with a delay that starts at
//! `initial_delay`, doubles after every attempt and saturates at `max_delay`.
//! Permanent failures are returned to the caller on the first occurrence.

use async_trait::async_trait;
use bridge_traits::error::{DestinationError, DestinationResult};
use core_runtime::config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Backoff schedule with no attempt limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            initial_delay: config.initial_delay,
            max_delay: config.max_delay,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds or fails permanently.
    pub async fn run<T, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        operation_name: &str,
        mut operation: F,
    ) -> DestinationResult<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = DestinationResult<T>> + Send,
        T: Send,
    {
        let mut retry: u32 = 0;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(DestinationError::Transient(message)) => {
                    let delay = self.delay_for(retry);
                    // One warning per operation; a long outage repeats at debug level.
                    if retry == 0 {
                        warn!(
                            operation = operation_name,
                            error = %message,
                            "Transient destination failure"
                        );
                    } else {
                        debug!(
                            operation = operation_name,
                            attempt = retry.saturating_add(1),
                            error = %message,
                            "Transient destination failure"
                        );
                    }
                    debug!(delay_ms = delay.as_millis() as u64, "Retrying after delay");
                    sleeper.sleep(delay).await;
                    retry = retry.saturating_add(1);
                }
                Err(permanent) => return Err(permanent),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, delay: Duration) {
            self.delays.lock().unwrap().push(delay);
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn lines_at(&self, level: &str) -> usize {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .lines()
                .filter(|line| line.contains(level) && line.contains("Transient destination failure"))
                .count()
        }
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (0..6).map(|n| policy.delay_for(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 10, 10]);
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let sleeper = RecordingSleeper::default();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let value = RetryPolicy::default()
            .run(&sleeper, "find", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(DestinationError::Transient("503".to_string()))
                } else {
                    Ok("id-1")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "id-1");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            *sleeper.delays.lock().unwrap(),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test]
    async fn test_outage_warns_once_per_operation() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let sleeper = RecordingSleeper::default();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        RetryPolicy::default()
            .run(&sleeper, "find", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 5 {
                    Err(DestinationError::Transient("503".to_string()))
                } else {
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(logs.lines_at("WARN"), 1);
        assert_eq!(logs.lines_at("DEBUG"), 4);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let sleeper = RecordingSleeper::default();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let err = RetryPolicy::default()
            .run(&sleeper, "create_folder", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DestinationError::Permanent("400".to_string()))
            })
            .await
            .unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }
}
