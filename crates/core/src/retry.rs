use std::fmt::Display;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

/// How an operation is retried after a transient failure.
///
/// `max_attempts` counts the first attempt, so `1` disables retrying.
/// Delays grow exponentially from `initial_delay` up to `max_delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound of a single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_attempts: 1,
        initial_delay: Duration::ZERO,
        max_delay: Duration::ZERO,
    };

    /// Creates a policy with `max_attempts` and default delays.
    #[inline]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(2.0)
            .with_randomization_factor(0.2)
            .with_max_elapsed_time(None)
            .build()
    }

    /// Runs `op` until it succeeds, fails permanently, or runs out of
    /// attempts. Only errors for which `is_transient` returns `true` are
    /// retried.
    pub async fn retry<T, E, F, Fut>(
        &self,
        what: &str,
        op: F,
        is_transient: impl Fn(&E) -> bool + Send + Sync,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let is_transient = &is_transient;
        let mut op = op;
        let mut attempt = 0;
        backoff::future::retry_notify(
            self.backoff(),
            move || {
                attempt += 1;
                let fut = op();
                let last = attempt >= max_attempts;
                async move {
                    fut.await.map_err(|err| {
                        if !last && is_transient(&err) {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: E, delay: Duration| {
                warn!("{what} failed, retrying in {delay:?}: {err}");
            },
        )
        .await
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}
