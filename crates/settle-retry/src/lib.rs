//! Attempt-bounded retries for settle.
//!
//! Unlike a wait, which is bounded by wall-clock time, a retry is bounded by
//! a number of attempts: the action runs up to `max_retries + 1` times and
//! the first `true` ends it. Use it for flaky idempotent operations
//! ("scale the operator, retry twice"), and a wait for readiness flags.

use serde::{Deserialize, Serialize};
use settle_backoff::Backoff;
use settle_cancel::CancelToken;
use settle_clock::{Clock, Stopwatch, SystemClock, duration_ms};
use settle_error::{ConfigurationError, WaitError};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay between attempts in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default)]
    pub backoff: Backoff,
}

fn default_max_retries() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
            backoff: Backoff::Fixed,
        }
    }
}

impl RetryPolicy {
    /// `delay` is stored in whole milliseconds, rounded up so a non-zero
    /// delay never becomes zero.
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        let millis = delay.as_nanos().div_ceil(1_000_000);
        Self {
            max_retries,
            delay_ms: u64::try_from(millis).unwrap_or(u64::MAX),
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Total number of attempts the policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff
            .delay_for(self.delay(), attempt.saturating_sub(1))
    }

    /// A zero delay is allowed: the loop is bounded by attempts, not time.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.backoff.validate(self.delay())
    }
}

/// Runs boolean actions under a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct Retrier<C = SystemClock> {
    policy: RetryPolicy,
    clock: C,
    cancel: Option<CancelToken>,
}

impl Retrier {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            clock: SystemClock::new(),
            cancel: None,
        }
    }
}

impl<C: Clock> Retrier<C> {
    pub fn with_clock<D: Clock>(self, clock: D) -> Retrier<D> {
        Retrier {
            policy: self.policy,
            clock,
            cancel: self.cancel,
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `action` until it returns true, returning the attempts used.
    pub fn until<F>(&self, mut action: F, fail_message: &str) -> Result<u32, WaitError>
    where
        F: FnMut() -> bool,
    {
        self.try_until(|| Ok::<_, Infallible>(action()), fail_message)
    }

    /// Fallible form of [`Retrier::until`]. An error from `action` is not
    /// retried; it ends the loop as [`WaitError::Condition`].
    pub fn try_until<E, F>(&self, mut action: F, fail_message: &str) -> Result<u32, WaitError<E>>
    where
        F: FnMut() -> Result<bool, E>,
    {
        self.policy.validate()?;

        let max_attempts = self.policy.max_attempts();
        let watch = Stopwatch::start(&self.clock);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            if action().map_err(WaitError::Condition)? {
                debug!(attempt, max_attempts, "Retried action succeeded");
                return Ok(attempt);
            }

            if attempt >= max_attempts {
                error!(
                    message = %fail_message,
                    attempt,
                    "Action failed after max retries"
                );
                return Err(WaitError::RetriesExhausted {
                    message: fail_message.to_string(),
                    attempts: attempt,
                });
            }

            let delay = self.policy.delay_after(attempt);
            warn!(
                message = %fail_message,
                attempt,
                max_attempts,
                delay_ms = duration_ms(delay),
                "Action failed, retrying"
            );

            if self.clock.sleep(delay, self.cancel.as_ref()).is_err() {
                return Err(WaitError::Cancelled {
                    description: fail_message.to_string(),
                    elapsed: watch.elapsed(),
                    evaluations: attempt,
                });
            }
        }
    }
}

/// Calls `action` up to `max_retries + 1` times, sleeping `delay` between
/// attempts, until it returns true. Fails with `fail_message` otherwise.
pub fn retry_until<F>(
    action: F,
    max_retries: u32,
    delay: Duration,
    fail_message: &str,
) -> Result<u32, WaitError>
where
    F: FnMut() -> bool,
{
    Retrier::new(RetryPolicy::new(max_retries, delay)).until(action, fail_message)
}

pub fn try_retry_until<E, F>(
    action: F,
    max_retries: u32,
    delay: Duration,
    fail_message: &str,
) -> Result<u32, WaitError<E>>
where
    F: FnMut() -> Result<bool, E>,
{
    Retrier::new(RetryPolicy::new(max_retries, delay)).try_until(action, fail_message)
}

/// Async retry utilities
pub mod async_retry {
    use super::*;
    use std::future::Future;
    use tokio::time::{Instant, sleep};

    /// Async form of [`Retrier::try_until`], sleeping on `tokio::time`.
    pub async fn retry_until_async<E, F, Fut>(
        policy: &RetryPolicy,
        mut action: F,
        fail_message: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<u32, WaitError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        policy.validate()?;

        let max_attempts = policy.max_attempts();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            if action().await.map_err(WaitError::Condition)? {
                return Ok(attempt);
            }

            if attempt >= max_attempts {
                error!(
                    message = %fail_message,
                    attempt,
                    "Action failed after max retries"
                );
                return Err(WaitError::RetriesExhausted {
                    message: fail_message.to_string(),
                    attempts: attempt,
                });
            }

            let delay = policy.delay_after(attempt);
            warn!(
                message = %fail_message,
                attempt,
                max_attempts,
                delay_ms = duration_ms(delay),
                "Action failed, retrying"
            );

            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            return Err(WaitError::Cancelled {
                                description: fail_message.to_string(),
                                elapsed: started.elapsed(),
                                evaluations: attempt,
                            });
                        }
                        _ = sleep(delay) => {}
                    }
                }
                None => sleep(delay).await,
            }
        }
    }
}
