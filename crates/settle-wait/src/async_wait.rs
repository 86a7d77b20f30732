//! Async variants of the condition waiter.
//!
//! Same loop, same outcome and error semantics as [`crate::Waiter`], but
//! sleeping on `tokio::time` so the calling task yields instead of blocking
//! its thread. Dropping the future stops the wait; a [`CancelToken`] makes the
//! stop observable as [`WaitError::Cancelled`].

use std::convert::Infallible;
use std::future::Future;

use settle_cancel::CancelToken;
use settle_clock::duration_ms;
use settle_error::WaitError;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::waiter::{cancelled, fail_on_timeout};
use crate::{Outcome, Polled, WaitSpec};

/// Polls an async `condition` until it resolves to true or the timeout passes.
pub async fn until_async<F, Fut>(
    spec: &WaitSpec,
    mut condition: F,
    cancel: Option<&CancelToken>,
) -> Result<Outcome, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    try_until_async(
        spec,
        || {
            let check = condition();
            async move { Ok::<_, Infallible>(check.await) }
        },
        cancel,
    )
    .await
}

pub async fn try_until_async<E, F, Fut>(
    spec: &WaitSpec,
    condition: F,
    cancel: Option<&CancelToken>,
) -> Result<Outcome, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    try_for_value_async(spec, condition, |done| *done, cancel)
        .await
        .map(|polled| polled.outcome)
}

/// Async counterpart of [`crate::Waiter::try_until_or_fail`].
pub async fn try_until_or_fail_async<E, F, Fut>(
    spec: &WaitSpec,
    condition: F,
    message: impl Into<String>,
    cancel: Option<&CancelToken>,
) -> Result<Outcome, WaitError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let outcome = try_until_async(spec, condition, cancel).await?;
    fail_on_timeout(spec, outcome, message)
}

/// Polls an async `supplier` until `predicate` accepts its value.
pub async fn for_value_async<T, S, Fut, P>(
    spec: &WaitSpec,
    mut supplier: S,
    predicate: P,
    cancel: Option<&CancelToken>,
) -> Result<Polled<T>, WaitError>
where
    S: FnMut() -> Fut,
    Fut: Future<Output = T>,
    P: Fn(&T) -> bool,
{
    try_for_value_async(
        spec,
        || {
            let next = supplier();
            async move { Ok::<_, Infallible>(next.await) }
        },
        predicate,
        cancel,
    )
    .await
}

pub async fn try_for_value_async<T, E, S, Fut, P>(
    spec: &WaitSpec,
    mut supplier: S,
    predicate: P,
    cancel: Option<&CancelToken>,
) -> Result<Polled<T>, WaitError<E>>
where
    S: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&T) -> bool,
{
    spec.validate()?;

    let description = spec.description();
    let started = Instant::now();
    let mut evaluations: u32 = 0;
    let mut step: u32 = 0;

    loop {
        let value = supplier().await.map_err(WaitError::Condition)?;
        evaluations = evaluations.saturating_add(1);
        let elapsed = started.elapsed();
        let done = predicate(&value);

        debug!(
            description = %description,
            evaluations,
            elapsed_ms = duration_ms(elapsed),
            done,
            "Evaluated wait condition"
        );

        if done {
            if evaluations > 1 {
                info!(
                    description = %description,
                    evaluations,
                    elapsed_ms = duration_ms(elapsed),
                    "Wait condition satisfied"
                );
            }
            return Ok(Polled {
                outcome: Outcome::Satisfied {
                    evaluations,
                    elapsed,
                },
                value,
            });
        }

        if elapsed > spec.timeout {
            warn!(
                description = %description,
                evaluations,
                elapsed_ms = duration_ms(elapsed),
                timeout_ms = duration_ms(spec.timeout),
                "Timed out waiting for condition"
            );
            return Ok(Polled {
                outcome: Outcome::TimedOut {
                    evaluations,
                    elapsed,
                },
                value,
            });
        }

        let delay = spec.delay_for(step, elapsed);
        step = step.saturating_add(1);

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        let elapsed = started.elapsed();
                        warn!(
                            description = %description,
                            evaluations,
                            elapsed_ms = duration_ms(elapsed),
                            "Wait cancelled"
                        );
                        return Err(cancelled(description, elapsed, evaluations));
                    }
                    _ = sleep(delay) => {}
                }
            }
            None => sleep(delay).await,
        }
    }
}
