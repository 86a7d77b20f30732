use std::convert::Infallible;
use std::time::Duration;

use settle_cancel::CancelToken;
use settle_clock::{Clock, Stopwatch, SystemClock, duration_ms};
use settle_error::WaitError;
use tracing::{debug, info, warn};

use crate::{Outcome, Polled, WaitSpec};

/// Stateless condition waiter.
///
/// Bundles a [`WaitSpec`] with the clock it sleeps on and an optional
/// [`CancelToken`]. Nothing is kept between calls: every `until*` /
/// `for_value*` call validates the [`WaitSpec`], then evaluates the condition on the
/// calling thread, sleeping between evaluations, until it holds or the
/// timeout has passed. Errors raised by the condition abort the wait
/// immediately and are returned as [`WaitError::Condition`].
#[derive(Debug, Clone)]
pub struct Waiter<C = SystemClock> {
    spec: WaitSpec,
    clock: C,
    cancel: Option<CancelToken>,
}

impl Waiter {
    pub fn new(spec: WaitSpec) -> Self {
        Self {
            spec,
            clock: SystemClock::new(),
            cancel: None,
        }
    }
}

impl<C: Clock> Waiter<C> {
    pub fn with_clock<D: Clock>(self, clock: D) -> Waiter<D> {
        Waiter {
            spec: self.spec,
            clock,
            cancel: self.cancel,
        }
    }

    /// Lets `token` interrupt the sleep between evaluations.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn spec(&self) -> &WaitSpec {
        &self.spec
    }

    /// Polls `condition` until it returns true or the timeout passes.
    pub fn until<F>(&self, mut condition: F) -> Result<Outcome, WaitError>
    where
        F: FnMut() -> bool,
    {
        self.try_until(|| Ok::<_, Infallible>(condition()))
    }

    pub fn try_until<E, F>(&self, condition: F) -> Result<Outcome, WaitError<E>>
    where
        F: FnMut() -> Result<bool, E>,
    {
        self.try_for_value(condition, |done| *done)
            .map(|polled| polled.outcome)
    }

    /// Like [`Waiter::until`], but a timeout is an error carrying `message`.
    pub fn until_or_fail<F>(
        &self,
        mut condition: F,
        message: impl Into<String>,
    ) -> Result<Outcome, WaitError>
    where
        F: FnMut() -> bool,
    {
        self.try_until_or_fail(|| Ok::<_, Infallible>(condition()), message)
    }

    pub fn try_until_or_fail<E, F>(
        &self,
        condition: F,
        message: impl Into<String>,
    ) -> Result<Outcome, WaitError<E>>
    where
        F: FnMut() -> Result<bool, E>,
    {
        let outcome = self.try_until(condition)?;
        fail_on_timeout(&self.spec, outcome, message)
    }

    /// Like [`Waiter::until`], reduced to a boolean. Never fails on timeout.
    pub fn until_no_fail<F>(&self, condition: F) -> Result<bool, WaitError>
    where
        F: FnMut() -> bool,
    {
        self.until(condition).map(|outcome| outcome.is_satisfied())
    }

    pub fn try_until_no_fail<E, F>(&self, condition: F) -> Result<bool, WaitError<E>>
    where
        F: FnMut() -> Result<bool, E>,
    {
        self.try_until(condition)
            .map(|outcome| outcome.is_satisfied())
    }

    /// Polls `supplier` until `predicate` accepts the value it produced.
    pub fn for_value<T, S, P>(&self, mut supplier: S, predicate: P) -> Result<Polled<T>, WaitError>
    where
        S: FnMut() -> T,
        P: Fn(&T) -> bool,
    {
        self.try_for_value(|| Ok::<_, Infallible>(supplier()), predicate)
    }

    pub fn try_for_value<T, E, S, P>(
        &self,
        mut supplier: S,
        predicate: P,
    ) -> Result<Polled<T>, WaitError<E>>
    where
        S: FnMut() -> Result<T, E>,
        P: Fn(&T) -> bool,
    {
        self.spec.validate()?;

        let description = self.spec.description();
        let watch = Stopwatch::start(&self.clock);
        let mut evaluations: u32 = 0;
        let mut step: u32 = 0;

        loop {
            let value = supplier().map_err(WaitError::Condition)?;
            evaluations = evaluations.saturating_add(1);
            let elapsed = watch.elapsed();
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

            // The evaluation above was the last-chance one once the deadline
            // has passed.
            if elapsed > self.spec.timeout {
                warn!(
                    description = %description,
                    evaluations,
                    elapsed_ms = duration_ms(elapsed),
                    timeout_ms = duration_ms(self.spec.timeout),
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

            let delay = self.spec.delay_for(step, elapsed);
            step = step.saturating_add(1);

            if self.clock.sleep(delay, self.cancel.as_ref()).is_err() {
                let elapsed = watch.elapsed();
                warn!(
                    description = %description,
                    evaluations,
                    elapsed_ms = duration_ms(elapsed),
                    "Wait cancelled"
                );
                return Err(cancelled(description, elapsed, evaluations));
            }
        }
    }
}

pub(crate) fn fail_on_timeout<E>(
    spec: &WaitSpec,
    outcome: Outcome,
    message: impl Into<String>,
) -> Result<Outcome, WaitError<E>> {
    match outcome {
        Outcome::Satisfied { .. } => Ok(outcome),
        Outcome::TimedOut {
            evaluations,
            elapsed,
        } => Err(WaitError::TimedOut {
            message: message.into(),
            description: spec.description().to_string(),
            elapsed,
            evaluations,
        }),
    }
}

pub(crate) fn cancelled<E>(description: &str, elapsed: Duration, evaluations: u32) -> WaitError<E> {
    WaitError::Cancelled {
        description: description.to_string(),
        elapsed,
        evaluations,
    }
}
