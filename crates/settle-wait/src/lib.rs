//! Poll a condition at a fixed interval until it holds or a timeout elapses.
//!
//! This is the synchronisation primitive an end-to-end test driver uses
//! against an eventually-consistent system: pod readiness, a route being
//! admitted, a custom resource reaching a phase. The waiter knows nothing
//! about what the condition inspects.
//!
//! Guarantees, for every call:
//!
//! - the [`WaitSpec`] is validated before anything else, so a zero interval or a
//!   timeout shorter than the interval fails fast with
//!   [`ConfigurationError`] instead of spinning;
//! - the condition is evaluated at least once, and evaluations never overlap;
//! - once the timeout has passed, the condition is evaluated one last time
//!   and that result decides between [`Outcome::Satisfied`] and
//!   [`Outcome::TimedOut`];
//! - an error raised by the condition stops the wait immediately and is
//!   returned unmodified inside [`WaitError::Condition`];
//! - a cancelled [`CancelToken`] interrupts the sleep and yields
//!   [`WaitError::Cancelled`], never a timeout.
//!
//! ```no_run
//! use std::time::Duration;
//! use settle_wait::wait_until_or_fail;
//!
//! # fn route_admitted() -> bool { true }
//! wait_until_or_fail(
//!     route_admitted,
//!     Duration::from_secs(1),
//!     Duration::from_secs(120),
//!     "Unable to find syndesis route in 120s",
//! )?;
//! # Ok::<(), settle_wait::WaitError>(())
//! ```

pub mod async_wait;
mod outcome;
pub mod pause;
mod spec;
mod waiter;

use std::time::Duration;

pub use outcome::{Outcome, Polled};
pub use pause::{pause, pause_at_least};
pub use settle_backoff::Backoff;
pub use settle_cancel::CancelToken;
pub use settle_clock::{Clock, ManualClock, SystemClock, duration_ms};
pub use settle_error::{ConfigurationError, WaitError};
pub use spec::{DEFAULT_INTERVAL, DEFAULT_TIMEOUT, WaitSpec};
pub use waiter::Waiter;

/// Polls `condition` every `interval` for up to `timeout`.
///
/// A timeout is a normal [`Outcome`], not an error.
pub fn wait_until<F>(condition: F, interval: Duration, timeout: Duration) -> Result<Outcome, WaitError>
where
    F: FnMut() -> bool,
{
    Waiter::new(WaitSpec::new(interval, timeout)).until(condition)
}

/// Fallible-condition form of [`wait_until`].
pub fn try_wait_until<E, F>(
    condition: F,
    interval: Duration,
    timeout: Duration,
) -> Result<Outcome, WaitError<E>>
where
    F: FnMut() -> Result<bool, E>,
{
    Waiter::new(WaitSpec::new(interval, timeout)).try_until(condition)
}

/// Like [`wait_until`], but a timeout becomes [`WaitError::TimedOut`] carrying
/// `message` and the elapsed time.
pub fn wait_until_or_fail<F>(
    condition: F,
    interval: Duration,
    timeout: Duration,
    message: impl Into<String>,
) -> Result<Outcome, WaitError>
where
    F: FnMut() -> bool,
{
    Waiter::new(WaitSpec::new(interval, timeout)).until_or_fail(condition, message)
}

/// Like [`wait_until`], reduced to "did it become true in time".
pub fn wait_until_no_fail<F>(
    condition: F,
    interval: Duration,
    timeout: Duration,
) -> Result<bool, WaitError>
where
    F: FnMut() -> bool,
{
    Waiter::new(WaitSpec::new(interval, timeout)).until_no_fail(condition)
}

/// Polls `supplier` until `predicate` accepts its value.
pub fn wait_for_value<T, S, P>(
    supplier: S,
    predicate: P,
    interval: Duration,
    timeout: Duration,
) -> Result<Polled<T>, WaitError>
where
    S: FnMut() -> T,
    P: Fn(&T) -> bool,
{
    Waiter::new(WaitSpec::new(interval, timeout)).for_value(supplier, predicate)
}
