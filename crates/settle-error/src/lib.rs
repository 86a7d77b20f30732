//! Error taxonomy for settle.
//!
//! Waits distinguish four failure kinds: an invalid configuration caught before
//! the first evaluation, a timeout surfaced through an `..._or_fail` call, an
//! external cancellation, and an error raised by the condition itself. The
//! last one is carried unmodified in [`WaitError::Condition`].

use std::convert::Infallible;
use std::time::Duration;

use thiserror::Error;

/// Invalid interval/timeout/backoff combination. Always fatal, never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("timeout {timeout:?} is shorter than poll interval {interval:?}")]
    TimeoutShorterThanInterval { interval: Duration, timeout: Duration },

    #[error("backoff multiplier must be a finite number >= 1.0, got {0}")]
    InvalidMultiplier(f64),

    #[error("backoff max delay {max_delay:?} is below the base interval {interval:?}")]
    MaxDelayBelowInterval {
        interval: Duration,
        max_delay: Duration,
    },

    #[error("unknown wait profile: {0}")]
    UnknownProfile(String),
}

/// Error returned by waits and retries.
///
/// `E` is the error type of the condition (or retry action). Infallible
/// conditions use the default `Infallible`, so `Condition` can never occur.
#[derive(Error, Debug)]
pub enum WaitError<E = Infallible> {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(
        "{message}: timed out after {elapsed:?} waiting for {description} ({evaluations} evaluations)"
    )]
    TimedOut {
        message: String,
        description: String,
        elapsed: Duration,
        evaluations: u32,
    },

    #[error("wait for {description} was cancelled after {elapsed:?} ({evaluations} evaluations)")]
    Cancelled {
        description: String,
        elapsed: Duration,
        evaluations: u32,
    },

    #[error("{message} (gave up after {attempts} attempts)")]
    RetriesExhausted { message: String, attempts: u32 },

    #[error("condition failed: {0}")]
    Condition(E),
}

impl<E> WaitError<E> {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. } | Self::RetriesExhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns the condition's own error, if that is what stopped the wait.
    pub fn into_condition(self) -> Option<E> {
        match self {
            Self::Condition(err) => Some(err),
            _ => None,
        }
    }

    /// Converts the condition error type, leaving every other variant intact.
    pub fn map_condition<F, G>(self, f: G) -> WaitError<F>
    where
        G: FnOnce(E) -> F,
    {
        match self {
            Self::Configuration(err) => WaitError::Configuration(err),
            Self::TimedOut {
                message,
                description,
                elapsed,
                evaluations,
            } => WaitError::TimedOut {
                message,
                description,
                elapsed,
                evaluations,
            },
            Self::Cancelled {
                description,
                elapsed,
                evaluations,
            } => WaitError::Cancelled {
                description,
                elapsed,
                evaluations,
            },
            Self::RetriesExhausted { message, attempts } => {
                WaitError::RetriesExhausted { message, attempts }
            }
            Self::Condition(err) => WaitError::Condition(f(err)),
        }
    }
}

impl WaitError<Infallible> {
    /// Widens an infallible wait error into any condition error type.
    pub fn widen<E>(self) -> WaitError<E> {
        self.map_condition(|never| match never {})
    }
}

/// Result alias for waits whose condition raises `E`.
pub type Result<T, E = Infallible> = std::result::Result<T, WaitError<E>>;
