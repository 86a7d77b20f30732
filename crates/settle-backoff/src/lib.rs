//! Interval schedules between polls and retries.
//!
//! A [`Backoff`] maps the zero-based index of a sleep to its duration, given
//! the base interval of the wait. `Fixed` is the default and keeps the
//! interval constant, which is what the polling loop's evaluation-count
//! guarantees are stated against.

use serde::{Deserialize, Serialize};
use settle_error::ConfigurationError;
use std::time::Duration;

/// Backoff strategy between successive evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay every time
    #[default]
    Fixed,
    /// `base * (step + 1)`, capped
    Linear { max_delay_ms: u64 },
    /// `base * multiplier^step`, capped
    Exponential {
        #[serde(default = "default_multiplier")]
        multiplier: f64,
        max_delay_ms: u64,
    },
}

fn default_multiplier() -> f64 {
    2.0
}

impl Backoff {
    pub fn linear(max_delay: Duration) -> Self {
        Self::Linear {
            max_delay_ms: duration_ms(max_delay),
        }
    }

    pub fn exponential(multiplier: f64, max_delay: Duration) -> Self {
        Self::Exponential {
            multiplier,
            max_delay_ms: duration_ms(max_delay),
        }
    }

    /// Upper bound on a single delay, if the strategy has one.
    pub fn max_delay(&self) -> Option<Duration> {
        match self {
            Self::Fixed => None,
            Self::Linear { max_delay_ms } | Self::Exponential { max_delay_ms, .. } => {
                Some(Duration::from_millis(*max_delay_ms))
            }
        }
    }

    /// Checks the strategy against the base interval it will scale.
    pub fn validate(&self, base: Duration) -> Result<(), ConfigurationError> {
        if let Self::Exponential { multiplier, .. } = self
            && (!multiplier.is_finite() || *multiplier < 1.0)
        {
            return Err(ConfigurationError::InvalidMultiplier(*multiplier));
        }

        match self.max_delay() {
            Some(max_delay) if max_delay < base => Err(ConfigurationError::MaxDelayBelowInterval {
                interval: base,
                max_delay,
            }),
            _ => Ok(()),
        }
    }

    /// Delay before evaluation `step + 1`. Saturates instead of overflowing.
    pub fn delay_for(&self, base: Duration, step: u32) -> Duration {
        match self {
            Self::Fixed => base,
            Self::Linear { max_delay_ms } => {
                let max = Duration::from_millis(*max_delay_ms);
                base.saturating_mul(step.saturating_add(1)).min(max)
            }
            Self::Exponential {
                multiplier,
                max_delay_ms,
            } => {
                let max = Duration::from_millis(*max_delay_ms);
                let exponent = i32::try_from(step).unwrap_or(i32::MAX);
                let secs = base.as_secs_f64() * multiplier.powi(exponent);
                Duration::try_from_secs_f64(secs)
                    .map(|delay| delay.min(max))
                    .unwrap_or(max)
            }
        }
    }

    /// The infinite sequence of delays for `base`.
    pub fn schedule(&self, base: Duration) -> impl Iterator<Item = Duration> + '_ {
        (0..=u32::MAX).map(move |step| self.delay_for(base, step))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
