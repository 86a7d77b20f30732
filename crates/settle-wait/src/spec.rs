use settle_backoff::Backoff;
use settle_error::ConfigurationError;
use std::time::Duration;

/// Default delay between evaluations.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Default total wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

const DEFAULT_DESCRIPTION: &str = "condition";

/// How long to wait and how often to look.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitSpec {
    pub interval: Duration,
    pub timeout: Duration,
    /// Only used in log lines and failure messages.
    pub description: Option<String>,
    pub backoff: Backoff,
}

impl WaitSpec {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            description: None,
            backoff: Backoff::Fixed,
        }
    }

    pub fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(interval_ms),
            Duration::from_millis(timeout_ms),
        )
    }

    pub fn from_secs(interval_secs: u64, timeout_secs: u64) -> Self {
        Self::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }

    /// `interval > 0`, `timeout >= interval`, and a backoff that fits the interval.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.interval.is_zero() {
            return Err(ConfigurationError::ZeroInterval);
        }
        if self.timeout < self.interval {
            return Err(ConfigurationError::TimeoutShorterThanInterval {
                interval: self.interval,
                timeout: self.timeout,
            });
        }
        self.backoff.validate(self.interval)
    }

    /// Delay before evaluation `step + 2`, given `elapsed` so far.
    ///
    /// A growing backoff is clipped to the time left before the deadline, but
    /// never below the base interval, so a wait overshoots its timeout by at
    /// most one interval.
    pub(crate) fn delay_for(&self, step: u32, elapsed: Duration) -> Duration {
        let remaining = self.timeout.saturating_sub(elapsed).max(self.interval);
        self.backoff.delay_for(self.interval, step).min(remaining)
    }
}

impl Default for WaitSpec {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL, DEFAULT_TIMEOUT)
    }
}
