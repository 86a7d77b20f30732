//! Configuration management and loading for settle.

mod env;

pub use env::{CI_DELAY_ENV, INTERVAL_ENV, TIMEOUT_ENV, is_ci, is_ci_from, is_truthy};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use settle_backoff::Backoff;
use settle_error::ConfigurationError;
use settle_retry::RetryPolicy;
use settle_wait::WaitSpec;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration format types supported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    Json,
    #[default]
    Yaml,
}

impl ConfigFormat {
    fn for_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Main settle configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettleConfig {
    /// Wait used when no profile is named
    #[serde(default)]
    pub defaults: WaitSettings,

    /// Named waits, e.g. `pod-ready` or `route-admitted`
    #[serde(default)]
    pub profiles: BTreeMap<String, WaitSettings>,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Minimum pause on CI hosts, in milliseconds
    #[serde(default = "default_ci_delay_ms")]
    pub ci_delay_ms: u64,
}

fn default_ci_delay_ms() -> u64 {
    1000
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self {
            defaults: WaitSettings::default(),
            profiles: BTreeMap::new(),
            retry: RetryPolicy::default(),
            ci_delay_ms: default_ci_delay_ms(),
        }
    }
}

/// Serializable form of a [`WaitSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub backoff: Backoff,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_interval_ms() -> u64 {
    duration_ms(settle_wait::DEFAULT_INTERVAL)
}

fn default_timeout_ms() -> u64 {
    duration_ms(settle_wait::DEFAULT_TIMEOUT)
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
            backoff: Backoff::Fixed,
            description: None,
        }
    }
}

impl WaitSettings {
    /// Builds a validated [`WaitSpec`].
    pub fn to_spec(&self) -> Result<WaitSpec, ConfigurationError> {
        let mut spec = WaitSpec::from_millis(self.interval_ms, self.timeout_ms)
            .with_backoff(self.backoff.clone());
        spec.description = self.description.clone();
        spec.validate()?;
        Ok(spec)
    }
}

impl SettleConfig {
    /// Resolves `profile` (or the defaults when `None`) into a [`WaitSpec`].
    pub fn spec_for(&self, profile: Option<&str>) -> Result<WaitSpec, ConfigurationError> {
        self.settings_for(profile)?.to_spec()
    }

    pub fn settings_for(&self, profile: Option<&str>) -> Result<&WaitSettings, ConfigurationError> {
        match profile {
            None => Ok(&self.defaults),
            Some(name) => self
                .profiles
                .get(name)
                .ok_or_else(|| ConfigurationError::UnknownProfile(name.to_string())),
        }
    }

    pub fn ci_delay(&self) -> Duration {
        Duration::from_millis(self.ci_delay_ms)
    }

    /// Floor for fixed pauses: the CI delay on CI hosts, zero elsewhere.
    pub fn pause_floor(&self) -> Duration {
        self.pause_floor_from(|name| std::env::var(name).ok())
    }

    pub fn pause_floor_from<F>(&self, lookup: F) -> Duration
    where
        F: Fn(&str) -> Option<String>,
    {
        if is_ci_from(lookup) { self.ci_delay() } else { Duration::ZERO }
    }

    /// Applies `SETTLE_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Applies `SETTLE_*` overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ms) = env::parse_millis(&lookup, INTERVAL_ENV)? {
            self.defaults.interval_ms = ms;
        }
        if let Some(ms) = env::parse_millis(&lookup, TIMEOUT_ENV)? {
            self.defaults.timeout_ms = ms;
        }
        if let Some(ms) = env::parse_millis(&lookup, CI_DELAY_ENV)? {
            self.ci_delay_ms = ms;
        }
        Ok(())
    }
}

/// Load configuration from a file
pub fn load_config<P: Into<PathBuf>>(path: P) -> anyhow::Result<SettleConfig> {
    let path = path.into();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;

    match ConfigFormat::for_path(&path) {
        ConfigFormat::Json => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON config {}", path.display())),
        ConfigFormat::Yaml => serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config {}", path.display())),
    }
}

/// Save configuration to a file
pub fn save_config<P: Into<PathBuf>>(config: &SettleConfig, path: P) -> anyhow::Result<()> {
    let path = path.into();
    let contents = match ConfigFormat::for_path(&path) {
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .context("Failed to serialize JSON config")?,
        ConfigFormat::Yaml => {
            serde_yaml::to_string(config).context("Failed to serialize YAML config")?
        }
    };

    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write config {}", path.display()))?;
    Ok(())
}
