//! Environment variable overrides and CI detection.

use anyhow::bail;

pub const INTERVAL_ENV: &str = "SETTLE_INTERVAL_MS";
pub const TIMEOUT_ENV: &str = "SETTLE_TIMEOUT_MS";
pub const CI_DELAY_ENV: &str = "SETTLE_CI_DELAY_MS";

/// Truthy values: "1", "true", "yes", "on" (case-insensitive)
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// True on CI hosts: `CI` is truthy, or `WORKSPACE` is set (Jenkins).
pub fn is_ci() -> bool {
    is_ci_from(|name| std::env::var(name).ok())
}

pub fn is_ci_from<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup("WORKSPACE").is_some() || lookup("CI").is_some_and(|value| is_truthy(&value))
}

pub(crate) fn parse_millis<F>(lookup: &F, name: &str) -> anyhow::Result<Option<u64>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(ms) => Ok(Some(ms)),
        Err(_) => bail!("{name} must be a whole number of milliseconds, got {raw:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values() {
        for value in ["1", "true", "TRUE", "yes", "On"] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["0", "false", "no", "off", ""] {
            assert!(!is_truthy(value), "{value}");
        }
    }

    #[test]
    fn ci_detected_from_jenkins_workspace() {
        assert!(is_ci_from(|name| (name == "WORKSPACE").then(|| "/var/lib/jenkins".to_string())));
    }

    #[test]
    fn ci_detected_from_truthy_ci() {
        assert!(is_ci_from(|name| (name == "CI").then(|| "true".to_string())));
        assert!(!is_ci_from(|name| (name == "CI").then(|| "false".to_string())));
        assert!(!is_ci_from(|_| None));
    }

    #[test]
    fn parse_millis_trims_whitespace() {
        let lookup = |_: &str| Some(" 750 ".to_string());
        assert_eq!(parse_millis(&lookup, INTERVAL_ENV).unwrap(), Some(750));
    }
}
