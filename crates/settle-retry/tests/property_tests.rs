//! Property tests for settle-retry

use proptest::prelude::*;
use settle_clock::ManualClock;
use settle_error::WaitError;
use settle_retry::{Retrier, RetryPolicy};
use settle_testkit::proptest::strategy_retry_script;
use settle_testkit::true_after;
use std::time::Duration;

proptest! {
    // k failures then success: succeeds iff k <= max_retries, and the
    // action is called min(k + 1, max_retries + 1) times.
    #[test]
    fn prop_attempts_bounded_by_policy((k, max_retries) in strategy_retry_script()) {
        let clock = ManualClock::new();
        let retrier = Retrier::new(RetryPolicy::new(max_retries, Duration::from_millis(10)))
            .with_clock(clock.clone());
        let action = true_after(k as usize);

        let result = retrier.until(|| action.evaluate(), "flaky action");
        let expected_calls = (k + 1).min(max_retries + 1);

        prop_assert_eq!(action.evaluations(), expected_calls);
        if k <= max_retries {
            prop_assert_eq!(result.unwrap(), k + 1);
            prop_assert_eq!(clock.sleeps().len() as u32, k);
        } else {
            let exhausted = matches!(
                result,
                Err(WaitError::RetriesExhausted { attempts, .. }) if attempts == max_retries + 1
            );
            prop_assert!(exhausted);
            // No sleep after the final attempt.
            prop_assert_eq!(clock.sleeps().len() as u32, max_retries);
        }
    }

    // Every sleep between attempts uses the configured fixed delay.
    #[test]
    fn prop_fixed_delay_between_attempts(max_retries in 0u32..20, delay_ms in 0u64..5_000) {
        let clock = ManualClock::new();
        let retrier = Retrier::new(RetryPolicy::new(max_retries, Duration::from_millis(delay_ms)))
            .with_clock(clock.clone());

        let _ = retrier.until(|| false, "never");

        prop_assert!(clock.sleeps().iter().all(|d| *d == Duration::from_millis(delay_ms)));
        prop_assert_eq!(clock.elapsed(), Duration::from_millis(delay_ms * u64::from(max_retries)));
    }
}

#[test]
fn fourth_attempt_succeeds_with_three_retries() {
    let clock = ManualClock::new();
    let action = true_after(3);
    let attempts = Retrier::new(RetryPolicy::new(3, Duration::from_millis(10)))
        .with_clock(clock)
        .until(|| action.evaluate(), "unused")
        .unwrap();
    assert_eq!(attempts, 4);
    assert_eq!(action.evaluations(), 4);
}

#[test]
fn two_retries_give_up_after_three_attempts() {
    let clock = ManualClock::new();
    let action = true_after(3);
    let err = Retrier::new(RetryPolicy::new(2, Duration::from_millis(10)))
        .with_clock(clock)
        .until(|| action.evaluate(), "Unable to scale syndesis-operator")
        .unwrap_err();
    assert_eq!(action.evaluations(), 3);
    assert_eq!(
        err.to_string(),
        "Unable to scale syndesis-operator (gave up after 3 attempts)"
    );
}
