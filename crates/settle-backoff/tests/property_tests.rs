//! Property tests for settle-backoff schedules.

use proptest::prelude::*;
use settle_backoff::Backoff;
use std::time::Duration;

fn strategy_backoff() -> impl Strategy<Value = Backoff> {
    prop_oneof![
        Just(Backoff::Fixed),
        (1_000u64..60_000).prop_map(|max| Backoff::linear(Duration::from_millis(max))),
        (1.0f64..4.0, 1_000u64..60_000)
            .prop_map(|(m, max)| Backoff::exponential(m, Duration::from_millis(max))),
    ]
}

proptest! {
    // Delays never shrink from one step to the next.
    #[test]
    fn prop_schedule_is_non_decreasing(
        backoff in strategy_backoff(),
        base_ms in 1u64..1_000,
    ) {
        let base = Duration::from_millis(base_ms);
        let delays: Vec<_> = backoff.schedule(base).take(32).collect();
        for pair in delays.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }
    }

    // Delays stay within [base, cap] whenever the strategy validates.
    #[test]
    fn prop_delays_bounded(
        backoff in strategy_backoff(),
        base_ms in 1u64..1_000,
        step in 0u32..10_000,
    ) {
        let base = Duration::from_millis(base_ms);
        prop_assume!(backoff.validate(base).is_ok());

        let delay = backoff.delay_for(base, step);
        prop_assert!(delay >= base);
        if let Some(max) = backoff.max_delay() {
            prop_assert!(delay <= max);
        }
    }
}
