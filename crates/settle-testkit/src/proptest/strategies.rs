use proptest::prelude::*;

/// Poll intervals small enough to keep virtual-time tests fast.
pub fn strategy_interval_ms() -> impl Strategy<Value = u64> {
    1u64..=500
}

/// `(interval_ms, timeout_ms)` pairs satisfying `timeout >= interval > 0`,
/// with at most a few hundred ticks per wait.
pub fn strategy_wait_millis() -> impl Strategy<Value = (u64, u64)> {
    strategy_interval_ms().prop_flat_map(|interval| {
        (Just(interval), interval..=interval.saturating_mul(200))
    })
}

/// Condition scripts of up to `max_len` booleans.
pub fn strategy_script(max_len: usize) -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..=max_len)
}

/// `(failures_before_success, max_retries)` for attempt-bounded retries.
pub fn strategy_retry_script() -> impl Strategy<Value = (u32, u32)> {
    (0u32..20, 0u32..20)
}
