//! Fuzz harness for backoff delay arithmetic
//!
//! Delays saturate instead of overflowing and never exceed the cap.

#![no_main]

use libfuzzer_sys::fuzz_target;
use settle_backoff::Backoff;
use std::time::Duration;

fuzz_target!(|input: (u64, u64, u64, u32)| {
    let (base_ms, cap_ms, multiplier_bits, step) = input;
    let base = Duration::from_millis(base_ms);
    let cap = Duration::from_millis(cap_ms);
    let multiplier = f64::from_bits(multiplier_bits);

    for backoff in [
        Backoff::Fixed,
        Backoff::linear(cap),
        Backoff::exponential(multiplier, cap),
    ] {
        if backoff.validate(base).is_err() {
            continue;
        }
        let delay = backoff.delay_for(base, step);
        if let Some(max) = backoff.max_delay() {
            assert!(delay <= max);
        }
    }
});
