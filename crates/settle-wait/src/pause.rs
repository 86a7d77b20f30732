//! Unconditional pauses between test steps.

use settle_clock::{Clock, SystemClock, duration_ms};
use std::time::Duration;
use tracing::debug;

/// Sleeps the calling thread for `duration`.
pub fn pause(duration: Duration) {
    pause_on(&SystemClock::new(), duration);
}

/// Sleeps for `requested` or `floor`, whichever is longer, and returns the
/// duration actually slept. `floor` is typically the CI delay from settings,
/// so slow CI machines get more slack than a developer laptop.
pub fn pause_at_least(requested: Duration, floor: Duration) -> Duration {
    pause_at_least_on(&SystemClock::new(), requested, floor)
}

pub fn pause_on<C: Clock + ?Sized>(clock: &C, duration: Duration) {
    debug!(duration_ms = duration_ms(duration), "Pausing");
    clock.sleep_uninterruptible(duration);
}

pub fn pause_at_least_on<C: Clock + ?Sized>(
    clock: &C,
    requested: Duration,
    floor: Duration,
) -> Duration {
    let duration = requested.max(floor);
    pause_on(clock, duration);
    duration
}
