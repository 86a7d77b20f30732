//! Clock and sleep abstraction for settle.
//!
//! Waits never read `Instant::now()` or call `thread::sleep` directly; they go
//! through a [`Clock`]. [`SystemClock`] is wall-clock time, [`ManualClock`] is
//! virtual time that only moves when something sleeps or calls
//! [`ManualClock::advance`], so timing-sensitive tests stay deterministic.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub use settle_cancel::{CancelToken, Interrupted};

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Source of monotonic time plus the ability to sleep on it.
pub trait Clock {
    /// Time since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    /// Sleeps for `duration`, returning early with `Interrupted` if `cancel`
    /// is or becomes cancelled.
    fn sleep(&self, duration: Duration, cancel: Option<&CancelToken>) -> Result<(), Interrupted>;

    /// Sleeps for the full `duration`; nothing can interrupt it.
    fn sleep_uninterruptible(&self, duration: Duration);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration, cancel: Option<&CancelToken>) -> Result<(), Interrupted> {
        (**self).sleep(duration, cancel)
    }

    fn sleep_uninterruptible(&self, duration: Duration) {
        (**self).sleep_uninterruptible(duration)
    }
}

/// Wall-clock time on the calling thread.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration, cancel: Option<&CancelToken>) -> Result<(), Interrupted> {
        match cancel {
            Some(token) => token.sleep(duration),
            None => {
                self.sleep_uninterruptible(duration);
                Ok(())
            }
        }
    }

    fn sleep_uninterruptible(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Virtual clock. Sleeping advances time instantly and is recorded.
///
/// Clones share the same timeline, so a condition closure can hold a clone and
/// move time forward to simulate slow evaluations.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves virtual time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = state.now.saturating_add(duration);
    }

    /// Every sleep performed so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.lock().now
    }

    fn sleep(&self, duration: Duration, cancel: Option<&CancelToken>) -> Result<(), Interrupted> {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(Interrupted);
        }
        self.sleep_uninterruptible(duration);
        Ok(())
    }

    fn sleep_uninterruptible(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = state.now.saturating_add(duration);
        state.sleeps.push(duration);
    }
}

/// Measures elapsed time on a [`Clock`] from the moment it was started.
#[derive(Debug)]
pub struct Stopwatch<'a, C: Clock + ?Sized> {
    clock: &'a C,
    started: Duration,
}

impl<'a, C: Clock + ?Sized> Stopwatch<'a, C> {
    pub fn start(clock: &'a C) -> Self {
        Self {
            clock,
            started: clock.now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.started)
    }

    /// True once `limit` has been exceeded (strictly).
    pub fn is_past(&self, limit: Duration) -> bool {
        self.elapsed() > limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_sleep_advances_and_records() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_millis(100), None).unwrap();
        clock.sleep(Duration::from_millis(250), None).unwrap();

        assert_eq!(clock.now(), Duration::from_millis(350));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_millis(100), Duration::from_millis(250)]
        );
    }

    #[test]
    fn manual_clock_advance_is_not_a_sleep() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(2));
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        other.advance(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(5));
    }

    #[test]
    fn manual_clock_cancelled_sleep_does_not_advance() {
        let clock = ManualClock::new();
        let token = CancelToken::new();
        token.cancel();

        assert_eq!(
            clock.sleep(Duration::from_secs(1), Some(&token)),
            Err(Interrupted)
        );
        assert_eq!(clock.now(), Duration::ZERO);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        clock.sleep(Duration::from_millis(5), None).unwrap();
        assert!(clock.now() >= first + Duration::from_millis(5));
    }

    #[test]
    fn system_clock_sleep_honours_cancel() {
        let clock = SystemClock::new();
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            clock.sleep(Duration::from_secs(30), Some(&token)),
            Err(Interrupted)
        );
    }

    #[test]
    fn manual_clock_uninterruptible_sleep_records() {
        let clock = ManualClock::new();
        clock.sleep_uninterruptible(Duration::from_millis(40));
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(40)]);
        assert_eq!(clock.now(), Duration::from_millis(40));
    }

    #[test]
    fn duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_millis(1_500)), 1_500);
        assert_eq!(duration_ms(Duration::from_micros(999)), 0);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }

    #[test]
    fn stopwatch_measures_from_start() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(10));

        let watch = Stopwatch::start(&clock);
        assert_eq!(watch.elapsed(), Duration::ZERO);

        clock.advance(Duration::from_millis(300));
        assert_eq!(watch.elapsed(), Duration::from_millis(300));
        assert!(watch.is_past(Duration::from_millis(299)));
        assert!(!watch.is_past(Duration::from_millis(300)));
    }
}
