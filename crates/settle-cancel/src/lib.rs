//! Cooperative cancellation for settle waits.
//!
//! A [`CancelToken`] is the only way to stop a wait early. Blocking waits
//! observe it while sleeping between evaluations; async waits race their
//! sleep against [`CancelToken::cancelled`]. Cancellation is one-shot.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// A sleep was cut short because its token was cancelled.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("sleep interrupted by cancellation")]
pub struct Interrupted;

#[derive(Debug, Default)]
struct Inner {
    token: CancellationToken,
    // Mirrors `token` for threads parked in `sleep`.
    lock: Mutex<bool>,
    condvar: Condvar,
}

/// Shared cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and wakes every sleeper, blocking or async.
    pub fn cancel(&self) {
        let mut cancelled = lock(&self.inner.lock);
        *cancelled = true;
        drop(cancelled);

        self.inner.token.cancel();
        self.inner.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// The underlying tokio token, for code that already speaks
    /// `CancellationToken`.
    pub fn as_cancellation_token(&self) -> &CancellationToken {
        &self.inner.token
    }

    /// Blocks the calling thread for `duration` unless cancelled first.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now().checked_add(duration);
        let mut cancelled = lock(&self.inner.lock);

        loop {
            if *cancelled {
                return Err(Interrupted);
            }

            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(());
                    }
                    let (guard, _) = self
                        .inner
                        .condvar
                        .wait_timeout(cancelled, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    cancelled = guard;
                }
                None => {
                    cancelled = self
                        .inner
                        .condvar
                        .wait(cancelled)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Resolves once the token has been cancelled.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }

    /// Returns a guard that cancels this token when dropped.
    pub fn guard(&self) -> CancelGuard {
        CancelGuard {
            token: self.clone(),
        }
    }
}

fn lock(mutex: &Mutex<bool>) -> MutexGuard<'_, bool> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cancels its token on drop, tying a wait to a scope.
#[derive(Debug)]
pub struct CancelGuard {
    token: CancelToken,
}

impl CancelGuard {
    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn new_token_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        other.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn sleep_completes_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert_eq!(token.sleep(Duration::from_millis(20)), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn sleep_on_cancelled_token_returns_immediately() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        assert_eq!(token.sleep(Duration::from_secs(30)), Err(Interrupted));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn cancel_from_other_thread_interrupts_sleep() {
        let token = CancelToken::new();
        let remote = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            remote.cancel();
        });

        let start = Instant::now();
        assert_eq!(token.sleep(Duration::from_secs(30)), Err(Interrupted));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn guard_cancels_on_drop() {
        let token = CancelToken::new();
        {
            let guard = token.guard();
            assert!(!guard.token().is_cancelled());
        }
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let token = CancelToken::new();
        let remote = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            remote.cancel();
        });

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("cancellation should be observed");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancellation_token_view_follows_cancel() {
        let token = CancelToken::new();
        let view = token.as_cancellation_token().clone();
        assert!(!view.is_cancelled());

        token.cancel();
        view.cancelled().await;
        assert!(view.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }
}
