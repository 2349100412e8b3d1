use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Condvar;
use parking_lot::Mutex;

/// Shared cancellation flag with a broadcast wakeup.
///
/// Cloning is cheap and every clone observes the same flag. Sleepers parked in
/// [`wait_timeout`](CancellationToken::wait_timeout) are woken as soon as
/// [`cancel`](CancellationToken::cancel) is called from any thread.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent. Wakes every thread sleeping on this token.
    pub fn cancel(&self) {
        let _guard = self.inner.lock.lock();
        self.inner.cancelled.store(true, Ordering::Release);
        self.inner.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Sleeps for `timeout` unless cancelled first.
    ///
    /// Returns `true` if the token was (or became) cancelled.
    pub fn wait_timeout(
        &self,
        timeout: Duration,
    ) -> bool {
        // None: the timeout is too large to represent, sleep until cancelled
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.inner.lock.lock();
        while !self.is_cancelled() {
            match deadline {
                Some(deadline) => {
                    if self.inner.cond.wait_until(&mut guard, deadline).timed_out() {
                        break;
                    }
                }
                None => self.inner.cond.wait(&mut guard),
            }
        }
        self.is_cancelled()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
