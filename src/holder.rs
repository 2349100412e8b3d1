use std::time::Duration;
use std::time::Instant;

use parking_lot::Condvar;
use parking_lot::Mutex;
use tracing::trace;

use crate::CancellationToken;
use crate::ConfigUpdate;

/// Single-slot mailbox between one fetch activity and one consumer.
///
/// At most one update is pending at a time; a newer `put` overwrites an
/// unconsumed one. Only the latest generation matters, so dropping the
/// intermediate update is fine.
///
/// Once [`cancel`](ConfigHolder::cancel) is called the holder is closed for
/// good: waiters return `false` immediately and later `put`s are dropped.
/// The holder owns the cancellation token its source sleeps on, so closing the
/// holder also stops the source's background activity.
#[derive(Debug)]
pub struct ConfigHolder {
    slot: Mutex<Slot>,
    cond: Condvar,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<ConfigUpdate>,
    closed: bool,
}

impl Default for ConfigHolder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigHolder {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            cond: Condvar::new(),
            token: CancellationToken::new(),
        }
    }

    /// Stores `update`, replacing any unconsumed one, and wakes the waiter.
    /// Never blocks beyond the slot lock. Ignored after `cancel`.
    pub fn put(
        &self,
        update: ConfigUpdate,
    ) {
        let mut slot = self.slot.lock();
        if slot.closed {
            trace!(generation = update.generation(), "holder closed, dropping update");
            return;
        }
        if let Some(stale) = slot.pending.replace(update) {
            trace!(generation = stale.generation(), "overwrote unconsumed update");
        }
        self.cond.notify_all();
    }

    /// Whether an update is pending. Never blocks.
    pub fn poll(&self) -> bool {
        let slot = self.slot.lock();
        !slot.closed && slot.pending.is_some()
    }

    /// Blocks until an update is pending, the holder is cancelled, or `timeout`
    /// elapses. Returns whether an update is available.
    pub fn wait(
        &self,
        timeout: Duration,
    ) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut slot = self.slot.lock();
        while !slot.closed && slot.pending.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.cond.wait_until(&mut slot, deadline).timed_out() {
                        break;
                    }
                }
                None => self.cond.wait(&mut slot),
            }
        }
        !slot.closed && slot.pending.is_some()
    }

    /// Removes and returns the pending update, if any.
    pub fn take(&self) -> Option<ConfigUpdate> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return None;
        }
        slot.pending.take()
    }

    /// Permanently closes the holder and cancels its token.
    pub fn cancel(&self) {
        {
            let mut slot = self.slot.lock();
            slot.closed = true;
            slot.pending = None;
            self.cond.notify_all();
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.slot.lock().closed
    }

    /// Token cancelled together with this holder, for the source's sleeps
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}
