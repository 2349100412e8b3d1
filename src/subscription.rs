use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::source::Source;
use crate::utils::Backoff;
use crate::CancellationToken;
use crate::ConfigHolder;
use crate::ConfigKey;
use crate::ConfigState;
use crate::ConfigValue;
use crate::Error;
use crate::Result;

/// Lifecycle of one subscription.
///
/// `Created -> Polling -> Converged -> Polling -> ... -> Cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// No fetch was requested yet
    Created,
    /// Waiting for a delivery the consumer has not seen
    Polling,
    /// The staged snapshot is the one exposed to handles
    Converged,
    Cancelled,
}

/// Snapshot exposed to config handles after a convergence
#[derive(Debug)]
pub(crate) struct Snapshot {
    pub(crate) value: ConfigValue,
    pub(crate) state: ConfigState,
    /// Content differs from the previously published snapshot
    pub(crate) changed: bool,
}

#[derive(Debug, Clone)]
struct Staged {
    value: ConfigValue,
    state: ConfigState,
}

/// Binds one key to one source and one holder.
///
/// Deliveries are staged by [`next_state`](ConfigSubscription::next_state) and
/// only become visible to handles on [`flip`](ConfigSubscription::flip). The
/// subscriber flips every subscription at once after they converged, so
/// handles never observe a mix of generations.
pub struct ConfigSubscription {
    key: ConfigKey,
    holder: Arc<ConfigHolder>,
    source: Mutex<Box<dyn Source>>,
    staged: Mutex<Option<Staged>>,
    published: ArcSwapOption<Snapshot>,
    polled: AtomicBool,
    cancelled: AtomicBool,
}

impl ConfigSubscription {
    pub(crate) fn new(
        key: ConfigKey,
        source: Box<dyn Source>,
        holder: Arc<ConfigHolder>,
    ) -> Self {
        Self {
            key,
            holder,
            source: Mutex::new(source),
            staged: Mutex::new(None),
            published: ArcSwapOption::empty(),
            polled: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &ConfigKey {
        &self.key
    }

    pub fn status(&self) -> SubscriptionStatus {
        if self.is_cancelled() {
            return SubscriptionStatus::Cancelled;
        }
        let staged = self.staged.lock().as_ref().map(|s| s.state.generation);
        let published = self.published.load_full().map(|s| s.state.generation);
        match (staged, published) {
            (Some(staged), Some(published)) if staged == published => SubscriptionStatus::Converged,
            _ if self.polled.load(Ordering::Acquire) => SubscriptionStatus::Polling,
            _ => SubscriptionStatus::Created,
        }
    }

    /// Asks the source to fetch and waits up to `timeout` for a delivery.
    ///
    /// Returns `true` if an update was staged. A delivery carrying an older
    /// generation than the staged one is dropped, so the staged generation
    /// never goes backwards.
    pub fn next_state(
        &self,
        timeout: Duration,
    ) -> Result<bool> {
        self.ensure_active()?;
        self.polled.store(true, Ordering::Release);
        self.source.lock().get_config();

        if !self.holder.wait(timeout) {
            if self.holder.is_cancelled() {
                return Err(Error::cancelled("subscription"));
            }
            return Ok(false);
        }
        let Some(update) = self.holder.take() else {
            return Ok(false);
        };

        let mut staged = self.staged.lock();
        if let Some(current) = staged.as_ref() {
            if update.generation() < current.state.generation {
                warn!(
                    key = %self.key,
                    received = update.generation(),
                    current = current.state.generation,
                    "ignoring update with older generation"
                );
                return Ok(false);
            }
        }
        trace!(key = %self.key, generation = update.generation(), has_changed = update.has_changed, "staged update");
        *staged = Some(Staged {
            value: update.value,
            state: update.state,
        });
        Ok(true)
    }

    /// Keeps fetching until an update is pending in the holder, without
    /// consuming it. Gives up at `timeout` or once `token` is cancelled.
    pub(crate) fn wait_pending(
        &self,
        timeout: Duration,
        backoff: &mut Backoff,
        token: &CancellationToken,
    ) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.is_cancelled() || token.is_cancelled() {
                return false;
            }
            self.polled.store(true, Ordering::Release);
            self.source.lock().get_config();

            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => backoff.peek(),
            };
            if self.holder.wait(backoff.next_delay().min(remaining)) {
                return true;
            }
            if remaining.is_zero() {
                return false;
            }
        }
    }

    /// Generation of the staged snapshot
    pub fn generation(&self) -> Result<Option<u64>> {
        self.ensure_active()?;
        Ok(self.staged.lock().as_ref().map(|s| s.state.generation))
    }

    /// Whether the staged generation differs from the published one
    pub fn has_generation_changed(&self) -> Result<bool> {
        self.ensure_active()?;
        let staged = self.staged.lock().as_ref().map(|s| s.state.generation);
        let published = self.published.load_full().map(|s| s.state.generation);
        Ok(staged != published)
    }

    /// Publishes the staged snapshot to handles.
    pub(crate) fn flip(&self) {
        let Some(staged) = self.staged.lock().clone() else {
            return;
        };
        let changed = match self.published.load_full() {
            Some(previous) => previous.value != staged.value,
            None => true,
        };
        debug!(key = %self.key, generation = staged.state.generation, changed, "publishing snapshot");
        self.published.store(Some(Arc::new(Snapshot {
            value: staged.value,
            state: staged.state,
            changed,
        })));
    }

    pub(crate) fn published(&self) -> Result<Option<Arc<Snapshot>>> {
        self.ensure_active()?;
        Ok(self.published.load_full())
    }

    /// Whether the last published snapshot changed content compared with the
    /// one published before it
    pub fn is_changed(&self) -> Result<bool> {
        Ok(self.published()?.is_some_and(|s| s.changed))
    }

    /// Forwards a generation bump to the source
    pub fn reload(
        &self,
        generation: u64,
    ) -> Result<()> {
        self.ensure_active()?;
        self.source.lock().reload(generation);
        Ok(())
    }

    /// Most recent fetch failure recorded by the source
    pub fn last_error(&self) -> Result<Option<String>> {
        self.ensure_active()?;
        Ok(self.source.lock().last_error())
    }

    /// Stops the source and closes the holder. Idempotent.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // unblocks a concurrent next_state before taking the source lock
        self.holder.cancel();
        self.source.lock().close();
        debug!(key = %self.key, "subscription cancelled");
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::cancelled("subscription"));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConfigSubscription {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigSubscription")
            .field("key", &self.key)
            .field("status", &self.status())
            .finish()
    }
}
