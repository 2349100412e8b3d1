//! The generation barrier.
//!
//! A [`ConfigSubscriber`] owns every subscription created through it and
//! blocks in [`next_config`](ConfigSubscriber::next_config) until all of them
//! stage one common generation. Only then are the staged snapshots published
//! to handles, all at once.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::trace;

use crate::metrics::record_convergence;
use crate::metrics::CONVERGED_GENERATION;
use crate::metrics::OUTCOME_CANCELLED;
use crate::metrics::OUTCOME_CONVERGED;
use crate::metrics::OUTCOME_TIMEOUT;
use crate::source::SourceFactory;
use crate::utils::scoped_timer::ScopedTimer;
use crate::CancellationToken;
use crate::ConfigHandle;
use crate::ConfigHolder;
use crate::ConfigKey;
use crate::ConfigSubscription;
use crate::ConfigType;
use crate::Error;
use crate::Result;
use crate::SourceSpec;
use crate::SubscriberConfig;
use crate::TimingPolicy;

/// State shared between a subscriber and its closers
#[derive(Debug, Default)]
struct Shared {
    token: CancellationToken,
    subscriptions: Mutex<Vec<Arc<ConfigSubscription>>>,
}

impl Shared {
    fn close(&self) {
        let subscriptions = {
            // cancelled under the lock so a concurrent subscribe cannot push past it
            let mut guard = self.subscriptions.lock();
            if self.token.is_cancelled() {
                return;
            }
            self.token.cancel();
            std::mem::take(&mut *guard)
        };
        for subscription in &subscriptions {
            subscription.cancel();
        }
        info!(subscriptions = subscriptions.len(), "subscriber closed");
    }
}

/// Closes a [`ConfigSubscriber`] from any thread.
///
/// A `next_config` blocked on the subscriber returns `Err(Cancelled)` promptly.
#[derive(Debug, Clone)]
pub struct SubscriberCloser {
    shared: Arc<Shared>,
}

impl SubscriberCloser {
    pub fn close(&self) {
        self.shared.close();
    }
}

pub struct ConfigSubscriber {
    factory: Box<dyn SourceFactory>,
    timing: TimingPolicy,
    shared: Arc<Shared>,
    /// Last generation every subscription converged on
    generation: Option<u64>,
    /// Set by the first next_config/next_generation; freezes the subscription set
    acquired: bool,
}

impl ConfigSubscriber {
    /// Subscriber with the default timing policy
    pub fn new(spec: impl Into<SourceSpec>) -> Result<Self> {
        Self::with_timing(spec, TimingPolicy::default())
    }

    /// Subscriber using the timing policy of a loaded [`SubscriberConfig`]
    pub fn with_config(
        spec: impl Into<SourceSpec>,
        config: SubscriberConfig,
    ) -> Result<Self> {
        let config = config.validate()?;
        Self::with_timing(spec, config.timing)
    }

    pub fn with_timing(
        spec: impl Into<SourceSpec>,
        timing: TimingPolicy,
    ) -> Result<Self> {
        timing.validate()?;
        let spec = spec.into();
        let factory = spec.create_source_factory(&timing)?;
        debug!(?spec, "created subscriber");
        Ok(Self {
            factory,
            timing,
            shared: Arc::new(Shared::default()),
            generation: None,
            acquired: false,
        })
    }

    /// Subscribes to `T` under `config_id`, waiting up to the policy's
    /// subscribe timeout for the first payload.
    pub fn subscribe<T: ConfigType>(
        &mut self,
        config_id: &str,
    ) -> Result<ConfigHandle<T>> {
        self.subscribe_with_timeout(config_id, self.timing.subscribe_timeout())
    }

    /// Subscribes to `T` under `config_id`.
    ///
    /// Returns once the first payload is pending for the new subscription; it
    /// is not visible through the handle before the next convergence. Fails
    /// with [`Error::SubscribeTimeout`] if nothing arrived within `timeout`.
    pub fn subscribe_with_timeout<T: ConfigType>(
        &mut self,
        config_id: &str,
        timeout: Duration,
    ) -> Result<ConfigHandle<T>> {
        self.ensure_open()?;
        let key = ConfigKey::of::<T>(config_id);
        if self.acquired {
            return Err(Error::SubscribeAfterAcquire { key });
        }

        let holder = Arc::new(ConfigHolder::new());
        let source = self.factory.create_source(holder.clone(), &key);
        let subscription = Arc::new(ConfigSubscription::new(key.clone(), source, holder));

        let mut backoff = self.timing.poll_backoff();
        if !subscription.wait_pending(timeout, &mut backoff, &self.shared.token) {
            let error = subscription.last_error().ok().flatten();
            subscription.cancel();
            self.ensure_open()?;
            debug!(%key, ?timeout, ?error, "subscribe timed out");
            return Err(Error::SubscribeTimeout { key, timeout });
        }

        {
            let mut subscriptions = self.shared.subscriptions.lock();
            if self.is_closed() {
                drop(subscriptions);
                subscription.cancel();
                debug!(%key, "subscriber closed while subscribing");
                return Err(Error::cancelled("subscriber"));
            }
            subscriptions.push(subscription.clone());
        }
        debug!(%key, "subscribed");
        Ok(ConfigHandle::new(subscription))
    }

    /// Blocks until every subscription reached one common generation, or
    /// `timeout` elapsed.
    ///
    /// Returns `Ok(true)` on convergence, after which every handle exposes the
    /// payload of that generation. `Ok(false)` means no consistent snapshot
    /// yet; handles keep showing the previous one. A converged state that did
    /// not move counts as converged.
    pub fn next_config(
        &mut self,
        timeout: Duration,
    ) -> Result<bool> {
        let _timer = ScopedTimer::new("next_config", self.subscription_count());
        self.acquire(timeout, false)
    }

    pub fn next_config_now(&mut self) -> Result<bool> {
        self.next_config(Duration::ZERO)
    }

    /// Like [`next_config`](ConfigSubscriber::next_config), but only returns
    /// `Ok(true)` for a generation newer than the last one acquired.
    pub fn next_generation(
        &mut self,
        timeout: Duration,
    ) -> Result<bool> {
        let _timer = ScopedTimer::new("next_generation", self.subscription_count());
        self.acquire(timeout, true)
    }

    pub fn next_generation_now(&mut self) -> Result<bool> {
        self.next_generation(Duration::ZERO)
    }

    /// Last generation all subscriptions converged on
    pub fn generation(&self) -> Result<Option<u64>> {
        self.ensure_open()?;
        Ok(self.generation)
    }

    /// Stamps subsequent deliveries of every subscription with `generation`.
    /// Sources that receive generations from upstream ignore it.
    pub fn reload(
        &self,
        generation: u64,
    ) -> Result<()> {
        self.ensure_open()?;
        for subscription in self.shared.subscriptions.lock().iter() {
            subscription.reload(generation)?;
        }
        Ok(())
    }

    pub fn close(&self) {
        self.shared.close();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    pub fn closer(&self) -> SubscriberCloser {
        SubscriberCloser {
            shared: self.shared.clone(),
        }
    }

    pub fn timing(&self) -> &TimingPolicy {
        &self.timing
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.shared.subscriptions.lock().len()
    }

    fn acquire(
        &mut self,
        timeout: Duration,
        require_newer: bool,
    ) -> Result<bool> {
        let started = Instant::now();
        let result = self.converge(timeout, require_newer);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let outcome = match &result {
            Ok(true) => OUTCOME_CONVERGED,
            Ok(false) => OUTCOME_TIMEOUT,
            Err(_) => OUTCOME_CANCELLED,
        };
        record_convergence(outcome, elapsed_ms);
        result
    }

    fn converge(
        &mut self,
        timeout: Duration,
        require_newer: bool,
    ) -> Result<bool> {
        self.ensure_open()?;
        self.acquired = true;

        let subscriptions = self.shared.subscriptions.lock().clone();
        let deadline = Instant::now().checked_add(timeout);
        let mut backoff = self.timing.poll_backoff();
        // later information always wins: the target only moves up
        let mut target = self.generation;

        loop {
            let mut progressed = false;
            for subscription in &subscriptions {
                let before = subscription.generation()?;
                let slice = if target.is_some() && before == target {
                    Duration::ZERO
                } else {
                    backoff.peek().min(remaining(deadline))
                };
                subscription.next_state(slice)?;
                if subscription.generation()? != before {
                    progressed = true;
                }
            }

            let mut max_seen = None;
            for subscription in &subscriptions {
                max_seen = max_seen.max(subscription.generation()?);
            }
            if max_seen > target {
                trace!(from = ?target, to = ?max_seen, "raising convergence target");
                target = max_seen;
            }

            if self.is_converged(&subscriptions, target)? && (!require_newer || target > self.generation) {
                for subscription in &subscriptions {
                    subscription.flip();
                }
                self.generation = target;
                if let Some(generation) = target {
                    CONVERGED_GENERATION.set(i64::try_from(generation).unwrap_or(i64::MAX));
                }
                debug!(generation = ?target, subscriptions = subscriptions.len(), "converged");
                return Ok(true);
            }

            let left = remaining(deadline);
            if left.is_zero() {
                debug!(pending = ?target, ?timeout, "no convergence before deadline");
                return Ok(false);
            }
            if !progressed && self.shared.token.wait_timeout(backoff.next_delay().min(left)) {
                return Err(Error::cancelled("subscriber"));
            }
            self.ensure_open()?;
        }
    }

    fn is_converged(
        &self,
        subscriptions: &[Arc<ConfigSubscription>],
        target: Option<u64>,
    ) -> Result<bool> {
        for subscription in subscriptions {
            let generation = subscription.generation()?;
            if generation.is_none() || generation != target {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::cancelled("subscriber"));
        }
        Ok(())
    }
}

impl Drop for ConfigSubscriber {
    fn drop(&mut self) {
        self.shared.close();
    }
}

impl std::fmt::Debug for ConfigSubscriber {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigSubscriber")
            .field("timing", &self.timing)
            .field("generation", &self.generation)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn remaining(deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()),
        None => Duration::MAX,
    }
}
