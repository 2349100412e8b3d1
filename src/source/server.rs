use std::fmt;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::Delivery;
use super::Source;
use super::SourceFactory;
use crate::metrics::FETCH_FAILURES;
use crate::utils::parse_endpoints;
use crate::ConfigHolder;
use crate::ConfigKey;
use crate::ConfigState;
use crate::ConfigValue;
use crate::Error;
use crate::FetchError;
use crate::Result;
use crate::TimingPolicy;

/// One poll against a remote endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub key: ConfigKey,
    /// Last state delivered for the key, `None` before the first delivery
    pub current_state: Option<ConfigState>,
    /// How long the endpoint may hold the request before answering
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub value: ConfigValue,
    pub generation: u64,
    pub apply_on_restart: bool,
}

/// Wire access to a config distribution endpoint.
///
/// Implementations block for at most `request.timeout` and return
/// `Ok(None)` when nothing newer than `request.current_state` is available.
#[cfg_attr(test, automock)]
pub trait ConfigTransport: Send + Sync + 'static {
    fn fetch(
        &self,
        host: &str,
        request: &FetchRequest,
    ) -> std::result::Result<Option<FetchResponse>, FetchError>;
}

/// Remote endpoints plus the transport used to reach them
#[derive(Clone)]
pub struct ServerSpec {
    hosts: Vec<String>,
    transport: Arc<dyn ConfigTransport>,
}

impl ServerSpec {
    /// `hosts` is a comma separated endpoint list, e.g. `"tcp/proxy1:19090,proxy2"`
    pub fn new(
        hosts: &str,
        transport: Arc<dyn ConfigTransport>,
    ) -> Self {
        Self {
            hosts: parse_endpoints(hosts),
            transport,
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }
}

impl fmt::Debug for ServerSpec {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("ServerSpec").field("hosts", &self.hosts).finish_non_exhaustive()
    }
}

pub(crate) struct ServerSourceFactory {
    hosts: Arc<[String]>,
    transport: Arc<dyn ConfigTransport>,
    timing: TimingPolicy,
}

impl ServerSourceFactory {
    pub(crate) fn new(
        spec: &ServerSpec,
        timing: TimingPolicy,
    ) -> Result<Self> {
        if spec.hosts.is_empty() {
            return Err(Error::InvalidSpec("server spec lists no endpoints".to_string()));
        }
        Ok(Self {
            hosts: spec.hosts.clone().into(),
            transport: spec.transport.clone(),
            timing,
        })
    }
}

impl SourceFactory for ServerSourceFactory {
    fn create_source(
        &self,
        holder: Arc<ConfigHolder>,
        key: &ConfigKey,
    ) -> Box<dyn Source> {
        Box::new(ServerSource {
            holder,
            key: key.clone(),
            hosts: self.hosts.clone(),
            transport: self.transport.clone(),
            timing: self.timing.clone(),
            worker: None,
        })
    }
}

/// Polls remote endpoints from a dedicated background thread.
///
/// The thread starts on the first `get_config` and keeps running until the
/// holder is cancelled; later `get_config` calls are no-ops.
pub(crate) struct ServerSource {
    holder: Arc<ConfigHolder>,
    key: ConfigKey,
    hosts: Arc<[String]>,
    transport: Arc<dyn ConfigTransport>,
    timing: TimingPolicy,
    worker: Option<JoinHandle<()>>,
}

impl Source for ServerSource {
    fn get_config(&mut self) {
        if self.worker.is_some() || self.holder.is_cancelled() {
            return;
        }

        let fetcher = Fetcher {
            holder: self.holder.clone(),
            key: self.key.clone(),
            hosts: self.hosts.clone(),
            transport: self.transport.clone(),
            timing: self.timing.clone(),
        };
        let spawned = thread::Builder::new()
            .name(format!("config-fetch-{}", self.key.def_name()))
            .spawn(move || fetcher.run());

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            // left unset so the next get_config tries again
            Err(e) => warn!(key = %self.key, "failed to spawn fetch thread: {}", e),
        }
    }

    fn reload(
        &mut self,
        generation: u64,
    ) {
        debug!(key = %self.key, generation, "remote sources own their generations, ignoring reload");
    }

    fn close(&mut self) {
        self.holder.cancel();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!(key = %self.key, "fetch thread panicked");
            }
        }
    }
}

impl Drop for ServerSource {
    fn drop(&mut self) {
        self.close();
    }
}

struct Fetcher {
    holder: Arc<ConfigHolder>,
    key: ConfigKey,
    hosts: Arc<[String]>,
    transport: Arc<dyn ConfigTransport>,
    timing: TimingPolicy,
}

impl Fetcher {
    fn run(self) {
        debug!(key = %self.key, "fetch thread started");

        let token = self.holder.token();
        let mut retry = self.timing.retry_backoff();
        let mut delivery = Delivery::default();
        let mut current: Option<ConfigState> = None;
        let mut host_index = 0usize;

        while !token.is_cancelled() {
            let host = &self.hosts[host_index % self.hosts.len()];
            let request = FetchRequest {
                key: self.key.clone(),
                current_state: current.clone(),
                timeout: self.timing.fetch_timeout(),
            };

            let delay = match self.transport.fetch(host, &request) {
                Ok(Some(response)) => {
                    retry.reset();
                    let state = ConfigState::new(response.generation, response.value.md5())
                        .with_apply_on_restart(response.apply_on_restart);
                    if self.is_newer(current.as_ref(), &state) {
                        delivery.push(&self.holder, &self.key, response.value, state.clone());
                        current = Some(state);
                    }
                    self.timing.success_delay()
                }
                Ok(None) => {
                    retry.reset();
                    self.timing.success_delay()
                }
                Err(e) => {
                    FETCH_FAILURES.with_label_values(&[self.key.def_name()]).inc();
                    let delay = retry.next_delay();
                    warn!(
                        key = %self.key,
                        host = %host,
                        attempt = retry.attempts(),
                        ?delay,
                        "failed to fetch config: {}",
                        e
                    );
                    host_index = host_index.wrapping_add(1);
                    delay
                }
            };

            if token.wait_timeout(delay) {
                break;
            }
        }

        info!(key = %self.key, "fetch thread stopped");
    }

    /// Generations never go backwards; an identical snapshot is not redelivered
    fn is_newer(
        &self,
        current: Option<&ConfigState>,
        received: &ConfigState,
    ) -> bool {
        let Some(current) = current else {
            return true;
        };
        if received.generation < current.generation {
            warn!(
                key = %self.key,
                received = received.generation,
                current = current.generation,
                "dropping response with older generation"
            );
            return false;
        }
        !received.is_same_snapshot(current)
    }
}
