use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::utils::Backoff;
use crate::Error;
use crate::Result;

/// Timing policy shared read-only by the subscriber and every source.
///
/// The poll interval pair drives how often `next_config` re-checks its
/// subscriptions; the retry pair drives how remote sources back off after
/// failed fetches.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TimingPolicy {
    /// First wait slice between convergence rounds (unit: milliseconds)
    #[serde(default = "default_initial_poll_interval_ms")]
    pub initial_poll_interval_ms: u64,

    /// Backoff ceiling for the convergence poll interval (unit: milliseconds)
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,

    /// How long `subscribe` waits for the first payload (unit: milliseconds)
    #[serde(default = "default_subscribe_timeout_ms")]
    pub subscribe_timeout_ms: u64,

    /// Per request timeout handed to remote transports (unit: milliseconds)
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,

    /// Pause between successful remote fetches (unit: milliseconds)
    #[serde(default = "default_success_delay_ms")]
    pub success_delay_ms: u64,

    /// Backoff base after a failed fetch (unit: milliseconds)
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Maximum backoff after repeated failed fetches (unit: milliseconds)
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            initial_poll_interval_ms: default_initial_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            subscribe_timeout_ms: default_subscribe_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
            success_delay_ms: default_success_delay_ms(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl TimingPolicy {
    pub fn validate(&self) -> Result<()> {
        let non_zero = [
            ("initial_poll_interval_ms", self.initial_poll_interval_ms),
            ("max_poll_interval_ms", self.max_poll_interval_ms),
            ("subscribe_timeout_ms", self.subscribe_timeout_ms),
            ("fetch_timeout_ms", self.fetch_timeout_ms),
            ("success_delay_ms", self.success_delay_ms),
            ("retry_base_delay_ms", self.retry_base_delay_ms),
            ("retry_max_delay_ms", self.retry_max_delay_ms),
        ];
        for (name, value) in non_zero {
            if value == 0 {
                return Err(Error::Config(ConfigError::Message(format!(
                    "{name} must be greater than 0"
                ))));
            }
        }

        if self.initial_poll_interval_ms > self.max_poll_interval_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "initial_poll_interval_ms {}ms should not exceed max_poll_interval_ms {}ms",
                self.initial_poll_interval_ms, self.max_poll_interval_ms
            ))));
        }

        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "retry_base_delay_ms {}ms should not exceed retry_max_delay_ms {}ms",
                self.retry_base_delay_ms, self.retry_max_delay_ms
            ))));
        }

        Ok(())
    }

    pub fn initial_poll_interval(&self) -> Duration {
        Duration::from_millis(self.initial_poll_interval_ms)
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }

    pub fn subscribe_timeout(&self) -> Duration {
        Duration::from_millis(self.subscribe_timeout_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn success_delay(&self) -> Duration {
        Duration::from_millis(self.success_delay_ms)
    }

    /// Schedule for the wait slices between convergence rounds
    pub fn poll_backoff(&self) -> Backoff {
        Backoff::new(self.initial_poll_interval(), self.max_poll_interval())
    }

    /// Schedule for retrying failed remote fetches
    pub fn retry_backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.retry_base_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }
}

fn default_initial_poll_interval_ms() -> u64 {
    50
}
fn default_max_poll_interval_ms() -> u64 {
    1000
}
fn default_subscribe_timeout_ms() -> u64 {
    60_000
}
fn default_fetch_timeout_ms() -> u64 {
    5000
}
fn default_success_delay_ms() -> u64 {
    100
}
fn default_retry_base_delay_ms() -> u64 {
    250
}
fn default_retry_max_delay_ms() -> u64 {
    10_000
}
