#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use config_subscriber::ConfigPayload;
use config_subscriber::ConfigTransport;
use config_subscriber::ConfigType;
use config_subscriber::ConfigValue;
use config_subscriber::DeserializationError;
use config_subscriber::FetchError;
use config_subscriber::FetchRequest;
use config_subscriber::FetchResponse;
use config_subscriber::TimingPolicy;
use parking_lot::Mutex;

pub const MY_DEF_MD5: &str = "d1b1f3f5";

pub const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct My {
    pub my_field: String,
}

impl ConfigType for My {
    const DEF_NAME: &'static str = "my";
    const DEF_NAMESPACE: &'static str = "test";
    const DEF_MD5: &'static str = MY_DEF_MD5;

    fn decode(value: &ConfigValue) -> Result<Self, DeserializationError> {
        let payload = ConfigPayload::parse(value)?;
        Ok(Self {
            my_field: payload.string("myField")?,
        })
    }
}

#[derive(Debug)]
pub struct Endpoints {
    pub port: i64,
    pub hosts: Vec<String>,
    pub enabled: bool,
}

impl ConfigType for Endpoints {
    const DEF_NAME: &'static str = "endpoints";
    const DEF_NAMESPACE: &'static str = "cloud.config";
    const DEF_MD5: &'static str = "7a3e91c2";

    fn decode(value: &ConfigValue) -> Result<Self, DeserializationError> {
        let payload = ConfigPayload::parse(value)?;
        Ok(Self {
            port: payload.i64("port")?,
            hosts: payload.string_array("hosts")?,
            enabled: payload.bool_or("enabled", true)?,
        })
    }
}

pub fn fast_timing() -> TimingPolicy {
    TimingPolicy {
        initial_poll_interval_ms: 1,
        max_poll_interval_ms: 10,
        subscribe_timeout_ms: 2000,
        fetch_timeout_ms: 50,
        success_delay_ms: 1,
        retry_base_delay_ms: 1,
        retry_max_delay_ms: 10,
    }
}

/// In-process stand in for a config proxy: serves the last published
/// response per definition name, failing while `down` is set.
#[derive(Debug, Default)]
pub struct FakeProxy {
    published: Mutex<HashMap<String, FetchResponse>>,
    down: Mutex<bool>,
    hosts_seen: Mutex<Vec<String>>,
}

impl FakeProxy {
    pub fn publish(
        &self,
        def_name: &str,
        generation: u64,
        text: &str,
    ) {
        self.publish_value(def_name, generation, ConfigValue::from_text(text));
    }

    pub fn publish_value(
        &self,
        def_name: &str,
        generation: u64,
        value: ConfigValue,
    ) {
        self.publish_response(
            def_name,
            FetchResponse {
                value,
                generation,
                apply_on_restart: false,
            },
        );
    }

    pub fn publish_response(
        &self,
        def_name: &str,
        response: FetchResponse,
    ) {
        self.published.lock().insert(def_name.to_string(), response);
    }

    pub fn set_down(
        &self,
        down: bool,
    ) {
        *self.down.lock() = down;
    }

    pub fn hosts_seen(&self) -> Vec<String> {
        self.hosts_seen.lock().clone()
    }
}

impl ConfigTransport for FakeProxy {
    fn fetch(
        &self,
        host: &str,
        request: &FetchRequest,
    ) -> Result<Option<FetchResponse>, FetchError> {
        self.hosts_seen.lock().push(host.to_string());
        if *self.down.lock() {
            return Err(FetchError::Transport(format!("{host} unreachable")));
        }
        Ok(self.published.lock().get(request.key.def_name()).cloned())
    }
}
