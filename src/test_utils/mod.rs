//! Config types, transports and timing shared by the unit tests
use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;

use crate::ConfigPayload;
use crate::ConfigTransport;
use crate::ConfigType;
use crate::ConfigValue;
use crate::DeserializationError;
use crate::FetchError;
use crate::FetchRequest;
use crate::FetchResponse;
use crate::TimingPolicy;

pub(crate) const MY_DEF_MD5: &str = "d1b1f3f5";

#[derive(Debug, PartialEq)]
pub(crate) struct MyConfig {
    pub(crate) my_field: String,
}

impl ConfigType for MyConfig {
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

#[derive(Debug, PartialEq)]
pub(crate) struct CounterConfig {
    pub(crate) value: i64,
}

impl ConfigType for CounterConfig {
    const DEF_NAME: &'static str = "counter";
    const DEF_NAMESPACE: &'static str = "test";
    const DEF_MD5: &'static str = "0c0ffee0";

    fn decode(value: &ConfigValue) -> Result<Self, DeserializationError> {
        let payload = ConfigPayload::parse(value)?;
        Ok(Self {
            value: payload.i64("value")?,
        })
    }
}

/// Short poll and retry intervals so convergence tests finish quickly
pub(crate) fn fast_timing() -> TimingPolicy {
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

/// Serves whatever was last published per definition name.
#[derive(Debug, Default)]
pub(crate) struct ScriptedTransport {
    published: Mutex<HashMap<String, FetchResponse>>,
    fetches: AtomicUsize,
}

impl ScriptedTransport {
    pub(crate) fn publish(
        &self,
        def_name: &str,
        generation: u64,
        value: ConfigValue,
    ) {
        self.published.lock().insert(
            def_name.to_string(),
            FetchResponse {
                value,
                generation,
                apply_on_restart: false,
            },
        );
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ConfigTransport for ScriptedTransport {
    fn fetch(
        &self,
        _host: &str,
        request: &FetchRequest,
    ) -> Result<Option<FetchResponse>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.published.lock().get(request.key.def_name()).cloned())
    }
}
