use std::sync::Arc;

use tracing::debug;

use super::Delivery;
use super::Source;
use super::SourceFactory;
use crate::ConfigHolder;
use crate::ConfigKey;
use crate::ConfigState;
use crate::ConfigValue;

/// Literal payload served in-process.
///
/// Every key subscribed through this spec receives the same payload, always
/// at generation 0. Meant for tests and bootstrapping.
///
/// ```
/// use config_subscriber::RawSpec;
///
/// let spec = RawSpec::new("myField \"foo\"\n");
/// assert_eq!(spec.payload(), "myField \"foo\"\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpec {
    payload: String,
}

impl RawSpec {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

pub(crate) struct RawSourceFactory {
    value: ConfigValue,
}

impl RawSourceFactory {
    pub(crate) fn new(spec: &RawSpec) -> Self {
        Self {
            value: ConfigValue::from_text(&spec.payload),
        }
    }
}

impl SourceFactory for RawSourceFactory {
    fn create_source(
        &self,
        holder: Arc<ConfigHolder>,
        key: &ConfigKey,
    ) -> Box<dyn Source> {
        Box::new(RawSource {
            holder,
            key: key.clone(),
            value: self.value.clone(),
            delivery: Delivery::default(),
        })
    }
}

pub(crate) struct RawSource {
    holder: Arc<ConfigHolder>,
    key: ConfigKey,
    value: ConfigValue,
    delivery: Delivery,
}

impl Source for RawSource {
    fn get_config(&mut self) {
        let state = ConfigState::new(0, self.value.md5());
        self.delivery.push(&self.holder, &self.key, self.value.clone(), state);
    }

    fn reload(
        &mut self,
        generation: u64,
    ) {
        debug!(key = %self.key, generation, "literal sources stay at generation 0, ignoring reload");
    }

    fn close(&mut self) {
        self.holder.cancel();
    }
}
