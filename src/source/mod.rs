//! Pluggable fetch strategies.
//!
//! A [`SourceSpec`] says where configuration comes from. It builds a
//! [`SourceFactory`], which in turn builds one [`Source`] per subscription.
//! Every source pushes what it fetches into the subscription's
//! [`ConfigHolder`]; fetch failures stay inside the source.
//!
//! - [`RawSpec`]: literal payload, delivered synchronously with generation 0
//! - [`FileSpec`] / [`DirSpec`]: files read synchronously on each fetch
//! - [`ServerSpec`]: remote endpoints polled from a background thread through
//!   a [`ConfigTransport`]

mod file;
mod raw;
mod server;

pub use file::*;
pub use raw::*;
pub use server::*;


use std::sync::Arc;

use tracing::trace;

use crate::metrics::UPDATES_DELIVERED;
use crate::ConfigHolder;
use crate::ConfigKey;
use crate::ConfigState;
use crate::ConfigUpdate;
use crate::ConfigValue;
use crate::Result;
use crate::TimingPolicy;

/// Fetch activity bound to one key and one holder.
pub trait Source: Send {
    /// Triggers one fetch attempt. Never fails: errors are logged, recorded and
    /// retried.
    fn get_config(&mut self);

    /// Stamps later deliveries with `generation`. Sources whose generations are
    /// assigned upstream ignore this.
    fn reload(
        &mut self,
        generation: u64,
    );

    /// Stops further fetch activity and cancels the holder.
    fn close(&mut self);

    /// Text of the most recent fetch failure, cleared by the next success
    fn last_error(&self) -> Option<String> {
        None
    }
}

pub trait SourceFactory: Send + Sync {
    fn create_source(
        &self,
        holder: Arc<ConfigHolder>,
        key: &ConfigKey,
    ) -> Box<dyn Source>;
}

/// Where to fetch configuration from
#[derive(Debug, Clone)]
pub enum SourceSpec {
    Raw(RawSpec),
    File(FileSpec),
    Dir(DirSpec),
    Server(ServerSpec),
}

impl SourceSpec {
    pub fn create_source_factory(
        &self,
        timing: &TimingPolicy,
    ) -> Result<Box<dyn SourceFactory>> {
        match self {
            SourceSpec::Raw(spec) => Ok(Box::new(RawSourceFactory::new(spec))),
            SourceSpec::File(spec) => FileSourceFactory::for_file(spec).map(|f| Box::new(f) as Box<dyn SourceFactory>),
            SourceSpec::Dir(spec) => FileSourceFactory::for_dir(spec).map(|f| Box::new(f) as Box<dyn SourceFactory>),
            SourceSpec::Server(spec) => {
                ServerSourceFactory::new(spec, timing.clone()).map(|f| Box::new(f) as Box<dyn SourceFactory>)
            }
        }
    }
}

impl From<RawSpec> for SourceSpec {
    fn from(spec: RawSpec) -> Self {
        SourceSpec::Raw(spec)
    }
}

impl From<FileSpec> for SourceSpec {
    fn from(spec: FileSpec) -> Self {
        SourceSpec::File(spec)
    }
}

impl From<DirSpec> for SourceSpec {
    fn from(spec: DirSpec) -> Self {
        SourceSpec::Dir(spec)
    }
}

impl From<ServerSpec> for SourceSpec {
    fn from(spec: ServerSpec) -> Self {
        SourceSpec::Server(spec)
    }
}

/// Remembers the checksum last pushed for a key, so sources can flag whether
/// a delivery changed content.
#[derive(Debug, Default)]
pub(crate) struct Delivery {
    last_checksum: Option<u32>,
}

impl Delivery {
    pub(crate) fn push(
        &mut self,
        holder: &ConfigHolder,
        key: &ConfigKey,
        value: ConfigValue,
        state: ConfigState,
    ) {
        let has_changed = self.last_checksum != Some(value.checksum());
        self.last_checksum = Some(value.checksum());

        trace!(%key, generation = state.generation, has_changed, "delivering update");
        UPDATES_DELIVERED.with_label_values(&[key.def_name()]).inc();
        holder.put(ConfigUpdate::new(value, state, has_changed));
    }
}
