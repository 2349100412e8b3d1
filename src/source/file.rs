use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::Delivery;
use super::Source;
use super::SourceFactory;
use crate::metrics::FETCH_FAILURES;
use crate::ConfigHolder;
use crate::ConfigKey;
use crate::ConfigState;
use crate::ConfigValue;
use crate::Error;
use crate::FetchError;
use crate::Result;

/// Extension of per-definition files inside a [`DirSpec`] directory
pub const CONFIG_FILE_EXTENSION: &str = "cfg";

/// A single file holding the payload for every key subscribed through it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    path: PathBuf,
}

impl FileSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A directory holding one `<def_name>.cfg` file per definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirSpec {
    dir: PathBuf,
}

impl DirSpec {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File a key with definition `def_name` is read from
    pub fn file_for(
        &self,
        def_name: &str,
    ) -> PathBuf {
        self.dir.join(format!("{def_name}.{CONFIG_FILE_EXTENSION}"))
    }
}

enum Layout {
    File(PathBuf),
    Dir(DirSpec),
}

pub(crate) struct FileSourceFactory {
    layout: Layout,
}

impl FileSourceFactory {
    pub(crate) fn for_file(spec: &FileSpec) -> Result<Self> {
        if spec.path.as_os_str().is_empty() {
            return Err(Error::InvalidSpec("file spec has an empty path".to_string()));
        }
        Ok(Self {
            layout: Layout::File(spec.path.clone()),
        })
    }

    pub(crate) fn for_dir(spec: &DirSpec) -> Result<Self> {
        if !spec.dir.is_dir() {
            return Err(Error::InvalidSpec(format!("{:?} is not a directory", spec.dir)));
        }
        Ok(Self {
            layout: Layout::Dir(spec.clone()),
        })
    }
}

impl SourceFactory for FileSourceFactory {
    fn create_source(
        &self,
        holder: Arc<ConfigHolder>,
        key: &ConfigKey,
    ) -> Box<dyn Source> {
        let path = match &self.layout {
            Layout::File(path) => path.clone(),
            Layout::Dir(spec) => spec.file_for(key.def_name()),
        };
        debug!(%key, ?path, "creating file source");
        Box::new(FileSource {
            holder,
            key: key.clone(),
            path,
            generation: 0,
            delivery: Delivery::default(),
            last_error: None,
        })
    }
}

/// Reads its file synchronously on every fetch.
///
/// The generation stamped on deliveries starts at 0 and only moves through
/// [`reload`](Source::reload).
pub(crate) struct FileSource {
    holder: Arc<ConfigHolder>,
    key: ConfigKey,
    path: PathBuf,
    generation: u64,
    delivery: Delivery,
    last_error: Option<String>,
}

impl FileSource {
    fn read(&self) -> std::result::Result<ConfigValue, FetchError> {
        fs::read_to_string(&self.path)
            .map(|text| ConfigValue::from_text(&text))
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

impl Source for FileSource {
    fn get_config(&mut self) {
        if self.holder.is_cancelled() {
            return;
        }
        match self.read() {
            Ok(value) => {
                self.last_error = None;
                let state = ConfigState::new(self.generation, value.md5());
                self.delivery.push(&self.holder, &self.key, value, state);
            }
            Err(e) => {
                warn!(key = %self.key, "failed to fetch config: {}", e);
                FETCH_FAILURES.with_label_values(&[self.key.def_name()]).inc();
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn reload(
        &mut self,
        generation: u64,
    ) {
        if generation > self.generation {
            debug!(key = %self.key, from = self.generation, to = generation, "reloading file source");
            self.generation = generation;
        }
    }

    fn close(&mut self) {
        self.holder.cancel();
    }

    fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }
}
