//! Config Subscription Error Hierarchy
//!
//! Errors are split by who has to act on them:
//! - [`Error`] is what callers of the public API see (usage, schema and
//!   cancellation problems).
//! - [`DeserializationError`] is raised synchronously by a config handle when
//!   a payload does not fit the requested type.
//! - [`FetchError`] never leaves a source. Sources log it, record it and retry.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

use crate::ConfigKey;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Timing policy loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Payload could not be turned into the requested config type
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),

    /// Accessor used after the owning subscriber/subscription was closed
    #[error("{what} already cancelled")]
    Cancelled { what: &'static str },

    /// No payload arrived for a new subscription within the subscribe timeout
    #[error("Subscribing to {key} timed out after {timeout:?}")]
    SubscribeTimeout { key: ConfigKey, timeout: Duration },

    /// The subscription set is fixed once the first generation was acquired
    #[error("Cannot subscribe to {key} after the first generation was acquired")]
    SubscribeAfterAcquire { key: ConfigKey },

    /// Handle read before its subscription took part in a convergence
    #[error("No converged snapshot for {key} yet")]
    NotConverged { key: ConfigKey },

    /// Source spec cannot be used to build a source factory
    #[error("Invalid source spec: {0}")]
    InvalidSpec(String),
}

impl Error {
    pub(crate) fn cancelled(what: &'static str) -> Self {
        Error::Cancelled { what }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeserializationError {
    /// The payload was produced for a different schema
    #[error("Schema mismatch for {def_name}: expected md5 {expected}, payload has {actual}")]
    SchemaMismatch {
        def_name: &'static str,
        expected: &'static str,
        actual: String,
    },

    #[error("Missing field: {field}")]
    MissingField { field: String },

    #[error("Invalid value {value:?} for field {field}, expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// Malformed line in the payload text
    #[error("Syntax error at line {line}: {reason}")]
    Syntax { line: usize, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// File backed sources could not read their file
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport level failure reported by a remote endpoint
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    /// Response could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),
}
