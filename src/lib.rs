//! Client side subscription to versioned configuration.
//!
//! A [`ConfigSubscriber`] subscribes to any number of configuration
//! definitions, each fetched on its own schedule from a [`SourceSpec`], and
//! converges them onto one common generation:
//!
//! ```
//! use std::time::Duration;
//!
//! use config_subscriber::ConfigPayload;
//! use config_subscriber::ConfigSubscriber;
//! use config_subscriber::ConfigType;
//! use config_subscriber::ConfigValue;
//! use config_subscriber::DeserializationError;
//! use config_subscriber::RawSpec;
//!
//! struct MyConfig {
//!     my_field: String,
//! }
//!
//! impl ConfigType for MyConfig {
//!     const DEF_NAME: &'static str = "my";
//!     const DEF_NAMESPACE: &'static str = "test";
//!     const DEF_MD5: &'static str = "d1b1f3f5";
//!
//!     fn decode(value: &ConfigValue) -> Result<Self, DeserializationError> {
//!         let payload = ConfigPayload::parse(value)?;
//!         Ok(Self {
//!             my_field: payload.string("myField")?,
//!         })
//!     }
//! }
//!
//! let mut subscriber = ConfigSubscriber::new(RawSpec::new("myField \"foo\"\n")).unwrap();
//! let handle = subscriber.subscribe::<MyConfig>("test/raw").unwrap();
//!
//! assert!(subscriber.next_config(Duration::from_secs(1)).unwrap());
//! assert_eq!(handle.get_config().unwrap().my_field, "foo");
//! ```

mod cancel;
mod config;
mod errors;
mod handle;
mod holder;
pub mod metrics;
mod model;
mod source;
mod subscriber;
mod subscription;
pub mod utils;

pub use cancel::*;
pub use crate::config::*;
pub use errors::*;
pub use handle::*;
pub use holder::*;
pub use model::*;
pub use source::*;
pub use subscriber::*;
pub use subscription::*;
pub use utils::Backoff;

#[cfg(test)]
mod cancel_test;
#[cfg(test)]
mod handle_test;
#[cfg(test)]
mod holder_test;

#[cfg(test)]
pub(crate) mod test_utils;
