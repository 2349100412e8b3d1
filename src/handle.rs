use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::ConfigKey;
use crate::ConfigState;
use crate::ConfigSubscription;
use crate::ConfigValue;
use crate::DeserializationError;
use crate::Error;
use crate::Result;

/// Decoder contract for one configuration schema.
///
/// `DEF_NAME`, `DEF_NAMESPACE` and `DEF_MD5` identify the schema; together with
/// a config id they form the [`ConfigKey`] a subscription is made for.
///
/// ```
/// use config_subscriber::ConfigPayload;
/// use config_subscriber::ConfigType;
/// use config_subscriber::ConfigValue;
/// use config_subscriber::DeserializationError;
///
/// struct MyConfig {
///     my_field: String,
/// }
///
/// impl ConfigType for MyConfig {
///     const DEF_NAME: &'static str = "my";
///     const DEF_NAMESPACE: &'static str = "test";
///     const DEF_MD5: &'static str = "d1b1f3f5";
///
///     fn decode(value: &ConfigValue) -> Result<Self, DeserializationError> {
///         let payload = ConfigPayload::parse(value)?;
///         Ok(Self {
///             my_field: payload.string("myField")?,
///         })
///     }
/// }
///
/// let value = ConfigValue::from_text("myField \"foo\"\n");
/// let config = MyConfig::decode(&value).unwrap();
/// assert_eq!(config.my_field, "foo");
/// assert_eq!(config.def_name(), "my");
/// ```
pub trait ConfigType: Sized + Send + Sync + 'static {
    const DEF_NAME: &'static str;
    const DEF_NAMESPACE: &'static str;
    const DEF_MD5: &'static str;

    fn decode(value: &ConfigValue) -> std::result::Result<Self, DeserializationError>;

    fn def_name(&self) -> &'static str {
        Self::DEF_NAME
    }
}

/// Typed view over one subscription's converged payload.
///
/// The decoded value is cached by the published snapshot's md5, so repeated
/// reads between convergences decode once.
pub struct ConfigHandle<T: ConfigType> {
    subscription: Arc<ConfigSubscription>,
    cache: Mutex<Option<(String, Arc<T>)>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: ConfigType> ConfigHandle<T> {
    pub(crate) fn new(subscription: Arc<ConfigSubscription>) -> Self {
        Self {
            subscription,
            cache: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    /// Payload of the last convergence, decoded as `T`.
    ///
    /// Fails with [`DeserializationError::SchemaMismatch`] when the payload
    /// was produced for a different schema checksum than `T::DEF_MD5`.
    pub fn get_config(&self) -> Result<Arc<T>> {
        let snapshot = self.subscription.published()?.ok_or_else(|| Error::NotConverged {
            key: self.subscription.key().clone(),
        })?;

        if let Some(actual) = snapshot.value.def_md5() {
            if actual != T::DEF_MD5 {
                return Err(DeserializationError::SchemaMismatch {
                    def_name: T::DEF_NAME,
                    expected: T::DEF_MD5,
                    actual: actual.to_string(),
                }
                .into());
            }
        }

        let mut cache = self.cache.lock();
        if let Some((md5, config)) = cache.as_ref() {
            if *md5 == snapshot.state.md5 {
                return Ok(config.clone());
            }
        }

        let config = Arc::new(T::decode(&snapshot.value)?);
        trace!(key = %self.subscription.key(), md5 = %snapshot.state.md5, "decoded config");
        *cache = Some((snapshot.state.md5.clone(), config.clone()));
        Ok(config)
    }

    /// Whether the last convergence changed this payload's content
    pub fn is_changed(&self) -> Result<bool> {
        self.subscription.is_changed()
    }

    pub fn key(&self) -> &ConfigKey {
        self.subscription.key()
    }

    /// Generation of the payload `get_config` returns
    pub fn generation(&self) -> Result<Option<u64>> {
        Ok(self.subscription.published()?.map(|s| s.state.generation))
    }

    /// State of the payload `get_config` returns, `None` before the first
    /// convergence
    pub fn state(&self) -> Result<Option<ConfigState>> {
        Ok(self.subscription.published()?.map(|s| s.state.clone()))
    }

    /// Whether the converged payload must wait for a process restart before
    /// taking effect
    pub fn apply_on_restart(&self) -> Result<bool> {
        Ok(self.state()?.is_some_and(|s| s.apply_on_restart))
    }

    pub fn subscription(&self) -> &Arc<ConfigSubscription> {
        &self.subscription
    }
}

impl<T: ConfigType> std::fmt::Debug for ConfigHandle<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfigHandle").field("subscription", &self.subscription).finish()
    }
}
