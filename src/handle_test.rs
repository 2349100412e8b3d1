use std::sync::Arc;
use std::time::Duration;

use crate::source::Source;
use crate::test_utils::CounterConfig;
use crate::test_utils::MyConfig;
use crate::test_utils::MY_DEF_MD5;
use crate::ConfigHandle;
use crate::ConfigHolder;
use crate::ConfigKey;
use crate::ConfigState;
use crate::ConfigSubscription;
use crate::ConfigType;
use crate::ConfigUpdate;
use crate::ConfigValue;
use crate::DeserializationError;
use crate::Error;

/// Deliveries are put into the holder by the test itself
struct ManualSource {
    holder: Arc<ConfigHolder>,
}

impl Source for ManualSource {
    fn get_config(&mut self) {}

    fn reload(
        &mut self,
        _generation: u64,
    ) {
    }

    fn close(&mut self) {
        self.holder.cancel();
    }
}

fn setup<T: ConfigType>() -> (Arc<ConfigHolder>, Arc<ConfigSubscription>, ConfigHandle<T>) {
    let holder = Arc::new(ConfigHolder::new());
    let source = ManualSource { holder: holder.clone() };
    let subscription = Arc::new(ConfigSubscription::new(
        ConfigKey::of::<T>("test/handle"),
        Box::new(source),
        holder.clone(),
    ));
    let handle = ConfigHandle::new(subscription.clone());
    (holder, subscription, handle)
}

/// Stages and publishes `value` at `generation`
fn deliver(
    holder: &ConfigHolder,
    subscription: &ConfigSubscription,
    generation: u64,
    value: ConfigValue,
) {
    let md5 = value.md5();
    holder.put(ConfigUpdate::new(value, ConfigState::new(generation, md5), true));
    assert!(subscription.next_state(Duration::ZERO).unwrap());
    subscription.flip();
}

#[test]
fn test_get_config_before_convergence_fails() {
    let (_holder, _subscription, handle) = setup::<MyConfig>();

    assert!(matches!(handle.get_config(), Err(Error::NotConverged { .. })));
    assert_eq!(handle.generation().unwrap(), None);
}

#[test]
fn test_get_config_decodes_published_payload() {
    let (holder, subscription, handle) = setup::<MyConfig>();
    deliver(&holder, &subscription, 0, ConfigValue::from_text("myField \"foo\"\n"));

    let config = handle.get_config().unwrap();
    assert_eq!(config.my_field, "foo");
    assert_eq!(config.def_name(), "my");
    assert_eq!(handle.generation().unwrap(), Some(0));
    assert_eq!(handle.key().def_name(), "my");
}

#[test]
fn test_get_config_is_cached_until_content_changes() {
    let (holder, subscription, handle) = setup::<MyConfig>();
    deliver(&holder, &subscription, 1, ConfigValue::from_text("myField \"foo\""));

    let first = handle.get_config().unwrap();
    let second = handle.get_config().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    deliver(&holder, &subscription, 2, ConfigValue::from_text("myField \"bar\""));
    let third = handle.get_config().unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(third.my_field, "bar");
    assert!(handle.is_changed().unwrap());
}

#[test]
fn test_schema_mismatch_is_reported() {
    let (holder, subscription, handle) = setup::<MyConfig>();
    let value = ConfigValue::from_text("myField \"foo\"").with_def_md5("ffffffff");
    deliver(&holder, &subscription, 0, value);

    match handle.get_config() {
        Err(Error::Deserialization(DeserializationError::SchemaMismatch {
            def_name,
            expected,
            actual,
        })) => {
            assert_eq!(def_name, "my");
            assert_eq!(expected, MY_DEF_MD5);
            assert_eq!(actual, "ffffffff");
        }
        other => panic!("expected schema mismatch, got {other:?}"),
    }
}

#[test]
fn test_matching_schema_tag_decodes() {
    let (holder, subscription, handle) = setup::<MyConfig>();
    let value = ConfigValue::from_text("myField \"foo\"").with_def_md5(MY_DEF_MD5);
    deliver(&holder, &subscription, 0, value);

    assert_eq!(handle.get_config().unwrap().my_field, "foo");
}

#[test]
fn test_decode_errors_surface_from_get_config() {
    let (holder, subscription, handle) = setup::<CounterConfig>();
    deliver(&holder, &subscription, 0, ConfigValue::from_text("value abc"));

    assert!(matches!(
        handle.get_config(),
        Err(Error::Deserialization(DeserializationError::InvalidValue { .. }))
    ));

    deliver(&holder, &subscription, 1, ConfigValue::from_text("other 1"));
    assert!(matches!(
        handle.get_config(),
        Err(Error::Deserialization(DeserializationError::MissingField { .. }))
    ));
}

#[test]
fn test_handle_fails_after_cancel() {
    let (holder, subscription, handle) = setup::<MyConfig>();
    deliver(&holder, &subscription, 0, ConfigValue::from_text("myField \"foo\""));

    subscription.cancel();

    assert!(matches!(handle.get_config(), Err(Error::Cancelled { .. })));
    assert!(matches!(handle.is_changed(), Err(Error::Cancelled { .. })));
    assert!(matches!(handle.generation(), Err(Error::Cancelled { .. })));
}
