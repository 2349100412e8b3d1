use std::fmt;

use crate::ConfigType;

/// Identifies one configuration definition instance.
///
/// Structural equality: two keys are the same subscription target iff every
/// field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey {
    config_id: String,
    def_name: String,
    def_namespace: String,
    def_md5: String,
}

impl ConfigKey {
    pub fn new(
        config_id: impl Into<String>,
        def_name: impl Into<String>,
        def_namespace: impl Into<String>,
        def_md5: impl Into<String>,
    ) -> Self {
        Self {
            config_id: config_id.into(),
            def_name: def_name.into(),
            def_namespace: def_namespace.into(),
            def_md5: def_md5.into(),
        }
    }

    /// Key for the schema of `T` under `config_id`
    pub fn of<T: ConfigType>(config_id: impl Into<String>) -> Self {
        Self::new(config_id, T::DEF_NAME, T::DEF_NAMESPACE, T::DEF_MD5)
    }

    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    pub fn def_name(&self) -> &str {
        &self.def_name
    }

    pub fn def_namespace(&self) -> &str {
        &self.def_namespace
    }

    pub fn def_md5(&self) -> &str {
        &self.def_md5
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.def_namespace.is_empty() {
            write!(f, "{},{}", self.def_name, self.config_id)
        } else {
            write!(f, "{}.{},{}", self.def_namespace, self.def_name, self.config_id)
        }
    }
}
