use crate::ConfigState;
use crate::ConfigValue;

/// One delivery from a source to a holder.
///
/// `has_changed` is true iff the content checksum differs from the one the
/// same source delivered previously for the key (always true for the first
/// delivery).
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigUpdate {
    pub value: ConfigValue,
    pub state: ConfigState,
    pub has_changed: bool,
}

impl ConfigUpdate {
    pub fn new(
        value: ConfigValue,
        state: ConfigState,
        has_changed: bool,
    ) -> Self {
        Self {
            value,
            state,
            has_changed,
        }
    }

    pub fn generation(&self) -> u64 {
        self.state.generation
    }
}
