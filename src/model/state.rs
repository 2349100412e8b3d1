/// Metadata describing one delivered snapshot.
///
/// `generation` is assigned by the authoritative source and is shared by every
/// definition it produced at the same point in time. For a fixed source it
/// never decreases. `md5` may repeat across generations when content did not
/// change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConfigState {
    pub generation: u64,
    pub md5: String,
    /// Must not take effect before the process restarts
    pub apply_on_restart: bool,
}

impl ConfigState {
    pub fn new(
        generation: u64,
        md5: impl Into<String>,
    ) -> Self {
        Self {
            generation,
            md5: md5.into(),
            apply_on_restart: false,
        }
    }

    pub fn with_apply_on_restart(
        mut self,
        apply_on_restart: bool,
    ) -> Self {
        self.apply_on_restart = apply_on_restart;
        self
    }

    /// Same generation and same content checksum
    pub fn is_same_snapshot(
        &self,
        other: &ConfigState,
    ) -> bool {
        self.generation == other.generation && self.md5 == other.md5
    }
}
