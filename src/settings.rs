use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::Settings;

/// Outcome of applying a settings snapshot, seen from the `enabled` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsTransition {
    Enabled,
    Disabled,
    Unchanged,
}

/// Settings value handed to the orchestrator and the pipeline at
/// construction. Updated only through [`SharedSettings::set`].
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<Settings>>,
}

impl SharedSettings {
    pub fn new(initial: Settings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn get(&self) -> Settings {
        *self.inner.read()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.read().enabled
    }

    pub fn set(&self, next: Settings) -> SettingsTransition {
        let mut current = self.inner.write();
        let transition = match (current.enabled, next.enabled) {
            (false, true) => SettingsTransition::Enabled,
            (true, false) => SettingsTransition::Disabled,
            _ => SettingsTransition::Unchanged,
        };
        *current = next;
        transition
    }
}
