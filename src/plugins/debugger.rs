//! Single-slot plugin debugger toggle

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Directory of the one plugin currently under debugging, if any
///
/// Last write wins. The metadata source reads the slot on every load pass.
#[derive(Debug, Default)]
pub struct PluginDebugger {
    path: RwLock<Option<PathBuf>>,
}

impl PluginDebugger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        crate::log_notice!("Plugin debugger attached to {}", path.display());
        *self.path.write().unwrap_or_else(PoisonError::into_inner) = Some(path);
    }

    pub fn clear(&self) {
        if let Some(path) = self.path.write().unwrap_or_else(PoisonError::into_inner).take() {
            crate::log_notice!("Plugin debugger detached from {}", path.display());
        }
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.path.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let debugger = PluginDebugger::new();
        assert!(debugger.current().is_none());

        debugger.activate("/tmp/plugins/first");
        debugger.activate("/tmp/plugins/second");
        assert_eq!(debugger.current(), Some(PathBuf::from("/tmp/plugins/second")));

        debugger.clear();
        assert!(debugger.current().is_none());

        // Clearing an empty slot is fine
        debugger.clear();
        assert!(debugger.current().is_none());
    }
}
