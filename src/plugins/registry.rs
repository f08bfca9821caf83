//! Plugin registry for the pairs of the last load pass
//!
//! The registry owns the authoritative list of loaded pairs. It is written
//! only by the manager during a load pass and read by everyone else; lookups
//! hand out cloned pairs so no lock is held while a plugin runs.

use crate::core::Query;
use crate::plugins::metadata::PluginType;
use crate::plugins::plugin::PluginPair;
use std::sync::{PoisonError, RwLock, RwLockReadGuard};

#[derive(Default)]
pub struct PluginRegistry {
    pairs: RwLock<Vec<PluginPair>>,
}

impl PluginRegistry {
    /// Create a new empty plugin registry
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<PluginPair>> {
        self.pairs.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap in the pairs of a new load pass, dropping the previous ones
    pub fn replace(&self, pairs: Vec<PluginPair>) {
        let mut slot = self.pairs.write().unwrap_or_else(PoisonError::into_inner);
        *slot = pairs;
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    /// Snapshot of every loaded pair, in load order
    pub fn all_plugins(&self) -> Vec<PluginPair> {
        self.read().clone()
    }

    /// First pair whose metadata id is `id`
    pub fn get_plugin(&self, id: &str) -> Option<PluginPair> {
        self.read().iter().find(|pair| pair.metadata.id == id).cloned()
    }

    /// Whether a third-party plugin owns the query's action keyword
    ///
    /// A query without an action token never hits. Keywords are compared as
    /// given; normalizing them is up to whoever writes the metadata.
    pub fn hit_thirdparty_keyword(&self, query: &Query) -> bool {
        if !query.has_action() {
            return false;
        }

        self.read().iter().any(|pair| owns_keyword(pair, query))
    }

    /// Pairs a query should be sent to
    ///
    /// Third-party owners of the action keyword when there are any, otherwise
    /// every global plugin.
    pub fn plugins_for_query(&self, query: &Query) -> Vec<PluginPair> {
        let pairs = self.read();

        if query.has_action() && pairs.iter().any(|pair| owns_keyword(pair, query)) {
            return pairs.iter().filter(|pair| owns_keyword(pair, query)).cloned().collect();
        }

        pairs.iter().filter(|pair| pair.metadata.is_global()).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

fn owns_keyword(pair: &PluginPair, query: &Query) -> bool {
    pair.metadata.plugin_type == PluginType::ThirdParty && pair.metadata.action_keyword == query.action_name
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.read().iter()).finish()
    }
}
