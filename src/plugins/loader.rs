//! Loader strategy shared by all plugin execution models
//!
//! A load pass hands the full metadata list to every configured loader in
//! order; each loader picks the entries it understands and returns the pairs
//! it managed to build.

use crate::config::InterpreterPaths;
use crate::plugins::jsonrpc::{JsonRpcPluginLoader, NodeRuntime, PythonRuntime};
use crate::plugins::metadata::PluginMetadata;
use crate::plugins::native::NativePluginLoader;
use crate::plugins::plugin::PluginPair;
use std::collections::HashMap;
use std::sync::Arc;

pub trait PluginLoader: Send + Sync {
    /// Short name used in log lines
    fn name(&self) -> &str;

    /// Build pairs for the entries this loader handles
    ///
    /// Entries that fail to load are logged and left out. An empty result is
    /// normal when nothing matches.
    fn load_plugins(&self, metadatas: &[Arc<PluginMetadata>]) -> Vec<PluginPair>;
}

/// The standard loader list: in-process modules first, then script runtimes
pub fn default_loaders(
    interpreters: &InterpreterPaths,
    plugin_env: HashMap<String, String>,
) -> Vec<Box<dyn PluginLoader>> {
    vec![
        Box::new(NativePluginLoader::new()),
        Box::new(JsonRpcPluginLoader::new(
            PythonRuntime::new(interpreters.python.clone()),
            plugin_env.clone(),
        )),
        Box::new(JsonRpcPluginLoader::new(
            NodeRuntime::new(interpreters.node.clone()),
            plugin_env,
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_loader_order() {
        let loaders = default_loaders(&InterpreterPaths::default(), HashMap::new());
        let names: Vec<_> = loaders.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["native", "python", "node"]);
    }

    #[test]
    fn test_loaders_tolerate_empty_metadata() {
        for loader in default_loaders(&InterpreterPaths::default(), HashMap::new()) {
            assert!(loader.load_plugins(&[]).is_empty());
        }
    }
}
