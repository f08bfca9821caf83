//! Loader for plugins that run as a script subprocess

use crate::log_debug;
use crate::plugins::env::get_plugin_env_vars;
use crate::plugins::jsonrpc::plugin::JsonRpcPlugin;
use crate::plugins::jsonrpc::runtime::ScriptRuntime;
use crate::plugins::loader::PluginLoader;
use crate::plugins::metadata::PluginMetadata;
use crate::plugins::plugin::PluginPair;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a [`JsonRpcPlugin`] for every entry written in `R`'s language
///
/// Nothing is started here. The subprocess comes up on the plugin's first
/// call, which is its `init`.
pub struct JsonRpcPluginLoader<R: ScriptRuntime> {
    runtime: R,
    name: String,
    plugin_env: HashMap<String, String>,
}

impl<R: ScriptRuntime> JsonRpcPluginLoader<R> {
    /// `plugin_env` is the parsed `.plugins.env`; each plugin only sees the
    /// keys listed in its `env_vars`
    pub fn new(runtime: R, plugin_env: HashMap<String, String>) -> Self {
        Self {
            runtime,
            name: R::LANGUAGE.to_string(),
            plugin_env,
        }
    }
}

impl<R: ScriptRuntime> PluginLoader for JsonRpcPluginLoader<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_plugins(&self, metadatas: &[Arc<PluginMetadata>]) -> Vec<PluginPair> {
        metadatas
            .iter()
            .filter(|metadata| metadata.language == R::LANGUAGE)
            .map(|metadata| {
                let env = get_plugin_env_vars(&metadata.env_vars, &self.plugin_env);
                let command = self.runtime.command_for(metadata, env);
                log_debug!(
                    "Prepared {} plugin '{}' ({})",
                    self.name,
                    metadata.id,
                    metadata.execute_file_path().display()
                );
                let plugin = JsonRpcPlugin::new(Arc::clone(metadata), command);
                PluginPair::new(Arc::clone(metadata), Arc::new(plugin))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::jsonrpc::runtime::{NodeRuntime, PythonRuntime};
    use crate::plugins::metadata::tests::sample_metadata;
    use crate::plugins::metadata::{PluginLanguage, PluginType};
    use crate::plugins::plugin::InitState;

    fn metadata_list() -> Vec<Arc<PluginMetadata>> {
        let python = sample_metadata("wiki", PluginType::ThirdParty, "w");
        let mut node = sample_metadata("npm", PluginType::ThirdParty, "npm");
        node.language = PluginLanguage::Node;
        node.execute_file_name = "main.js".to_string();
        let mut native = sample_metadata("calc", PluginType::System, "*");
        native.language = PluginLanguage::Native;

        vec![Arc::new(python), Arc::new(node), Arc::new(native)]
    }

    #[test]
    fn test_loader_picks_its_language() {
        let metadatas = metadata_list();

        let python = JsonRpcPluginLoader::new(PythonRuntime::new(None), HashMap::new());
        let pairs = python.load_plugins(&metadatas);
        assert_eq!(python.name(), "python");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].id(), "wiki");
        assert_eq!(pairs[0].init_state(), InitState::Pending);

        let node = JsonRpcPluginLoader::new(NodeRuntime::new(None), HashMap::new());
        let pairs = node.load_plugins(&metadatas);
        assert_eq!(node.name(), "node");
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].id(), "npm");
    }

    #[test]
    fn test_loading_does_not_start_processes() {
        // A bogus interpreter only fails once a call is made
        let runtime = PythonRuntime::new(Some("/nonexistent/python".into()));
        let loader = JsonRpcPluginLoader::new(runtime, HashMap::new());
        assert_eq!(loader.load_plugins(&metadata_list()).len(), 1);
    }
}
