//! Plugin manager: directories, loaders, registry and debugger in one place
//!
//! A load pass (`init`) runs in this order:
//! 1. make sure every plugin directory exists (a root that can't be created is skipped)
//! 2. drop the pairs of the previous pass
//! 3. read metadata from the directories (plus the plugin under debugging)
//! 4. hand the metadata to each loader in turn and collect the pairs
//! 5. publish the pairs and schedule their `init` on the blocking pool
//!
//! `init` returns as soon as step 5 has been scheduled.

use crate::config::ensure_directories_exist;
use crate::core::{HttpProxy, PublicApi, Query};
use crate::plugins::debugger::PluginDebugger;
use crate::plugins::initializer::{initialize_plugins, InitProgress};
use crate::plugins::loader::PluginLoader;
use crate::plugins::metadata::{parse_plugin_directories, PluginMetadata};
use crate::plugins::plugin::{PluginPair, ResultItem};
use crate::plugins::registry::PluginRegistry;
use crate::{log_debug, log_info, log_notice, log_warn};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;

pub struct PluginManager {
    directories: Vec<PathBuf>,
    loaders: Vec<Box<dyn PluginLoader>>,
    registry: PluginRegistry,
    debugger: PluginDebugger,
    proxy: Arc<HttpProxy>,
    api: Arc<dyn PublicApi>,
    init_lock: Mutex<()>,
    handle: Handle,
}

impl PluginManager {
    /// `handle` is the runtime whose blocking pool runs plugin initialization
    pub fn new(
        directories: Vec<PathBuf>,
        loaders: Vec<Box<dyn PluginLoader>>,
        proxy: Arc<HttpProxy>,
        api: Arc<dyn PublicApi>,
        handle: Handle,
    ) -> Self {
        Self {
            directories,
            loaders,
            registry: PluginRegistry::new(),
            debugger: PluginDebugger::new(),
            proxy,
            api,
            init_lock: Mutex::new(()),
            handle,
        }
    }

    /// Run a load pass, replacing every previously loaded plugin
    ///
    /// Concurrent calls run one after the other.
    pub fn init(&self) -> InitProgress {
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let roots = ensure_directories_exist(&self.directories);
        self.registry.clear();

        let debugger = self.debugger.current();
        let metadatas: Vec<Arc<PluginMetadata>> =
            parse_plugin_directories(&roots, debugger.as_deref())
                .into_iter()
                .map(Arc::new)
                .collect();

        let mut pairs = Vec::with_capacity(metadatas.len());
        for loader in &self.loaders {
            let loaded = loader.load_plugins(&metadatas);
            log_debug!("Loader '{}' produced {} plugin(s)", loader.name(), loaded.len());
            pairs.extend(loaded);
        }

        log_info!(
            "Loaded {} plugin(s), skipped {}",
            pairs.len(),
            metadatas.len().saturating_sub(pairs.len())
        );

        self.registry.replace(pairs.clone());
        initialize_plugins(
            &pairs,
            Arc::clone(&self.proxy),
            Arc::clone(&self.api),
            &self.handle,
        )
    }

    pub fn all_plugins(&self) -> Vec<PluginPair> {
        self.registry.all_plugins()
    }

    pub fn get_plugin(&self, id: &str) -> Option<PluginPair> {
        self.registry.get_plugin(id)
    }

    pub fn hit_thirdparty_keyword(&self, query: &Query) -> bool {
        self.registry.hit_thirdparty_keyword(query)
    }

    pub fn plugins_for_query(&self, query: &Query) -> Vec<PluginPair> {
        self.registry.plugins_for_query(query)
    }

    /// Send `query` to every plugin that should answer it
    ///
    /// Plugins are asked concurrently; one that fails is logged and left out.
    /// Results come back best score first.
    pub async fn query(&self, query: &Query) -> Vec<ResultItem> {
        let targets = self.plugins_for_query(query);
        let answers = join_all(targets.iter().map(|pair| pair.query(query))).await;

        let mut results = Vec::new();
        for (pair, answer) in targets.iter().zip(answers) {
            match answer {
                Ok(items) => results.extend(items),
                Err(e) if e.is_permanent() => log_warn!("Plugin '{}' cannot answer: {}", pair.id(), e),
                Err(e) => log_notice!("Plugin '{}' query failed: {}", pair.id(), e),
            }
        }

        results.sort_by(|a, b| b.score.cmp(&a.score));
        results
    }

    /// Put the plugin in `path` under debugging from the next load pass on
    pub fn activate_plugin_debugger(&self, path: impl AsRef<Path>) {
        self.debugger.activate(path);
    }

    pub fn clear_plugin_debugger(&self) {
        self.debugger.clear();
    }

    pub fn plugin_debugger(&self) -> Option<PathBuf> {
        self.debugger.current()
    }

    /// Unload every plugin
    pub fn clear(&self) {
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.registry.clear();
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("directories", &self.directories)
            .field("loaders", &self.loaders.iter().map(|l| l.name()).collect::<Vec<_>>())
            .field("plugins", &self.registry)
            .field("debugger", &self.debugger.current())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LoggingApi;
    use crate::plugins::metadata::tests::write_plugin;
    use crate::plugins::metadata::PluginType;
    use crate::plugins::error::PluginResult;
    use crate::plugins::plugin::{InitState, Plugin, PluginInitContext};
    use crate::plugins::registry::tests::NoopPlugin;
    use std::fs;
    use std::sync::Barrier;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Loads every entry as a no-op plugin, except ids starting with "broken"
    struct FakeLoader;

    impl PluginLoader for FakeLoader {
        fn name(&self) -> &str {
            "fake"
        }

        fn load_plugins(&self, metadatas: &[Arc<PluginMetadata>]) -> Vec<PluginPair> {
            metadatas
                .iter()
                .filter(|m| !m.id.starts_with("broken"))
                .map(|m| PluginPair::new(Arc::clone(m), Arc::new(NoopPlugin)))
                .collect()
        }
    }

    struct EchoPlugin;

    impl Plugin for EchoPlugin {
        fn init(&self, _context: &PluginInitContext) -> PluginResult<()> {
            Ok(())
        }

        fn query(&self, query: &Query) -> PluginResult<Vec<ResultItem>> {
            Ok(vec![ResultItem {
                title: query.search.clone(),
                ..Default::default()
            }])
        }
    }

    struct EchoLoader;

    impl PluginLoader for EchoLoader {
        fn name(&self) -> &str {
            "echo"
        }

        fn load_plugins(&self, metadatas: &[Arc<PluginMetadata>]) -> Vec<PluginPair> {
            metadatas
                .iter()
                .map(|m| PluginPair::new(Arc::clone(m), Arc::new(EchoPlugin)))
                .collect()
        }
    }

    /// `init` blocks until the test meets it at the barrier
    struct GatedPlugin {
        gate: Arc<Barrier>,
    }

    impl Plugin for GatedPlugin {
        fn init(&self, _context: &PluginInitContext) -> PluginResult<()> {
            self.gate.wait();
            Ok(())
        }

        fn query(&self, _query: &Query) -> PluginResult<Vec<ResultItem>> {
            Ok(Vec::new())
        }
    }

    /// Gates plugins whose id starts with "slow", loads the rest as no-ops
    struct GatedLoader {
        gate: Arc<Barrier>,
    }

    impl PluginLoader for GatedLoader {
        fn name(&self) -> &str {
            "gated"
        }

        fn load_plugins(&self, metadatas: &[Arc<PluginMetadata>]) -> Vec<PluginPair> {
            metadatas
                .iter()
                .map(|m| {
                    let plugin: Arc<dyn Plugin> = if m.id.starts_with("slow") {
                        Arc::new(GatedPlugin {
                            gate: Arc::clone(&self.gate),
                        })
                    } else {
                        Arc::new(NoopPlugin)
                    };
                    PluginPair::new(Arc::clone(m), plugin)
                })
                .collect()
        }
    }

    fn manager(root: &Path) -> PluginManager {
        PluginManager::new(
            vec![root.join("Plugins")],
            vec![Box::new(FakeLoader)],
            Arc::new(HttpProxy::default()),
            Arc::new(LoggingApi),
            Handle::current(),
        )
    }

    fn ids(manager: &PluginManager) -> Vec<String> {
        manager.all_plugins().iter().map(|p| p.id().to_string()).collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_init_creates_directories_and_loads() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(temp_dir.path());

        let progress = manager.init();
        assert!(progress.is_empty());
        assert!(temp_dir.path().join("Plugins").is_dir());

        let root = temp_dir.path().join("Plugins");
        write_plugin(&root, "a", "alpha", "a");
        write_plugin(&root, "b", "broken-beta", "b");

        let summary = manager.init().wait().await;
        assert_eq!(summary.ready, vec!["alpha"]);
        assert_eq!(ids(&manager), vec!["alpha"]);

        let alpha = manager.get_plugin("alpha").unwrap();
        assert_eq!(alpha.init_state(), InitState::Ready);
        assert_eq!(alpha.metadata.plugin_type, PluginType::ThirdParty);
        assert!(manager.get_plugin("broken-beta").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_init_replaces_plugins() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Plugins");
        let first = write_plugin(&root, "one", "one", "1");
        write_plugin(&root, "two", "two", "2");

        let manager = manager(temp_dir.path());
        manager.init().wait().await;
        assert_eq!(ids(&manager), vec!["one", "two"]);

        fs::remove_dir_all(first).unwrap();
        write_plugin(&root, "three", "three", "3");
        manager.init().wait().await;

        assert_eq!(ids(&manager), vec!["three", "two"]);
        assert!(manager.get_plugin("one").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispatch_through_manager() {
        let temp_dir = TempDir::new().unwrap();
        write_plugin(&temp_dir.path().join("Plugins"), "google", "google", "g");

        let manager = manager(temp_dir.path());
        manager.init().wait().await;

        assert!(manager.hit_thirdparty_keyword(&Query::parse("g rust")));
        assert!(!manager.hit_thirdparty_keyword(&Query::parse("gg rust")));
        assert_eq!(manager.plugins_for_query(&Query::parse("g rust")).len(), 1);

        manager.clear();
        assert!(manager.all_plugins().is_empty());
        assert!(!manager.hit_thirdparty_keyword(&Query::parse("g rust")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_query_collects_answers() {
        let temp_dir = TempDir::new().unwrap();
        write_plugin(&temp_dir.path().join("Plugins"), "google", "google", "g");

        let manager = PluginManager::new(
            vec![temp_dir.path().join("Plugins")],
            vec![Box::new(EchoLoader)],
            Arc::new(HttpProxy::default()),
            Arc::new(LoggingApi),
            Handle::current(),
        );
        // Not waiting for init: the query does that itself
        let _progress = manager.init();

        let results = manager.query(&Query::parse("g rust")).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "rust");
        assert_eq!(results[0].plugin_id, "google");

        assert!(manager.query(&Query::parse("nothing here")).await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_debugged_plugin_replaces_installed_copy() {
        let temp_dir = TempDir::new().unwrap();
        write_plugin(&temp_dir.path().join("Plugins"), "google", "google", "g");
        let debug_dir = write_plugin(&temp_dir.path().join("dev"), "google", "google", "gd");

        let manager = manager(temp_dir.path());
        manager.activate_plugin_debugger(&debug_dir);
        assert_eq!(manager.plugin_debugger(), Some(debug_dir.clone()));
        manager.init().wait().await;

        let google = manager.get_plugin("google").unwrap();
        assert_eq!(google.metadata.action_keyword, "gd");
        assert_eq!(google.metadata.plugin_directory, debug_dir);
        assert_eq!(manager.all_plugins().len(), 1);

        manager.clear_plugin_debugger();
        manager.init().wait().await;
        assert_eq!(manager.get_plugin("google").unwrap().metadata.action_keyword, "g");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_uncreatable_root_does_not_stop_the_others() {
        let temp_dir = TempDir::new().unwrap();
        let bundled = temp_dir.path().join("bundled");
        fs::write(&bundled, "not a directory").unwrap();
        let user_root = temp_dir.path().join("user").join("Plugins");
        write_plugin(&user_root, "wiki", "wiki", "w");

        let manager = PluginManager::new(
            vec![bundled.join("Plugins"), user_root],
            vec![Box::new(FakeLoader)],
            Arc::new(HttpProxy::default()),
            Arc::new(LoggingApi),
            Handle::current(),
        );

        let summary = manager.init().wait().await;
        assert_eq!(summary.ready, vec!["wiki"]);
        assert_eq!(ids(&manager), vec!["wiki"]);

        // The next pass still drops what the previous one loaded
        fs::remove_dir_all(temp_dir.path().join("user").join("Plugins").join("wiki")).unwrap();
        manager.init().wait().await;
        assert!(manager.all_plugins().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_init_does_not_wait_for_slow_plugins() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Plugins");
        write_plugin(&root, "fast", "fast", "f");
        write_plugin(&root, "slow", "slow", "s");

        let gate = Arc::new(Barrier::new(2));
        let manager = PluginManager::new(
            vec![root],
            vec![Box::new(GatedLoader {
                gate: Arc::clone(&gate),
            })],
            Arc::new(HttpProxy::default()),
            Arc::new(LoggingApi),
            Handle::current(),
        );

        let progress = manager.init();
        let slow = manager.get_plugin("slow").unwrap();
        let fast = manager.get_plugin("fast").unwrap();
        assert_eq!(slow.init_state(), InitState::Pending);

        tokio::time::timeout(Duration::from_secs(5), fast.wait_until_initialized())
            .await
            .expect("fast plugin should not wait for the slow one")
            .unwrap();
        assert_eq!(fast.init_state(), InitState::Ready);
        assert_eq!(slow.init_state(), InitState::Pending);

        tokio::task::spawn_blocking(move || {
            gate.wait();
        })
        .await
        .unwrap();

        let summary = progress.wait().await;
        assert_eq!(summary.ready.len(), 2);
        assert!(summary.failed.is_empty());
        assert_eq!(slow.init_state(), InitState::Ready);
    }
}
