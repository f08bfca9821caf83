//! The plugin contract shared by every loader

use crate::core::{HttpProxy, PublicApi, Query};
use crate::plugins::error::{PluginError, PluginResult};
use crate::plugins::metadata::PluginMetadata;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// What every loaded plugin can do, wherever it runs
///
/// Calls may block (remote plugins wait on their subprocess), so the host only
/// invokes them from the blocking worker pool.
pub trait Plugin: Send + Sync {
    /// Called exactly once per load pass, before any other call
    fn init(&self, context: &PluginInitContext) -> PluginResult<()>;

    fn query(&self, query: &Query) -> PluginResult<Vec<ResultItem>>;
}

/// One entry of a plugin's answer to a query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub title: String,
    #[serde(default)]
    pub sub_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    #[serde(default)]
    pub score: i32,
    /// Filled in by the host with the answering plugin's id
    #[serde(default)]
    pub plugin_id: String,
}

/// Everything a plugin receives when it is initialized
///
/// Built fresh for each plugin; `proxy` and `api` are the same instances for
/// all of them.
#[derive(Clone)]
pub struct PluginInitContext {
    pub current_plugin_metadata: Arc<PluginMetadata>,
    pub proxy: Arc<HttpProxy>,
    pub api: Arc<dyn PublicApi>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitState {
    Pending,
    Ready,
    Failed(String),
}

/// A loaded plugin bound to its metadata
#[derive(Clone)]
pub struct PluginPair {
    pub metadata: Arc<PluginMetadata>,
    pub plugin: Arc<dyn Plugin>,
    state: Arc<watch::Sender<InitState>>,
}

impl PluginPair {
    pub fn new(metadata: Arc<PluginMetadata>, plugin: Arc<dyn Plugin>) -> Self {
        let (state, _) = watch::channel(InitState::Pending);
        Self {
            metadata,
            plugin,
            state: Arc::new(state),
        }
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn init_state(&self) -> InitState {
        self.state.borrow().clone()
    }

    pub(crate) fn set_init_state(&self, state: InitState) {
        self.state.send_replace(state);
    }

    /// Wait until this pair's `init` has finished, one way or the other
    ///
    /// Never returns for a pair whose initialization was not scheduled.
    pub async fn wait_until_initialized(&self) -> PluginResult<()> {
        let mut receiver = self.state.subscribe();
        let state = receiver
            .wait_for(|state| *state != InitState::Pending)
            .await
            .map_err(|_| PluginError::unavailable(self.id(), "plugin was unloaded"))?
            .clone();

        match state {
            InitState::Failed(reason) => Err(PluginError::PluginInitFault(self.id().to_string(), reason)),
            _ => Ok(()),
        }
    }

    /// Forward a query once initialization has completed
    pub async fn query(&self, query: &Query) -> PluginResult<Vec<ResultItem>> {
        self.wait_until_initialized().await?;

        let plugin = Arc::clone(&self.plugin);
        let owned_query = query.clone();
        let mut results = tokio::task::spawn_blocking(move || plugin.query(&owned_query))
            .await
            .map_err(|e| PluginError::Panicked(self.id().to_string(), e.to_string()))??;

        for result in &mut results {
            result.plugin_id = self.metadata.id.clone();
        }

        Ok(results)
    }
}

impl std::fmt::Debug for PluginPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginPair")
            .field("id", &self.metadata.id)
            .field("language", &self.metadata.language)
            .field("state", &self.init_state())
            .finish()
    }
}
