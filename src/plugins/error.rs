//! Error types for plugin loading and plugin calls

use thiserror::Error;

/// Failure local to one plugin
///
/// None of these ever escape the plugin they belong to: load failures drop the
/// plugin from the registry, init failures are recorded on its pair, and call
/// failures go back to whoever made that call.
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Failed to load plugin module {path}: {reason}")]
    ModuleLoad { path: String, reason: String },

    #[error("Plugin {0} is unavailable: {1}")]
    PluginUnavailable(String, String),

    #[error("Plugin {plugin} did not answer '{method}' within {seconds}s")]
    PluginTimeout {
        plugin: String,
        method: String,
        seconds: u64,
    },

    #[error("Plugin {0} failed to initialize: {1}")]
    PluginInitFault(String, String),

    #[error("Plugin {0} panicked: {1}")]
    Panicked(String, String),

    #[error("Plugin {plugin} returned an error for '{method}': {message}")]
    Remote {
        plugin: String,
        method: String,
        message: String,
    },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PluginResult<T> = Result<T, PluginError>;

impl PluginError {
    pub fn module_load(path: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::ModuleLoad {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(plugin: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PluginUnavailable(plugin.into(), reason.into())
    }

    /// Whether retrying the same call can ever succeed in this run
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::ModuleLoad { .. } | Self::PluginUnavailable(..) | Self::PluginInitFault(..)
        )
    }
}
