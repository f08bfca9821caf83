//! Plugin management core
//!
//! Plugins are discovered from `plugin.toml` files in the plugin directories
//! and loaded by one of several loaders depending on their `language`:
//!
//! - `native` - a shared library loaded into the host process, exporting its
//!   plugin with [`export_plugin!`](crate::export_plugin)
//! - `python`, `node` - a script run as a subprocess, spoken to with
//!   newline-delimited JSON-RPC over stdin/stdout
//!
//! # Plugin Structure
//!
//! ```toml
//! [plugin]
//! id = "2f4e8a1c"
//! name = "Web Search"
//! version = "1.0.0"
//! plugin_type = "thirdparty"
//! action_keyword = "g"
//! language = "python"
//! execute_file_name = "main.py"
//! env_vars = ["SEARCH_API_KEY"]
//! ```
//!
//! Every loaded plugin sits in the registry as a [`PluginPair`]. Its `init` is
//! run once per load pass on the blocking pool; queries wait for it.

pub mod debugger;
pub mod env;
pub mod error;
pub mod initializer;
pub mod jsonrpc;
pub mod loader;
pub mod manager;
pub mod metadata;
pub mod native;
pub mod plugin;
pub mod registry;

pub use error::{PluginError, PluginResult};
pub use initializer::{InitProgress, InitSummary};
pub use loader::{default_loaders, PluginLoader};
pub use manager::PluginManager;
pub use metadata::{PluginLanguage, PluginMetadata, PluginType};
pub use plugin::{InitState, Plugin, PluginInitContext, PluginPair, ResultItem};
pub use registry::PluginRegistry;
