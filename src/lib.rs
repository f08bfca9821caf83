//! # Launcher Plugin Host
//!
//! Plugin management core for a launcher-style application:
//! - Plugin discovery from `plugin.toml` files in the plugin directories
//! - In-process plugins loaded from shared libraries
//! - Script plugins (Python, Node.js) run as subprocesses speaking JSON-RPC
//! - Concurrent, non-blocking plugin initialization
//! - Action keyword dispatch for third-party plugins
//!
//! ## Quick Start
//!
//! ```no_run
//! use launcher_plugin_host::config::{default_plugin_directories, InterpreterPaths};
//! use launcher_plugin_host::core::{HttpProxy, LoggingApi, Query};
//! use launcher_plugin_host::plugins::{default_loaders, PluginManager};
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = PluginManager::new(
//!         default_plugin_directories(),
//!         default_loaders(&InterpreterPaths::default(), HashMap::new()),
//!         Arc::new(HttpProxy::from_env()),
//!         Arc::new(LoggingApi),
//!         tokio::runtime::Handle::current(),
//!     );
//!
//!     manager.init().wait().await;
//!
//!     let query = Query::parse("g rust");
//!     if manager.hit_thirdparty_keyword(&query) {
//!         for result in manager.query(&query).await {
//!             println!("{} - {}", result.title, result.sub_title);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod plugins;

// Re-export commonly used types for convenience
pub use core::{HttpProxy, PublicApi, Query};
pub use plugins::{PluginManager, PluginMetadata, PluginPair, ResultItem};
