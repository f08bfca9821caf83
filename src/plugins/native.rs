//! In-process loader for plugins compiled as shared libraries
//!
//! A native plugin is a `cdylib` built against this crate that exports its
//! declaration with [`export_plugin!`]:
//!
//! ```rust,ignore
//! use launcher_plugin_host::export_plugin;
//! use launcher_plugin_host::plugins::native::PluginRegistrar;
//!
//! fn register(registrar: &mut dyn PluginRegistrar) {
//!     registrar.register_plugin(Box::new(Calculator::default()));
//! }
//!
//! export_plugin!(register);
//! ```
//!
//! The library must register exactly one plugin. Trait objects cross the
//! library boundary, so plugins have to be built with the same compiler and
//! the same version of this crate as the host.

use crate::core::Query;
use crate::plugins::error::{PluginError, PluginResult};
use crate::plugins::loader::PluginLoader;
use crate::plugins::metadata::{PluginLanguage, PluginMetadata};
use crate::plugins::plugin::{Plugin, PluginInitContext, PluginPair, ResultItem};
use crate::{log_debug, log_warn};
use libloading::Library;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

/// Version a plugin library must have been built against
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the static every plugin library exports
pub const PLUGIN_DECLARATION_SYMBOL: &[u8] = b"launcher_plugin_declaration\0";

/// Exported by every native plugin library
pub struct PluginDeclaration {
    pub core_version: &'static str,
    pub register: fn(&mut dyn PluginRegistrar),
}

/// Receives the plugin a library provides
pub trait PluginRegistrar {
    fn register_plugin(&mut self, plugin: Box<dyn Plugin>);
}

/// Export a plugin declaration from a `cdylib`
#[macro_export]
macro_rules! export_plugin {
    ($register:expr) => {
        #[doc(hidden)]
        #[allow(non_upper_case_globals)]
        #[unsafe(no_mangle)]
        pub static launcher_plugin_declaration: $crate::plugins::native::PluginDeclaration =
            $crate::plugins::native::PluginDeclaration {
                core_version: $crate::plugins::native::CORE_VERSION,
                register: $register,
            };
    };
}

#[derive(Default)]
struct CollectingRegistrar {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistrar for CollectingRegistrar {
    fn register_plugin(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }
}

/// A plugin instance together with the library its code lives in
struct NativePlugin {
    // Declared before the library so it is dropped while the code is still mapped
    plugin: Box<dyn Plugin>,
    _library: Library,
}

impl Plugin for NativePlugin {
    fn init(&self, context: &PluginInitContext) -> PluginResult<()> {
        self.plugin.init(context)
    }

    fn query(&self, query: &Query) -> PluginResult<Vec<ResultItem>> {
        self.plugin.query(query)
    }
}

/// Run a declaration's registration and return its single plugin
fn instantiate(declaration: &PluginDeclaration, path: &Path) -> PluginResult<Box<dyn Plugin>> {
    if declaration.core_version != CORE_VERSION {
        return Err(PluginError::module_load(
            path.display(),
            format!(
                "built against core {}, host is {}",
                declaration.core_version, CORE_VERSION
            ),
        ));
    }

    let mut registrar = CollectingRegistrar::default();
    catch_unwind(AssertUnwindSafe(|| (declaration.register)(&mut registrar)))
        .map_err(|_| PluginError::module_load(path.display(), "registration panicked"))?;

    let count = registrar.plugins.len();
    match registrar.plugins.pop() {
        Some(plugin) if count == 1 => Ok(plugin),
        None => Err(PluginError::module_load(path.display(), "no plugin registered")),
        Some(_) => Err(PluginError::module_load(
            path.display(),
            format!("{} plugins registered, expected exactly one", count),
        )),
    }
}

fn load_module(path: &Path) -> PluginResult<Box<dyn Plugin>> {
    // SAFETY: loading a library runs its initializers; plugin directories are
    // trusted the same way the host binary is.
    let library = unsafe { Library::new(path) }
        .map_err(|e| PluginError::module_load(path.display(), e.to_string()))?;

    // SAFETY: the symbol is the static written by `export_plugin!`, which has
    // the `PluginDeclaration` layout of this crate version (checked below).
    let declaration: &PluginDeclaration = unsafe {
        let symbol = library
            .get::<*const PluginDeclaration>(PLUGIN_DECLARATION_SYMBOL)
            .map_err(|e| {
                PluginError::module_load(path.display(), format!("missing plugin declaration: {}", e))
            })?;
        &**symbol
    };

    let plugin = instantiate(declaration, path)?;
    Ok(Box::new(NativePlugin {
        plugin,
        _library: library,
    }))
}

/// Loads `language = "native"` plugins into the host process
#[derive(Debug, Default)]
pub struct NativePluginLoader;

impl NativePluginLoader {
    pub fn new() -> Self {
        Self
    }
}

impl PluginLoader for NativePluginLoader {
    fn name(&self) -> &str {
        "native"
    }

    fn load_plugins(&self, metadatas: &[Arc<PluginMetadata>]) -> Vec<PluginPair> {
        let mut pairs = Vec::new();

        for metadata in metadatas.iter().filter(|m| m.language == PluginLanguage::Native) {
            let path = metadata.execute_file_path();
            match load_module(&path) {
                Ok(plugin) => {
                    log_debug!("Loaded native plugin '{}' from {:?}", metadata.id, path);
                    pairs.push(PluginPair::new(Arc::clone(metadata), Arc::from(plugin)));
                }
                Err(e) => {
                    log_warn!("Skipping plugin '{}': {}", metadata.id, e);
                }
            }
        }

        pairs
    }
}
