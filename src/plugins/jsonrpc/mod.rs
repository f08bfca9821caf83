//! Remote-process plugins speaking JSON-RPC over stdin/stdout

pub mod client;
pub mod loader;
pub mod plugin;
pub mod protocol;
pub mod runtime;

pub use client::{ProcessCommand, RpcClient};
pub use loader::JsonRpcPluginLoader;
pub use plugin::JsonRpcPlugin;
pub use runtime::{NodeRuntime, PythonRuntime, ScriptRuntime};
