//! Interpreters that script plugins run under

use crate::plugins::jsonrpc::client::ProcessCommand;
use crate::plugins::metadata::{PluginLanguage, PluginMetadata};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// One scripting language the remote-process loader can host
pub trait ScriptRuntime: Send + Sync + 'static {
    /// Metadata `language` value this runtime accepts
    const LANGUAGE: PluginLanguage;

    fn interpreter(&self) -> &Path;

    /// Arguments placed before the entry script
    fn interpreter_args(&self) -> Vec<OsString> {
        Vec::new()
    }

    /// Command line that runs `metadata`'s entry script from its directory
    fn command_for(&self, metadata: &PluginMetadata, env: HashMap<String, String>) -> ProcessCommand {
        let mut args = self.interpreter_args();
        args.push(metadata.execute_file_path().into_os_string());

        ProcessCommand {
            program: self.interpreter().to_path_buf(),
            args,
            working_dir: metadata.plugin_directory.clone(),
            env,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PythonRuntime {
    interpreter: PathBuf,
}

impl PythonRuntime {
    pub const DEFAULT_INTERPRETER: &'static str = if cfg!(windows) { "python" } else { "python3" };

    /// `None` uses the interpreter found on `PATH`
    pub fn new(interpreter: Option<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_INTERPRETER)),
        }
    }
}

impl ScriptRuntime for PythonRuntime {
    const LANGUAGE: PluginLanguage = PluginLanguage::Python;

    fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    fn interpreter_args(&self) -> Vec<OsString> {
        // Unbuffered stdout, otherwise responses sit in the pipe buffer
        vec!["-u".into()]
    }
}

#[derive(Debug, Clone)]
pub struct NodeRuntime {
    interpreter: PathBuf,
}

impl NodeRuntime {
    pub const DEFAULT_INTERPRETER: &'static str = "node";

    pub fn new(interpreter: Option<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.unwrap_or_else(|| PathBuf::from(Self::DEFAULT_INTERPRETER)),
        }
    }
}

impl ScriptRuntime for NodeRuntime {
    const LANGUAGE: PluginLanguage = PluginLanguage::Node;

    fn interpreter(&self) -> &Path {
        &self.interpreter
    }
}
