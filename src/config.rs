use anyhow::Context;
use clap::Parser;
use once_cell::sync::Lazy;
use std::fs;
use std::path::{Path, PathBuf};

// Plugin search directories
pub const PLUGINS_DIR_NAME: &str = "Plugins";
pub const USER_DATA_DIR_NAME: &str = ".launcher";

// Runtime defaults
pub const DEFAULT_MAX_BLOCKING_THREADS: usize = 64;

/// Per-user data directory (`~/.launcher`), falling back to the working directory
pub static USER_DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(USER_DATA_DIR_NAME)
});

/// Plugins shipped next to the executable
static BUNDLED_PLUGINS_DIR: Lazy<Option<PathBuf>> = Lazy::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(PLUGINS_DIR_NAME)))
});

pub fn user_data_dir() -> &'static Path {
    &USER_DATA_DIR
}

/// Search roots in load order: bundled plugins, then the user's own
pub fn default_plugin_directories() -> Vec<PathBuf> {
    let mut directories = Vec::new();
    if let Some(bundled) = BUNDLED_PLUGINS_DIR.as_ref() {
        directories.push(bundled.clone());
    }
    directories.push(USER_DATA_DIR.join(PLUGINS_DIR_NAME));
    directories
}

/// Create every missing directory in `directories`
///
/// A root that cannot be created is logged and left out; the others are
/// returned in their original order.
pub fn ensure_directories_exist(directories: &[PathBuf]) -> Vec<PathBuf> {
    let mut usable = Vec::with_capacity(directories.len());
    for dir in directories {
        if !dir.is_dir() {
            crate::log_info!("Creating plugin directory {}", dir.display());
            let created = fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create plugin directory {}", dir.display()));
            if let Err(e) = created {
                crate::log_warn!("Skipping plugin root: {:#}", e);
                continue;
            }
        }
        usable.push(dir.clone());
    }
    usable
}

/// Interpreter overrides for script plugins; `None` means look up `PATH`
#[derive(Debug, Clone, Default)]
pub struct InterpreterPaths {
    pub python: Option<PathBuf>,
    pub node: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Launcher plugin host")]
pub struct Cli {
    /// Additional plugin directory (may be repeated)
    #[arg(long = "plugin-dir", value_name = "DIR")]
    pub plugin_dirs: Vec<PathBuf>,

    /// Load the plugin in this directory in place of the installed copy
    #[arg(long, value_name = "DIR")]
    pub debug_plugin: Option<PathBuf>,

    /// Python interpreter for python plugins
    #[arg(long, value_name = "PATH")]
    pub python: Option<PathBuf>,

    /// Node.js interpreter for node plugins
    #[arg(long, value_name = "PATH")]
    pub node: Option<PathBuf>,

    /// Async worker threads (default: one per core)
    #[arg(long)]
    pub worker_threads: Option<usize>,

    /// Upper bound of the blocking pool that runs plugin calls
    #[arg(long, default_value_t = DEFAULT_MAX_BLOCKING_THREADS)]
    pub max_blocking_threads: usize,

    /// Print every loaded plugin and exit
    #[arg(long)]
    pub list: bool,

    /// Dispatch one query and print the results
    #[arg(short, long, value_name = "TEXT")]
    pub query: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    pub debug: bool,

    /// Write journald-formatted log lines
    #[arg(long)]
    pub journald: bool,
}

impl Cli {
    pub fn interpreters(&self) -> InterpreterPaths {
        InterpreterPaths {
            python: self.python.clone(),
            node: self.node.clone(),
        }
    }

    /// Default search roots followed by any `--plugin-dir`
    pub fn plugin_directories(&self) -> Vec<PathBuf> {
        let mut directories = default_plugin_directories();
        for dir in &self.plugin_dirs {
            if !directories.contains(dir) {
                directories.push(dir.clone());
            }
        }
        directories
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_directories_end_with_user_plugins() {
        let directories = default_plugin_directories();
        assert!(!directories.is_empty());
        assert_eq!(
            directories.last(),
            Some(&user_data_dir().join(PLUGINS_DIR_NAME))
        );
        assert!(directories.iter().all(|d| d.ends_with(PLUGINS_DIR_NAME)));
    }

    #[test]
    fn test_ensure_directories_exist() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join(PLUGINS_DIR_NAME);
        let existing = temp_dir.path().to_path_buf();

        let usable = ensure_directories_exist(&[existing.clone(), nested.clone()]);
        assert_eq!(usable, vec![existing, nested.clone()]);
        assert!(nested.is_dir());
    }

    #[test]
    fn test_uncreatable_directory_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("bundled");
        fs::write(&file, "not a directory").unwrap();
        let blocked = file.join(PLUGINS_DIR_NAME);
        let user = temp_dir.path().join("user").join(PLUGINS_DIR_NAME);

        let usable = ensure_directories_exist(&[blocked, user.clone()]);
        assert_eq!(usable, vec![user.clone()]);
        assert!(user.is_dir());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "launcher-plugin-host",
            "--plugin-dir",
            "/opt/plugins",
            "--plugin-dir",
            "/opt/plugins",
            "--python",
            "/usr/bin/python3.12",
            "--query",
            "g rust",
            "--debug",
        ]);

        assert_eq!(cli.query.as_deref(), Some("g rust"));
        assert!(cli.debug);
        assert!(!cli.list);
        assert_eq!(cli.max_blocking_threads, DEFAULT_MAX_BLOCKING_THREADS);
        assert_eq!(cli.interpreters().python, Some(PathBuf::from("/usr/bin/python3.12")));
        assert!(cli.interpreters().node.is_none());

        let directories = cli.plugin_directories();
        assert_eq!(directories.last(), Some(&PathBuf::from("/opt/plugins")));
        assert_eq!(
            directories.iter().filter(|d| d.as_path() == Path::new("/opt/plugins")).count(),
            1
        );
    }
}
