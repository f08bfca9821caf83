//! Plugin metadata and the directory scanner that produces it
//!
//! Each plugin lives in its own directory under one of the search roots:
//! - `plugin.toml` - Plugin metadata (`[plugin]` table)
//! - the entry file named by `execute_file_name` (shared library or script)

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata file expected in every plugin directory
pub const METADATA_FILE_NAME: &str = "plugin.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    System,
    #[serde(rename = "thirdparty", alias = "third_party")]
    ThirdParty,
}

/// How a plugin's entry file is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginLanguage {
    /// Shared library loaded into the host process
    Native,
    Python,
    Node,
}

impl std::fmt::Display for PluginLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PluginLanguage::Native => "native",
            PluginLanguage::Python => "python",
            PluginLanguage::Node => "node",
        };
        f.write_str(name)
    }
}

fn default_plugin_type() -> PluginType {
    PluginType::ThirdParty
}

fn default_timeout() -> u64 {
    10
}

/// Identity record of one discovered plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default = "default_plugin_type", alias = "plugin_type")]
    pub plugin_type: PluginType,
    /// Empty means the plugin claims no keyword
    #[serde(default, alias = "action_keyword")]
    pub action_keyword: String,
    pub language: PluginLanguage,
    #[serde(alias = "execute_file_name")]
    pub execute_file_name: String,
    #[serde(default, alias = "icon_path", skip_serializing_if = "Option::is_none")]
    pub icon_path: Option<String>,
    /// Bound on a single remote call, in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Host environment variables forwarded to script plugins
    #[serde(default, alias = "env_vars")]
    pub env_vars: Vec<String>,
    /// Directory the metadata was read from
    #[serde(default, alias = "plugin_directory")]
    pub plugin_directory: PathBuf,
}

impl PluginMetadata {
    pub fn execute_file_path(&self) -> PathBuf {
        self.plugin_directory.join(&self.execute_file_name)
    }

    /// Global plugins receive queries that no keyword claims
    pub fn is_global(&self) -> bool {
        self.action_keyword.is_empty() || self.action_keyword == crate::core::GLOBAL_ACTION_KEYWORD
    }
}

#[derive(Debug, Deserialize)]
struct MetadataFile {
    plugin: PluginMetadata,
}

/// Scan the search roots and return metadata in load order
///
/// Roots are visited in order and plugin directories inside a root are sorted
/// by name, so the result is stable between runs. A plugin under debugging
/// (`debugger`) is read on top of that and replaces any entry with its id.
/// Ids are unique in the result; later duplicates are dropped with a warning.
pub fn parse_plugin_directories(roots: &[PathBuf], debugger: Option<&Path>) -> Vec<PluginMetadata> {
    let mut metadatas = Vec::new();
    let mut seen = HashSet::new();

    for root in roots {
        let mut plugin_dirs = match fs::read_dir(root) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_dir())
                .collect::<Vec<_>>(),
            Err(e) => {
                crate::log_warn!("Failed to read plugin directory {:?}: {}", root, e);
                continue;
            }
        };
        plugin_dirs.sort();

        for dir in plugin_dirs {
            match read_plugin_directory(&dir) {
                Ok(metadata) => {
                    if !seen.insert(metadata.id.clone()) {
                        crate::log_warn!(
                            "Duplicate plugin id '{}' in {:?}, keeping the first one",
                            metadata.id,
                            dir
                        );
                        continue;
                    }
                    metadatas.push(metadata);
                }
                Err(e) => {
                    crate::log_warn!("Skipping plugin directory {:?}: {:#}", dir, e);
                }
            }
        }
    }

    if let Some(debug_dir) = debugger {
        match read_plugin_directory(debug_dir) {
            Ok(metadata) => {
                crate::log_notice!("Plugin '{}' is loaded from debugger path {:?}", metadata.id, debug_dir);
                match metadatas.iter_mut().find(|m| m.id == metadata.id) {
                    Some(existing) => *existing = metadata,
                    None => metadatas.push(metadata),
                }
            }
            Err(e) => {
                crate::log_warn!("Failed to read debugged plugin {:?}: {:#}", debug_dir, e);
            }
        }
    }

    metadatas
}

/// Read and validate the metadata of one plugin directory
pub fn read_plugin_directory(dir: &Path) -> anyhow::Result<PluginMetadata> {
    let meta_path = dir.join(METADATA_FILE_NAME);
    if !meta_path.exists() {
        return Err(anyhow::anyhow!("{} not found", METADATA_FILE_NAME));
    }

    let content = fs::read_to_string(&meta_path)
        .with_context(|| format!("Failed to read {}", METADATA_FILE_NAME))?;
    let mut metadata = parse_metadata(&content)?;
    metadata.plugin_directory = dir.to_path_buf();

    if !metadata.execute_file_path().exists() {
        return Err(anyhow::anyhow!(
            "Entry file {} not found",
            metadata.execute_file_name
        ));
    }

    Ok(metadata)
}

/// Parse `plugin.toml` content and check required fields
pub fn parse_metadata(content: &str) -> anyhow::Result<PluginMetadata> {
    let file: MetadataFile = toml::from_str(content)
        .with_context(|| format!("Failed to parse {}", METADATA_FILE_NAME))?;
    let metadata = file.plugin;

    if metadata.id.trim().is_empty() {
        return Err(anyhow::anyhow!("Plugin id cannot be empty"));
    }

    if metadata.name.trim().is_empty() {
        return Err(anyhow::anyhow!("Plugin name cannot be empty"));
    }

    if metadata.execute_file_name.trim().is_empty() {
        return Err(anyhow::anyhow!("Plugin execute_file_name cannot be empty"));
    }

    Ok(metadata)
}
