//! Environment variables handed to script plugins
//!
//! The host reads `.plugins.env` from its user data directory once, and each
//! script plugin gets only the variables its metadata asks for in `env_vars`.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// File name looked up in the user data directory
pub const PLUGIN_ENV_FILE: &str = ".plugins.env";

/// Load environment variables from a `.plugins.env` file
///
/// KEY=VALUE, one per line. Lines starting with # are comments, values may be
/// wrapped in single or double quotes. A missing file yields an empty map.
pub fn load_env_file(env_path: &Path) -> Result<HashMap<String, String>> {
    if !env_path.exists() {
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(env_path)
        .with_context(|| format!("Failed to read {}", env_path.display()))?;

    Ok(parse_env(&content))
}

fn parse_env(content: &str) -> HashMap<String, String> {
    let mut env_vars = HashMap::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            crate::log_warn!(
                "{} line {} has invalid format: {}",
                PLUGIN_ENV_FILE,
                line_num + 1,
                line
            );
            continue;
        };

        let key = key.trim();
        let value = value.trim();
        let value = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            value
        };

        if !key.is_empty() {
            env_vars.insert(key.to_string(), value.to_string());
        }
    }

    env_vars
}

/// Pick the variables a plugin asked for that are actually defined
pub fn get_plugin_env_vars(
    requested_vars: &[String],
    env_vars: &HashMap<String, String>,
) -> HashMap<String, String> {
    requested_vars
        .iter()
        .filter_map(|name| env_vars.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_env_file() {
        let temp_dir = TempDir::new().unwrap();
        let env_path = temp_dir.path().join(PLUGIN_ENV_FILE);

        let mut file = fs::File::create(&env_path).unwrap();
        writeln!(file, "# Test environment file").unwrap();
        writeln!(file, "API_KEY=test_key_123").unwrap();
        writeln!(file, "QUOTED=\"with spaces\"").unwrap();
        writeln!(file, "SINGLE='x=y'").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "garbage line").unwrap();
        writeln!(file, "BASE_URL=https://api.example.com").unwrap();

        let env_vars = load_env_file(&env_path).unwrap();
        assert_eq!(env_vars.len(), 4);
        assert_eq!(env_vars["API_KEY"], "test_key_123");
        assert_eq!(env_vars["QUOTED"], "with spaces");
        assert_eq!(env_vars["SINGLE"], "x=y");
        assert_eq!(env_vars["BASE_URL"], "https://api.example.com");
    }

    #[test]
    fn test_missing_env_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let env_vars = load_env_file(&temp_dir.path().join(PLUGIN_ENV_FILE)).unwrap();
        assert!(env_vars.is_empty());
    }

    #[test]
    fn test_get_plugin_env_vars() {
        let mut env_vars = HashMap::new();
        env_vars.insert("API_KEY".to_string(), "test_key".to_string());
        env_vars.insert("SECRET".to_string(), "secret".to_string());
        env_vars.insert("UNUSED".to_string(), "value".to_string());

        let requested = vec!["API_KEY".to_string(), "SECRET".to_string(), "ABSENT".to_string()];
        let plugin_env = get_plugin_env_vars(&requested, &env_vars);

        assert_eq!(plugin_env.len(), 2);
        assert_eq!(plugin_env.get("API_KEY"), Some(&"test_key".to_string()));
        assert_eq!(plugin_env.get("SECRET"), Some(&"secret".to_string()));
        assert_eq!(plugin_env.get("UNUSED"), None);
    }
}
