use crate::config::GitVersionConfiguration;
use crate::error::{GitverError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAMES: [&str; 2] = ["gitver.toml", ".gitver.toml"];

/// Locate the configuration file to use, if any
///
/// Lookup order:
/// 1. Explicit path (must exist)
/// 2. `gitver.toml` or `.gitver.toml` in `working_dir`
/// 3. `gitver/gitver.toml` in the user config directory
pub fn find_configuration_file(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(GitverError::config(format!(
                "Configuration file '{}' does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    for name in CONFIG_FILE_NAMES {
        let candidate = working_dir.join(name);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let candidate = config_dir.join("gitver").join("gitver.toml");
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }

    Ok(None)
}

/// Load the override layer from disk; `None` when no file is found
pub fn load_configuration(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> Result<Option<GitVersionConfiguration>> {
    let Some(path) = find_configuration_file(explicit, working_dir)? else {
        return Ok(None);
    };

    tracing::debug!(path = %path.display(), "Loading configuration");
    let content = fs::read_to_string(&path)?;
    let configuration: GitVersionConfiguration = toml::from_str(&content).map_err(|e| {
        GitverError::config(format!("Failed to parse '{}': {}", path.display(), e))
    })?;
    Ok(Some(configuration))
}
