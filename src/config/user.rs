use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CreateError, Result};

/// User-level configuration loaded from `~/.config/ut-create/config.toml`.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    /// npm registry base URL used to locate templates.
    pub registry: Option<String>,
    /// Program invoked for version-control operations.
    pub git: Option<String>,
    #[serde(default)]
    pub form: FormConfig,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormConfig {
    /// `browser` or `terminal`.
    pub mode: Option<String>,
    /// Address the browser form listens on, e.g. `127.0.0.1:0`.
    pub bind: Option<String>,
    /// Whether to launch a browser for the form URL.
    pub open: Option<bool>,
}

/// Get the path to the user config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ut-create").join("config.toml"))
}

/// Load user configuration from the platform config directory.
///
/// Returns `Ok(None)` if the config file does not exist.
/// Returns `Err` if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<Option<UserConfig>> {
    match config_path() {
        Some(path) => load_from(&path),
        None => Ok(None),
    }
}

pub fn load_from(path: &Path) -> Result<Option<UserConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path).map_err(|e| CreateError::Io {
        context: format!("reading user config {}", path.display()),
        source: e,
    })?;

    let config = toml::from_str(&content).map_err(|e| CreateError::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(Some(config))
}
