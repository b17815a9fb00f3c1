//! Configuration file discovery and loading
//!
//! Config files are optional. Resolution order for the file location:
//! 1. Explicit path (command-line argument or environment variable)
//! 2. User config: `~/.config/vidshield/<file_name>`
//! 3. System config: `/etc/vidshield/<file_name>` (Linux only)
//!
//! A missing file yields defaults with a warning; an unreadable or
//! unparsable file is an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration directory name under the platform config root
pub const CONFIG_DIR_NAME: &str = "vidshield";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Locate a config file by name in the user and system config directories
///
/// Returns `None` when no candidate exists.
pub fn find_config_file(file_name: &str) -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(file_name));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(file_name);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML config file, falling back to defaults when absent
///
/// # Arguments
/// * `explicit` - Path given on the command line or via environment; must exist if set
/// * `file_name` - File name searched for by [`find_config_file`] when no explicit path
///
/// # Returns
/// Parsed config, or `T::default()` when no file was found
pub fn load_toml_config<T>(explicit: Option<&Path>, file_name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match find_config_file(file_name) {
            Some(path) => path,
            None => {
                warn!(
                    "No {} found in config directories, using built-in defaults",
                    file_name
                );
                return Ok(T::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Configuration loaded from {}", path.display());
    Ok(config)
}
