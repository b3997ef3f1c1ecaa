//! Application configuration for Frontdesk.
//!
//! User config lives at `~/.frontdesk/frontdesk.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FrontdeskError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "frontdesk.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".frontdesk";

// ---------------------------------------------------------------------------
// Config structs (matching frontdesk.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Agent behavior.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Serve-loop settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the database file. A leading `~` expands to the home directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.frontdesk/frontdesk.db".into()
}

impl StoreConfig {
    /// Resolve `db_path` to an absolute path, expanding a leading `~`.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        expand_home(&self.db_path)
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Age in seconds after which a pending request is swept to
    /// `unresolved_timeout`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Customer identity used when a session event does not carry one.
    #[serde(default = "default_customer_id")]
    pub default_customer_id: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            default_customer_id: default_customer_id(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}
fn default_customer_id() -> String {
    "cust_123".into()
}

impl AgentConfig {
    /// The configured timeout as a chrono duration.
    pub fn timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.timeout_secs as i64)
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the session listener binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Seconds between recurring timeout sweeps while serving.
    /// 0 disables the recurring sweep (the startup catch-up sweep always runs).
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:4620".into()
}
fn default_sweep_interval_secs() -> u64 {
    60
}

impl ServerConfig {
    /// The recurring sweep period, or `None` when disabled.
    pub fn sweep_interval(&self) -> Option<std::time::Duration> {
        match self.sweep_interval_secs {
            0 => None,
            secs => Some(std::time::Duration::from_secs(secs)),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.frontdesk/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| FrontdeskError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.frontdesk/frontdesk.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| FrontdeskError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| FrontdeskError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| FrontdeskError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| FrontdeskError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| FrontdeskError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| FrontdeskError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}
