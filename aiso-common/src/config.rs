//! Configuration loading and root folder resolution
//!
//! Three configuration sources are handled here:
//! - the service TOML file (`config.toml`): provider keys, models, timeouts, logging
//! - the setup JSON file (`setup-config.json`) written by first-run onboarding
//! - the root (data) folder that holds the sample database and the JSON files
//!
//! Missing or unreadable configuration is never fatal: callers get defaults and a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Directory name used under the OS config/data directories
pub const APP_DIR_NAME: &str = "ai-sample-organizer";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "AISO_ROOT_FOLDER";

const DATABASE_FILE: &str = "samples.db";
const SETUP_CONFIG_FILE: &str = "setup-config.json";
const CUSTOM_TAGS_FILE: &str = "custom-tags.json";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file `root_folder`
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(root_folder) = &toml_config.root_folder {
        return PathBuf::from(root_folder);
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/ai-sample-organizer
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/var/lib").join(APP_DIR_NAME))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/ai-sample-organizer
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support").join(APP_DIR_NAME))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\ai-sample-organizer
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData").join(APP_DIR_NAME))
    } else {
        PathBuf::from("./aiso_data")
    }
}

/// Default location of the service TOML config (`~/.config/ai-sample-organizer/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// Files living inside the resolved root folder
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            debug!(root = %self.root.display(), "Created root folder");
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn setup_config_path(&self) -> PathBuf {
        self.root.join(SETUP_CONFIG_FILE)
    }

    pub fn custom_tags_path(&self) -> PathBuf {
        self.root.join(CUSTOM_TAGS_FILE)
    }
}

// ============================================================================
// Service TOML configuration
// ============================================================================

/// Service configuration loaded from `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder override
    #[serde(default)]
    pub root_folder: Option<String>,

    /// HTTP port override
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub openai: ProviderConfig,

    #[serde(default)]
    pub anthropic: ProviderConfig,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing directive, e.g. "info" or "aiso_ai=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Provider-independent AI pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Upper bound on a single provider request
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Per-provider request quota
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Files above this size are rejected before parsing
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            requests_per_minute: default_requests_per_minute(),
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_max_file_size_mb() -> u64 {
    100
}

/// Per-provider section (`[openai]`, `[anthropic]`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model override; the client picks its own default when absent
    #[serde(default)]
    pub model: Option<String>,

    /// API base URL override (used for proxies and tests)
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Load the TOML config from `path`
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the TOML config, falling back to defaults when it is missing or invalid
pub fn load_toml_config_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        return TomlConfig::default();
    };

    if !path.exists() {
        debug!(path = %path.display(), "No TOML config file, using defaults");
        return TomlConfig::default();
    }

    match load_toml_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

// ============================================================================
// Setup (onboarding) configuration
// ============================================================================

/// First-run onboarding state persisted as JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupConfig {
    #[serde(default)]
    pub setup_completed: bool,

    /// Folder the user picked for their sample library
    #[serde(default)]
    pub samples_path: Option<String>,

    #[serde(default = "default_theme")]
    pub theme: String,

    #[serde(default)]
    pub setup_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            setup_completed: false,
            samples_path: None,
            theme: default_theme(),
            setup_date: None,
        }
    }
}

fn default_theme() -> String {
    "neon".to_string()
}

/// Read the setup config; missing or unreadable files yield the defaults
pub fn load_setup_config(path: &Path) -> SetupConfig {
    if !path.exists() {
        return SetupConfig::default();
    }

    let parsed = std::fs::read_to_string(path)
        .map_err(Error::from)
        .and_then(|content| serde_json::from_str::<SetupConfig>(&content).map_err(Error::from));

    match parsed {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Error reading setup config, using defaults");
            SetupConfig::default()
        }
    }
}

/// Write the setup config as pretty-printed JSON, creating the parent folder
pub fn save_setup_config(path: &Path, config: &SetupConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}
