//! Configuration loading and root folder resolution
//!
//! Resolution order for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the service logs a warning and runs
//! on defaults. A config file that exists but does not parse is an error.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "REPDIR_CONFIG";
/// Environment variable naming the root folder (database location)
pub const ROOT_FOLDER_ENV_VAR: &str = "REPDIR_ROOT_FOLDER";
/// Environment variable carrying the OpenStates API key
pub const OPENSTATES_KEY_ENV_VAR: &str = "REPDIR_OPENSTATES_API_KEY";
/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "repdir.db";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub sync: SyncSection,
    pub sources: SourcesSection,
}

/// `[logging]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[sync]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Per-adapter timeout in seconds
    pub adapter_timeout_secs: u64,
    /// District identifiers longer than this are truncated
    pub max_district_len: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            adapter_timeout_secs: 30,
            max_district_len: 10,
        }
    }
}

/// `[sources]` section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    pub openstates: OpenStatesSection,
    pub county_roster: CountyRosterSection,
    pub static_roster: Vec<StaticRosterSection>,
}

/// `[sources.openstates]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenStatesSection {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub jurisdiction: String,
    /// State abbreviation stamped on every record from this source
    pub state: String,
    pub per_page: u32,
    pub requests_per_second: u32,
}

impl Default for OpenStatesSection {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: "https://v3.openstates.org".to_string(),
            jurisdiction: "ocd-jurisdiction/country:us/state:ny/government".to_string(),
            state: "NY".to_string(),
            per_page: 50,
            requests_per_second: 1,
        }
    }
}

/// `[sources.county_roster]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CountyRosterSection {
    pub enabled: bool,
    pub path: Option<PathBuf>,
    pub state: String,
}

impl Default for CountyRosterSection {
    fn default() -> Self {
        Self {
            enabled: false,
            path: None,
            state: "NY".to_string(),
        }
    }
}

/// `[[sources.static_roster]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct StaticRosterSection {
    /// Adapter name used in logs and provenance
    pub name: String,
    /// Source kind (e.g. "house_roster", "attorneys_general")
    pub kind: String,
    /// JSON file holding an array of raw records
    pub path: PathBuf,
}

/// Locate the TOML config file
///
/// Returns `None` when no file was requested and none exists at the default
/// location.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|path| path.exists())
}

/// Default config file location (`<config_dir>/repdir/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("repdir").join("config.toml"))
}

/// Load TOML configuration, degrading to defaults when the file is missing
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        info!("No config file found, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Resolve the root folder holding the database
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("repdir"))
        .unwrap_or_else(|| PathBuf::from("./repdir_data"))
}

/// Creates the root folder and hands out paths inside it
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create the root folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
            info!("Created root folder: {}", self.root_folder.display());
        }
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }
}

/// Resolve the OpenStates API key
///
/// **Priority:** ENV → TOML
pub fn resolve_openstates_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(OPENSTATES_KEY_ENV_VAR)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .sources
        .openstates
        .api_key
        .clone()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("OpenStates API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("OpenStates API key loaded from environment variable");
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("OpenStates API key loaded from TOML config");
        return Some(key);
    }

    None
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
