//! Bootstrap configuration loading and root folder resolution
//!
//! Bootstrap settings live in a TOML file and cannot change while the
//! service runs. Runtime settings live in the database `settings` table
//! (see [`crate::db::settings`]).
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the root folder
pub const ROOT_FOLDER_ENV: &str = "TABULEIRO_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "tabuleiro.db";

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional in the file; a missing file yields
/// `TomlConfig::default()`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Root folder holding the database file
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// HTTP bind address
    #[serde(default)]
    pub bind_address: Option<String>,

    /// Open-id of the account promoted to admin on sign-in
    #[serde(default)]
    pub owner_open_id: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub mentor: MentorConfig,

    #[serde(default)]
    pub billing: BillingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

/// Grading oracle (Gemini) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MentorConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_mentor_model")]
    pub model: String,

    #[serde(default = "default_mentor_base_url")]
    pub base_url: String,

    #[serde(default = "default_mentor_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MentorConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_mentor_model(),
            base_url: default_mentor_base_url(),
            timeout_secs: default_mentor_timeout_secs(),
        }
    }
}

/// Payment provider (Stripe) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub secret_key: Option<String>,

    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Public URL of the front end, used for checkout redirects
    #[serde(default = "default_app_url")]
    pub app_url: String,

    /// One-time price in the smallest currency unit
    #[serde(default = "default_price_cents")]
    pub price_cents: i64,

    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            webhook_secret: None,
            app_url: default_app_url(),
            price_cents: default_price_cents(),
            currency: default_currency(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_mentor_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_mentor_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_mentor_timeout_secs() -> u64 {
    30
}

fn default_app_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_price_cents() -> i64 {
    19_700
}

fn default_currency() -> String {
    "brl".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load configuration, degrading to defaults when no file is usable
    ///
    /// An explicit path is tried first, then the platform config file.
    /// Missing or malformed files log a warning and never abort startup.
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_file(),
        };

        let Some(path) = path else {
            warn!("No config file found, using built-in defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} - using built-in defaults", e);
                Self::default()
            }
        }
    }
}

/// Root folder resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// Database file location for a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE)
}

/// Resolve a secret from environment or TOML
///
/// **Priority:** ENV → TOML. Blank values count as absent.
pub fn resolve_secret(env_var: &str, toml_value: Option<&str>, label: &str) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    match (env_value, toml_value) {
        (Some(env), Some(_)) => {
            warn!(
                "{} found in environment and TOML config. Using environment ({}).",
                label, env_var
            );
            Some(env)
        }
        (Some(env), None) => {
            info!("{} loaded from environment variable", label);
            Some(env)
        }
        (None, Some(toml)) => {
            info!("{} loaded from TOML config", label);
            Some(toml.to_string())
        }
        (None, None) => None,
    }
}

/// Validate a key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Platform config file, if one exists
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("tabuleiro").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tabuleiro/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tabuleiro"))
        .unwrap_or_else(|| PathBuf::from("./tabuleiro_data"))
}
