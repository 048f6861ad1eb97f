//! Configuration models for matchfetch.
//!
//! All I^R (resolvable ignorance) is parameterized here.
//! The user resolves these unknowns at runtime via config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration for matchfetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Pagination, batching and throttle settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Checkpoint settings
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// CSV export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Remote service configuration.
///
/// B_i: The cookie bundle is valid for the session (might have expired).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Inline cookie string; supports ${ENV_VAR} expansion
    #[serde(default)]
    pub cookies: Option<String>,

    /// Environment variable holding the cookie string
    #[serde(default = "default_cookies_env")]
    pub cookies_env: String,

    /// File holding the cookie string
    #[serde(default = "default_cookie_file")]
    pub cookie_file: PathBuf,
}

fn default_base_url() -> String {
    "https://www.ancestry.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_cookies_env() -> String {
    "MATCHFETCH_COOKIES".to_string()
}

fn default_cookie_file() -> PathBuf {
    PathBuf::from("cookie.txt")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            cookies: None,
            cookies_env: default_cookies_env(),
            cookie_file: default_cookie_file(),
        }
    }
}

/// Pagination and enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Items requested per list page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Identifiers per enrichment batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Delay between pages and between batches, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_page_size() -> usize {
    100
}

fn default_batch_size() -> usize {
    24
}

fn default_delay_ms() -> u64 {
    2000
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            batch_size: default_batch_size(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl FetchConfig {
    /// Throttle interval as a duration.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Checkpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Path of the snapshot file
    #[serde(default = "default_checkpoint_path")]
    pub path: PathBuf,
}

fn default_checkpoint_path() -> PathBuf {
    PathBuf::from("progress.json")
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
        }
    }
}

/// CSV export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory receiving exported CSV files
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Anonymize identifiers and drop name, parent and cM columns
    #[serde(default)]
    pub privacy_mode: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            privacy_mode: false,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// B_i(file exists) → Result
    /// B_i(file is valid TOML) → Result
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_owned(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_owned(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.page_size == 0 {
            return Err(ConfigError::Invalid("fetch.page_size must be > 0".to_string()));
        }
        if self.fetch.batch_size == 0 {
            return Err(ConfigError::Invalid("fetch.batch_size must be > 0".to_string()));
        }
        Ok(())
    }

    /// Resolve the cookie string from config, environment, or cookie file.
    ///
    /// B_i(cookies available) → Result
    pub fn resolve_cookies(&self) -> Result<String, ConfigError> {
        if let Some(cookies) = &self.service.cookies {
            return Ok(expand_env_vars(cookies));
        }

        if let Ok(cookies) = std::env::var(&self.service.cookies_env) {
            if !cookies.trim().is_empty() {
                return Ok(cookies);
            }
        }

        let path = &self.service.cookie_file;
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(_) => Err(ConfigError::MissingCookies {
                env_var: self.service.cookies_env.clone(),
                path: path.clone(),
            }),
        }
    }
}

/// Expand environment variables in a string.
///
/// Supports ${VAR_NAME} syntax.
/// If the variable is not set, the placeholder is left unchanged.
pub fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let Ok(re) = regex::Regex::new(r"\$\{([^}]+)\}") else {
        return result;
    };

    for cap in re.captures_iter(s) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

/// Configuration errors.
///
/// Epistemic origin:
/// - B_i falsified: File not found, parse error
/// - I^B materialized: Missing required values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing cookies: set service.cookies, the {env_var} env var, or create {path}")]
    MissingCookies { env_var: String, path: PathBuf },
}
