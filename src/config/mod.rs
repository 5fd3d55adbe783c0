use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{DEFAULT_FACILITY_CATEGORY, DEFAULT_SEARCH_RADIUS_METERS};

/// Request timeout applied to both upstream services
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Nominatim's usage policy requires an identifying User-Agent with a contact
pub const DEFAULT_USER_AGENT: &str = concat!(
    "nearcare/",
    env!("CARGO_PKG_VERSION"),
    " (hospital locator; set api.user_agent to add your contact address)"
);

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

pub const DEFAULT_LOCATION: &str = "New York";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid config file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

fn default_radius() -> u32 {
    DEFAULT_SEARCH_RADIUS_METERS
}
fn default_category() -> String {
    DEFAULT_FACILITY_CATEGORY.to_string()
}

/// Settings read from `nearcare.toml`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_radius")]
    pub radius: u32,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub api: ApiConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            location: None,
            radius: default_radius(),
            category: default_category(),
            verbose: false,
            json: false,
            api: ApiConfig::default(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_nominatim_url() -> String {
    DEFAULT_NOMINATIM_URL.to_string()
}
fn default_overpass_url() -> String {
    DEFAULT_OVERPASS_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Upstream endpoints and the HTTP client settings shared by both services
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_nominatim_url")]
    pub nominatim_url: String,
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            nominatim_url: default_nominatim_url(),
            overpass_url: default_overpass_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl FileConfig {
    /// Load an explicitly requested config file. Missing or invalid is an error.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    /// Reject values that parse but would make every request fail
    fn validate(&self) -> Result<(), String> {
        // reqwest treats a zero timeout as "expire immediately"
        if self.api.timeout_secs == 0 {
            return Err("api.timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }

    /// Search the usual locations; the first file that parses wins
    pub fn load() -> Option<Self> {
        Self::load_from(&get_config_paths())
    }

    fn load_from(paths: &[PathBuf]) -> Option<Self> {
        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::from_path(path) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded config file");
                    return Some(config);
                }
                Err(e) => warn!("Skipping config file: {}", e),
            }
        }
        None
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("nearcare.toml"));
    paths.push(PathBuf::from(".nearcare.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("nearcare").join("config.toml"));
        paths.push(config_dir.join("nearcare.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".nearcare.toml"));
    }

    paths
}
