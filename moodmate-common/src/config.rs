//! Configuration loading and backend URL resolution
//!
//! Settings come from, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable (`API__URL`, then `MOODMATE_API_URL`)
//! 3. TOML config file
//! 4. Compiled default
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used. A config file that exists but cannot be
//! parsed is.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable used by existing MoodMate deployments
pub const API_URL_ENV: &str = "API__URL";
/// Alternative, namespaced environment variable
pub const MOODMATE_API_URL_ENV: &str = "MOODMATE_API_URL";

/// Compiled fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub backend_url: String,
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_upload_mb: u64,
    pub session_idle_minutes: u64,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:5000".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 8501,
            request_timeout_secs: 120,
            max_upload_mb: 200,
            session_idle_minutes: 60,
            log_level: "info".to_string(),
        }
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    CompiledDefaults::default().log_level
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub backend_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub request_timeout_secs: Option<u64>,
    pub max_upload_mb: Option<u64>,
    /// Minutes without a request before a browser session is dropped
    pub session_idle_minutes: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load from `path`, or from the platform default location when `None`
    ///
    /// Falls back to an empty config (all defaults) when the file is absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory; using compiled defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!("Config file not found at {}; using compiled defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::parse(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// `~/.config/moodmate/config.toml` (or the platform equivalent)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("moodmate").join("config.toml"))
}

/// Fully resolved settings used by the front end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub bind_address: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
    pub session_idle_minutes: u64,
    pub log_level: String,
}

impl Settings {
    /// Merge CLI overrides, environment and TOML over the compiled defaults
    pub fn resolve(
        cli_backend_url: Option<&str>,
        cli_port: Option<u16>,
        cli_bind: Option<&str>,
        toml: &TomlConfig,
    ) -> Result<Self> {
        let defaults = CompiledDefaults::default();
        let backend_url = resolve_backend_url(cli_backend_url, toml)?;
        let max_upload_mb = toml.max_upload_mb.unwrap_or(defaults.max_upload_mb);

        Ok(Self {
            backend_url,
            bind_address: cli_bind
                .map(str::to_string)
                .or_else(|| toml.bind_address.clone())
                .unwrap_or(defaults.bind_address),
            port: cli_port.or(toml.port).unwrap_or(defaults.port),
            request_timeout_secs: toml
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
            max_upload_bytes: usize::try_from(max_upload_mb.saturating_mul(1024 * 1024))
                .unwrap_or(usize::MAX),
            session_idle_minutes: toml
                .session_idle_minutes
                .unwrap_or(defaults.session_idle_minutes)
                .max(1),
            log_level: toml.logging.level.clone(),
        })
    }
}

/// Resolve the backend base URL
pub fn resolve_backend_url(cli_arg: Option<&str>, toml: &TomlConfig) -> Result<String> {
    // Priority 1: Command-line argument
    if let Some(url) = cli_arg {
        info!("Backend URL from command line");
        return validate_backend_url(url);
    }

    // Priority 2: Environment variables
    for var in [API_URL_ENV, MOODMATE_API_URL_ENV] {
        if let Ok(url) = std::env::var(var) {
            if !url.trim().is_empty() {
                info!("Backend URL from environment variable {}", var);
                return validate_backend_url(&url);
            }
        }
    }

    // Priority 3: TOML config file
    if let Some(url) = &toml.backend_url {
        info!("Backend URL from TOML config");
        return validate_backend_url(url);
    }

    // Priority 4: Compiled default
    Ok(CompiledDefaults::default().backend_url)
}

/// Require an http(s) URL and drop trailing slashes
pub fn validate_backend_url(url: &str) -> Result<String> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Backend URL must start with http:// or https://: {:?}",
            url
        )));
    }
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("//") || trimmed.ends_with(':') {
        return Err(Error::Config(format!("Backend URL has no host: {:?}", url)));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_backend_url() {
        assert_eq!(
            validate_backend_url("http://localhost:5000/").unwrap(),
            "http://localhost:5000"
        );
        assert_eq!(
            validate_backend_url(" https://api.example.com ").unwrap(),
            "https://api.example.com"
        );
        assert!(validate_backend_url("localhost:5000").is_err());
        assert!(validate_backend_url("http://").is_err());
        assert!(validate_backend_url("").is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = TomlConfig::parse("port = 9000\n[logging]\nlevel = \"debug\"\n").unwrap();
        assert_eq!(config.port, Some(9000));
        assert_eq!(config.logging.level, "debug");
        assert!(config.backend_url.is_none());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = TomlConfig::parse("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_empty_toml_uses_default_logging() {
        let config = TomlConfig::parse("").unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
