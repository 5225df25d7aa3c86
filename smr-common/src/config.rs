//! Configuration loading and config file resolution
//!
//! Config file discovery follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory
//! 4. System-wide config (Linux only)
//!
//! A missing or unreadable file never aborts startup: callers get the
//! compiled defaults and a warning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SMR_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct TomlConfig {
    /// Path to the local media library database (opened read-only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_database: Option<PathBuf>,

    /// Base URL of the library's GraphQL query endpoint (tried before the database)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_endpoint: Option<String>,

    /// API key sent to the query endpoint in the `ApiKey` header
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_api_key: Option<String>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Matching threshold overrides
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Remote search sources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceConfig>,
}

impl TomlConfig {
    /// Look up a configured source by name (case-insensitive)
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
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

fn default_log_level() -> String {
    "info".to_string()
}

/// Matching threshold overrides
///
/// Every field is optional; unset values fall back to the engine's
/// compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct MatchingConfig {
    /// Duration tolerance for free-text queries (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_tolerance_secs: Option<u64>,

    /// Duration tolerance for identifier queries (seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_duration_tolerance_secs: Option<u64>,

    /// Accepted file size deviation, in percent of the local size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_tolerance_percent: Option<f64>,

    /// Minimum title ratio for federated scene lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federated_min_ratio: Option<f64>,

    /// Minimum name ratio for federated performer lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performer_min_ratio: Option<f64>,

    /// Number of sub-source queries allowed in flight at once
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federated_concurrency: Option<usize>,
}

/// One remote search source reachable over HTTP/JSON
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SourceConfig {
    /// Source name used on the command line
    pub name: String,

    /// Free-text search URL template (`{query}`, optional `{site}`)
    pub search_url: String,

    /// Identifier lookup URL template (`{id}`, optional `{site}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_url: Option<String>,

    /// JSON pointer to the array of hits (empty = document root)
    #[serde(default)]
    pub hits_pointer: String,

    /// Independently indexed sub-sources sharing this API
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_sources: Vec<String>,

    /// Minimum interval between two requests (milliseconds)
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// JSON pointers for candidate fields inside one hit
    #[serde(default)]
    pub fields: FieldMapConfig,

    /// Extra request headers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_timeout_secs() -> u64 {
    10
}

/// JSON pointers locating candidate fields inside one hit
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FieldMapConfig {
    pub id: String,
    pub title: String,
    pub url_slug: String,
    pub duration: String,
    pub sizes_by_quality: String,
    pub generic_size: String,
    pub site_name: String,
    pub network_name: String,
}

impl Default for FieldMapConfig {
    fn default() -> Self {
        Self {
            id: "/id".to_string(),
            title: "/title".to_string(),
            url_slug: "/url_title".to_string(),
            duration: "/length".to_string(),
            sizes_by_quality: "/download_file_sizes".to_string(),
            generic_size: "/index_size".to_string(),
            site_name: "/sitename".to_string(),
            network_name: "/network_name".to_string(),
        }
    }
}

/// Resolve the config file path
///
/// Returns `None` when no candidate location holds a file; the CLI argument
/// and environment variable are returned even if the file does not exist so
/// that the caller can report the bad path.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Per-user config directory
    if let Some(path) = user_config_path() {
        if path.exists() {
            return Some(path);
        }
    }

    // Priority 4: System-wide config
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/smr/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Per-user config file location (`<config_dir>/smr/config.toml`)
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("smr").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load config, degrading to defaults when the file is missing or broken
pub fn load_or_default(path: Option<&Path>) -> TomlConfig {
    let Some(path) = path else {
        debug!("No config file found, using compiled defaults");
        return TomlConfig::default();
    };

    match load_toml_config(path) {
        Ok(config) => {
            debug!(path = %path.display(), "Loaded config file");
            config
        }
        Err(e) => {
            warn!("{}; continuing with compiled defaults", e);
            TomlConfig::default()
        }
    }
}

/// Write config atomically (temp file in the same directory, then rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;

    debug!(path = %path.display(), "Wrote config file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_default_level() {
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_field_map_defaults() {
        let fields = FieldMapConfig::default();
        assert_eq!(fields.id, "/id");
        assert_eq!(fields.generic_size, "/index_size");
    }

    #[test]
    fn test_source_lookup_is_case_insensitive() {
        let config: TomlConfig = toml::from_str(
            r#"
            [[sources]]
            name = "Network"
            search_url = "https://api.example.test/search?q={query}"
            "#,
        )
        .unwrap();

        assert!(config.source("network").is_some());
        assert!(config.source("other").is_none());
    }
}
