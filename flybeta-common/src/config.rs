//! Bootstrap configuration loading and config-file resolution
//!
//! The TOML file is the lowest-priority explicit source of settings. Every key is
//! optional; services apply their own built-in defaults for anything left unset so
//! that environment variables and command-line flags can still override it.
//!
//! Config-file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. `<user config dir>/flybeta/<service>.toml` if present
//! 4. No file (built-in defaults only)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub source: SourceSection,
    pub join: JoinSection,
    pub scoring: ScoringSection,
    pub retry: RetrySection,
    pub pipeline: PipelineSection,
    pub features: FeaturesSection,
    pub sink: SinkSection,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
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

/// `[source]` section: input series locations and record prefilters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub flights_path: Option<PathBuf>,
    pub weather_path: Option<PathBuf>,
    /// Airline names whose flights are never scored
    pub exclude_airlines: Option<Vec<String>>,
    /// When set, both endpoints of a flight must be in this list
    pub allowed_airports: Option<Vec<String>>,
}

/// `[join]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinSection {
    pub tolerance_minutes: Option<i64>,
    /// "prefer_earlier" or "prefer_later"
    pub tie_break: Option<String>,
}

/// `[scoring]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    pub base_url: Option<String>,
    pub stage1_path: Option<String>,
    pub stage2_path: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// `[retry]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: Option<u32>,
    pub delay_ms: Option<u64>,
    /// "fixed" or "exponential"
    pub schedule: Option<String>,
    pub multiplier: Option<f64>,
    pub max_delay_ms: Option<u64>,
}

/// `[pipeline]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub concurrency: Option<usize>,
    pub window_size: Option<usize>,
}

/// `[features]` section: per-stage ordered schemas
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesSection {
    /// "substitute" or "reject"
    pub missing_field_policy: Option<String>,
    pub stage1: Option<Vec<FieldEntry>>,
    pub stage2: Option<Vec<FieldEntry>>,
}

/// One declared feature field, either a bare name or a full spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Name(String),
    Spec {
        name: String,
        #[serde(default)]
        kind: Option<String>,
        #[serde(default)]
        default: Option<f64>,
    },
}

impl FieldEntry {
    pub fn name(&self) -> &str {
        match self {
            FieldEntry::Name(name) => name,
            FieldEntry::Spec { name, .. } => name,
        }
    }
}

/// `[sink]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkSection {
    pub path: Option<PathBuf>,
    pub topic: Option<String>,
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Read TOML {} failed: {}", path.display(), e))
    })?;
    let config: TomlConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Default per-user config file location for a service
pub fn default_config_path(service_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("flybeta").join(format!("{}.toml", service_name)))
}

/// Resolve which config file (if any) should be loaded
///
/// A path given explicitly (CLI or environment) is returned even if it does not
/// exist, so that loading reports the error. The per-user default is only used
/// when the file is actually present.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    service_name: &str,
) -> Option<PathBuf> {
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

    // Priority 3: Per-user default
    default_config_path(service_name).filter(|p| p.exists())
}

/// Load the resolved config file, or built-in defaults when there is none
pub fn load_or_default(path: Option<&Path>) -> Result<TomlConfig> {
    match path {
        Some(path) => load_toml_config(path),
        None => Ok(TomlConfig::default()),
    }
}
