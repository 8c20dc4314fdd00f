//! Configuration loading and merging for passgate.
//!
//! Precedence: built-in defaults < config file < command-line overrides.

use passgate_types::{ConfigFile, FilterPolicy, DEFAULT_EXCLUSION_MARKER};
use std::fs;
use std::path::{Path, PathBuf};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "passgate.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("min_rate must be a fraction in [0, 1], got {0}")]
    InvalidMinRate(f64),

    #[error("excluded prefixes must not be empty strings")]
    EmptyPrefix,
}

/// Values supplied on the command line. `None`/empty means "not given".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub excluded_prefixes: Vec<String>,
    pub exclusion_marker: Option<String>,
    pub min_rate: Option<f64>,
    pub fail_on_no_data: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub filter: FilterPolicy,
    pub exclusion_marker: String,
    pub min_rate: Option<f64>,
    pub fail_on_no_data: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            filter: FilterPolicy::default(),
            exclusion_marker: DEFAULT_EXCLUSION_MARKER.to_string(),
            min_rate: None,
            fail_on_no_data: false,
        }
    }
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `dir/passgate.toml`, if it exists.
pub fn discover(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    candidate.is_file().then_some(candidate)
}

pub fn resolve(file: &ConfigFile, overrides: Overrides) -> Result<EffectiveConfig, ConfigError> {
    let mut cfg = EffectiveConfig::default();

    if let Some(prefixes) = &file.filter.excluded_prefixes {
        cfg.filter.excluded_prefixes = prefixes.clone();
    }
    if let Some(marker) = &file.ingest.exclusion_marker {
        cfg.exclusion_marker = marker.clone();
    }
    cfg.min_rate = file.defaults.min_rate;
    cfg.fail_on_no_data = file.defaults.fail_on_no_data.unwrap_or(false);

    if !overrides.excluded_prefixes.is_empty() {
        cfg.filter.excluded_prefixes = overrides.excluded_prefixes;
    }
    if let Some(marker) = overrides.exclusion_marker {
        cfg.exclusion_marker = marker;
    }
    if overrides.min_rate.is_some() {
        cfg.min_rate = overrides.min_rate;
    }
    cfg.fail_on_no_data |= overrides.fail_on_no_data;

    validate(&cfg)?;
    Ok(cfg)
}

fn validate(cfg: &EffectiveConfig) -> Result<(), ConfigError> {
    if let Some(min) = cfg.min_rate {
        if !(0.0..=1.0).contains(&min) {
            return Err(ConfigError::InvalidMinRate(min));
        }
    }
    // An empty prefix would match every file.
    if cfg.filter.excluded_prefixes.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::EmptyPrefix);
    }
    Ok(())
}
