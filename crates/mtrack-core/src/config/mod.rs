//! Configuration discovery and loading.

mod defaults;

pub use defaults::{TrackConfig, DEFAULT_CONFIG_YAML};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackError};

/// Candidate config file names searched for on disk.
const CONFIG_FILENAMES: &[&str] = &["mtrack.yml", "mtrack.yaml"];

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MTRACK_CONFIG";

/// The loaded configuration, where it came from, and anything that went wrong on the way.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    pub config: TrackConfig,
    pub source: Option<PathBuf>,
    pub warnings: Vec<String>,
}

/// Load configuration, optionally forcing a specific path first.
///
/// Unreadable or unparsable candidates become warnings and the search
/// continues. Built-in defaults are used when nothing loads.
pub fn load_config(custom_path: Option<&Path>) -> ConfigHandle {
    let mut warnings = Vec::new();

    for candidate in config_candidates(custom_path) {
        if !candidate.is_file() {
            continue;
        }
        match load_config_file(&candidate) {
            Ok(config) => {
                let source = fs::canonicalize(&candidate).unwrap_or(candidate);
                log::info!("loaded config from {}", source.display());
                return ConfigHandle {
                    config,
                    source: Some(source),
                    warnings,
                };
            }
            Err(err) => {
                log::warn!("{}", err);
                warnings.push(err.to_string());
            }
        }
    }

    if let Some(path) = custom_path {
        if !path.is_file() {
            warnings.push(format!("config file {} not found", path.display()));
        }
    }
    warnings.push("no config file found; using built-in defaults".to_string());
    ConfigHandle {
        config: TrackConfig::default(),
        source: None,
        warnings,
    }
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<TrackConfig> {
    let contents = fs::read_to_string(path).map_err(|e| {
        TrackError::Config(format!("failed to read config {}: {}", path.display(), e))
    })?;
    let config: TrackConfig = serde_yaml::from_str(&contents).map_err(|e| {
        TrackError::Config(format!("failed to parse config {}: {}", path.display(), e))
    })?;
    Ok(config.sanitize())
}

/// Write the commented default configuration. Refuses to overwrite unless `force`.
pub fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(TrackError::Config(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG_YAML)?;
    Ok(())
}

fn config_candidates(custom_path: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = custom_path {
        candidates.push(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        candidates.push(PathBuf::from(env_path));
    }

    if let Ok(cwd) = std::env::current_dir() {
        for name in CONFIG_FILENAMES {
            candidates.push(cwd.join("config").join(name));
        }
        for name in CONFIG_FILENAMES {
            candidates.push(cwd.join(name));
        }
    }

    if let Some(home_dir) = dirs::home_dir() {
        for name in CONFIG_FILENAMES {
            candidates.push(home_dir.join("mtrack").join(name));
        }
    }

    candidates
}
