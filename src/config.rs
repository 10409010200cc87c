use crate::migrate::{migrate, CURRENT_SCHEMA_VERSION};
use crate::types::*;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const APP_NAME: &str = "wadman";
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const CONFIG_PATH_ENV: &str = "WADMAN_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file version {found} requires a newer version of wadman (this build supports up to {supported})")]
    UnsupportedSchemaVersion { found: u64, supported: u32 },
    #[error("could not read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("could not write config file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not serialize config: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("could not determine config directory")]
    NoConfigDir,
}

pub fn get_config_file_path() -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let path = dirs::config_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(APP_NAME)
        .join(CONFIG_FILE_NAME);
    tracing::debug!("Config file path: {}", path.display());
    Ok(path)
}

/// Loads the config at `path`, upgrading older schema versions.
///
/// A missing file yields the default configuration.
pub fn load_config(path: &Path) -> Result<WadmanConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(WadmanConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let parse_error = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut doc = match serde_json::from_str::<Value>(&content).map_err(parse_error)? {
        Value::Object(map) => map,
        _ => {
            return Err(parse_error(serde::de::Error::custom(
                "expected a JSON object at the top level",
            )))
        }
    };

    let found = doc.get("version").and_then(Value::as_u64).unwrap_or(0);
    if found > u64::from(CURRENT_SCHEMA_VERSION) {
        return Err(ConfigError::UnsupportedSchemaVersion {
            found,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if found < u64::from(CURRENT_SCHEMA_VERSION) {
        migrate(&mut doc, found as u32);
    }

    serde_json::from_value(Value::Object(doc)).map_err(parse_error)
}

#[derive(Serialize)]
struct PersistedConfig<'a> {
    install_path: &'a Path,
    version: u32,
    settings: &'a WadmanSettings,
    addons: &'a [AddonRecord],
}

/// Writes `config` at the current schema version.
///
/// The file is written next to its destination and renamed over it, so
/// readers never see a half-written addon list.
pub fn save_config(path: &Path, config: &WadmanConfig) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    let config_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&config_dir).map_err(write_error)?;

    let persisted = PersistedConfig {
        install_path: &config.install_path,
        version: CURRENT_SCHEMA_VERSION,
        settings: &config.settings,
        addons: &config.addons,
    };
    let content = serde_json::to_string_pretty(&persisted)?;

    let mut staged = tempfile::NamedTempFile::new_in(&config_dir).map_err(write_error)?;
    staged.write_all(content.as_bytes()).map_err(write_error)?;
    staged.write_all(b"\n").map_err(write_error)?;
    staged
        .persist(path)
        .map_err(|e| write_error(e.error))?;

    tracing::debug!("Saved {} addons to {}", config.addons.len(), path.display());
    Ok(())
}

/// Applies `WADMAN_*` environment overrides on top of the loaded config.
pub fn apply_env_overrides(config: &mut WadmanConfig) {
    if let Ok(path) = std::env::var("WADMAN_INSTALL_PATH") {
        if !path.is_empty() {
            config.install_path = PathBuf::from(path);
        }
    }

    if let Ok(flavor) = std::env::var("WADMAN_FLAVOR") {
        if !flavor.is_empty() {
            config.settings.flavor = flavor;
        }
    }

    if let Ok(channel) = std::env::var("WADMAN_CHANNEL") {
        match channel.parse::<Channel>() {
            Ok(channel) => config.settings.channel = channel,
            Err(e) => tracing::warn!("Ignoring WADMAN_CHANNEL: {}", e),
        }
    }
}

pub fn normalize_key(key: &str) -> String {
    key.replace('-', "_")
        .chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                format!("_{}", c.to_lowercase())
            } else {
                c.to_string()
            }
        })
        .collect::<String>()
        .to_lowercase()
}
