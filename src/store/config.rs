//! Configuration file handling.
//!
//! The configuration names every block file by key and holds the allocation
//! patterns of each key. It lives in `ipam-config.json` inside the config
//! directory.

use crate::models::{fill_pattern_names, PatternTable};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};

/// Environment variable naming the config directory.
pub const CONFIG_PATH_ENV: &str = "IPAM_CONFIG_PATH";
/// File name of the configuration inside the config directory.
pub const CONFIG_FILE_NAME: &str = "ipam-config.json";
/// Key of the block file created by `config init` when none is given.
pub const DEFAULT_FILE_KEY: &str = "default";

lazy_static! {
    static ref FILE_KEY: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid Regex?");
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Block file paths by key. Relative paths are relative to the config directory.
    #[serde(default)]
    pub block_files: BTreeMap<String, String>,
    #[serde(default)]
    pub patterns: PatternTable,
    /// Path this config was loaded from.
    #[serde(skip)]
    pub config_file: PathBuf,
}

impl Config {
    /// Directory holding the config file.
    pub fn config_dir(&self) -> &Path {
        self.config_file.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Resolve the path of block file `key`.
    pub fn block_file_path(&self, key: &str) -> Result<PathBuf, Box<dyn Error>> {
        let path = self
            .block_files
            .get(key)
            .ok_or_else(|| format!("Block file for key {key} not found in config"))?;
        Ok(self.config_dir().join(path))
    }
}

/// Pick the config directory: an explicit path first, then `IPAM_CONFIG_PATH`.
pub fn config_dir(explicit: Option<&Path>) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(dir) if !dir.trim().is_empty() => Ok(PathBuf::from(dir)),
        _ => Err(format!("{CONFIG_PATH_ENV} environment variable is required (or pass --config)").into()),
    }
}

/// Check a block file key: letters, digits, hyphens and underscores only.
pub fn validate_file_key(key: &str) -> Result<(), Box<dyn Error>> {
    if FILE_KEY.is_match(key) {
        Ok(())
    } else {
        Err(format!(
            "Invalid block file key '{key}': only alphanumeric characters, hyphens, and underscores are allowed"
        )
        .into())
    }
}

/// Read the config from `dir`.
pub fn load_config(dir: &Path) -> Result<Config, Box<dyn Error>> {
    let config_file = dir.join(CONFIG_FILE_NAME);
    log::debug!("Loading config from: {}", config_file.display());

    let json = std::fs::read_to_string(&config_file)
        .map_err(|e| format!("Error reading config file {}: {e}", config_file.display()))?;
    let de = &mut serde_json::Deserializer::from_str(&json);
    let mut config: Config = serde_path_to_error::deserialize(de)
        .map_err(|e| format!("Error parsing config file {}: {e}", config_file.display()))?;

    fill_pattern_names(&mut config.patterns);
    config.config_file = config_file;
    log::info!(
        "Loaded config with {} block files and {} pattern groups",
        config.block_files.len(),
        config.patterns.len()
    );
    Ok(config)
}

/// Write the config back to the file it was loaded from.
pub fn write_config(config: &Config) -> Result<(), Box<dyn Error>> {
    if config.config_file.as_os_str().is_empty() {
        return Err("Config file path not set".into());
    }
    let dir = config.config_dir();
    if !dir.exists() {
        return Err(format!("Config directory does not exist: {}", dir.display()).into());
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Error serializing config: {e}"))?;
    std::fs::write(&config.config_file, json)
        .map_err(|e| format!("Error writing config file {}: {e}", config.config_file.display()))?;
    log::debug!("Config written to {}", config.config_file.display());
    Ok(())
}

/// Create the config directory, a first empty block file and the config file.
///
/// Fails when a config file already exists in `dir`.
pub fn init_config(dir: &Path, file_key: &str) -> Result<Config, Box<dyn Error>> {
    validate_file_key(file_key)?;
    let config_file = dir.join(CONFIG_FILE_NAME);
    if config_file.exists() {
        return Err(format!("Configuration file already exists at {}", config_file.display()).into());
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("Error creating config directory {}: {e}", dir.display()))?;

    let mut config = Config {
        config_file,
        ..Default::default()
    };
    let path = default_block_path(file_key);
    create_empty_block_file(&config.config_dir().join(&path))?;
    config.block_files.insert(file_key.to_string(), path);

    write_config(&config)?;
    log::info!("Configuration initialized in {}", dir.display());
    Ok(config)
}

/// Register a new block file under `file_key`, creating it empty if absent.
pub fn add_block_file(
    config: &Config,
    file_key: &str,
    path: Option<&str>,
) -> Result<Config, Box<dyn Error>> {
    validate_file_key(file_key)?;
    if config.block_files.contains_key(file_key) {
        return Err(format!("Block file with key '{file_key}' already exists").into());
    }
    let path = path.map_or_else(|| default_block_path(file_key), str::to_string);
    create_empty_block_file(&config.config_dir().join(&path))?;

    let mut updated = config.clone();
    updated.block_files.insert(file_key.to_string(), path);
    log::info!("Added block file {file_key}");
    Ok(updated)
}

fn default_block_path(file_key: &str) -> String {
    format!("blocks/{file_key}.json")
}

fn create_empty_block_file(path: &Path) -> Result<(), Box<dyn Error>> {
    if path.exists() {
        log::debug!("Block file {} already exists, keeping it", path.display());
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Error creating blocks directory {}: {e}", parent.display()))?;
    }
    std::fs::write(path, "[]").map_err(|e| format!("Error creating block file {}: {e}", path.display()))?;
    Ok(())
}
