//! Configuration - Read Once, Passed Explicitly
//!
//! Defaults, then an optional JSON file, then environment overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoothConfig {
    #[serde(default)]
    pub storage: StoreConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub printing: PrintConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf { PathBuf::from("./temp") }

impl Default for StoreConfig {
    fn default() -> Self {
        Self { root: default_root() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityConfig {
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_allowed_image_types")]
    pub allowed_image_types: Vec<String>,
}

fn default_max_file_size() -> u64 { 10 * 1024 * 1024 }

fn default_allowed_image_types() -> Vec<String> {
    ["image/jpeg", "image/jpg", "image/png", "image/webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            allowed_image_types: default_allowed_image_types(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_copies")]
    pub max_copies: u32,
    #[serde(default = "default_printer_name")]
    pub printer_name: String,
    #[serde(default)]
    pub options: PrintOptions,
}

fn default_true() -> bool { true }
fn default_max_copies() -> u32 { 5 }
fn default_printer_name() -> String { "Canon_SELPHY_CP1500".to_string() }

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_copies: default_max_copies(),
            printer_name: default_printer_name(),
            options: PrintOptions::default(),
        }
    }
}

/// Fixed quality/fit options sent with every job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    #[serde(default = "default_media")]
    pub media: String,
    #[serde(default = "default_true")]
    pub fit_to_page: bool,
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_media() -> String { "4x6".to_string() }
fn default_quality() -> u8 { 5 }

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            media: default_media(),
            fit_to_page: true,
            quality: default_quality(),
        }
    }
}

/// Load configuration from an optional JSON file plus the process environment.
pub fn load(path: Option<&Path>) -> Result<BoothConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&content)?
        }
        None => BoothConfig::default(),
    };

    apply_env(&mut config, |var| std::env::var(var).ok())?;
    Ok(config)
}

fn apply_env(
    config: &mut BoothConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(name) = lookup("PRINTER_NAME") {
        config.printing.printer_name = name;
    }

    if let Some(value) = lookup("MAX_COPIES") {
        config.printing.max_copies = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var: "MAX_COPIES", value })?;
    }

    if let Some(dir) = lookup("TEMP_DIRECTORY") {
        config.storage.root = PathBuf::from(dir);
    }

    if let Some(value) = lookup("ENABLE_PRINTING") {
        config.printing.enabled = value == "true";
    }

    if let Some(value) = lookup("MAX_FILE_SIZE") {
        config.security.max_file_size = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { var: "MAX_FILE_SIZE", value })?;
    }

    Ok(())
}
