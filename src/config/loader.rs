//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles YAML file discovery,
//! environment detection, and base-plus-overlay merging.

use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_yaml::Value as YamlValue;
use tracing::debug;

use super::VitalsConfig;
use crate::error::{Result, VitalsError};

const BASE_FILE: &str = "vitals.yaml";
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Loaded configuration plus the environment it was resolved for.
pub struct ConfigManager {
    config: VitalsConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection from the default
    /// `config/` directory.
    pub fn load() -> Result<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory.
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> Result<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with an explicit
    /// environment. Useful for tests that must not touch process env vars.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> Result<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading vitals configuration"
        );

        let config = Self::load_and_merge(&config_directory, environment)?;
        config.validate()?;

        debug!(
            environment = %environment,
            dependencies = config.dependencies.len(),
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    pub fn config(&self) -> &VitalsConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Deployment environment from environment variables.
    pub fn detect_environment() -> String {
        env::var("VITALS_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
    }

    fn load_and_merge(directory: &Path, environment: &str) -> Result<VitalsConfig> {
        let base_path = directory.join(BASE_FILE);
        let overlay_path = directory.join(format!("vitals.{environment}.yaml"));

        if !base_path.exists() {
            // No file at all is a legal deployment: everything defaults.
            if !overlay_path.exists() {
                debug!(
                    path = %base_path.display(),
                    "No configuration file found, using defaults"
                );
                return Ok(VitalsConfig::default());
            }
            let overlay = Self::read_yaml(&overlay_path)?;
            return Self::from_value(overlay);
        }

        let mut merged = Self::read_yaml(&base_path)?;
        if overlay_path.exists() {
            let overlay = Self::read_yaml(&overlay_path)?;
            merge_values(&mut merged, overlay);
        }
        Self::from_value(merged)
    }

    fn from_value(value: YamlValue) -> Result<VitalsConfig> {
        serde_yaml::from_value(value)
            .map_err(|e| VitalsError::configuration("loader", e.to_string()))
    }

    fn read_yaml(path: &Path) -> Result<YamlValue> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| VitalsError::configuration("loader", format!("{}: {e}", path.display())))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(VitalsError::configuration(
                "loader",
                format!(
                    "{} is {} bytes, over the {MAX_CONFIG_FILE_SIZE} byte limit",
                    path.display(),
                    metadata.len()
                ),
            ));
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VitalsError::configuration("loader", format!("{}: {e}", path.display())))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| VitalsError::configuration("loader", format!("{}: {e}", path.display())))
    }
}

/// Deep-merge `overlay` into `base`. Mappings merge key by key; everything
/// else (sequences included) is replaced wholesale by the overlay.
fn merge_values(base: &mut YamlValue, overlay: YamlValue) {
    match (base, overlay) {
        (YamlValue::Mapping(base_map), YamlValue::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => merge_values(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base_slot, overlay_value) => *base_slot = overlay_value,
    }
}
