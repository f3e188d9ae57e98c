use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variable that overrides `storage_directory`.
pub const STORAGE_DIR_ENV: &str = "MAILHARVEST_STORAGE_DIR";

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        load_config_from_yaml(&content)
    } else {
        load_config_from_str(&content)
    }
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;
    load_config_from_value(json_value)
}

pub fn load_config_from_yaml(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_yaml::from_str(content)?;
    load_config_from_value(json_value)
}

fn load_config_from_value(json_value: serde_json::Value) -> Result<Config, ConfigError> {
    validate_schema(&json_value)?;

    let mut config: Config = serde_json::from_value(json_value)?;

    if let Ok(dir) = std::env::var(STORAGE_DIR_ENV) {
        if !dir.trim().is_empty() {
            config.storage_directory = dir;
        }
    }

    validate_config(&config)?;

    Ok(config)
}

/// Default storage location under the platform data directory.
pub fn default_storage_directory() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("mailharvest"))
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();

    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.storage_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "storage_directory must not be empty".to_string(),
        });
    }

    if config.label_ids.is_empty() {
        return Err(ConfigError::Validation {
            message: "label_ids must contain at least one label".to_string(),
        });
    }

    if config.progress_log_interval == 0 {
        return Err(ConfigError::Validation {
            message: "progress_log_interval must be greater than zero".to_string(),
        });
    }

    if config.notification.workers == 0 {
        return Err(ConfigError::Validation {
            message: "notification.workers must be greater than zero".to_string(),
        });
    }

    if let Some(topic) = &config.watch_topic {
        if topic.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "watch_topic must not be blank when set".to_string(),
            });
        }
    }

    Ok(())
}
