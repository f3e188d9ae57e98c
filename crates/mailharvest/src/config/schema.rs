use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::provider::{CURRENT_USER_ID, INBOX_LABEL};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    pub storage_directory: String,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_label_ids")]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub max_results: Option<u32>,
    #[serde(default = "default_progress_log_interval")]
    pub progress_log_interval: usize,
    #[serde(default)]
    pub watch_topic: Option<String>,
    /// Seconds between scheduled reconciliations. Zero disables the timer.
    #[serde(default)]
    pub reconcile_interval_secs: u64,
    #[serde(default)]
    pub notification: NotificationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Creates a config with defaults for everything but the storage directory.
    pub fn with_storage_directory<P: Into<PathBuf>>(storage_directory: P) -> Self {
        Self {
            version: "1.0".to_string(),
            storage_directory: storage_directory.into().display().to_string(),
            user_id: default_user_id(),
            label_ids: default_label_ids(),
            query: None,
            max_results: None,
            progress_log_interval: default_progress_log_interval(),
            watch_topic: None,
            reconcile_interval_secs: 0,
            notification: NotificationConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_directory)
    }
}

fn default_user_id() -> String {
    CURRENT_USER_ID.to_string()
}

fn default_label_ids() -> Vec<String> {
    vec![INBOX_LABEL.to_string()]
}

fn default_progress_log_interval() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Bounded queue size; defaults to twice the worker count.
    #[serde(default)]
    pub queue_capacity: Option<usize>,
}

impl NotificationConfig {
    pub fn effective_queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers * 2)
    }
}

fn default_workers() -> usize {
    num_cpus::get()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_record_prefix")]
    pub record_file_prefix: String,
    #[serde(default = "default_record_extension")]
    pub record_file_extension: String,
}

fn default_record_prefix() -> String {
    "emails-".to_string()
}

fn default_record_extension() -> String {
    ".json".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            record_file_prefix: default_record_prefix(),
            record_file_extension: default_record_extension(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}
