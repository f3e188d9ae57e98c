use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Mail provider '{0}' is not available")]
    Unavailable(String),

    #[error("Failed to list messages: {0}")]
    ListPage(#[source] ProviderError),

    #[error("Failed to register mailbox watch on '{topic}': {source}")]
    Watch {
        topic: String,
        #[source]
        source: ProviderError,
    },

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Refusing to store an empty record")]
    EmptyRecord,

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures reported by a [`crate::provider::MailProvider`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Message '{0}' not found")]
    NotFound(String),

    #[error("Change cursor {0} can no longer be resolved")]
    CursorExpired(u64),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Operation not supported by provider: {0}")]
    Unsupported(String),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to decode body of message '{message_id}': {reason}")]
    Decode { message_id: String, reason: String },

    #[error("Failed to serialize converted message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Provider call failed: {0}")]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
