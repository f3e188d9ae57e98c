pub mod loader;
pub mod schema;

pub use loader::{
    default_storage_directory, load_config, load_config_from_str, load_config_from_yaml,
    validate_config, STORAGE_DIR_ENV,
};
pub use schema::{Config, LogFormat, LoggingConfig, NotificationConfig, StorageConfig};
