//! Configuration for vizflow.
//!
//! Settings are read from TOML files layered user-wide, then per project,
//! with command-line flags applied last by the caller. See [`discovery`]
//! for the search order and [`types`] for the schema.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::{CacheConfig, LoggingConfig, StorageConfig, VizflowConfig};
