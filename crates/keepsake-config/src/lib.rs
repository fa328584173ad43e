//! Configuration system for the keepsake session store.
//!
//! Provides TOML-based configuration with:
//! - A `[session]` section mapping onto the engine's `StoreConfig`
//! - A `[redis]` section for the default backend connection
//! - A `[logging]` section for the CLI's tracing filter
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    LoadedConfig, load_config, load_config_file, load_config_with_options, user_config_dir,
    user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
