//! TOML configuration for polyglot.
//!
//! Loads `config.toml` from the user's config directory, layers an
//! optional project-local `.polyglot/config.toml` on top, and validates
//! the result.
pub mod config;
pub mod error;
pub mod load;
pub mod merge;
pub mod validate;

pub use config::{Config, LogConfig, LogLevel, LspConfig, LspServerEntry};
pub use error::ConfigError;
pub use load::{find_project_config, load_config, load_file, load_from_str, PROJECT_CONFIG_DIR};
pub use merge::merge_configs;
pub use validate::validate;
