use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::ConfigError;
use crate::merge::merge_configs;
use crate::validate::validate;

/// Name of the project-local config directory.
pub const PROJECT_CONFIG_DIR: &str = ".polyglot";

/// Content written into a newly-created default config file.
const DEFAULT_CONFIG_CONTENT: &str = r#"# polyglot configuration
# Uncomment and edit settings below to override defaults.

# [log]
# level = "info"
# file = "/path/to/polyglot.log"

# [lsp]
# enabled = true
# request_timeout_secs = 0   # 0 waits forever

# [lsp.servers.python]
# command = "pyright-langserver"
# args = ["--stdio"]
# extensions = ["py", "pyi"]
"#;

/// Load and merge configuration.
///
/// 1. Reads the global config from `config_dir/config.toml`, creating it
///    with commented-out defaults if it does not exist.
/// 2. Optionally reads a project config from
///    `project_dir/.polyglot/config.toml`, walking upward.
/// 3. Merges `Config::default() <- global <- project`.
/// 4. Validates the merged result.
///
/// # Errors
///
/// Returns [`ConfigError`] on I/O failure, parse failure, or the first
/// validation failure.
pub fn load_config(config_dir: &Path, project_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let global_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::io(config_dir, e))?;
    }
    if !global_path.exists() {
        std::fs::write(&global_path, DEFAULT_CONFIG_CONTENT).map_err(|e| {
            ConfigError::CreateDefault {
                path: global_path.clone(),
                reason: e.to_string(),
            }
        })?;
        tracing::info!("created default config at {}", global_path.display());
    }

    let mut config = Config::default();

    let global_content = read(&global_path)?;
    if has_non_comment_content(&global_content) {
        config = merge_configs(&config, &global_content).map_err(|e| e.in_file(&global_path))?;
    }

    if let Some(project_path) = project_dir.and_then(find_project_config) {
        tracing::debug!("merging project config {}", project_path.display());
        let project_content = read(&project_path)?;
        config = merge_configs(&config, &project_content).map_err(|e| e.in_file(&project_path))?;
    }

    validate(&config).map_err(first_error)?;
    Ok(config)
}

/// Load a single explicitly named config file over the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::NotFound`] if `path` does not exist.
pub fn load_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = read(path)?;
    let config = merge_configs(&Config::default(), &content).map_err(|e| e.in_file(path))?;
    validate(&config).map_err(first_error)?;
    Ok(config)
}

/// Walk from `start` upward looking for `.polyglot/config.toml`.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(PROJECT_CONFIG_DIR).join("config.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Parse a TOML string directly into a validated [`Config`].
///
/// # Errors
///
/// Returns [`ConfigError`] on parse or validation failure.
pub fn load_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(toml_str).map_err(ConfigError::parse)?;
    validate(&config).map_err(first_error)?;
    Ok(config)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
}

fn first_error(errors: Vec<ConfigError>) -> ConfigError {
    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| ConfigError::Invalid {
            key: "config".to_string(),
            reason: "validation failed".to_string(),
        })
}

fn has_non_comment_content(content: &str) -> bool {
    content.lines().any(|l| {
        let trimmed = l.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    })
}
