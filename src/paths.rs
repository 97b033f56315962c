//! Per-user directories for config and logs.
use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_NAME: &str = "polyglot";

/// Standard directories resolved from the user's home directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    home: PathBuf,
}

impl AppPaths {
    /// Resolve the home directory via `dirs`, falling back to `$HOME`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .context("could not determine home directory")?;
        Ok(Self { home })
    }

    #[cfg(test)]
    fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    /// `~/.config/polyglot`
    pub fn config_dir(&self) -> PathBuf {
        self.home.join(".config").join(APP_NAME)
    }

    /// `~/.local/share/polyglot`
    pub fn data_dir(&self) -> PathBuf {
        self.home.join(".local").join("share").join(APP_NAME)
    }

    /// `<data_dir>/logs`
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    /// Log file used when the config does not name one.
    pub fn default_log_file(&self) -> PathBuf {
        self.log_dir().join(format!("{}.log", APP_NAME))
    }
}
