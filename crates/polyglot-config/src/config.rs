use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Log verbosity level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug messages.
    Debug,
    /// Informational messages (default).
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// The level name as understood by `tracing` filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log verbosity level.
    #[serde(default)]
    pub level: LogLevel,
    /// Optional path to a log file.
    pub file: Option<PathBuf>,
}

/// Launch settings for one language's server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LspServerEntry {
    /// The executable to run.
    pub command: String,
    /// Command-line arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// File extensions (without the dot) mapped to this language.
    #[serde(default)]
    pub extensions: Vec<String>,
}

impl LspServerEntry {
    /// Executable followed by its arguments.
    pub fn command_line(&self) -> Vec<String> {
        std::iter::once(self.command.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// Language server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LspConfig {
    /// Whether language servers may be started at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Per-request deadline in seconds; 0 waits forever.
    #[serde(default)]
    pub request_timeout_secs: u64,
    /// Server overrides and additions, keyed by language id.
    #[serde(default)]
    pub servers: BTreeMap<String, LspServerEntry>,
}

fn default_true() -> bool {
    true
}

impl Default for LspConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_timeout_secs: 0,
            servers: BTreeMap::new(),
        }
    }
}

impl LspConfig {
    /// The request deadline, or `None` to wait indefinitely.
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

/// Top-level polyglot configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,
    /// Language server settings.
    #[serde(default)]
    pub lsp: LspConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = Config::default();
        assert_eq!(cfg.log.level, LogLevel::Info);
        assert!(cfg.log.file.is_none());
        assert!(cfg.lsp.enabled);
        assert_eq!(cfg.lsp.request_timeout_secs, 0);
        assert!(cfg.lsp.servers.is_empty());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parse_from_toml_string() {
        let toml_str = r#"
[log]
level = "debug"
file = "/tmp/polyglot.log"

[lsp]
request_timeout_secs = 30

[lsp.servers.python]
command = "pyright-langserver"
args = ["--stdio"]
extensions = ["py", "pyi"]
"#;
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.log.level, LogLevel::Debug);
        assert_eq!(cfg.log.file, Some(PathBuf::from("/tmp/polyglot.log")));
        assert!(cfg.lsp.enabled);
        let python = &cfg.lsp.servers["python"];
        assert_eq!(python.command_line(), ["pyright-langserver", "--stdio"]);
        assert_eq!(python.extensions, ["py", "pyi"]);
    }

    #[test]
    fn server_entry_requires_command() {
        let result: Result<Config, _> = toml::from_str("[lsp.servers.go]\nargs = [\"serve\"]\n");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_log_level_rejected() {
        let result: Result<Config, _> = toml::from_str("[log]\nlevel = \"loud\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn request_timeout_zero_is_none() {
        let mut lsp = LspConfig::default();
        assert_eq!(lsp.request_timeout(), None);
        lsp.request_timeout_secs = 15;
        assert_eq!(lsp.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn log_level_names() {
        assert_eq!(LogLevel::Trace.as_str(), "trace");
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert_eq!(LogLevel::default().as_str(), "info");
    }

    #[test]
    fn serde_roundtrip_preserves_servers() {
        let mut cfg = Config::default();
        cfg.lsp.servers.insert(
            "zig".into(),
            LspServerEntry {
                command: "zls".into(),
                args: vec![],
                extensions: vec!["zig".into()],
            },
        );
        let text = toml::to_string(&cfg).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }
}
