use std::fmt::Display;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Why a polyglot configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file passed with `--config` does not exist.
    #[error("no config file at {}", .0.display())]
    NotFound(PathBuf),

    /// The commented default `config.toml` could not be written.
    #[error("could not write default config {}: {reason}", .path.display())]
    CreateDefault {
        /// Where the default file was going to be written.
        path: PathBuf,
        /// The underlying failure.
        reason: String,
    },

    /// A config layer is not TOML, or does not fit the `[log]`/`[lsp]` schema.
    #[error("invalid config in {origin}: {message}")]
    Parse {
        /// The file the layer came from, or `inline TOML`.
        origin: String,
        /// What the TOML parser reported.
        message: String,
    },

    /// A setting parsed but cannot be used, such as an empty server command.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Dotted key, e.g. `lsp.servers.python.command`.
        key: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// Reading a config file or creating the config directory failed.
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        /// The file or directory being accessed.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub(crate) fn parse(message: impl Display) -> Self {
        Self::Parse {
            origin: "inline TOML".into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Attribute a parse failure to the file it was read from.
    pub(crate) fn in_file(self, path: &Path) -> Self {
        match self {
            Self::Parse { message, .. } => Self::Parse {
                origin: path.display().to_string(),
                message,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn not_found_names_the_file() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/polyglot.toml"));
        assert_eq!(err.to_string(), "no config file at /etc/polyglot.toml");
    }

    #[test]
    fn create_default_names_path_and_reason() {
        let err = ConfigError::CreateDefault {
            path: PathBuf::from("/home/u/.config/polyglot/config.toml"),
            reason: "permission denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "could not write default config /home/u/.config/polyglot/config.toml: permission denied"
        );
    }

    #[test]
    fn parse_is_inline_until_attributed() {
        let err = ConfigError::parse("expected `]`");
        assert_eq!(err.to_string(), "invalid config in inline TOML: expected `]`");
        let err = err.in_file(Path::new("/p/.polyglot/config.toml"));
        assert_eq!(
            err.to_string(),
            "invalid config in /p/.polyglot/config.toml: expected `]`"
        );
    }

    #[test]
    fn in_file_leaves_other_variants() {
        let err = ConfigError::NotFound(PathBuf::from("a.toml")).in_file(Path::new("b.toml"));
        assert!(matches!(err, ConfigError::NotFound(p) if p == Path::new("a.toml")));
    }

    #[test]
    fn invalid_names_the_key() {
        let err = ConfigError::Invalid {
            key: "lsp.servers.go.command".into(),
            reason: "must not be empty".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for lsp.servers.go.command: must not be empty"
        );
    }

    #[test]
    fn io_keeps_its_source() {
        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::io(Path::new("/cfg"), inner);
        assert_eq!(err.to_string(), "cannot access /cfg: denied");
        assert!(err.source().is_some());
    }
}
