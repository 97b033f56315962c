//! LSP error types.
use std::time::Duration;

/// Errors from language server management.
#[derive(Debug, thiserror::Error)]
pub enum LspError {
    /// Server executable is missing or failed to start.
    #[error("failed to launch `{command}`: {reason}")]
    Launch {
        /// The executable that was being started.
        command: String,
        /// Why the launch failed.
        reason: String,
    },

    /// The `initialize` handshake failed or returned malformed data.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// No language server is known for the requested language.
    #[error("unknown language: {0:?}")]
    UnknownLanguage(String),

    /// The pipe to the server is closed or the connection went away.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound payload could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An inbound message used a method outside the supported set.
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    /// JSON-RPC error returned by the server.
    #[error("JSON-RPC error {code}: {message}")]
    Rpc {
        /// The error code.
        code: i64,
        /// The error message.
        message: String,
    },

    /// A request deadline elapsed before the server answered.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LspError {
    /// Whether the error was raised while decoding inbound traffic.
    ///
    /// These are recovered locally by the reading task and never reach
    /// a caller of the public API.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::UnsupportedMethod(_))
    }

    pub(crate) fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}
