//! polyglot-lsp: a client manager for multiple language servers.
//!
//! Spawns one language server process per language on first use, speaks
//! JSON-RPC with Content-Length framing over its stdio, and exposes
//! document notifications, completion and cached diagnostics through
//! [`ServerManager`].
pub mod client;
pub mod command;
pub mod connection;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod framing;
pub mod language;
pub mod manager;
pub mod protocol;
pub mod transport;
pub mod types;

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Re-export key types for convenience.
pub use client::{ClientOptions, ClientState, DiagnosticsCallback, LanguageClient};
pub use command::{normalize_language, CommandTable, LanguageServerSpec};
pub use connection::{NotificationHandler, RpcConnection};
pub use diagnostics::DiagnosticSet;
pub use error::LspError;
pub use language::{language_from_extension, language_from_path, resolve_language, LanguageResolver};
pub use manager::ServerManager;
pub use transport::Transport;
pub use types::{
    normalize_uri, path_to_uri, uri_to_path, CompletionItem, CompletionItemKind, Diagnostic,
    DiagnosticSeverity, Documentation, NumberOrString, Position, Range,
};

// Every critical section in this crate leaves its data consistent, so a
// poisoned lock is still safe to use.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
