//! Registry of language clients and the public entry point.
//!
//! Clients are created lazily on the first operation for their language.
//! The registry lock is only held for lookups and inserts; spawning and
//! the handshake run outside it, serialized per language by a startup
//! gate so concurrent first uses share one process.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::client::{CallbackSlot, ClientOptions, DiagnosticsCallback, LanguageClient};
use crate::command::{normalize_language, CommandTable};
use crate::error::LspError;
use crate::language::LanguageResolver;
use crate::types::{path_to_uri, CompletionItem, Diagnostic, Position};
use crate::{lock, write};

/// Owns one [`LanguageClient`] per language and routes every operation.
pub struct ServerManager {
    commands: CommandTable,
    resolver: LanguageResolver,
    root: PathBuf,
    request_timeout: Option<Duration>,
    clients: Mutex<HashMap<String, Arc<LanguageClient>>>,
    startup_gates: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    callback: CallbackSlot,
}

impl Default for ServerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerManager {
    /// A manager using the built-in command table and extensions, rooted
    /// at the current directory, with no request deadline.
    pub fn new() -> Self {
        Self {
            commands: CommandTable::builtin(),
            resolver: LanguageResolver::new(),
            root: std::env::current_dir().unwrap_or_default(),
            request_timeout: None,
            clients: Mutex::new(HashMap::new()),
            startup_gates: Mutex::new(HashMap::new()),
            callback: CallbackSlot::default(),
        }
    }

    /// Replace the command table.
    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = commands;
        self
    }

    /// Replace the extension resolver.
    pub fn with_resolver(mut self, resolver: LanguageResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Set the workspace root sent to new servers.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Set the per-request deadline for new clients.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The command table in use.
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Send `textDocument/didOpen` for `path` with its full text.
    pub async fn did_open(&self, language: &str, path: &str, text: &str) -> Result<(), LspError> {
        let (client, uri) = self.route(language, path).await?;
        client.did_open(&uri, text).await
    }

    /// Send `textDocument/didChange` replacing the whole document.
    pub async fn did_change(&self, language: &str, path: &str, text: &str) -> Result<(), LspError> {
        let (client, uri) = self.route(language, path).await?;
        client.did_change(&uri, text).await
    }

    /// Send `textDocument/didSave` with the saved text.
    pub async fn did_save(&self, language: &str, path: &str, text: &str) -> Result<(), LspError> {
        let (client, uri) = self.route(language, path).await?;
        client.did_save(&uri, text).await
    }

    /// Request completions at a zero-based line and column.
    pub async fn completion(
        &self,
        language: &str,
        path: &str,
        line: u32,
        column: u32,
    ) -> Result<Vec<CompletionItem>, LspError> {
        let (client, uri) = self.route(language, path).await?;
        client.completion(&uri, Position::new(line, column)).await
    }

    /// Cached diagnostics for `path`.
    ///
    /// Empty when the language is unresolved, has no client, or nothing was
    /// published for the document. Never performs I/O.
    pub fn diagnostics(&self, language: &str, path: &str) -> Vec<Diagnostic> {
        let Some(language) = self.resolver.resolve(language, path) else {
            return Vec::new();
        };
        let client = lock(&self.clients).get(&language).cloned();
        client
            .map(|client| client.diagnostics(&path_to_uri(path)))
            .unwrap_or_default()
    }

    /// Install the diagnostics callback shared by every client, replacing
    /// any previous one. Live clients use it from their next publish.
    pub fn set_diagnostics_handler<F>(&self, callback: F)
    where
        F: Fn(&str, &[Diagnostic]) + Send + Sync + 'static,
    {
        let callback: DiagnosticsCallback = Arc::new(callback);
        *write(&self.callback) = Some(callback);
    }

    /// Remove the diagnostics callback.
    pub fn clear_diagnostics_handler(&self) {
        *write(&self.callback) = None;
    }

    /// Shut down every client and empty the registry. Safe to repeat.
    pub async fn shutdown(&self) {
        let clients: Vec<(String, Arc<LanguageClient>)> = lock(&self.clients).drain().collect();
        if clients.is_empty() {
            debug!("shutdown with no running servers");
            return;
        }
        for (language, client) in clients {
            debug!(%language, "stopping client");
            client.shutdown().await;
        }
        info!("all language servers stopped");
    }

    /// Languages with a registered client, sorted.
    pub fn active_languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = lock(&self.clients).keys().cloned().collect();
        languages.sort_unstable();
        languages
    }

    /// Whether a client is registered for `language`.
    pub fn has_client(&self, language: &str) -> bool {
        lock(&self.clients).contains_key(&normalize_language(language))
    }

    /// The ready client for `language`, starting one if needed.
    pub async fn client(&self, language: &str) -> Result<Arc<LanguageClient>, LspError> {
        let language = normalize_language(language);
        if let Some(client) = self.live_client(&language).await {
            return Ok(client);
        }
        let command = self.commands.command_for(&language);
        if command.is_empty() {
            return Err(LspError::UnknownLanguage(language));
        }

        let gate = self.startup_gate(&language);
        let _starting = gate.lock().await;
        if let Some(client) = self.live_client(&language).await {
            return Ok(client);
        }

        let options = ClientOptions::new(self.root.clone())
            .with_request_timeout(self.request_timeout)
            .with_callback_slot(Arc::clone(&self.callback));
        let client = Arc::new(LanguageClient::start(&language, command, options).await?);
        Ok(self.publish(language, client).await)
    }

    async fn route(
        &self,
        language: &str,
        path: &str,
    ) -> Result<(Arc<LanguageClient>, String), LspError> {
        let resolved = self
            .resolver
            .resolve(language, path)
            .ok_or_else(|| LspError::UnknownLanguage(language.trim().to_string()))?;
        let client = self.client(&resolved).await?;
        Ok((client, path_to_uri(path)))
    }

    fn startup_gate(&self, language: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = lock(&self.startup_gates);
        Arc::clone(gates.entry(language.to_string()).or_default())
    }

    /// Registered ready client, evicting and stopping a dead one.
    async fn live_client(&self, language: &str) -> Option<Arc<LanguageClient>> {
        let stale = {
            let mut clients = lock(&self.clients);
            match clients.get(language).map(|client| client.is_ready()) {
                Some(true) => return clients.get(language).cloned(),
                Some(false) => clients.remove(language),
                None => None,
            }
        };
        if let Some(stale) = stale {
            info!(%language, "replacing terminated language server");
            stale.shutdown().await;
        }
        None
    }

    /// Register `client`, stopping any entry it replaces.
    ///
    /// Only called with the language's startup gate held, after
    /// `live_client` found nothing ready, so no other ready client can have
    /// been registered in the meantime.
    async fn publish(&self, language: String, client: Arc<LanguageClient>) -> Arc<LanguageClient> {
        let displaced = lock(&self.clients).insert(language.clone(), Arc::clone(&client));
        if let Some(displaced) = displaced {
            debug!(%language, "stopping displaced client");
            displaced.shutdown().await;
        }
        client
    }
}

impl std::fmt::Debug for ServerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerManager")
            .field("root", &self.root)
            .field("request_timeout", &self.request_timeout)
            .field("active", &self.active_languages())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::LanguageServerSpec;

    fn table(language: &str, command: &[&str]) -> CommandTable {
        let mut table = CommandTable::new();
        table.insert(LanguageServerSpec::new(
            language,
            command.iter().map(|s| s.to_string()).collect(),
        ));
        table
    }

    #[tokio::test]
    async fn diagnostics_default_empty() {
        let manager = ServerManager::new();
        assert!(manager.diagnostics("python", "/tmp/x.py").is_empty());
        assert!(manager.diagnostics("", "/tmp/x.unknown").is_empty());
        assert!(!manager.has_client("python"));
    }

    #[tokio::test]
    async fn unsupported_language_spawns_nothing() {
        let manager = ServerManager::new();
        match manager.completion("cobol", "/tmp/x.cob", 0, 0).await {
            Err(LspError::UnknownLanguage(lang)) => assert_eq!(lang, "cobol"),
            other => panic!("expected UnknownLanguage, got: {:?}", other),
        }
        assert!(manager.active_languages().is_empty());
    }

    #[tokio::test]
    async fn unresolved_extension_is_unknown_language() {
        let manager = ServerManager::new();
        assert!(matches!(
            manager.did_open("", "/x/y.unknown", "text").await,
            Err(LspError::UnknownLanguage(_))
        ));
        assert!(matches!(
            manager.did_change("  ", "/x/Makefile", "text").await,
            Err(LspError::UnknownLanguage(_))
        ));
        assert!(manager.active_languages().is_empty());
    }

    #[tokio::test]
    async fn missing_executable_is_launch_error() {
        let manager = ServerManager::new()
            .with_commands(table("python", &["definitely-not-a-real-command-xyz"]));
        match manager.did_open("python", "/tmp/x.py", "").await {
            Err(LspError::Launch { command, .. }) => {
                assert_eq!(command, "definitely-not-a-real-command-xyz")
            }
            other => panic!("expected Launch, got: {:?}", other),
        }
        assert!(!manager.has_client("python"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_handshake_registers_nothing() {
        let manager = ServerManager::new().with_commands(table("python", &["true"]));
        assert!(matches!(
            manager.did_open("python", "/tmp/x.py", "").await,
            Err(LspError::Handshake(_))
        ));
        assert!(!manager.has_client("python"));
    }

    #[tokio::test]
    async fn shutdown_without_clients_is_noop() {
        let manager = ServerManager::new();
        manager.shutdown().await;
        manager.shutdown().await;
        assert!(manager.active_languages().is_empty());
    }

    #[test]
    fn set_handler_replaces_previous() {
        let manager = ServerManager::new();
        manager.set_diagnostics_handler(|_, _| {});
        assert!(crate::read(&manager.callback).is_some());
        manager.clear_diagnostics_handler();
        assert!(crate::read(&manager.callback).is_none());
    }

    #[test]
    fn builder_settings() {
        let manager = ServerManager::new()
            .with_root("/work")
            .with_request_timeout(Some(Duration::from_secs(5)))
            .with_commands(table("zig", &["zls"]));
        assert_eq!(manager.root, PathBuf::from("/work"));
        assert_eq!(manager.request_timeout, Some(Duration::from_secs(5)));
        assert!(manager.commands().supports("zig"));
        assert!(!manager.commands().supports("go"));
    }
}
