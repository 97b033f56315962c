//! One language server process and its connection.
//!
//! Handles lifecycle (spawn, initialize, shutdown), document
//! notifications, completion, and the per-document diagnostics cache fed
//! by `textDocument/publishDiagnostics`.
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use crate::connection::{NotificationHandler, RpcConnection};
use crate::diagnostics::DiagnosticSet;
use crate::error::LspError;
use crate::protocol::{
    ClientInfo, ClientNotification, ClientRequest, CompletionParams, DidChangeTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, InitializeParams, InitializeResult,
    MessageParams, ServerNotification, TextDocumentContentChangeEvent, TextDocumentIdentifier,
    TextDocumentItem, VersionedTextDocumentIdentifier,
};
use crate::transport::Transport;
use crate::types::{
    client_capabilities, normalize_uri, path_to_uri, CompletionItem, CompletionResponse, Diagnostic,
    Position,
};
use crate::{lock, read, write};

/// How long `shutdown` waits to hand the server its shutdown notification.
const SHUTDOWN_NOTICE_TIMEOUT: Duration = Duration::from_millis(500);

/// Callback invoked after each diagnostics replace with (URI, diagnostics).
pub type DiagnosticsCallback = Arc<dyn Fn(&str, &[Diagnostic]) + Send + Sync>;

/// Callback storage shared between a manager and all of its clients.
pub(crate) type CallbackSlot = Arc<RwLock<Option<DiagnosticsCallback>>>;

/// Lifecycle of a [`LanguageClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Not yet spawned.
    Unstarted,
    /// Spawn and handshake in progress.
    Starting,
    /// Accepting document notifications and requests.
    Ready,
    /// Shutdown in progress.
    ShuttingDown,
    /// Stopped, or the server went away.
    Terminated,
}

/// Settings applied when starting a client.
#[derive(Clone)]
pub struct ClientOptions {
    /// Workspace root sent as `rootUri`.
    pub root: PathBuf,
    /// Deadline for each request; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    callback: CallbackSlot,
}

impl ClientOptions {
    /// Options rooted at `root`, with no deadline and no callback.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            request_timeout: None,
            callback: CallbackSlot::default(),
        }
    }

    /// Set the per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Call `callback` after each diagnostics publish.
    pub fn on_diagnostics<F>(self, callback: F) -> Self
    where
        F: Fn(&str, &[Diagnostic]) + Send + Sync + 'static,
    {
        let callback: DiagnosticsCallback = Arc::new(callback);
        *write(&self.callback) = Some(callback);
        self
    }

    pub(crate) fn with_callback_slot(mut self, slot: CallbackSlot) -> Self {
        self.callback = slot;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_default())
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("root", &self.root)
            .field("request_timeout", &self.request_timeout)
            .field("has_callback", &read(&self.callback).is_some())
            .finish()
    }
}

/// Inbound notification handler running on the connection's reading task.
struct ClientHandler {
    language: String,
    diagnostics: Arc<Mutex<DiagnosticSet>>,
    callback: CallbackSlot,
}

impl ClientHandler {
    fn forward_message(&self, params: MessageParams, shown: bool) {
        let language = self.language.as_str();
        let message = params.message.as_str();
        match params.kind {
            1 => error!(language, shown, "{}", message),
            2 => warn!(language, shown, "{}", message),
            3 => info!(language, shown, "{}", message),
            _ => debug!(language, shown, "{}", message),
        }
    }
}

impl NotificationHandler for ClientHandler {
    fn handle_notification(&self, notification: ServerNotification) {
        match notification {
            ServerNotification::PublishDiagnostics(params) => {
                let uri = normalize_uri(&params.uri);
                debug!(
                    language = %self.language,
                    %uri,
                    count = params.diagnostics.len(),
                    "diagnostics published"
                );
                lock(&self.diagnostics).publish(uri.clone(), params.diagnostics.clone());
                let callback = read(&self.callback).clone();
                if let Some(callback) = callback {
                    callback(&uri, &params.diagnostics);
                }
            }
            ServerNotification::LogMessage(params) => self.forward_message(params, false),
            ServerNotification::ShowMessage(params) => self.forward_message(params, true),
        }
    }
}

/// A running language server bound to one language.
pub struct LanguageClient {
    language: String,
    state: Mutex<ClientState>,
    connection: RpcConnection,
    child: tokio::sync::Mutex<Option<Child>>,
    diagnostics: Arc<Mutex<DiagnosticSet>>,
    versions: Mutex<HashMap<String, i32>>,
    request_timeout: Option<Duration>,
    server_info: Option<ClientInfo>,
}

impl LanguageClient {
    /// Spawn `command` and complete the initialize handshake.
    ///
    /// On failure the process is killed and nothing is retained.
    pub async fn start(
        language: &str,
        command: &[String],
        options: ClientOptions,
    ) -> Result<Self, LspError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| LspError::UnknownLanguage(language.to_string()))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LspError::Launch {
                command: program.clone(),
                reason: e.to_string(),
            })?;

        let launch_error = |what: &str| LspError::Launch {
            command: program.clone(),
            reason: format!("could not capture {}", what),
        };
        let stdin = child.stdin.take().ok_or_else(|| launch_error("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| launch_error("stdout"))?;

        info!(language, command = %program, pid = child.id(), "spawned language server");
        Self::connect(language, Transport::new(stdout, stdin), Some(child), options).await
    }

    /// Run the handshake over an existing transport.
    ///
    /// `child`, if given, is owned by the client and killed on shutdown.
    pub async fn connect(
        language: &str,
        transport: Transport,
        child: Option<Child>,
        options: ClientOptions,
    ) -> Result<Self, LspError> {
        let diagnostics = Arc::new(Mutex::new(DiagnosticSet::new()));
        let handler = Arc::new(ClientHandler {
            language: language.to_string(),
            diagnostics: Arc::clone(&diagnostics),
            callback: options.callback.clone(),
        });
        let mut client = Self {
            language: language.to_string(),
            state: Mutex::new(ClientState::Starting),
            connection: RpcConnection::new(transport, handler),
            child: tokio::sync::Mutex::new(child),
            diagnostics,
            versions: Mutex::new(HashMap::new()),
            request_timeout: options.request_timeout,
            server_info: None,
        };

        match client.initialize(&options).await {
            Ok(server_info) => {
                client.server_info = server_info;
                client.set_state(ClientState::Ready);
                info!(
                    language,
                    server = client.server_name().unwrap_or("unknown"),
                    "language server ready"
                );
                Ok(client)
            }
            Err(e) => {
                warn!(language, error = %e, "initialize handshake failed");
                client.terminate().await;
                Err(match e {
                    LspError::Handshake(_) => e,
                    other => LspError::Handshake(other.to_string()),
                })
            }
        }
    }

    async fn initialize(&self, options: &ClientOptions) -> Result<Option<ClientInfo>, LspError> {
        let params = InitializeParams {
            process_id: std::process::id(),
            root_uri: path_to_uri(&options.root.to_string_lossy()),
            capabilities: client_capabilities(),
            client_info: ClientInfo {
                name: "polyglot".into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            },
        };
        let value = self
            .connection
            .call_with_timeout(ClientRequest::Initialize(params), self.request_timeout)
            .await?;
        let result: InitializeResult = serde_json::from_value(value)
            .map_err(|e| LspError::Handshake(format!("malformed initialize result: {}", e)))?;
        self.connection.notify(ClientNotification::Initialized).await?;
        Ok(result.server_info)
    }

    /// The language this client serves.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Server name reported during the handshake.
    pub fn server_name(&self) -> Option<&str> {
        self.server_info.as_ref().map(|info| info.name.as_str())
    }

    /// Current state. A ready client whose connection dropped reports
    /// `Terminated`.
    pub fn state(&self) -> ClientState {
        let state = *lock(&self.state);
        if state == ClientState::Ready && self.connection.is_closed() {
            return ClientState::Terminated;
        }
        state
    }

    /// Whether operations are currently accepted.
    pub fn is_ready(&self) -> bool {
        self.state() == ClientState::Ready
    }

    fn set_state(&self, state: ClientState) {
        *lock(&self.state) = state;
    }

    fn ensure_ready(&self) -> Result<(), LspError> {
        match self.state() {
            ClientState::Ready => Ok(()),
            state => Err(LspError::Transport(format!(
                "{} server is not ready ({:?})",
                self.language, state
            ))),
        }
    }

    /// Send `textDocument/didOpen` with the full text at version 1.
    pub async fn did_open(&self, uri: &str, text: &str) -> Result<(), LspError> {
        self.ensure_ready()?;
        lock(&self.versions).insert(uri.to_string(), 1);
        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.to_string(),
                language_id: self.language.clone(),
                version: 1,
                text: text.to_string(),
            },
        };
        self.connection.notify(ClientNotification::DidOpen(params)).await
    }

    /// Send `textDocument/didChange` replacing the whole document.
    pub async fn did_change(&self, uri: &str, text: &str) -> Result<(), LspError> {
        self.ensure_ready()?;
        let version = {
            let mut versions = lock(&self.versions);
            let version = versions.entry(uri.to_string()).or_insert(1);
            *version += 1;
            *version
        };
        let params = DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: uri.to_string(),
                version,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                text: text.to_string(),
            }],
        };
        self.connection
            .notify(ClientNotification::DidChange(params))
            .await
    }

    /// Send `textDocument/didSave` including the saved text.
    pub async fn did_save(&self, uri: &str, text: &str) -> Result<(), LspError> {
        self.ensure_ready()?;
        let params = DidSaveTextDocumentParams {
            text_document: TextDocumentIdentifier {
                uri: uri.to_string(),
            },
            text: Some(text.to_string()),
        };
        self.connection.notify(ClientNotification::DidSave(params)).await
    }

    /// Request completions at `position`.
    pub async fn completion(
        &self,
        uri: &str,
        position: Position,
    ) -> Result<Vec<CompletionItem>, LspError> {
        self.ensure_ready()?;
        let params = CompletionParams {
            text_document: TextDocumentIdentifier {
                uri: uri.to_string(),
            },
            position,
        };
        let value = self
            .connection
            .call_with_timeout(ClientRequest::Completion(params), self.request_timeout)
            .await?;
        let response: CompletionResponse = serde_json::from_value(value)
            .map_err(|e| LspError::Protocol(format!("malformed completion result: {}", e)))?;
        Ok(response.into_items())
    }

    /// Cached diagnostics for `uri`. Never blocks on the server.
    pub fn diagnostics(&self, uri: &str) -> Vec<Diagnostic> {
        lock(&self.diagnostics).get(&normalize_uri(uri))
    }

    /// Snapshot of every cached diagnostics entry.
    pub fn diagnostic_set(&self) -> DiagnosticSet {
        lock(&self.diagnostics).clone()
    }

    /// Send `shutdown`, close the connection, and kill the process if it
    /// is still running.
    ///
    /// Only the first call does any work.
    pub async fn shutdown(&self) {
        {
            let mut state = lock(&self.state);
            match *state {
                ClientState::ShuttingDown | ClientState::Terminated => return,
                _ => *state = ClientState::ShuttingDown,
            }
        }
        info!(language = %self.language, "shutting down language server");
        match tokio::time::timeout(
            SHUTDOWN_NOTICE_TIMEOUT,
            self.connection.notify(ClientNotification::Shutdown),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(language = %self.language, error = %e, "shutdown notification not sent")
            }
            Err(_) => warn!(language = %self.language, "server is not reading; skipping shutdown notification"),
        }
        self.terminate().await;
    }

    async fn terminate(&self) {
        if let Err(e) = self.connection.close().await {
            debug!(language = %self.language, error = %e, "error closing connection");
        }
        if let Some(mut child) = self.child.lock().await.take() {
            match child.try_wait() {
                Ok(Some(status)) => debug!(language = %self.language, %status, "server already exited"),
                _ => {
                    if let Err(e) = child.kill().await {
                        warn!(language = %self.language, error = %e, "failed to kill server");
                    }
                }
            }
        }
        self.set_state(ClientState::Terminated);
    }
}

impl std::fmt::Debug for LanguageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageClient")
            .field("language", &self.language)
            .field("state", &self.state())
            .field("server", &self.server_name())
            .finish()
    }
}
