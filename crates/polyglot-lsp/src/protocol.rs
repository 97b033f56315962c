//! Typed JSON-RPC messages for the supported LSP methods.
//!
//! Outbound traffic is built from [`ClientRequest`] and
//! [`ClientNotification`]. Inbound frames decode into [`ServerMessage`];
//! notifications outside the handled set are rejected rather than passed
//! through as raw JSON.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::LspError;
use crate::types::{Diagnostic, Position};

const JSONRPC_VERSION: &str = "2.0";

/// `initialize` request parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Process id of the client.
    pub process_id: u32,
    /// Workspace root as a `file://` URI.
    pub root_uri: String,
    /// Client capabilities.
    pub capabilities: Value,
    /// Client name and version.
    pub client_info: ClientInfo,
}

/// Name and version of a protocol participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Name.
    pub name: String,
    /// Version, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// `initialize` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Server capabilities; required by the protocol.
    pub capabilities: Value,
    /// Server name and version.
    #[serde(default)]
    pub server_info: Option<ClientInfo>,
}

/// An open document's full content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentItem {
    /// Document URI.
    pub uri: String,
    /// Language id.
    pub language_id: String,
    /// Document version.
    pub version: i32,
    /// Full text.
    pub text: String,
}

/// A document reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocumentIdentifier {
    /// Document URI.
    pub uri: String,
}

/// A document reference at a specific version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedTextDocumentIdentifier {
    /// Document URI.
    pub uri: String,
    /// Document version.
    pub version: i32,
}

/// A whole-document content change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocumentContentChangeEvent {
    /// The new full text.
    pub text: String,
}

/// `textDocument/didOpen` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenTextDocumentParams {
    /// The opened document.
    pub text_document: TextDocumentItem,
}

/// `textDocument/didChange` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidChangeTextDocumentParams {
    /// The changed document.
    pub text_document: VersionedTextDocumentIdentifier,
    /// Content changes; always one full-text replacement.
    pub content_changes: Vec<TextDocumentContentChangeEvent>,
}

/// `textDocument/didSave` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidSaveTextDocumentParams {
    /// The saved document.
    pub text_document: TextDocumentIdentifier,
    /// Content at save time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// `textDocument/completion` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionParams {
    /// The document.
    pub text_document: TextDocumentIdentifier,
    /// Cursor position.
    pub position: Position,
}

/// `textDocument/publishDiagnostics` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishDiagnosticsParams {
    /// Document URI.
    pub uri: String,
    /// Document version the diagnostics apply to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    /// The complete diagnostic list for the document.
    pub diagnostics: Vec<Diagnostic>,
}

/// `window/logMessage` and `window/showMessage` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageParams {
    /// 1 error, 2 warning, 3 info, 4 log.
    #[serde(rename = "type")]
    pub kind: u8,
    /// The message.
    pub message: String,
}

/// Requests the client sends.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// `initialize`
    Initialize(InitializeParams),
    /// `textDocument/completion`
    Completion(CompletionParams),
}

impl ClientRequest {
    /// The LSP method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Initialize(_) => "initialize",
            Self::Completion(_) => "textDocument/completion",
        }
    }

    fn params(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Initialize(p) => serde_json::to_value(p),
            Self::Completion(p) => serde_json::to_value(p),
        }
    }

    /// Serialize as a JSON-RPC request body.
    pub fn encode(&self, id: i64) -> Result<String, LspError> {
        let params = self
            .params()
            .map_err(|e| LspError::Protocol(format!("{}: {}", self.method(), e)))?;
        Ok(serde_json::json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "method": self.method(),
            "params": params,
        })
        .to_string())
    }
}

/// Notifications the client sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNotification {
    /// `initialized`
    Initialized,
    /// `textDocument/didOpen`
    DidOpen(DidOpenTextDocumentParams),
    /// `textDocument/didChange`
    DidChange(DidChangeTextDocumentParams),
    /// `textDocument/didSave`
    DidSave(DidSaveTextDocumentParams),
    /// `shutdown`, sent without expecting an answer.
    Shutdown,
}

impl ClientNotification {
    /// The LSP method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::DidOpen(_) => "textDocument/didOpen",
            Self::DidChange(_) => "textDocument/didChange",
            Self::DidSave(_) => "textDocument/didSave",
            Self::Shutdown => "shutdown",
        }
    }

    fn params(&self) -> Result<Option<Value>, serde_json::Error> {
        let value = match self {
            Self::Initialized => Value::Object(serde_json::Map::new()),
            Self::DidOpen(p) => serde_json::to_value(p)?,
            Self::DidChange(p) => serde_json::to_value(p)?,
            Self::DidSave(p) => serde_json::to_value(p)?,
            Self::Shutdown => return Ok(None),
        };
        Ok(Some(value))
    }

    /// Serialize as a JSON-RPC notification body.
    pub fn encode(&self) -> Result<String, LspError> {
        let params = self
            .params()
            .map_err(|e| LspError::Protocol(format!("{}: {}", self.method(), e)))?;
        let mut message = serde_json::json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": self.method(),
        });
        if let Some(params) = params {
            message["params"] = params;
        }
        Ok(message.to_string())
    }
}

/// The error object of a failed JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

impl From<RpcError> for LspError {
    fn from(err: RpcError) -> Self {
        LspError::Rpc {
            code: err.code,
            message: err.message,
        }
    }
}

/// Notifications the client handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerNotification {
    /// `textDocument/publishDiagnostics`
    PublishDiagnostics(PublishDiagnosticsParams),
    /// `window/logMessage`
    LogMessage(MessageParams),
    /// `window/showMessage`
    ShowMessage(MessageParams),
}

impl ServerNotification {
    /// Decode a notification by method name.
    ///
    /// Unknown methods give `UnsupportedMethod`; a payload that does not
    /// match the method's shape gives `Protocol`.
    pub fn decode(method: &str, params: Value) -> Result<Self, LspError> {
        fn parse<T: serde::de::DeserializeOwned>(method: &str, params: Value) -> Result<T, LspError> {
            serde_json::from_value(params)
                .map_err(|e| LspError::Protocol(format!("malformed {} params: {}", method, e)))
        }
        match method {
            "textDocument/publishDiagnostics" => {
                parse(method, params).map(Self::PublishDiagnostics)
            }
            "window/logMessage" => parse(method, params).map(Self::LogMessage),
            "window/showMessage" => parse(method, params).map(Self::ShowMessage),
            other => Err(LspError::UnsupportedMethod(other.to_string())),
        }
    }

    /// The LSP method name.
    pub fn method(&self) -> &'static str {
        match self {
            Self::PublishDiagnostics(_) => "textDocument/publishDiagnostics",
            Self::LogMessage(_) => "window/logMessage",
            Self::ShowMessage(_) => "window/showMessage",
        }
    }
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Answer to one of our requests.
    Response {
        /// Id of the request being answered.
        id: i64,
        /// Result value or the server's error object.
        outcome: Result<Value, RpcError>,
    },
    /// A request from the server. The id is echoed back verbatim.
    Request {
        /// Request id (number or string).
        id: Value,
        /// Method name.
        method: String,
    },
    /// A handled notification.
    Notification(ServerNotification),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Decode one frame body.
pub fn decode_message(body: &str) -> Result<ServerMessage, LspError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| LspError::Protocol(format!("invalid JSON-RPC message: {}", e)))?;
    match (envelope.id, envelope.method) {
        (Some(id), Some(method)) => Ok(ServerMessage::Request { id, method }),
        (Some(id), None) => {
            let id = id
                .as_i64()
                .ok_or_else(|| LspError::Protocol(format!("response id is not an integer: {}", id)))?;
            let outcome = match envelope.error {
                Some(err) => Err(err),
                None => Ok(envelope.result.unwrap_or(Value::Null)),
            };
            Ok(ServerMessage::Response { id, outcome })
        }
        (None, Some(method)) => {
            let params = envelope.params.unwrap_or(Value::Null);
            ServerNotification::decode(&method, params).map(ServerMessage::Notification)
        }
        (None, None) => Err(LspError::Protocol(
            "message has neither id nor method".into(),
        )),
    }
}

/// Body answering a server request with a null result.
pub fn encode_null_response(id: &Value) -> String {
    serde_json::json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": Value::Null,
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: &str) -> Value {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn encode_initialize_request() {
        let req = ClientRequest::Initialize(InitializeParams {
            process_id: 42,
            root_uri: "file:///work".into(),
            capabilities: json!({}),
            client_info: ClientInfo {
                name: "polyglot".into(),
                version: None,
            },
        });
        let msg = parse(&req.encode(1).unwrap());
        assert_eq!(msg["jsonrpc"], "2.0");
        assert_eq!(msg["id"], 1);
        assert_eq!(msg["method"], "initialize");
        assert_eq!(msg["params"]["processId"], 42);
        assert_eq!(msg["params"]["rootUri"], "file:///work");
        assert_eq!(msg["params"]["clientInfo"]["name"], "polyglot");
    }

    #[test]
    fn encode_completion_request() {
        let req = ClientRequest::Completion(CompletionParams {
            text_document: TextDocumentIdentifier {
                uri: "file:///a.py".into(),
            },
            position: Position::new(3, 7),
        });
        let msg = parse(&req.encode(9).unwrap());
        assert_eq!(msg["method"], "textDocument/completion");
        assert_eq!(msg["params"]["textDocument"]["uri"], "file:///a.py");
        assert_eq!(msg["params"]["position"], json!({"line": 3, "character": 7}));
    }

    #[test]
    fn encode_did_open_notification() {
        let note = ClientNotification::DidOpen(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: "file:///tmp/x.py".into(),
                language_id: "python".into(),
                version: 1,
                text: "def f(): pass".into(),
            },
        });
        let msg = parse(&note.encode().unwrap());
        assert!(msg.get("id").is_none());
        assert_eq!(msg["method"], "textDocument/didOpen");
        assert_eq!(msg["params"]["textDocument"]["languageId"], "python");
        assert_eq!(msg["params"]["textDocument"]["text"], "def f(): pass");
    }

    #[test]
    fn encode_did_change_sends_full_text() {
        let note = ClientNotification::DidChange(DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: "file:///a.go".into(),
                version: 2,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                text: "package main".into(),
            }],
        });
        let msg = parse(&note.encode().unwrap());
        assert_eq!(msg["params"]["textDocument"]["version"], 2);
        assert_eq!(msg["params"]["contentChanges"], json!([{"text": "package main"}]));
    }

    #[test]
    fn encode_initialized_has_empty_params() {
        let msg = parse(&ClientNotification::Initialized.encode().unwrap());
        assert_eq!(msg["method"], "initialized");
        assert_eq!(msg["params"], json!({}));
    }

    #[test]
    fn encode_shutdown_has_no_params() {
        let msg = parse(&ClientNotification::Shutdown.encode().unwrap());
        assert_eq!(msg["method"], "shutdown");
        assert!(msg.get("params").is_none());
        assert!(msg.get("id").is_none());
    }

    #[test]
    fn decode_success_response() {
        let msg = decode_message(r#"{"jsonrpc":"2.0","id":3,"result":{"ok":true}}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Response {
                id: 3,
                outcome: Ok(json!({"ok": true}))
            }
        );
    }

    #[test]
    fn decode_null_result_response() {
        let msg = decode_message(r#"{"jsonrpc":"2.0","id":4,"result":null}"#).unwrap();
        assert_eq!(
            msg,
            ServerMessage::Response {
                id: 4,
                outcome: Ok(Value::Null)
            }
        );
    }

    #[test]
    fn decode_error_response() {
        let msg = decode_message(
            r#"{"jsonrpc":"2.0","id":5,"error":{"code":-32601,"message":"not found"}}"#,
        )
        .unwrap();
        match msg {
            ServerMessage::Response { id, outcome: Err(err) } => {
                assert_eq!(id, 5);
                assert_eq!(err.code, -32601);
                let lsp: LspError = err.into();
                assert!(matches!(lsp, LspError::Rpc { code: -32601, .. }));
            }
            other => panic!("expected error response, got: {:?}", other),
        }
    }

    #[test]
    fn decode_response_with_string_id_fails() {
        let result = decode_message(r#"{"jsonrpc":"2.0","id":"abc","result":null}"#);
        assert!(matches!(result, Err(LspError::Protocol(_))));
    }

    #[test]
    fn decode_server_request_keeps_id() {
        let msg = decode_message(
            r#"{"jsonrpc":"2.0","id":"cfg-1","method":"workspace/configuration","params":{}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ServerMessage::Request {
                id: json!("cfg-1"),
                method: "workspace/configuration".into()
            }
        );
    }

    #[test]
    fn decode_publish_diagnostics() {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "textDocument/publishDiagnostics",
            "params": {
                "uri": "file:///tmp/x.py",
                "diagnostics": [{
                    "range": {
                        "start": {"line": 0, "character": 0},
                        "end": {"line": 0, "character": 1}
                    },
                    "message": "undefined name 'f'"
                }]
            }
        })
        .to_string();
        match decode_message(&body).unwrap() {
            ServerMessage::Notification(ServerNotification::PublishDiagnostics(p)) => {
                assert_eq!(p.uri, "file:///tmp/x.py");
                assert_eq!(p.diagnostics.len(), 1);
                assert_eq!(p.diagnostics[0].message, "undefined name 'f'");
            }
            other => panic!("expected PublishDiagnostics, got: {:?}", other),
        }
    }

    #[test]
    fn decode_malformed_publish_diagnostics_is_protocol_error() {
        let body = r#"{"jsonrpc":"2.0","method":"textDocument/publishDiagnostics","params":{"uri":"file:///x"}}"#;
        match decode_message(body) {
            Err(LspError::Protocol(msg)) => assert!(msg.contains("publishDiagnostics")),
            other => panic!("expected Protocol, got: {:?}", other),
        }
    }

    #[test]
    fn decode_log_message() {
        let body = r#"{"jsonrpc":"2.0","method":"window/logMessage","params":{"type":3,"message":"indexing"}}"#;
        assert_eq!(
            decode_message(body).unwrap(),
            ServerMessage::Notification(ServerNotification::LogMessage(MessageParams {
                kind: 3,
                message: "indexing".into()
            }))
        );
    }

    #[test]
    fn decode_unknown_notification_is_unsupported() {
        let body = r#"{"jsonrpc":"2.0","method":"$/progress","params":{}}"#;
        match decode_message(body) {
            Err(LspError::UnsupportedMethod(m)) => assert_eq!(m, "$/progress"),
            other => panic!("expected UnsupportedMethod, got: {:?}", other),
        }
    }

    #[test]
    fn decode_invalid_json() {
        assert!(matches!(
            decode_message("not json"),
            Err(LspError::Protocol(_))
        ));
    }

    #[test]
    fn decode_neither_id_nor_method() {
        assert!(matches!(
            decode_message(r#"{"jsonrpc":"2.0"}"#),
            Err(LspError::Protocol(_))
        ));
    }

    #[test]
    fn null_response_echoes_id() {
        let msg = parse(&encode_null_response(&json!(7)));
        assert_eq!(msg["id"], 7);
        assert_eq!(msg["result"], Value::Null);
        assert!(msg.as_object().unwrap().contains_key("result"));
    }

    #[test]
    fn notification_method_names() {
        let params = MessageParams {
            kind: 1,
            message: "x".into(),
        };
        assert_eq!(
            ServerNotification::ShowMessage(params).method(),
            "window/showMessage"
        );
        assert_eq!(ClientNotification::Shutdown.method(), "shutdown");
    }
}
