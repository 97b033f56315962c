//! LSP data types.
//!
//! These mirror the subset of the Language Server Protocol (v3.17) that
//! the manager exchanges with servers: positions, diagnostics and
//! completion items.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use url::Url;

const FILE_SCHEME: &str = "file://";

/// Convert a filesystem path to a percent-encoded `file://` URI.
///
/// Relative paths are resolved against the current working directory.
/// Input that already carries the `file://` scheme is normalized with
/// [`normalize_uri`].
pub fn path_to_uri(path: &str) -> String {
    if path.starts_with(FILE_SCHEME) {
        return normalize_uri(path);
    }
    let path = Path::new(path);
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };
    match Url::from_file_path(&abs) {
        Ok(url) => url.to_string(),
        Err(()) => format!("{}{}", FILE_SCHEME, abs.to_string_lossy()),
    }
}

/// Canonical form of a `file://` URI, so `/a b` and `/a%20b` compare equal.
///
/// Other schemes and unparsable input are returned unchanged.
pub fn normalize_uri(uri: &str) -> String {
    Url::parse(uri)
        .ok()
        .filter(|url| url.scheme() == "file")
        .and_then(|url| url.to_file_path().ok())
        .and_then(|path| Url::from_file_path(path).ok())
        .map(String::from)
        .unwrap_or_else(|| uri.to_string())
}

/// Convert a `file://` URI back to a filesystem path, decoding escapes.
pub fn uri_to_path(uri: &str) -> PathBuf {
    Url::parse(uri)
        .ok()
        .and_then(|url| url.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(uri.strip_prefix(FILE_SCHEME).unwrap_or(uri)))
}

/// Zero-based line and character offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Position {
    /// Zero-based line number.
    pub line: u32,
    /// Zero-based character offset (UTF-16).
    pub character: u32,
}

impl Position {
    /// Create a new position.
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Start and end positions in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Range {
    /// Start position (inclusive).
    pub start: Position,
    /// End position (exclusive).
    pub end: Position,
}

impl Range {
    /// Create a new range.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Diagnostic severity levels, encoded as integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DiagnosticSeverity {
    /// Reports an error.
    Error = 1,
    /// Reports a warning.
    Warning = 2,
    /// Reports an information.
    Information = 3,
    /// Reports a hint.
    Hint = 4,
}

impl DiagnosticSeverity {
    /// Lowercase label used in human-readable output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

impl TryFrom<u8> for DiagnosticSeverity {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        match value {
            1 => Ok(Self::Error),
            2 => Ok(Self::Warning),
            3 => Ok(Self::Information),
            4 => Ok(Self::Hint),
            other => Err(format!("invalid diagnostic severity: {}", other)),
        }
    }
}

impl From<DiagnosticSeverity> for u8 {
    fn from(severity: DiagnosticSeverity) -> Self {
        severity as u8
    }
}

/// A diagnostic code, which servers send as either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    /// Numeric code.
    Number(i64),
    /// String code.
    String(String),
}

/// A diagnostic message from the language server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The range at which the diagnostic applies.
    pub range: Range,
    /// The severity of the diagnostic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<DiagnosticSeverity>,
    /// The diagnostic's code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<NumberOrString>,
    /// The diagnostic's source (e.g. "pyflakes", "rustc").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// The diagnostic's message.
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with only a range and message.
    pub fn new(range: Range, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: None,
            code: None,
            source: None,
            message: message.into(),
        }
    }

    /// Set the severity.
    pub fn with_severity(mut self, severity: DiagnosticSeverity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// Completion item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[allow(missing_docs)]
pub enum CompletionItemKind {
    Text = 1,
    Method = 2,
    Function = 3,
    Constructor = 4,
    Field = 5,
    Variable = 6,
    Class = 7,
    Interface = 8,
    Module = 9,
    Property = 10,
    Unit = 11,
    Value = 12,
    Enum = 13,
    Keyword = 14,
    Snippet = 15,
    Color = 16,
    File = 17,
    Reference = 18,
    Folder = 19,
    EnumMember = 20,
    Constant = 21,
    Struct = 22,
    Event = 23,
    Operator = 24,
    TypeParameter = 25,
}

impl TryFrom<u8> for CompletionItemKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, String> {
        use CompletionItemKind::*;
        const KINDS: [CompletionItemKind; 25] = [
            Text,
            Method,
            Function,
            Constructor,
            Field,
            Variable,
            Class,
            Interface,
            Module,
            Property,
            Unit,
            Value,
            Enum,
            Keyword,
            Snippet,
            Color,
            File,
            Reference,
            Folder,
            EnumMember,
            Constant,
            Struct,
            Event,
            Operator,
            TypeParameter,
        ];
        usize::from(value)
            .checked_sub(1)
            .and_then(|i| KINDS.get(i).copied())
            .ok_or_else(|| format!("invalid completion item kind: {}", value))
    }
}

impl From<CompletionItemKind> for u8 {
    fn from(kind: CompletionItemKind) -> Self {
        kind as u8
    }
}

/// Markup content (plaintext or markdown).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupContent {
    /// The type of the markup content.
    pub kind: String,
    /// The content itself.
    pub value: String,
}

/// Completion documentation: a bare string or markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Documentation {
    /// Plain string.
    Text(String),
    /// Markup content.
    Markup(MarkupContent),
}

impl Documentation {
    /// The documentation text regardless of representation.
    pub fn value(&self) -> &str {
        match self {
            Self::Text(s) => s,
            Self::Markup(m) => &m.value,
        }
    }
}

/// A completion item returned by the language server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    /// The label of this completion item.
    pub label: String,
    /// The kind of this completion item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CompletionItemKind>,
    /// A human-readable string with additional information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The documentation for this completion item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<Documentation>,
    /// Text inserted when this completion is selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_text: Option<String>,
    /// Text used to sort this item among others.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_text: Option<String>,
}

impl CompletionItem {
    /// Create an item with only a label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: None,
            detail: None,
            documentation: None,
            insert_text: None,
            sort_text: None,
        }
    }
}

/// A completion list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionList {
    /// More items may follow on further typing.
    #[serde(default)]
    pub is_incomplete: bool,
    /// The completion items.
    pub items: Vec<CompletionItem>,
}

/// The three shapes a `textDocument/completion` result may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionResponse {
    /// A bare array of items.
    Array(Vec<CompletionItem>),
    /// A completion list.
    List(CompletionList),
    /// No completions.
    Null(()),
}

impl CompletionResponse {
    /// Flatten into a plain item list.
    pub fn into_items(self) -> Vec<CompletionItem> {
        match self {
            Self::Array(items) => items,
            Self::List(list) => list.items,
            Self::Null(()) => Vec::new(),
        }
    }
}

/// Client capabilities sent during initialization.
pub fn client_capabilities() -> serde_json::Value {
    serde_json::json!({
        "textDocument": {
            "completion": {
                "completionItem": {
                    "snippetSupport": false,
                    "documentationFormat": ["plaintext"]
                }
            },
            "publishDiagnostics": {
                "relatedInformation": false
            },
            "synchronization": {
                "didSave": true,
                "willSave": false,
                "dynamicRegistration": false
            }
        },
        "workspace": {
            "workspaceFolders": false,
            "configuration": false
        }
    })
}
