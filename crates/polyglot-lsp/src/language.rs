//! File extension to language id resolution.
use std::collections::HashMap;
use std::path::Path;

use crate::command::normalize_language;

/// Detect a language id from a file extension (without the dot).
pub fn language_from_extension(ext: &str) -> Option<&'static str> {
    let lang = match ext.to_ascii_lowercase().as_str() {
        "go" => "go",
        "rs" => "rust",
        "py" | "pyw" | "pyi" => "python",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "c++" | "hpp" | "hh" | "hxx" => "cpp",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "mts" | "cts" | "tsx" => "typescript",
        "html" | "htm" => "html",
        "css" => "css",
        "json" | "jsonc" => "json",
        "xml" | "xsd" | "xsl" | "svg" => "xml",
        "md" | "markdown" => "markdown",
        _ => return None,
    };
    Some(lang)
}

/// Detect a language id from a file path's extension.
///
/// Returns `None` for unknown or missing extensions.
pub fn language_from_path(path: impl AsRef<Path>) -> Option<&'static str> {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .and_then(language_from_extension)
}

/// Resolve the language for an operation using the built-in extensions.
///
/// A non-empty `explicit` id wins (lowercased); otherwise the path's
/// extension decides. `None` means the caller cannot proceed.
pub fn resolve_language(explicit: &str, path: impl AsRef<Path>) -> Option<String> {
    LanguageResolver::default().resolve(explicit, path)
}

/// Extension resolver with optional user-configured extensions layered
/// over the built-in mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageResolver {
    extra: HashMap<String, String>,
}

impl LanguageResolver {
    /// A resolver using only the built-in extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `extension` to `language`, taking precedence over the
    /// built-in mapping. A leading dot is ignored.
    pub fn add_extension(&mut self, extension: &str, language: &str) {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        if ext.is_empty() {
            return;
        }
        self.extra.insert(ext, normalize_language(language));
    }

    /// Language for `path`, checking configured extensions first.
    pub fn language_for_path(&self, path: impl AsRef<Path>) -> Option<String> {
        let ext = path.as_ref().extension()?.to_str()?;
        if let Some(lang) = self.extra.get(&ext.to_ascii_lowercase()) {
            return Some(lang.clone());
        }
        language_from_extension(ext).map(str::to_string)
    }

    /// Explicit id if non-empty, else the path's language.
    pub fn resolve(&self, explicit: &str, path: impl AsRef<Path>) -> Option<String> {
        let explicit = normalize_language(explicit);
        if !explicit.is_empty() {
            return Some(explicit);
        }
        self.language_for_path(path)
    }
}
