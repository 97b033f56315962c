//! Per-document diagnostics cache.
//!
//! Each publish replaces the previous list for its URI. Entries are only
//! removed by an explicit clear.
use std::collections::HashMap;

use crate::types::Diagnostic;

/// Diagnostics most recently published by one language server, keyed by URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticSet {
    store: HashMap<String, Vec<Diagnostic>>,
}

impl DiagnosticSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the diagnostics for `uri`.
    ///
    /// An empty list is stored as-is: the URI stays known with no issues.
    pub fn publish(&mut self, uri: impl Into<String>, diagnostics: Vec<Diagnostic>) {
        self.store.insert(uri.into(), diagnostics);
    }

    /// Diagnostics for `uri`; empty if nothing was ever published.
    pub fn get(&self, uri: &str) -> Vec<Diagnostic> {
        self.store.get(uri).cloned().unwrap_or_default()
    }

    /// Whether a publish has been recorded for `uri`.
    pub fn contains(&self, uri: &str) -> bool {
        self.store.contains_key(uri)
    }

    /// Drop the entry for `uri`.
    pub fn clear(&mut self, uri: &str) {
        self.store.remove(uri);
    }

    /// Drop every entry.
    pub fn clear_all(&mut self) {
        self.store.clear();
    }

    /// URIs with a recorded publish, sorted.
    pub fn uris(&self) -> Vec<&str> {
        let mut uris: Vec<&str> = self.store.keys().map(String::as_str).collect();
        uris.sort_unstable();
        uris
    }

    /// Number of URIs with a recorded publish.
    pub fn file_count(&self) -> usize {
        self.store.len()
    }

    /// Total diagnostics across all URIs.
    pub fn total_count(&self) -> usize {
        self.store.values().map(Vec::len).sum()
    }
}
