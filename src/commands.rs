//! The `check`, `complete` and `servers` subcommands.
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use polyglot_config::Config;
use polyglot_lsp::{
    path_to_uri, CommandTable, Diagnostic, LanguageResolver, LanguageServerSpec, ServerManager,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Built-in command table with `[lsp.servers]` entries layered on top.
pub fn command_table(config: &Config) -> CommandTable {
    let mut table = CommandTable::builtin();
    for (language, entry) in &config.lsp.servers {
        table.insert(LanguageServerSpec::new(language, entry.command_line()));
    }
    table
}

/// Built-in extensions plus those configured per server.
pub fn language_resolver(config: &Config) -> LanguageResolver {
    let mut resolver = LanguageResolver::new();
    for (language, entry) in &config.lsp.servers {
        for ext in &entry.extensions {
            resolver.add_extension(ext, language);
        }
    }
    resolver
}

/// A manager configured from `config`, rooted at `root`.
pub fn build_manager(config: &Config, root: PathBuf) -> ServerManager {
    ServerManager::new()
        .with_commands(command_table(config))
        .with_resolver(language_resolver(config))
        .with_root(root)
        .with_request_timeout(config.lsp.request_timeout())
}

/// `path:line:col: severity: message`, one-based.
pub fn format_diagnostic(path: &Path, diagnostic: &Diagnostic) -> String {
    let severity = diagnostic
        .severity
        .map(|s| s.as_str())
        .unwrap_or("diagnostic");
    let mut line = format!(
        "{}:{}:{}: {}: {}",
        path.display(),
        diagnostic.range.start.line + 1,
        diagnostic.range.start.character + 1,
        severity,
        diagnostic.message
    );
    if let Some(source) = &diagnostic.source {
        line.push_str(&format!(" [{}]", source));
    }
    line
}

fn ensure_enabled(config: &Config) -> Result<()> {
    if !config.lsp.enabled {
        bail!("language servers are disabled (lsp.enabled = false)");
    }
    Ok(())
}

fn read_source(file: &Path) -> Result<(String, String)> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    Ok((file.to_string_lossy().into_owned(), text))
}

/// Open `file`, wait up to `wait` for its first diagnostics publish, and
/// print them. Returns the number printed.
pub async fn check(
    manager: &ServerManager,
    config: &Config,
    file: &Path,
    language: &str,
    wait: Duration,
    out: &mut impl Write,
) -> Result<usize> {
    ensure_enabled(config)?;
    let (path, text) = read_source(file)?;
    let uri = path_to_uri(&path);

    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.set_diagnostics_handler(move |published, _| {
        let _ = tx.send(published.to_string());
    });

    manager
        .did_open(language, &path, &text)
        .await
        .with_context(|| format!("failed to open {}", file.display()))?;

    let waited = tokio::time::timeout(wait, async {
        while let Some(published) = rx.recv().await {
            if published == uri {
                return true;
            }
        }
        false
    })
    .await;
    match waited {
        Ok(true) => debug!(%uri, "diagnostics received"),
        _ => info!(%uri, wait_ms = wait.as_millis() as u64, "no diagnostics published in time"),
    }
    manager.clear_diagnostics_handler();

    let diagnostics = manager.diagnostics(language, &path);
    for diagnostic in &diagnostics {
        writeln!(out, "{}", format_diagnostic(file, diagnostic))?;
    }
    Ok(diagnostics.len())
}

/// Open `file` and print completion labels at a zero-based position.
pub async fn complete(
    manager: &ServerManager,
    config: &Config,
    file: &Path,
    language: &str,
    line: u32,
    column: u32,
    out: &mut impl Write,
) -> Result<usize> {
    ensure_enabled(config)?;
    let (path, text) = read_source(file)?;
    manager
        .did_open(language, &path, &text)
        .await
        .with_context(|| format!("failed to open {}", file.display()))?;
    let items = manager
        .completion(language, &path, line, column)
        .await
        .context("completion request failed")?;
    for item in &items {
        match &item.detail {
            Some(detail) => writeln!(out, "{}\t{}", item.label, detail)?,
            None => writeln!(out, "{}", item.label)?,
        }
    }
    Ok(items.len())
}

/// Print `language<TAB>command` for each configured server.
pub fn servers(table: &CommandTable, out: &mut impl Write) -> Result<()> {
    for language in table.languages() {
        writeln!(out, "{}\t{}", language, table.command_for(language).join(" "))?;
    }
    Ok(())
}
