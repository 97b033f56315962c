//! Language id to server command lookup.
use std::collections::BTreeMap;

/// Built-in launch table: language id, executable, arguments.
const BUILTIN_SERVERS: &[(&str, &[&str])] = &[
    ("go", &["gopls"]),
    ("rust", &["rust-analyzer"]),
    ("python", &["pylsp"]),
    ("java", &["jdtls"]),
    ("c", &["clangd"]),
    ("cpp", &["clangd"]),
    ("javascript", &["typescript-language-server", "--stdio"]),
    ("typescript", &["typescript-language-server", "--stdio"]),
    ("html", &["vscode-html-language-server", "--stdio"]),
    ("css", &["vscode-css-language-server", "--stdio"]),
    ("json", &["vscode-json-language-server", "--stdio"]),
    ("xml", &["lemminx"]),
    ("markdown", &["marksman", "server"]),
];

/// The command used to start one language's server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageServerSpec {
    /// Lowercase language identifier.
    pub language: String,
    /// Executable followed by its arguments.
    pub command: Vec<String>,
}

impl LanguageServerSpec {
    /// Create a spec, normalizing the language id to lowercase.
    pub fn new(language: &str, command: Vec<String>) -> Self {
        Self {
            language: normalize_language(language),
            command,
        }
    }

    /// The executable name, if the command is non-empty.
    pub fn program(&self) -> Option<&str> {
        self.command.first().map(String::as_str)
    }

    /// Arguments passed after the executable.
    pub fn args(&self) -> &[String] {
        self.command.get(1..).unwrap_or(&[])
    }
}

/// Lowercase and trim a language identifier.
pub fn normalize_language(language: &str) -> String {
    language.trim().to_ascii_lowercase()
}

/// Static mapping from language id to server command.
///
/// Lookups are case-insensitive. The table is read-only once handed to a
/// [`ServerManager`](crate::ServerManager).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    servers: BTreeMap<String, Vec<String>>,
}

impl CommandTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table of well-known language servers.
    pub fn builtin() -> Self {
        let servers = BUILTIN_SERVERS
            .iter()
            .map(|(lang, cmd)| {
                (
                    (*lang).to_string(),
                    cmd.iter().map(|s| (*s).to_string()).collect(),
                )
            })
            .collect();
        Self { servers }
    }

    /// Add or replace the entry for a language.
    ///
    /// An empty command removes the language from the table.
    pub fn insert(&mut self, spec: LanguageServerSpec) {
        if spec.command.is_empty() {
            self.servers.remove(&spec.language);
        } else {
            self.servers.insert(spec.language, spec.command);
        }
    }

    /// Command tokens for `language`; empty when the language is unsupported.
    pub fn command_for(&self, language: &str) -> &[String] {
        self.servers
            .get(&normalize_language(language))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Look up the full spec for `language`.
    pub fn spec_for(&self, language: &str) -> Option<LanguageServerSpec> {
        let language = normalize_language(language);
        self.servers
            .get(&language)
            .map(|command| LanguageServerSpec {
                language,
                command: command.clone(),
            })
    }

    /// Whether `language` has a server entry.
    pub fn supports(&self, language: &str) -> bool {
        !self.command_for(language).is_empty()
    }

    /// All language ids in the table, sorted.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }

    /// Number of languages in the table.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_go_is_gopls() {
        let table = CommandTable::builtin();
        assert_eq!(table.command_for("go"), ["gopls"]);
    }

    #[test]
    fn builtin_typescript_uses_stdio() {
        let table = CommandTable::builtin();
        assert_eq!(
            table.command_for("typescript"),
            ["typescript-language-server", "--stdio"]
        );
        assert_eq!(
            table.command_for("javascript"),
            table.command_for("typescript")
        );
    }

    #[test]
    fn builtin_c_and_cpp_share_clangd() {
        let table = CommandTable::builtin();
        assert_eq!(table.command_for("c"), ["clangd"]);
        assert_eq!(table.command_for("cpp"), ["clangd"]);
    }

    #[test]
    fn builtin_markdown_has_server_arg() {
        let table = CommandTable::builtin();
        let spec = table.spec_for("markdown").unwrap();
        assert_eq!(spec.program(), Some("marksman"));
        assert_eq!(spec.args(), ["server"]);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let table = CommandTable::builtin();
        assert_eq!(table.command_for("PYTHON"), ["pylsp"]);
        assert_eq!(table.command_for(" Rust "), ["rust-analyzer"]);
    }

    #[test]
    fn unknown_language_is_empty() {
        let table = CommandTable::builtin();
        assert!(table.command_for("cobol").is_empty());
        assert!(table.command_for("").is_empty());
        assert!(!table.supports("cobol"));
        assert!(table.spec_for("cobol").is_none());
    }

    #[test]
    fn insert_overrides_builtin() {
        let mut table = CommandTable::builtin();
        table.insert(LanguageServerSpec::new(
            "Python",
            vec!["pyright-langserver".into(), "--stdio".into()],
        ));
        assert_eq!(
            table.command_for("python"),
            ["pyright-langserver", "--stdio"]
        );
    }

    #[test]
    fn insert_extends_table() {
        let mut table = CommandTable::builtin();
        let before = table.len();
        table.insert(LanguageServerSpec::new("zig", vec!["zls".into()]));
        assert_eq!(table.len(), before + 1);
        assert!(table.supports("zig"));
    }

    #[test]
    fn insert_empty_command_removes() {
        let mut table = CommandTable::builtin();
        table.insert(LanguageServerSpec::new("java", vec![]));
        assert!(!table.supports("java"));
    }

    #[test]
    fn languages_are_sorted() {
        let table = CommandTable::builtin();
        let langs: Vec<&str> = table.languages().collect();
        let mut sorted = langs.clone();
        sorted.sort_unstable();
        assert_eq!(langs, sorted);
        assert_eq!(langs.len(), 13);
    }

    #[test]
    fn empty_table() {
        let table = CommandTable::new();
        assert!(table.is_empty());
        assert!(table.command_for("go").is_empty());
    }

    #[test]
    fn spec_args_empty_for_bare_program() {
        let spec = LanguageServerSpec::new("go", vec!["gopls".into()]);
        assert_eq!(spec.program(), Some("gopls"));
        assert!(spec.args().is_empty());
        let empty = LanguageServerSpec::new("go", vec![]);
        assert_eq!(empty.program(), None);
        assert!(empty.args().is_empty());
    }
}
