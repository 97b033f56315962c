use crate::config::Config;
use crate::error::ConfigError;

/// Validate a [`Config`], returning all detected violations.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |key: String, reason: String| {
        errors.push(ConfigError::Invalid { key, reason });
    };

    if let Some(file) = &config.log.file {
        if file.as_os_str().is_empty() {
            invalid("log.file".into(), "must not be empty".into());
        }
    }

    for (language, server) in &config.lsp.servers {
        if language.trim().is_empty() {
            invalid(
                "lsp.servers".into(),
                "language id must not be empty".into(),
            );
        }
        let field = format!("lsp.servers.{}", language);
        if server.command.trim().is_empty() {
            invalid(format!("{}.command", field), "must not be empty".into());
        }
        for ext in &server.extensions {
            if ext.is_empty() {
                invalid(format!("{}.extensions", field), "must not contain empty entries".into());
            } else if ext.starts_with('.') {
                invalid(
                    format!("{}.extensions", field),
                    format!("write {:?} without the leading dot", ext),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
