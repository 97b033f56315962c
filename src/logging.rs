//! Log file rotation and `tracing-subscriber` setup.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use polyglot_config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Maximum size of a single log file before rotation (10 MB).
pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated log files to retain.
pub const DEFAULT_MAX_LOG_FILES: u32 = 5;

/// Ensure the parent directory of a log file exists.
pub fn ensure_log_dir(log_path: &Path) -> io::Result<()> {
    match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Rotate log files when the current file exceeds `max_size` bytes.
///
/// ```text
///   polyglot.log   -> polyglot.log.1
///   polyglot.log.1 -> polyglot.log.2
///   ...
///   polyglot.log.<max_files> is deleted
/// ```
///
/// Does nothing when the file does not exist or is smaller than `max_size`.
pub fn rotate_log_files(log_path: &Path, max_size: u64, max_files: u32) -> io::Result<()> {
    let Ok(metadata) = fs::metadata(log_path) else {
        return Ok(());
    };
    if metadata.len() < max_size {
        return Ok(());
    }

    let oldest = rotated_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for i in (1..max_files).rev() {
        let from = rotated_path(log_path, i);
        if from.exists() {
            fs::rename(&from, rotated_path(log_path, i + 1))?;
        }
    }
    fs::rename(log_path, rotated_path(log_path, 1))
}

fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let name = base.file_name().unwrap_or_default().to_string_lossy();
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}.{}", name, index))
}

/// Filter from `RUST_LOG` if set, else the configured level.
fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
}

/// Install the global subscriber.
///
/// Logs go to stderr when `to_stderr` is set; otherwise to the configured
/// file (or `default_file`), rotated first.
pub fn init(config: &LogConfig, default_file: PathBuf, to_stderr: bool) -> Result<()> {
    if to_stderr {
        tracing_subscriber::fmt()
            .with_writer(io::stderr)
            .with_env_filter(env_filter(config))
            .init();
        return Ok(());
    }

    let log_path = config.file.clone().unwrap_or(default_file);
    ensure_log_dir(&log_path)
        .with_context(|| format!("failed to create log directory for {}", log_path.display()))?;
    if let Err(e) = rotate_log_files(&log_path, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES) {
        eprintln!("polyglot: log rotation failed: {}", e);
    }

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_env_filter(env_filter(config))
        .init();

    tracing::info!(log_level = config.level.as_str(), file = %log_path.display(), "logging started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_bytes(path: &Path, len: usize) {
        fs::write(path, vec![b'x'; len]).unwrap();
    }

    #[test]
    fn ensure_log_dir_creates_parent() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("a").join("b").join("polyglot.log");
        ensure_log_dir(&log).unwrap();
        assert!(log.parent().unwrap().is_dir());
    }

    #[test]
    fn ensure_log_dir_bare_file_name() {
        ensure_log_dir(Path::new("polyglot.log")).unwrap();
    }

    #[test]
    fn rotate_missing_file_is_noop() {
        let tmp = TempDir::new().unwrap();
        rotate_log_files(&tmp.path().join("none.log"), 10, 3).unwrap();
    }

    #[test]
    fn rotate_small_file_is_noop() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("polyglot.log");
        write_bytes(&log, 5);
        rotate_log_files(&log, 10, 3).unwrap();
        assert!(log.exists());
        assert!(!rotated_path(&log, 1).exists());
    }

    #[test]
    fn rotate_shifts_files() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("polyglot.log");
        write_bytes(&log, 20);
        write_bytes(&rotated_path(&log, 1), 1);
        rotate_log_files(&log, 10, 3).unwrap();
        assert!(!log.exists());
        assert_eq!(fs::metadata(rotated_path(&log, 1)).unwrap().len(), 20);
        assert_eq!(fs::metadata(rotated_path(&log, 2)).unwrap().len(), 1);
    }

    #[test]
    fn rotate_drops_oldest() {
        let tmp = TempDir::new().unwrap();
        let log = tmp.path().join("polyglot.log");
        write_bytes(&log, 20);
        write_bytes(&rotated_path(&log, 1), 1);
        write_bytes(&rotated_path(&log, 2), 2);
        rotate_log_files(&log, 10, 2).unwrap();
        assert_eq!(fs::metadata(rotated_path(&log, 1)).unwrap().len(), 20);
        assert_eq!(fs::metadata(rotated_path(&log, 2)).unwrap().len(), 1);
        assert!(!rotated_path(&log, 3).exists());
    }

    #[test]
    fn rotated_path_appends_index() {
        let path = rotated_path(Path::new("/var/log/polyglot.log"), 4);
        assert_eq!(path, PathBuf::from("/var/log/polyglot.log.4"));
    }
}
