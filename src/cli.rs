//! Command-line parsing.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Default time `check` waits for a server to publish diagnostics.
pub const DEFAULT_WAIT_MS: u64 = 5_000;

pub const USAGE: &str = "\
usage: polyglot [--config <file>] [--log-stderr] <command>

commands:
  check <file> [--lang <id>] [--wait-ms <n>]   print diagnostics for a file
  complete <file> <line> <col> [--lang <id>]   print completion labels (zero-based position)
  servers                                      list configured language servers
  help                                         show this message
";

/// What to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a file and print the diagnostics its server publishes.
    Check {
        file: PathBuf,
        language: String,
        wait_ms: u64,
    },
    /// Print completion labels at a position.
    Complete {
        file: PathBuf,
        language: String,
        line: u32,
        column: u32,
    },
    /// Print the effective command table.
    Servers,
    /// Print usage.
    Help,
}

/// Parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub command: Command,
    /// Explicit config file replacing the default lookup.
    pub config: Option<PathBuf>,
    /// Log to stderr instead of the log file.
    pub log_stderr: bool,
}

/// Parse arguments, excluding the program name.
pub fn parse<I>(args: I) -> Result<Cli>
where
    I: IntoIterator<Item = String>,
{
    let mut config = None;
    let mut log_stderr = false;
    let mut help = false;
    let mut language = String::new();
    let mut wait_ms = DEFAULT_WAIT_MS;
    let mut positional = Vec::new();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config = Some(PathBuf::from(value_for(&mut args, "--config")?)),
            "--log-stderr" => log_stderr = true,
            "--lang" => language = value_for(&mut args, "--lang")?,
            "--wait-ms" => {
                let value = value_for(&mut args, "--wait-ms")?;
                wait_ms = value
                    .parse()
                    .with_context(|| format!("invalid --wait-ms value: {}", value))?;
            }
            "-h" | "--help" => help = true,
            flag if flag.starts_with("--") => bail!("unknown option: {}", flag),
            _ => positional.push(arg),
        }
    }

    if help {
        return Ok(Cli {
            command: Command::Help,
            config,
            log_stderr,
        });
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        None | Some("help") => Command::Help,
        Some("servers") => Command::Servers,
        Some("check") => {
            let file = positional.next().context("check: missing <file>")?;
            Command::Check {
                file: PathBuf::from(file),
                language,
                wait_ms,
            }
        }
        Some("complete") => {
            let file = positional.next().context("complete: missing <file>")?;
            let line = number(positional.next(), "line")?;
            let column = number(positional.next(), "col")?;
            Command::Complete {
                file: PathBuf::from(file),
                language,
                line,
                column,
            }
        }
        Some(other) => bail!("unknown command: {}", other),
    };

    if let Some(extra) = positional.next() {
        bail!("unexpected argument: {}", extra);
    }

    Ok(Cli {
        command,
        config,
        log_stderr,
    })
}

fn value_for(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next()
        .with_context(|| format!("{} requires a value", flag))
}

fn number(arg: Option<String>, name: &str) -> Result<u32> {
    let arg = arg.with_context(|| format!("complete: missing <{}>", name))?;
    arg.parse()
        .with_context(|| format!("invalid <{}>: {}", name, arg))
}
