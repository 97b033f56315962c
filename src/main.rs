mod cli;
mod commands;
mod logging;
mod paths;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use polyglot_config::{load_config, load_file, Config};
use tracing::{error, info};

use crate::cli::{Cli, Command};
use crate::paths::AppPaths;

fn run(cli: Cli) -> Result<()> {
    if cli.command == Command::Help {
        print!("{}", cli::USAGE);
        return Ok(());
    }

    let paths = AppPaths::new()?;
    let cwd = env::current_dir().context("failed to read current directory")?;

    // An explicit --config must load; the default lookup falls back to
    // defaults once logging is up.
    let (config, config_err) = match &cli.config {
        Some(path) => (
            load_file(path).with_context(|| format!("failed to load {}", path.display()))?,
            None,
        ),
        None => match load_config(&paths.config_dir(), Some(&cwd)) {
            Ok(config) => (config, None),
            Err(e) => (Config::default(), Some(e)),
        },
    };

    logging::init(&config.log, paths.default_log_file(), cli.log_stderr)?;
    if let Some(e) = config_err {
        error!("config load failed, using defaults: {}", e);
    }

    let mut stdout = io::stdout().lock();
    if cli.command == Command::Servers {
        return commands::servers(&commands::command_table(&config), &mut stdout);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let manager = commands::build_manager(&config, cwd);
    let outcome = runtime.block_on(async {
        let outcome = match cli.command {
            Command::Check {
                file,
                language,
                wait_ms,
            } => commands::check(
                &manager,
                &config,
                &absolute(file)?,
                &language,
                Duration::from_millis(wait_ms),
                &mut stdout,
            )
            .await
            .map(|count| info!(count, "check finished")),
            Command::Complete {
                file,
                language,
                line,
                column,
            } => commands::complete(
                &manager,
                &config,
                &absolute(file)?,
                &language,
                line,
                column,
                &mut stdout,
            )
            .await
            .map(|count| info!(count, "completion finished")),
            Command::Servers | Command::Help => Ok(()),
        };
        manager.shutdown().await;
        outcome
    });
    stdout.flush()?;
    outcome
}

fn absolute(file: PathBuf) -> Result<PathBuf> {
    if file.is_absolute() {
        return Ok(file);
    }
    Ok(env::current_dir()
        .context("failed to read current directory")?
        .join(file))
}

fn main() {
    let result = cli::parse(env::args().skip(1)).and_then(run);
    if let Err(e) = result {
        eprintln!("polyglot: {:#}", e);
        std::process::exit(1);
    }
}
