use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{Outcome, Session};
use config::{Config, DEFAULT_LOG_LEVEL, LOG_LEVELS};

/// Titan language front end and interpreter.
///
/// Runs each FILE in order as its own unit. With no files, starts an
/// interactive session that evaluates one line at a time.
///
/// EXAMPLES:
///     titan main.tn                Run a program
///     titan -a main.tn             Analyze, then run
///     titan -a -n main.tn          Analyze only
///     titan -i lib:vendor main.tn  Search lib/ and vendor/ for imports
///     titan                        Start interactive REPL
///
/// ENVIRONMENT VARIABLES:
///     TITAN_LOG           Tracing filter, overrides --log
///     TITAN_PATH          Extra ':'-separated include directories
///     TITAN_DIAGNOSTICS   Set to 'json' for JSON diagnostics by default
///     TITAN_HISTORY_FILE  REPL history location (default ~/.titan/history)
///     TITAN_NO_HISTORY    Set to disable REPL history
///     NO_COLOR            Set to disable colored output
#[derive(Parser, Debug)]
#[command(name = "titan")]
#[command(version)]
struct Cli {
    /// Run semantic analysis before execution
    #[arg(short, long)]
    analyze: bool,

    /// Skip execution
    #[arg(short, long)]
    norun: bool,

    /// ':'-separated include directories searched for imports
    #[arg(short, long = "include", value_name = "DIRS")]
    include: Vec<String>,

    /// Tracing level
    #[arg(short, long, value_name = "LEVEL", value_parser = LOG_LEVELS)]
    log: Option<String>,

    /// Print diagnostics as JSON, one object per line
    #[arg(long)]
    json: bool,

    /// Source files to run
    #[arg(value_name = "FILES")]
    files: Vec<PathBuf>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let config = Config::load(&cwd).context("Failed to load configuration")?;

    let level = cli
        .log
        .as_deref()
        .or(config.project.log.as_deref())
        .unwrap_or(DEFAULT_LOG_LEVEL);
    init_tracing(level);

    let analyze = cli.analyze || config.project.analyze.unwrap_or(false);
    if cli.norun && !analyze {
        println!("Nothing to do");
        return Ok(ExitCode::SUCCESS);
    }

    let include_dirs = include_dirs(&cli, &config);
    config::validate_include_dirs(&include_dirs)?;
    tracing::debug!(?include_dirs, analyze, execute = !cli.norun, "resolved settings");

    let session = Session::new(
        analyze,
        !cli.norun,
        include_dirs,
        cli.json || config.default_json,
        config.color_mode(),
    );

    let outcome: Outcome = if cli.files.is_empty() {
        commands::repl::run(&session, &config)?
    } else {
        commands::run::run(&cli.files, &session)?
    };
    Ok(outcome.into())
}

/// Include directories in lookup order: flags, `titan.toml`, then TITAN_PATH
fn include_dirs(cli: &Cli, config: &Config) -> Vec<PathBuf> {
    cli.include
        .iter()
        .flat_map(|list| config::split_dirs(list))
        .chain(config.project.include.iter().cloned())
        .chain(config.path_dirs.iter().cloned())
        .collect()
}

struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(&self, _w: &mut Writer<'_>) -> std::fmt::Result {
        Ok(())
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env("TITAN_LOG").unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(NoTimestamp)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
