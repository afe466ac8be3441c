//! CLI entry point for spcookie.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

mod app_config;
mod cli;
mod commands;

use app_config::FileConfig;
use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let cli = Cli::parse();
    let loaded_config = app_config::load_default_file_config()?;

    init_tracing(default_level(&cli, loaded_config.config.as_ref()));

    // Arguments are not logged whole: `set` carries cookie values.
    debug!(
        command = cli.command.name(),
        config = ?loaded_config.path,
        config_loaded = loaded_config.config.is_some(),
        "CLI arguments parsed"
    );

    if let Command::Expires(args) = &cli.command {
        return commands::run_expires_command(args);
    }

    let cookie_file = app_config::resolve_cookie_file(
        cli.cookie_file.as_deref(),
        loaded_config.config.as_ref(),
    )?;
    info!(cookie_file = %cookie_file.display(), command = cli.command.name(), "Running");

    commands::run_cookie_command(&cli.command, &cookie_file).await
}

/// Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
fn default_level(cli: &Cli, config: Option<&FileConfig>) -> &'static str {
    if cli.quiet {
        return "error";
    }
    match cli.verbose {
        0 => config
            .and_then(|cfg| cfg.verbosity)
            .map_or("info", app_config::VerbositySetting::filter_level),
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}
