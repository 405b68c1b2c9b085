//! `blogwalk` command-line front end.
mod cli;
mod config;
mod download;

use std::process::ExitCode;

use clap::Parser;
use engine_logging::{engine_error, LogDestination};

use crate::cli::{Cli, Command};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Download(args) => {
            let config = match resolve_config(&args) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("blogwalk: {err:#}");
                    return ExitCode::FAILURE;
                }
            };
            match download::run(&args, &config).await {
                Ok(report) => report.exit_code(),
                Err(err) => {
                    engine_error!("{:#}", err);
                    eprintln!("blogwalk: {err:#}");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn resolve_config(args: &cli::DownloadArgs) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply_env()?;
    config.apply_flags(args);

    let level = config.level_filter()?;
    let destination = match (args.quiet, config.log_file.clone()) {
        (true, Some(path)) => LogDestination::File(path),
        (true, None) => LogDestination::Off,
        (false, Some(path)) => LogDestination::Both(path),
        (false, None) => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);
    Ok(config)
}
