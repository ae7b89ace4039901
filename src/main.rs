mod cli;
mod config;
mod host;
mod runner;
mod sudo;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use config::Deployment;
use host::SystemHost;
use runner::RunOptions;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let deployment = match &cli.config {
        Some(path) => Deployment::load(path)?,
        None => Deployment::default(),
    };

    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let deployment = deployment.resolve(cli.deploy_dir.as_deref(), &cwd)?;
    deployment.validate()?;

    if sudo::is_root() {
        log::debug!("Running as root; mutations will not go through sudo");
    } else if !cli.dry_run && !cli.quiet && !cli.json {
        ui::warn("Changes run through sudo; you may be asked for your password");
    }

    let opts = RunOptions {
        dry_run: cli.dry_run,
        json: cli.json,
        verbose: cli.verbose > 0,
        quiet: cli.quiet,
    };

    runner::run(&deployment, &SystemHost::new(), opts)
}
