use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dnsr-provision")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Install the dnsR daemon as a systemd service and route its domain through systemd-resolved",
    long_about = None
)]
pub struct Cli {
    /// Deployment config file (TOML); every key is optional
    #[arg(short, long, env = "DNSR_PROVISION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the daemon runs in [default: current directory]
    #[arg(short, long)]
    pub deploy_dir: Option<PathBuf>,

    /// Show what would change without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the plan (with --dry-run) or the execution records as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}
