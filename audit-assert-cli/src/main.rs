use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod state;
mod steps;

#[derive(Parser)]
#[command(name = "audit-assert", about = "Verify audit log records written by a secured cluster")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file layered over the user config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// File recording whether an earlier verification in the suite failed
    #[arg(long, global = true, env = "AUDIT_STATE_FILE")]
    state: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture the audit log baseline before a test runs
    Baseline(commands::baseline::BaselineArgs),
    /// Print the normalized records written since a baseline
    Records(commands::records::RecordsArgs),
    /// Wait for the expected records to appear after a baseline
    Verify(commands::verify::VerifyArgs),
    /// Clear the suite state after the last test
    Teardown(commands::teardown::TeardownArgs),
    /// Inspect configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let explicit = cli.config.as_deref();
    let state = state::StateFile::resolve(cli.state.as_deref());
    match cli.command {
        Commands::Config(args) => commands::config::run(explicit, args),
        Commands::Teardown(args) => commands::teardown::run(&state, args),
        Commands::Baseline(args) => {
            commands::baseline::run(config::ConfigLoader::load(explicit)?, &state, args).await
        }
        Commands::Records(args) => {
            commands::records::run(config::ConfigLoader::load(explicit)?, args).await
        }
        Commands::Verify(args) => {
            commands::verify::run(config::ConfigLoader::load(explicit)?, &state, args).await
        }
    }
}
