//! mpydeploy CLI - Differential deployment for MicroPython devices
//!
//! Provides commands for:
//! - Deploying a built artifact tree to a device (serial or WebREPL)
//! - Listing connected serial devices
//! - Checking the local tree against its version manifest
//! - Viewing and validating configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    config::ConfigCommand, deploy::DeployCommand, devices::DevicesCommand, status::StatusCommand,
};
use mpydeploy_core::config::Config;
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "mpydeploy",
    version,
    about = "Differential deployment for MicroPython devices"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Deploy the artifact tree to a device
    Deploy(DeployCommand),
    /// List connected serial devices
    Devices(DevicesCommand),
    /// Check the local artifact tree against its version manifest
    Status(StatusCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path);
    config.apply_env_overrides();

    match cli.command {
        Commands::Deploy(cmd) => cmd.execute(&config, format).await,
        Commands::Devices(cmd) => cmd.execute(&config, format).await,
        Commands::Status(cmd) => cmd.execute(&config, format).await,
        Commands::Config(cmd) => cmd.execute(&config_path, format).await,
    }
}
