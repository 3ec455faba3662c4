//! Deskmate CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the HTTP API server
//! - `doctor`  — Check config, credential and storage
//! - `init`    — Write a default config file

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "deskmate",
    about = "Deskmate — knowledge-grounded support chat server",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs (and doctor output) as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of ~/.deskmate/config.toml
    #[arg(short, long, global = true, env = "DESKMATE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Diagnose config, credential and storage
    Doctor,

    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    }

    let config_path = cli
        .config
        .unwrap_or_else(deskmate_config::AppConfig::config_path);

    match cli.command {
        Commands::Serve { port } => commands::serve::run(&config_path, port).await?,
        Commands::Doctor => commands::doctor::run(&config_path, cli.json).await?,
        Commands::Init { force } => commands::init::run(&config_path, force)?,
    }

    Ok(())
}
