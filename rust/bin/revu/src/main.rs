//! `revu`: drive the session controller from the command line.
//!
//! Usage:
//!   revu replay <script.json> [-c revu.toml]
//!   revu route <path> [--authenticated] [-c revu.toml]
//!   revu config [-c revu.toml]

mod script;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use revu_session::{RouteGuard, SessionConfig};
use tracing::info;

/// Session controller tool.
#[derive(Parser, Debug)]
#[command(name = "revu", about = "Session & project state controller tool")]
struct Cli {
    /// Path to the controller config file (defaults apply if missing).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scripted scenario against the in-memory backend and print
    /// the resulting state as JSON.
    Replay {
        /// Script file.
        script: PathBuf,
    },

    /// Print where the redirect guard sends a path.
    Route {
        path: String,
        /// Decide for a signed-in user.
        #[arg(long)]
        authenticated: bool,
    },

    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            SessionConfig::load(path)?
        }
        None => SessionConfig::default(),
    };

    match cli.command {
        Commands::Replay { script } => {
            let content = std::fs::read_to_string(&script)?;
            let script = script::parse(&content)?;
            let report = script::replay(script, config).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Route {
            path,
            authenticated,
        } => {
            let guard = RouteGuard::from(config.routes);
            match guard.decide(&path, authenticated) {
                Some(target) => println!("{path} -> {target}"),
                None => println!("{path} (stays)"),
            }
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
