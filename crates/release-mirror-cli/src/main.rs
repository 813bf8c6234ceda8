mod app;
mod commands;
mod config;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::app::App;

#[derive(Parser)]
#[command(name = "release-mirror")]
#[command(about = "Mirror the latest GitHub release assets into an object store")]
struct Cli {
    /// Config file (defaults to ~/.config/release-mirror/config.toml)
    #[arg(long, global = true, env = "RELEASE_MIRROR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the status page and sync endpoints, and run scheduled checks
    Serve {
        /// Address to listen on
        #[arg(long)]
        listen: Option<SocketAddr>,
    },
    /// Run one sync pass and exit
    Sync {
        /// Only sync this repository (owner/name)
        #[arg(long)]
        repo: Option<String>,
    },
    /// Print the sync status of every configured repository
    Status {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("release_mirror=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.listen = listen;
            }
            let app = App::build(config).await?;
            commands::serve::run(app).await
        }
        Command::Sync { repo } => {
            let app = App::build(config).await?;
            commands::sync::run(&app, repo.as_deref()).await
        }
        Command::Status { json } => {
            let app = App::build(config).await?;
            commands::status::run(&app, json).await
        }
    }
}
