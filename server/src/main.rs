//! schemaforge
//!
//! Serves CRUD endpoints for every entity description found under the
//! modules directory.
//!
//! Usage:
//!   schemaforge --modules-dir modules --database data.db --listen 0.0.0.0:8000

use anyhow::Result;
use clap::Parser;
use schemaforge_server::config::ServerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "schemaforge")]
#[command(about = "Generic CRUD server for declaratively described entities")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides the config file)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Root of the module tree (overrides the config file)
    #[arg(short, long)]
    modules_dir: Option<PathBuf>,

    /// SQLite database file (overrides the config file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let mut config = ServerConfig::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(dir) = args.modules_dir {
        config.modules_dir = dir;
    }
    if let Some(database) = args.database {
        config.database = database;
    }

    schemaforge_server::serve(config).await
}
