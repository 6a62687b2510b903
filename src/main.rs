mod cli;
mod config;
mod file;
mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::config::{StoreConfig, DEFAULT_STORAGE_PATH};
use crate::file::LocalFileStore;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory uploaded files are kept in
    #[arg(long, env = "UPLOAD_STORE_PATH", default_value = DEFAULT_STORAGE_PATH, global = true)]
    storage_path: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Cli,
    Server { port: Option<u16> },
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = StoreConfig::new(&cli.storage_path);
    let store = match LocalFileStore::init(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Storage initialization failed: {}", e);
            return Err(e.into());
        }
    };

    match &cli.command {
        Some(Commands::Cli) => {
            cli::console::run(&store)?;
        }
        Some(Commands::Server { port }) => {
            let port = port.unwrap_or(8080);
            server::api::run_server(port, Arc::new(store)).await?;
        }
        Some(Commands::Info) => {
            println!("{}", store.storage_info());
        }
        None => {
            println!("Please specify a command: cli, server or info");
        }
    }

    Ok(())
}
