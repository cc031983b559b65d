//! confserve: hierarchical, environment-scoped configuration service.
//!
//! Stores JSON documents addressed by dot-delimited paths and resolves
//! reads with wildcard fallback and extend/override expansion.

use anyhow::Result;
use clap::Parser;
use confserve::cli::{Cli, Command, KeyAction};
use confserve::config::ConfigLoader;
use confserve::http;
use confserve::resolve::Engine;
use confserve::store::{SqliteStore, Store, generate_key};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut loader = ConfigLoader::load(cli.config.as_deref().map(Path::new))?;
    let config = loader.config_mut();

    // CLI arguments override the loaded configuration
    if let Some(ref db_path) = cli.database {
        config.storage.path = db_path.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    let config = loader.config().clone();

    let store = Arc::new(SqliteStore::open(&config.storage.path)?);
    info!(path = %config.storage.path, "store opened");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let engine = Engine::new(store)
                .with_deadline(Duration::from_millis(config.resolution.timeout_ms));
            let (shutdown_tx, addr) =
                http::start_server(engine, &config.server.bind, config.server.port).await?;
            info!(addr = %addr, "service ready");

            tokio::signal::ctrl_c().await?;
            let _ = shutdown_tx.send(());
            info!("shutdown complete");
        }
        Command::Key { action } => match action {
            KeyAction::Issue => {
                let key = generate_key();
                store.create_key(&key).await?;
                println!("{key}");
            }
            KeyAction::Revoke { key } => {
                if store.delete_key(&key).await? {
                    println!("revoked");
                } else {
                    eprintln!("key not found");
                    std::process::exit(1);
                }
            }
        },
    }

    Ok(())
}
