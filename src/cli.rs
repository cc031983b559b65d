//! CLI definitions for confserve.
//!
//! The main entry point is the `Cli` struct which contains subcommands;
//! `serve` is the default when no subcommand is given.

use clap::{Parser, Subcommand};

/// Hierarchical configuration service and CLI tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to the SQLite database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP service (default if no subcommand given)
    Serve,

    /// Manage API keys directly against the store.
    ///
    /// `POST /auth` requires an existing key, so the first key of a fresh
    /// deployment has to be minted here.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

/// API key management actions.
#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Mint a new API key and print it
    Issue,
    /// Revoke an existing API key
    Revoke {
        /// The key to revoke
        key: String,
    },
}
