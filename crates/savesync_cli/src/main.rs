//! savesync CLI
//!
//! Synchronizes save directories against a remote snapshot store.
//!
//! # Commands
//!
//! - `sync` - Run one sync pass over the configured items
//! - `watch` - Watch the items and re-sync when they change
//! - `migrate-keys` - Rename legacy snapshot keys to the current format

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::Config;
use savesync_engine::SyncOrchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Save directory synchronization against a remote snapshot store.
#[derive(Parser)]
#[command(name = "savesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(global = true, short, long, default_value = "savesync.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass over the configured items
    Sync {
        /// Only sync the item with this name
        #[arg(short, long)]
        item: Option<String>,
    },

    /// Watch the items and re-sync when they change
    Watch,

    /// Rename legacy snapshot keys to the current format
    MigrateKeys {
        /// Show what would be renamed without renaming
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Commands::Version = cli.command {
        println!("savesync v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = Config::load(&cli.config)?;
    let transport = config.connect()?;
    let orchestrator = Arc::new(SyncOrchestrator::new(
        transport.clone(),
        config.sync_options(),
    ));

    match cli.command {
        Commands::Sync { item } => {
            let mut items = config.tracked_items();
            if let Some(name) = item {
                items.retain(|i| i.name == name);
                if items.is_empty() {
                    return Err(format!("no configured item named {name:?}").into());
                }
            }
            commands::sync::run(&orchestrator, &items)?;
        }
        Commands::Watch => {
            commands::watch::run(orchestrator, config.tracked_items(), config.debounce())?;
        }
        Commands::MigrateKeys { dry_run } => {
            commands::migrate_keys::run(&transport, dry_run)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
