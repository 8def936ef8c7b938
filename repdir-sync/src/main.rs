//! repdir-sync - one reconciliation run per invocation
//!
//! Loads configuration, opens the representatives database, runs every
//! configured source adapter, reconciles, applies, and prints the run
//! outcome as JSON. Scheduling is left to cron or a systemd timer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use repdir_common::config::{
    load_toml_config, resolve_config_path, resolve_root_folder, RootFolderInitializer,
};
use repdir_common::db::init::init_database;
use repdir_sync::config::build_adapters;
use repdir_sync::{RunStatus, SqliteStore, SyncConfig, SyncRunner};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for repdir-sync
#[derive(Parser, Debug)]
#[command(name = "repdir-sync")]
#[command(about = "Synchronize the elected officials directory with its sources")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Root folder holding repdir.db
    #[arg(short, long, value_name = "DIR")]
    root_folder: Option<PathBuf>,

    /// Compute and print the plan without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let toml_config =
        load_toml_config(config_path.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG overrides the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.as_str().into()),
        )
        .init();

    info!("Starting repdir-sync v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = &config_path {
        info!("Config file: {}", path.display());
    }

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let adapters = build_adapters(&toml_config).context("Invalid source configuration")?;
    if adapters.is_empty() {
        warn!("No sources configured; every known representative would be soft-removed");
        bail!("refusing to run with no configured sources");
    }

    let mut sync_config = SyncConfig::from_toml(&toml_config);
    sync_config.dry_run = args.dry_run;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, cancelling run");
            ctrl_c_token.cancel();
        }
    });

    let store = Arc::new(SqliteStore::new(pool.clone()));
    let outcome = SyncRunner::new(sync_config, adapters, store)
        .execute(&cancel)
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    pool.close().await;

    match outcome.status {
        RunStatus::Succeeded => Ok(()),
        RunStatus::Cancelled => bail!("run {} cancelled", outcome.run_id),
        RunStatus::Failed { error } => bail!("run {} failed: {}", outcome.run_id, error),
    }
}
