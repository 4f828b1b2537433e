//! Tabletop console.
//!
//! Drives a grid map and initiative tracker from the terminal:
//!
//! ```bash
//! cargo run -p tabletop -- --save-dir ./saves --seed 7
//! ```
//!
//! Settings come from `TABLETOP_*` environment variables (a `.env` file is
//! read if present) and are overridden by command line flags.

mod commands;
mod headless;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tabletop_core::{DiceRoller, DirectoryStore, Table, TableConfig};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tabletop", version, about = "Grid map and initiative tracker console")]
struct Args {
    /// Directory map snapshots are saved in
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Seed for reproducible dice rolls
    #[arg(long)]
    seed: Option<u64>,

    /// Grid cell size in pixels
    #[arg(long)]
    grid_size: Option<u32>,

    /// Key the map is saved under
    #[arg(long)]
    storage_key: Option<String>,

    /// Do not load the saved map on startup
    #[arg(long)]
    fresh: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with console replies
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tabletop=info,tabletop_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = TableConfig::from_env();
    if let Some(dir) = args.save_dir {
        config = config.with_save_dir(dir);
    }
    if let Some(size) = args.grid_size {
        config = config.with_grid_size(size);
    }
    if let Some(key) = args.storage_key {
        config = config.with_storage_key(key);
    }

    let roller = match args.seed {
        Some(seed) => DiceRoller::seeded(seed),
        None => DiceRoller::from_entropy(),
    };

    let store = DirectoryStore::new(&config.save_dir);
    info!(save_dir = %store.dir().display(), "Starting tabletop console");

    let mut table = Table::with_roller(config, roller);
    if !args.fresh {
        table
            .load(&store)
            .await
            .context("Failed to load saved map")?;
    }

    headless::run_console(table, store).await?;
    Ok(())
}
