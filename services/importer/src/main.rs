//! Importer - Loads the cleaned international football CSVs into MariaDB
//!
//! Responsibilities:
//! - Read results, shootouts and goalscorers CSVs and coerce their columns
//! - Resolve teams, tournaments, locations and players to surrogate ids
//! - Insert matches, then the shootouts and goals that belong to them
//! - Report every dependent row that could not be attached to a match
//!
//! The target tables must exist and be empty: ids are cached per run only,
//! so importing twice duplicates every entity.

mod config;
mod import;
mod resolver;
mod source;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::mysql::MySqlPoolOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DB_PORT};
use crate::import::{import_all, ImportSummary};
use crate::store::{MemoryStore, MySqlStore};

#[derive(Parser, Debug)]
#[command(name = "importer", about = "Loads football results CSVs into the relational schema")]
struct Args {
    /// Directory holding results_clean.csv, shootouts_clean.csv and goalscorers_clean.csv
    #[arg(long, env = "IMPORT_CSV_DIR", default_value = "/app/csvs")]
    csv_dir: PathBuf,

    /// Dry run - resolve everything in memory, don't touch the database
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("importer=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();
}

fn print_summary(summary: &ImportSummary) {
    println!("\n=== Import Complete ===");
    for stage in &summary.stages {
        println!(
            "{:<10} rows: {:>7}  inserted: {:>7}  skipped: {:>5}",
            stage.stage,
            stage.rows,
            stage.inserted,
            stage.skipped.len()
        );
    }
    println!(
        "Entities: {} teams, {} tournaments, {} locations, {} players",
        summary.teams, summary.tournaments, summary.locations, summary.players
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let args = Args::parse();

    println!("=== Football Results Importer ===");
    println!("CSV directory: {}", args.csv_dir.display());
    println!("Mode: {}", if args.dry_run { "dry-run" } else { "live" });

    let summary = if args.dry_run {
        let data = source::load_sources(&args.csv_dir).await?;
        let mut store = MemoryStore::new();
        let summary = import_all(&data, &mut store).await?;
        tracing::info!(
            teams = store.teams.len(),
            tournaments = store.tournaments.len(),
            locations = store.locations.len(),
            players = store.players.len(),
            matches = store.matches.len(),
            shootouts = store.shootouts.len(),
            goals = store.goals.len(),
            commits = store.commits,
            "dry run - no rows saved to database"
        );
        summary
    } else {
        let config = Config::from_env();
        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(config.connect_options())
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to MariaDB at {}:{}/{}",
                    config.host, DB_PORT, config.database
                )
            })?;
        tracing::info!(host = %config.host, database = %config.database, "connected to MariaDB");

        let data = source::load_sources(&args.csv_dir).await?;
        let mut store = MySqlStore::new(pool);
        let summary = import_all(&data, &mut store).await?;
        store.close().await?;
        summary
    };

    print_summary(&summary);
    Ok(())
}
