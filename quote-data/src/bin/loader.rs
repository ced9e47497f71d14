use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use quote_data::EquipmentCatalogLoader;
use quote_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Load an equipment catalog CSV into the quote database.
///
/// Columns: name, category, nameplate_kw, duty_cycle, description, use_case,
/// quantity. The last four may be blank. Every category in the file replaces
/// the category already stored.
#[derive(Parser, Debug)]
#[command(name = "quote-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the equipment catalog CSV
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL (e.g., sqlite:quotes.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:quotes.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    println!("Loading equipment catalog from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = EquipmentCatalogLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let summary = EquipmentCatalogLoader::load(&repo, &records)
        .await
        .context("Failed to load equipment catalog into database")?;

    println!(
        "Loaded {} templates in {} categories ({} use case attachments).",
        summary.templates, summary.categories, summary.attachments
    );

    Ok(())
}
