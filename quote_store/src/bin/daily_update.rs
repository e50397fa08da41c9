//! One-shot daily maintenance run over the gold-price warehouse.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use quote_store::config::PipelineConfig;
use quote_store::db::{connect_sqlite, migrate};
use quote_store::orchestrator::{self, RunOptions};

#[derive(Parser, Debug)]
#[command(
    name = "daily-update",
    about = "Ingest gold-price sources, forward-fill gaps, and prune old rows"
)]
struct Cli {
    /// Ingest world gold and USD/VND via the chart source.
    #[arg(long)]
    world: bool,

    /// Crawl and import local gold quotes.
    #[arg(long)]
    vn: bool,

    /// Crawl window in days (defaults to the retention window).
    #[arg(long)]
    crawler_days: Option<u32>,

    /// Basename for crawl snapshot files.
    #[arg(long, default_value = "vn_raw")]
    basename: String,

    /// Snapshot output directory (defaults to the data directory).
    #[arg(long)]
    outdir: Option<PathBuf>,

    /// Data directory holding the database, snapshots, archive and log.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// SQLite database path (overrides the config; falls back to $GOLD_DB).
    #[arg(long)]
    db: Option<PathBuf>,

    /// Distinct calendar dates to keep per table.
    #[arg(long, default_value_t = 365)]
    retention_days: u32,

    /// TOML config file; flags above act as defaults when it is absent.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut cfg = match &cli.config {
        Some(path) => PipelineConfig::load_path(path)?,
        None => PipelineConfig::from_data_dir(&cli.data_dir, cli.retention_days),
    };
    if let Some(db) = &cli.db {
        cfg.db_path = db.clone();
    } else if let Ok(db) = std::env::var("GOLD_DB") {
        cfg.db_path = PathBuf::from(db);
    }

    if let Some(parent) = cfg.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let database_url = cfg.db_path.to_string_lossy().into_owned();
    migrate::run(&database_url)?;
    let mut conn = connect_sqlite(&database_url)?;

    let opts = RunOptions {
        world: cli.world,
        vn: cli.vn,
        crawler_days: cli.crawler_days,
        basename: cli.basename,
        outdir: cli.outdir,
    };

    let outcome = orchestrator::run(&mut conn, &cfg, &opts).await?;
    println!("{}", outcome.combined_report());
    std::process::exit(outcome.exit_code);
}
