use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use studyingest::{
    config::Config,
    logging,
    pipeline::IngestionService,
    registry::Registry,
};

#[derive(Parser)]
#[command(
    name = "study-ingest",
    about = "Index study materials and uploads into the vector store"
)]
struct Cli {
    /// Recursively ingest every supported document under this directory.
    #[arg(long, value_name = "PATH")]
    materials_dir: Option<PathBuf>,

    /// Embed completed uploads that are not yet marked embedding-ready.
    #[arg(long)]
    uploaded_files: bool,

    /// Re-embed every tracked study material.
    #[arg(long)]
    materials: bool,

    /// Remove embedding records older than this many days.
    #[arg(long, value_name = "DAYS")]
    cleanup: Option<u32>,

    /// Print registry and vector-store statistics.
    #[arg(long)]
    stats: bool,

    /// Create the registry database schema and exit.
    #[arg(long)]
    init_db: bool,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.needs_pipeline() || self.init_db
    }

    /// Whether any requested operation needs the embedding and vector-store
    /// configuration. `--init-db` alone touches only the registry.
    fn needs_pipeline(&self) -> bool {
        self.materials_dir.is_some()
            || self.uploaded_files
            || self.materials
            || self.cleanup.is_some()
            || self.stats
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    if !cli.has_action() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let _ = dotenvy::dotenv();
    let _log_guard = logging::init_tracing();

    let registry_path = Config::registry_db_path_from_env();
    if cli.init_db {
        Registry::open(&registry_path).context("failed to initialize registry database")?;
        println!("Registry database ready at {}", registry_path.display());
        if !cli.needs_pipeline() {
            return Ok(());
        }
    }

    let config = Config::from_env().context("failed to load configuration")?;
    let service = IngestionService::connect(config)
        .await
        .context("failed to initialize ingestion service")?;

    if let Some(dir) = &cli.materials_dir {
        let summary = service.process_materials_dir(dir).await?;
        println!(
            "Materials directory: {} processed, {} skipped, {} failed",
            summary.processed, summary.skipped, summary.failed
        );
    }

    if cli.uploaded_files {
        let registry = Registry::open(&registry_path).context("failed to open registry")?;
        let summary = service.process_pending_uploads(&registry).await?;
        println!(
            "Uploads: {} processed, {} skipped, {} failed",
            summary.processed, summary.skipped, summary.failed
        );
    }

    if cli.materials {
        let registry = Registry::open(&registry_path).context("failed to open registry")?;
        let summary = service.process_materials(&registry).await?;
        println!(
            "Tracked materials: {} processed, {} skipped, {} failed",
            summary.processed, summary.skipped, summary.failed
        );
    }

    if let Some(days) = cli.cleanup {
        let removed = service.cleanup_older_than(days).await?;
        println!("Removed {removed} embedding records older than {days} days");
    }

    if cli.stats {
        let registry = Registry::open(&registry_path).context("failed to open registry")?;
        let stats = service.statistics(&registry).await?;
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}
