use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use shopsync::config::SyncConfig;
use shopsync::env_u32;
use shopsync::shopify::ShopifyClient;
use shopsync::store::{FileStore, FsFileStore, PgProductTable};
use shopsync::sync::{Orchestrator, Stage, StageState, SyncOptions};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "shopsync", version, about = "Product catalog synchronization CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run the full pipeline: pull, import (when --file is given), push, export
    Sync {
        /// Local flat file to stage and import
        #[arg(long)]
        file: Option<PathBuf>,
        /// Where to write the export artifact
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Pull the remote catalog into the product table
    Pull,
    /// Import a local flat file into the product table
    Import {
        #[arg(long)]
        file: PathBuf,
    },
    /// Push the persisted snapshot to the remote platform
    Push,
    /// Export the persisted snapshot to a flat file
    Export {
        /// Where to write the export artifact
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Copy a local flat file into the store's `imports/` collection; returns
/// the staged file name the Import stage expects.
async fn stage_import_file(files: &FsFileStore, path: &Path) -> Result<String> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("unusable import file name: {}", path.display()))?
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading import file {}", path.display()))?;
    files
        .store(&format!("imports/{name}"), bytes.into())
        .await
        .with_context(|| format!("staging import file {name}"))?;
    Ok(name)
}

#[tokio::main]
async fn main() -> Result<()> {
    shopsync::ensure_dotenv();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("shopsync=info,warn")),
        )
        .with_target(false)
        .compact()
        .try_init();

    let cli = Cli::parse();
    let cfg = SyncConfig::from_env().context("remote platform configuration")?;
    let database_url =
        std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    let table = PgProductTable::connect(&database_url, env_u32("PG_MAX_CONNECTIONS", 5))
        .await
        .context("connecting to the product table")?;
    table.ensure_schema().await.context("ensuring product table schema")?;
    let files = FsFileStore::new(
        std::env::var("FILE_STORE_DIR").unwrap_or_else(|_| "sync-files".into()),
    );
    let api = ShopifyClient::new(cfg.clone())?;

    let (stages, local_file, out) = match cli.command {
        Commands::Sync { file, out } => (Stage::ALL.to_vec(), file, out),
        Commands::Pull => (vec![Stage::Pull], None, None),
        Commands::Import { file } => (vec![Stage::Import], Some(file), None),
        Commands::Push => (vec![Stage::Push], None, None),
        Commands::Export { out } => (vec![Stage::Export], None, out),
    };

    let import_file = match &local_file {
        Some(path) => Some(stage_import_file(&files, path).await?),
        None => None,
    };
    // A full sync without --file still attempts Import so the missing
    // precondition is reported per stage rather than silently skipped.

    let orchestrator = Orchestrator::new(api, table, files, cfg);
    let report = orchestrator
        .run(&SyncOptions {
            stages,
            import_file,
        })
        .await;

    for stage in &report.stages {
        info!(stage = %stage.stage, state = ?stage.state, detail = %stage.detail, "stage result");
    }
    if let Some(artifact) = &report.export {
        match &out {
            Some(path) => {
                tokio::fs::write(path, &artifact.bytes)
                    .await
                    .with_context(|| format!("writing export to {}", path.display()))?;
                info!(path = %path.display(), bytes = artifact.bytes.len(), "export written");
            }
            None => info!(locator = %artifact.locator, bytes = artifact.bytes.len(), "export available"),
        }
    }

    let skipped = report
        .stages
        .iter()
        .filter(|r| r.state == StageState::Skipped)
        .count();
    info!(summary = %report.summary, skipped, "run finished");
    if !report.succeeded {
        bail!("{}", report.summary);
    }
    Ok(())
}
