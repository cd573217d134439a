use std::path::{Path, PathBuf};

use anyhow::Context;
use bookrev_db::{transfer, MemoryStore};
use bookrev_kernel::settings::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bookrev", version, about = "BookRev book review service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server.
    Serve {
        /// Seed file imported at startup, overriding `database.seed_csv`.
        #[arg(long)]
        seed: Option<PathBuf>,
        /// Port to listen on, overriding `server.port`.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Import a sectional CSV file and report what it contains.
    Import {
        #[arg(long = "csv")]
        csv: PathBuf,
    },
    /// Load a sectional CSV file and write it back out.
    Export {
        /// File to load before exporting.
        #[arg(long = "csv")]
        csv: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().context("failed to load BookRev settings")?;
    bookrev_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve { seed, port } => {
            if seed.is_some() {
                settings.database.seed_csv = seed;
            }
            if let Some(port) = port {
                settings.server.port = port;
            }
            bookrev_app::run(settings).await
        }
        Command::Import { csv } => import(&csv).await,
        Command::Export { csv, out } => export(&csv, &out).await,
    }
}

async fn import(path: &Path) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let report = transfer::import_file(&store, path)
        .await
        .with_context(|| format!("failed to import {}", path.display()))?;

    for (model, created) in &report.created {
        println!("{model}: {created} created");
    }
    for (model, existing) in &report.existing {
        println!("{model}: {existing} already present");
    }
    for error in &report.errors {
        eprintln!("skipped: {error}");
    }
    tracing::info!(
        created = report.total_created(),
        skipped_rows = report.errors.len(),
        "import finished"
    );
    Ok(())
}

async fn export(seed: &Path, out: &Path) -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let report = transfer::import_file(&store, seed)
        .await
        .with_context(|| format!("failed to load {}", seed.display()))?;
    for error in &report.errors {
        eprintln!("skipped: {error}");
    }
    let summary = transfer::export_file(&store, out)
        .await
        .with_context(|| format!("failed to export to {}", out.display()))?;

    println!(
        "exported {} records ({} bytes) to {}",
        summary.records,
        summary.bytes,
        out.display()
    );
    Ok(())
}
