//! SkyView catalog CLI
//!
//! Upload, inspect and query simulation logs stored in an embedded database.

use clap::{Parser, Subcommand};
use serde::Serialize;
use skyview_catalog::{Catalog, CatalogConfig, CatalogError, GalleryQuery, GallerySort, SubmissionStatus, Upload};
use skyview_env::{SledStore, TokioContext};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// SkyView submission catalog
#[derive(Parser, Debug)]
#[command(name = "skyview-catalog")]
#[command(about = "Manage SkyView simulation log submissions", long_about = None)]
struct Args {
    /// Path of the catalog database
    #[arg(long, default_value = "skyview-catalog.db")]
    db: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a simulation log
    Upload {
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Comma-separated or JSON-array tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        env_set: Option<String>,
        #[arg(long)]
        renderer_preset: Option<String>,
    },
    /// List submissions, newest first
    List,
    /// Filter and sort the gallery
    Gallery {
        #[arg(long)]
        search: Option<String>,
        /// Only show READY submissions
        #[arg(long)]
        ready_only: bool,
        /// newest, score, duration
        #[arg(long, default_value = "newest")]
        sort: GallerySort,
    },
    /// Show a submission
    Get { id: String },
    /// Check that a stored log still parses
    Status { id: String },
    /// Frame count, metadata, obstacles and first frame
    Data { id: String },
    /// Print the log as pretty JSON
    Log { id: String },
    /// Write the raw log to disk
    Download {
        id: String,
        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Delete a submission
    Delete { id: String },
}

type SledCatalog = Catalog<SledStore, SledStore, TokioContext>;

fn print_json<T: Serialize>(value: &T) -> Result<(), CatalogError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(catalog: &SledCatalog, command: Command) -> Result<(), CatalogError> {
    match command {
        Command::Upload {
            file,
            title,
            name,
            tags,
            notes,
            env_set,
            renderer_preset,
        } => {
            let content = std::fs::read(&file)
                .map_err(|e| CatalogError::bad_request(format!("Cannot read {}: {}", file.display(), e)))?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = Upload {
                file_name,
                content,
                title,
                name,
                tags,
                notes,
                env_set,
                renderer_preset,
            };
            print_json(&catalog.create(upload).await?)
        }
        Command::List => print_json(&catalog.list().await?),
        Command::Gallery {
            search,
            ready_only,
            sort,
        } => {
            let mut query = GalleryQuery::new().with_sort(sort);
            if let Some(search) = search {
                query = query.with_search(search);
            }
            if ready_only {
                query = query.with_status(SubmissionStatus::Ready);
            }
            print_json(&query.apply(&catalog.list_detailed().await?))
        }
        Command::Get { id } => print_json(&catalog.get(&id).await?),
        Command::Status { id } => print_json(&catalog.status(&id).await?),
        Command::Data { id } => print_json(&catalog.data(&id).await?),
        Command::Log { id } => {
            println!("{}", catalog.log(&id).await?);
            Ok(())
        }
        Command::Download { id, out } => {
            let file = catalog.file(&id).await?;
            let path = out.join(&file.download_name);
            std::fs::write(&path, &file.body)
                .map_err(|e| CatalogError::Store(skyview_env::EnvError::storage(e.to_string())))?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Delete { id } => catalog.delete(&id).await,
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    let config = CatalogConfig::default();
    let store = match SledStore::open(&args.db) {
        Ok(store) => Arc::new(store.with_page_size(config.list_page_size)),
        Err(e) => {
            error!("Failed to open catalog database {}: {}", args.db.display(), e);
            std::process::exit(1);
        }
    };

    let catalog = Catalog::new(store.clone(), store.clone(), TokioContext::shared()).with_config(config);
    let result = run(&catalog, args.command).await;

    if let Err(e) = store.flush() {
        error!("Failed to flush catalog database: {}", e);
    }

    if let Err(e) = result {
        error!(status = e.status_code(), "{}", e.detail());
        std::process::exit(1);
    }
}
