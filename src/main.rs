//! CLI for ragdb: run the HTTP server, or inspect and edit a snapshot offline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragdb::config::{BackendKind, ServeArgs, ServerConfig};
use ragdb::logging::init_logging;
use ragdb::{IndexConfig, IndexManager, Metadata, SnapshotManager, Vector, VectorRecord};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ragdb")]
#[command(about = "A RAG service and vector index engine", long_about = None)]
struct Cli {
    /// Snapshot directory. The server loads it at startup and saves on shutdown.
    #[arg(long, global = true, env = "RAGDB_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log filter, e.g. "ragdb=debug" (defaults to RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),
    #[command(flatten)]
    Offline(OfflineCommand),
}

/// Commands that run against the snapshot in `--data-dir`.
#[derive(Subcommand)]
enum OfflineCommand {
    /// Create an index
    CreateIndex {
        name: String,
        #[arg(short, long)]
        dimension: i64,
        /// cosine, euclidean or dot_product
        #[arg(long, default_value = "cosine")]
        space: String,
        /// float32 or float16
        #[arg(long, default_value = "float32")]
        precision: String,
        #[arg(long, value_enum, default_value = "flat")]
        backend: BackendKind,
    },
    /// Delete an index and all its records
    DropIndex { name: String },
    /// Insert or replace a record
    Upsert {
        index: String,
        id: String,
        /// Vector data as comma-separated values (e.g., "1.0,2.0,3.0")
        #[arg(short, long)]
        vector: String,
        /// Metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },
    /// Search an index for the nearest records
    Query {
        index: String,
        /// Query vector as comma-separated values (e.g., "1.0,2.0,3.0")
        query: String,
        /// Number of results to return
        #[arg(short, long, default_value = "5")]
        k: usize,
    },
    /// Print one record as JSON
    Get { index: String, id: String },
    /// Delete a record
    Delete { index: String, id: String },
    /// List indexes, or the record IDs of one index
    List { index: Option<String> },
}

impl OfflineCommand {
    fn mutates(&self) -> bool {
        matches!(
            self,
            OfflineCommand::CreateIndex { .. }
                | OfflineCommand::DropIndex { .. }
                | OfflineCommand::Upsert { .. }
                | OfflineCommand::Delete { .. }
        )
    }
}

fn run_offline(manager: &IndexManager, command: OfflineCommand) -> Result<()> {
    match command {
        OfflineCommand::CreateIndex {
            name,
            dimension,
            space,
            precision,
            backend,
        } => {
            let config = IndexConfig::parse(dimension, &space, &precision)?.with_backend(backend.into_backend());
            manager.create_index(&name, config)?;
            println!("Created index: {}", name);
        }
        OfflineCommand::DropIndex { name } => {
            manager.delete_index(&name)?;
            println!("Deleted index: {}", name);
        }
        OfflineCommand::Upsert {
            index,
            id,
            vector,
            metadata,
        } => {
            let metadata: Metadata = match metadata {
                Some(json) => serde_json::from_str(&json).context("metadata must be a JSON object")?,
                None => Metadata::new(),
            };
            let record = VectorRecord::new(id.clone(), Vector::parse_csv(&vector)?.into_inner())
                .with_metadata(metadata);
            manager.get_index(&index)?.upsert(vec![record])?;
            println!("Upserted record with ID: {}", id);
        }
        OfflineCommand::Query { index, query, k } => {
            let q = Vector::parse_csv(&query)?;
            let results = manager.get_index(&index)?.query(q.as_slice(), k)?;

            if results.is_empty() {
                println!("No results found (index is empty)");
            } else {
                println!("Top {} results:", results.len());
                for (i, result) in results.iter().enumerate() {
                    println!("{}. {} (score: {:.4})", i + 1, result.id, result.score);
                }
            }
        }
        OfflineCommand::Get { index, id } => {
            let record = manager.get_index(&index)?.get(&id)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        OfflineCommand::Delete { index, id } => {
            manager.get_index(&index)?.delete(&id)?;
            println!("Deleted record with ID: {}", id);
        }
        OfflineCommand::List { index: None } => {
            let names = manager.list_indexes()?;
            if names.is_empty() {
                println!("No indexes");
            } else {
                println!("Indexes ({} total):", names.len());
                for name in names {
                    let info = manager.get_index(&name)?.info()?;
                    println!(
                        "  - {} (dimension {}, {}, {}, {} records)",
                        info.name,
                        info.config.dimension,
                        info.config.space_type,
                        info.config.precision,
                        info.count
                    );
                }
            }
        }
        OfflineCommand::List { index: Some(index) } => {
            let ids = manager.get_index(&index)?.list_ids()?;
            if ids.is_empty() {
                println!("No records in index {}", index);
            } else {
                println!("Record IDs ({} total):", ids.len());
                for id in ids {
                    println!("  - {}", id);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref())?;

    let command = match cli.command {
        Commands::Serve(args) => {
            let config = ServerConfig::from_args(args, cli.data_dir);
            return ragdb::server::serve(config).await;
        }
        Commands::Offline(command) => command,
    };

    let data_dir = cli
        .data_dir
        .context("offline commands need --data-dir (or RAGDB_DATA_DIR)")?;
    let snapshots = SnapshotManager::new(&data_dir)?;
    let manager = IndexManager::new();
    if let Some(snapshot) = snapshots.load()? {
        manager.restore(snapshot)?;
    }

    let mutates = command.mutates();
    run_offline(&manager, command)?;
    if mutates {
        snapshots.save(&manager.snapshot()?)?;
    }
    Ok(())
}
