//! # Knowledge Index CLI (`kidx`)
//!
//! ```bash
//! kidx --config ./config/kidx.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kidx init` | Create the SQLite database and run schema migrations |
//! | `kidx collections` | List configured collections and their folders |
//! | `kidx index` | Index all (or `--collection`-selected) collections |
//! | `kidx index-file <ID>` | Re-index one file |
//! | `kidx query "<text>"` | Rank a collection's chunks against a query |
//! | `kidx status` | Show per-file index state |
//!
//! Log verbosity follows `RUST_LOG` (default `knowledge_index=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use knowledge_index::{collections, config, index_cmd, migrate, search, status};

/// Knowledge Index CLI: collection-scoped document indexing and
/// similarity retrieval.
#[derive(Parser)]
#[command(
    name = "kidx",
    about = "Knowledge Index: index document collections and query them by similarity",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/kidx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// List configured collections and whether their folders resolve.
    Collections,

    /// Index collections from the configured source.
    ///
    /// Without `--collection`, every configured collection is indexed.
    /// Ctrl-C stops after the file in flight.
    Index {
        /// Collection to index (repeatable).
        #[arg(long = "collection")]
        collections: Vec<String>,
    },

    /// Re-index a single file.
    IndexFile {
        /// External file id.
        file_id: String,

        /// Collection the file belongs to.
        #[arg(long)]
        collection: String,

        /// Display path stored with the record and chunks.
        #[arg(long)]
        path: Option<String>,
    },

    /// Query a collection by similarity.
    Query {
        /// Query text.
        text: String,

        #[arg(long)]
        collection: String,

        /// Number of results (defaults to `[retrieval] top_k`).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Show per-file index records.
    Status {
        #[arg(long)]
        collection: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("knowledge_index=info,knowledge_index_core=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Collections => {
            collections::list_collections(&cfg)?;
        }
        Commands::Index { collections } => {
            index_cmd::run_index(&cfg, &collections).await?;
        }
        Commands::IndexFile {
            file_id,
            collection,
            path,
        } => {
            index_cmd::run_index_file(&cfg, &collection, &file_id, path.as_deref()).await?;
        }
        Commands::Query {
            text,
            collection,
            top_k,
        } => {
            search::run_query(&cfg, &collection, &text, top_k).await?;
        }
        Commands::Status { collection } => {
            status::run_status(&cfg, collection.as_deref()).await?;
        }
    }

    Ok(())
}
