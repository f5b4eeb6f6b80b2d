//! # Manuals Index CLI (`manuals`)
//!
//! ## Usage
//!
//! ```bash
//! manuals --config ./config/manuals.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `manuals init` | Create the SQLite database and schema |
//! | `manuals index` | Walk the docs tree and rebuild the index |
//! | `manuals search "<query>"` | Ranked full-text search |
//! | `manuals get <id>` | Show one device with specs and pins |
//! | `manuals pinouts <id>` | Show a device's pin table |
//! | `manuals list` | List indexed devices |
//! | `manuals stats` | Index statistics |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use manuals_index::models::Domain;
use manuals_index::{config, get, ingest, logging, migrate, search, stats};

/// Manuals Index — full-text search over markdown device documentation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/manuals.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "manuals",
    about = "Manuals Index — full-text search over markdown device documentation",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/manuals.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Index a documentation directory.
    ///
    /// By default every existing record is removed first, so devices whose
    /// files were deleted disappear from the index.
    Index {
        /// Documentation root. Defaults to `[docs].root` from the config.
        #[arg(long)]
        docs: Option<PathBuf>,

        /// Keep existing records and upsert over them.
        #[arg(long)]
        no_clear: bool,
    },

    /// Search indexed devices.
    Search {
        /// The search query string.
        query: String,

        /// Restrict to one domain: `hardware`, `software`, or `protocol`.
        #[arg(long)]
        domain: Option<Domain>,

        /// Restrict to one device type (last category segment).
        #[arg(long = "type")]
        device_type: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<i64>,

        /// Number of results to skip.
        #[arg(long)]
        offset: Option<i64>,
    },

    /// Show a device by ID.
    Get {
        /// Device ID, e.g. `sensors-temperature-ds18b20`.
        id: String,
    },

    /// Show the pin table of a hardware device.
    Pinouts {
        id: String,

        /// Only pins whose name or alt functions mention this interface (e.g. `i2c`).
        #[arg(long)]
        interface: Option<String>,
    },

    /// List indexed devices.
    List {
        #[arg(long)]
        domain: Option<Domain>,
    },

    /// Show index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index { docs, no_clear } => {
            ingest::run_index_command(&cfg, docs, !no_clear).await?;
        }
        Commands::Search {
            query,
            domain,
            device_type,
            limit,
            offset,
        } => {
            search::run_search(&cfg, &query, domain, device_type, limit, offset).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, &id).await?;
        }
        Commands::Pinouts { id, interface } => {
            get::run_pinouts(&cfg, &id, interface.as_deref()).await?;
        }
        Commands::List { domain } => {
            get::run_list(&cfg, domain).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
