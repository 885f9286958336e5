//! # altnav CLI
//!
//! ```bash
//! altnav --config ./config/altnav.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `altnav sources` | List declared and discovered documents |
//! | `altnav ingest` | Build the catalog once and print a report |
//! | `altnav search "<term>"` | Search the catalog |
//! | `altnav stats` | Per-document and per-category counts |
//! | `altnav parse <file>` | Extract records from one local file |
//! | `altnav serve` | Start the JSON HTTP API |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use altnav::config::{self, Config};
use altnav::ingest::records_from_text;
use altnav::logging::{init_subscriber, Verbosity};
use altnav::models::{DocumentLocation, DocumentSpec};
use altnav::{ingest, search, server, sources, stats};

/// altnav: search hand-authored catalogs of alternative services.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file.
#[derive(Parser)]
#[command(
    name = "altnav",
    about = "altnav: a tolerant literal extractor and search index for alternative-service catalogs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/altnav.toml")]
    config: PathBuf,

    /// Debug-level logging on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List declared and discovered documents.
    Sources {
        /// Fetch every document and report whether it is reachable.
        #[arg(long)]
        check: bool,
    },

    /// Fetch and parse every document once, then print a report.
    Ingest {
        /// Exit with an error when no document could be read.
        #[arg(long)]
        check: bool,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search the catalog.
    ///
    /// Matches the term case-insensitively against names, replaced
    /// services, and descriptions. Results are ordered by rank.
    Search {
        /// The search term.
        #[arg(default_value = "")]
        term: String,

        /// Browse a category instead of matching the term.
        #[arg(long)]
        category: Option<String>,

        /// Maximum number of results to print.
        #[arg(long)]
        limit: Option<usize>,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show per-document and per-category counts.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Extract records from a single local file.
    ///
    /// Uses the extraction settings from the config file when it exists,
    /// defaults otherwise.
    Parse {
        path: PathBuf,

        /// Text preceding the literal list (overrides config).
        #[arg(long)]
        anchor: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Start the JSON HTTP API.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber(Verbosity::from_flags(cli.verbose, cli.quiet));

    // Commands that don't require config
    if let Commands::Parse { path, anchor, json } = &cli.command {
        let cfg = if cli.config.exists() {
            config::load_config(&cli.config)?
        } else {
            Config::minimal()
        };
        return run_parse(&cfg, path, anchor.clone(), *json);
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Sources { check } => {
            sources::list_sources(&cfg, check).await?;
        }
        Commands::Ingest { check, json } => {
            ingest::run_ingest(&cfg, check, json).await?;
        }
        Commands::Search {
            term,
            category,
            limit,
            json,
        } => {
            search::run_search(&cfg, &term, category, limit, json).await?;
        }
        Commands::Stats { json } => {
            stats::run_stats(&cfg, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Parse { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn run_parse(
    cfg: &Config,
    path: &Path,
    anchor: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = DocumentSpec {
        id: path.display().to_string(),
        location: DocumentLocation::Path(path.to_path_buf()),
        category: None,
    };
    let mut extraction = cfg.extraction.extraction()?;
    if anchor.is_some() {
        extraction.list_anchor = anchor;
    }
    let (records, report) = records_from_text(&text, &doc, &extraction);

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in &records {
        println!(
            "{:<32} rank={:<5} replaces=[{}]",
            record.identity,
            record.rank,
            record.aliases.join(", ")
        );
    }
    println!();
    println!("blocks: {}", report.blocks());
    println!("records: {}", report.records);
    println!("malformed blocks: {}", report.malformed);
    println!("duplicates: {}", report.duplicates);
    Ok(())
}
