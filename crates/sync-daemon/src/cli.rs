//! CLI argument parsing for content-sync.
//!
//! CLI flags override all other config sources.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// content-sync
///
/// Keeps a Tantivy search index in step with a RocksDB record store.
#[derive(Parser, Debug)]
#[command(name = "content-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/content-sync/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override record store path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    /// Override search index path
    #[arg(long, global = true)]
    pub index_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bulk reindex registered content types
    Reindex {
        /// Only these types (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        types: Option<Vec<String>>,

        /// Page size
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        per_page: Option<u64>,

        /// full (page records) or pending (page ids, fetch lazily)
        #[arg(short, long)]
        mode: Option<String>,

        /// Sync types one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Show record and index counts
    Count,

    /// Deliver one mutation hook and flush
    Trigger {
        /// Hook name, e.g. edit_comment or updated_comment_meta
        hook: String,

        /// Record id, or metadata row id for metadata hooks
        record_id: String,

        /// Owning record id for metadata hooks
        #[arg(long)]
        owning_id: Option<String>,
    },

    /// Load records from a JSON Lines file into the record store
    Seed {
        /// File with one record object per line
        file: PathBuf,

        /// Content type of the records
        #[arg(long, default_value = "comment")]
        doc_type: String,

        /// Store-native primary key of the records
        #[arg(long, default_value = "comment_ID")]
        primary_key: String,
    },

    /// Keyword search over the index
    Search {
        /// Query string
        query: String,

        /// Restrict to one content type
        #[arg(short = 't', long)]
        doc_type: Option<String>,

        /// Maximum results
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}
