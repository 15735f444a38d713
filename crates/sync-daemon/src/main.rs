//! content-sync
//!
//! Keeps a search index consistent with a record store.
//!
//! # Usage
//!
//! ```bash
//! content-sync seed comments.jsonl
//! content-sync reindex [--types comment] [--per-page 100] [--mode full|pending]
//! content-sync trigger edit_comment 12
//! content-sync trigger updated_comment_meta 99 --owning-id 7
//! content-sync count
//! content-sync search "borrow checker"
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/content-sync/config.toml)
//! 3. Environment variables (CONTENT_SYNC_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use sync_daemon::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
