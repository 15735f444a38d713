//! content-sync command-line library.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (reindex, count, trigger, seed, search)
//! - `seed`: JSON Lines loader for the record store

pub mod cli;
pub mod commands;
pub mod seed;

pub use cli::{Cli, Commands};
pub use commands::{init_logging, load_settings, run, App};
pub use seed::{seed_records, SeedStats};
