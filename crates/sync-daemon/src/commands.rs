//! Command implementations for content-sync.
//!
//! Every command loads settings (defaults -> file -> env -> CLI flags),
//! initializes logging, and opens the record store and search index.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use sync_indexing::{
    CommentBinding, LoggingProgressCallback, SyncOptions, SyncReport, Synchronizer, TantivyBackend,
    TypeBinding,
};
use sync_search::{DocumentSearcher, SearchIndex, SearchIndexer, SearchOptions};
use sync_storage::Storage;
use sync_types::{RecordId, Settings, SyncMode, TriggerPayload};

use crate::cli::{Cli, Commands};
use crate::seed::seed_records;

/// Pages between progress log lines during reindex.
const PROGRESS_EVERY_PAGES: u64 = 10;

/// Load configuration and apply CLI overrides (highest precedence).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(db_path) = &cli.db_path {
        settings.db_path = db_path.clone();
    }
    if let Some(index_path) = &cli.index_path {
        settings.index_path = index_path.clone();
    }
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    Ok(settings)
}

/// Initialize logging. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Opened store, index and synchronizer.
pub struct App {
    pub settings: Settings,
    pub storage: Arc<Storage>,
    pub index: SearchIndex,
    pub synchronizer: Synchronizer,
}

impl App {
    /// Open storage and index and register the built-in content types.
    pub fn open(settings: Settings) -> Result<Self> {
        let db_path = settings.expanded_db_path();
        info!(path = ?db_path, "Opening record store");
        std::fs::create_dir_all(&db_path)
            .with_context(|| format!("Failed to create {:?}", db_path))?;
        let storage = Arc::new(Storage::open(&db_path).context("Failed to open record store")?);

        let index = SearchIndex::open(&settings.expanded_index_path(), &settings.index)
            .context("Failed to open index")?;
        let indexer = Arc::new(SearchIndexer::new(&index).context("Failed to open index writer")?);

        let mut synchronizer =
            Synchronizer::from_settings(Arc::new(TantivyBackend::new(indexer)), &settings.sync)
                .with_progress(Arc::new(LoggingProgressCallback::new(PROGRESS_EVERY_PAGES)));
        synchronizer.register_type(Arc::new(CommentBinding::new(storage.clone())));

        Ok(Self {
            settings,
            storage,
            index,
            synchronizer,
        })
    }

    fn searcher(&self) -> Result<DocumentSearcher> {
        let searcher = DocumentSearcher::new(&self.index)?;
        searcher.reload()?;
        Ok(searcher)
    }
}

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;
    let app = App::open(settings)?;

    match cli.command {
        Commands::Reindex {
            types,
            per_page,
            mode,
            sequential,
        } => reindex(app, types, per_page, mode.as_deref(), sequential).await,
        Commands::Count => count(&app),
        Commands::Trigger {
            hook,
            record_id,
            owning_id,
        } => trigger(&app, &hook, &record_id, owning_id.as_deref()).await,
        Commands::Seed {
            file,
            doc_type,
            primary_key,
        } => seed(&app, &file, &doc_type, &primary_key),
        Commands::Search {
            query,
            doc_type,
            limit,
        } => search(&app, &query, doc_type, limit),
    }
}

async fn reindex(
    app: App,
    types: Option<Vec<String>>,
    per_page: Option<u64>,
    mode: Option<&str>,
    sequential: bool,
) -> Result<()> {
    let mut options = SyncOptions::from_settings(&app.settings.sync);
    if let Some(types) = types {
        options = options.with_types(types);
    }
    if let Some(per_page) = per_page {
        options = options.with_per_page(per_page);
    }
    if let Some(mode) = mode {
        options = options.with_mode(mode.parse::<SyncMode>()?);
    }

    let synchronizer = if sequential {
        app.synchronizer.with_concurrent_types(false)
    } else {
        app.synchronizer
    };

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current page");
            ctrl_c.cancel();
        }
    });

    let report = synchronizer.sync_all_with_cancel(options, cancel).await;
    print_report(&report);

    if let Some(reason) = &report.rejected {
        bail!("Reindex refused: {}", reason);
    }
    if report.has_fatal() {
        bail!("Reindex finished with {} error(s)", report.errors.len());
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    for t in &report.types {
        let status = if t.fatal.is_some() {
            "failed"
        } else if t.cancelled {
            "cancelled"
        } else {
            "done"
        };
        println!(
            "{:<12} {:<9} total={} pages={} submitted={} skipped={} failed={} ({} ms)",
            t.doc_type, status, t.total, t.pages, t.submitted, t.skipped, t.failed, t.elapsed_ms
        );
    }
    println!(
        "all          submitted={} skipped={} failed={}{}",
        report.submitted,
        report.skipped,
        report.failed,
        if report.cancelled { " (cancelled)" } else { "" }
    );
    for error in &report.errors {
        println!("  error: {}", error);
    }
}

fn count(app: &App) -> Result<()> {
    for binding in app.synchronizer.registry().iter() {
        let total = binding
            .get_items_count()
            .with_context(|| format!("Failed to count {}", binding.name()))?;
        println!("{:<12} records={}", binding.name(), total);
    }
    println!("index        documents={}", app.searcher()?.count());
    Ok(())
}

async fn trigger(app: &App, hook: &str, record_id: &str, owning_id: Option<&str>) -> Result<()> {
    if !app.synchronizer.router().handles(hook) {
        bail!(
            "Unknown hook {}; known hooks: {}",
            hook,
            app.synchronizer.router().hooks().join(", ")
        );
    }

    let record_id: RecordId = record_id.parse()?;
    let payload = TriggerPayload {
        record_id,
        owning_id: owning_id.map(str::parse::<RecordId>).transpose()?,
    };

    let mut cycle = app.synchronizer.begin_cycle();
    let queued = cycle.trigger(hook, payload);
    for action in cycle.pending() {
        println!("queued {} {}:{}", action.kind, action.doc_type, action.id);
    }
    if queued == 0 {
        println!("nothing to do");
    }

    let report = cycle.flush_deferred().await?;
    println!(
        "submitted={} deleted={} skipped={} failed={}",
        report.submitted(),
        report.deleted(),
        report.skipped(),
        report.failed()
    );
    for error in &report.errors {
        println!("  error: {}", error);
    }
    Ok(())
}

fn seed(app: &App, file: &Path, doc_type: &str, primary_key: &str) -> Result<()> {
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("Failed to open {:?}", file))?,
    );
    let stats = seed_records(app.storage.as_ref(), doc_type, primary_key, reader)?;
    app.storage.flush()?;
    println!("seeded records={} metadata={}", stats.records, stats.metadata);
    Ok(())
}

fn search(app: &App, query: &str, doc_type: Option<String>, limit: usize) -> Result<()> {
    let mut options = SearchOptions::default().with_limit(limit);
    if let Some(doc_type) = doc_type {
        options = options.with_doc_type(doc_type);
    }

    let hits = app.searcher()?.search(query, options)?;
    if hits.is_empty() {
        println!("no matches");
    }
    for hit in hits {
        println!("{:.3}  {}:{}", hit.score, hit.doc_type, hit.doc_id);
    }
    Ok(())
}
