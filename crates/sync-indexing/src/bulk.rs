//! Bulk reindexing over registered content types.
//!
//! Each type is paged in descending primary-key order and every page is
//! normalized and submitted straight to the backend, bypassing the action
//! queue. Cancellation is checked between pages; no cursor is kept, so a
//! cancelled run is simply repeated from the start.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use sync_types::{Document, SyncMode, SyncSettings};

use crate::binding::TypeBinding;
use crate::error::{IndexingError, NormalizationError};
use crate::normalizer::ItemRef;
use crate::pagination::page_count;
use crate::registry::TypeRegistry;
use crate::updater::{IndexBackend, UpdateResult};

/// Default page size for bulk sync.
pub const DEFAULT_PER_PAGE: u64 = 100;

/// Options for one bulk sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Restrict to these types (None = all registered)
    pub types: Option<Vec<String>>,
    /// Page size
    pub per_page: u64,
    /// Full records or ids only
    pub mode: SyncMode,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            types: None,
            per_page: DEFAULT_PER_PAGE,
            mode: SyncMode::Full,
        }
    }
}

impl SyncOptions {
    /// Options seeded from configuration.
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            types: None,
            per_page: settings.per_page,
            mode: settings.mode,
        }
    }

    pub fn with_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn with_mode(mut self, mode: SyncMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Outcome for one content type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeReport {
    pub doc_type: String,
    /// Rows reported by `get_items_count`
    pub total: u64,
    /// Pages fetched
    pub pages: u64,
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Stopped early because of cancellation
    pub cancelled: bool,
    /// Query error that ended this type's run
    pub fatal: Option<String>,
    /// Per-item and commit errors
    pub errors: Vec<String>,
    pub elapsed_ms: u64,
}

impl TypeReport {
    fn new(doc_type: &str) -> Self {
        Self {
            doc_type: doc_type.to_string(),
            ..Default::default()
        }
    }

    fn absorb(&mut self, result: &UpdateResult) {
        self.submitted += result.submitted;
        self.skipped += result.skipped;
        self.failed += result.failed;
    }

    /// Whether every page was processed.
    pub fn completed(&self) -> bool {
        !self.cancelled && self.fatal.is_none()
    }
}

/// Aggregate outcome of a bulk sync run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// Per-type reports in registration order
    pub types: Vec<TypeReport>,
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
    /// Set when the options were refused and no type ran
    pub rejected: Option<String>,
    /// Every error from every type, prefixed with the type name
    pub errors: Vec<String>,
}

impl SyncReport {
    fn add(&mut self, report: TypeReport) {
        self.submitted += report.submitted;
        self.skipped += report.skipped;
        self.failed += report.failed;
        self.cancelled |= report.cancelled;
        if let Some(fatal) = &report.fatal {
            self.errors.push(format!("{}: {}", report.doc_type, fatal));
        }
        self.errors.extend(
            report
                .errors
                .iter()
                .map(|e| format!("{}: {}", report.doc_type, e)),
        );
        self.types.push(report);
    }

    fn fail(&mut self, doc_type: &str, error: &IndexingError) {
        let mut report = TypeReport::new(doc_type);
        report.fatal = Some(error.to_string());
        self.add(report);
    }

    /// Report for one type.
    pub fn type_report(&self, doc_type: &str) -> Option<&TypeReport> {
        self.types.iter().find(|t| t.doc_type == doc_type)
    }

    /// Whether the run was refused or any type ended with a fatal error.
    pub fn has_fatal(&self) -> bool {
        self.rejected.is_some() || self.types.iter().any(|t| t.fatal.is_some())
    }
}

/// Progress of one type after a page.
#[derive(Debug, Clone)]
pub struct PageProgress<'a> {
    pub doc_type: &'a str,
    pub page: u64,
    pub pages: u64,
    pub submitted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Trait for receiving bulk sync progress updates.
pub trait ProgressCallback: Send + Sync {
    /// Called after each page is processed.
    fn on_page(&self, progress: &PageProgress<'_>);
}

/// A no-op progress callback for when progress reporting isn't needed.
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_page(&self, _progress: &PageProgress<'_>) {}
}

/// A callback that logs every `every` pages and the last page at info level.
pub struct LoggingProgressCallback {
    every: u64,
}

impl LoggingProgressCallback {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl ProgressCallback for LoggingProgressCallback {
    fn on_page(&self, progress: &PageProgress<'_>) {
        if progress.page.is_multiple_of(self.every) || progress.page == progress.pages {
            info!(
                doc_type = progress.doc_type,
                page = progress.page,
                pages = progress.pages,
                submitted = progress.submitted,
                skipped = progress.skipped,
                failed = progress.failed,
                "Bulk sync progress"
            );
        }
    }
}

/// Drives bulk sync across the registry.
pub struct BulkSyncDriver {
    registry: Arc<TypeRegistry>,
    backend: Arc<dyn IndexBackend>,
    progress: Arc<dyn ProgressCallback>,
    concurrent_types: bool,
}

impl BulkSyncDriver {
    pub fn new(registry: Arc<TypeRegistry>, backend: Arc<dyn IndexBackend>) -> Self {
        Self {
            registry,
            backend,
            progress: Arc::new(NoOpProgressCallback),
            concurrent_types: true,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Run distinct types on separate blocking tasks at the same time.
    pub fn with_concurrent_types(mut self, concurrent: bool) -> Self {
        self.concurrent_types = concurrent;
        self
    }

    /// Resolve the bindings a run covers, in registration order.
    ///
    /// Unknown names in `options.types` are returned separately.
    fn select(&self, options: &SyncOptions) -> (Vec<Arc<dyn TypeBinding>>, Vec<String>) {
        match &options.types {
            None => (self.registry.iter().cloned().collect(), Vec::new()),
            Some(names) => {
                let selected = self
                    .registry
                    .iter()
                    .filter(|b| names.iter().any(|n| n == b.name()))
                    .cloned()
                    .collect();
                let unknown = names
                    .iter()
                    .filter(|n| self.registry.get(n).is_none())
                    .cloned()
                    .collect();
                (selected, unknown)
            }
        }
    }

    /// Run a bulk sync.
    pub async fn run(&self, options: SyncOptions, cancel: CancellationToken) -> SyncReport {
        let mut report = SyncReport::default();
        if options.per_page == 0 {
            let error =
                IndexingError::InvalidOptions("per_page must be greater than 0".to_string());
            warn!(error = %error, "Refusing bulk sync");
            report.errors.push(error.to_string());
            report.rejected = Some(error.to_string());
            return report;
        }

        let (bindings, unknown) = self.select(&options);
        for name in &unknown {
            report.fail(name, &IndexingError::UnknownType(name.clone()));
        }

        info!(
            types = bindings.len(),
            per_page = options.per_page,
            mode = %options.mode,
            concurrent = self.concurrent_types,
            "Starting bulk sync"
        );

        let spawn = |binding: Arc<dyn TypeBinding>| {
            let backend = self.backend.clone();
            let progress = self.progress.clone();
            let cancel = cancel.clone();
            let (per_page, mode) = (options.per_page, options.mode);
            let name = binding.name().to_string();
            let handle = tokio::task::spawn_blocking(move || {
                sync_type(
                    binding.as_ref(),
                    backend.as_ref(),
                    per_page,
                    mode,
                    &cancel,
                    progress.as_ref(),
                )
            });
            (name, handle)
        };

        if self.concurrent_types {
            let handles: Vec<_> = bindings.into_iter().map(spawn).collect();
            for (name, handle) in handles {
                collect(&mut report, &name, handle.await);
            }
        } else {
            for binding in bindings {
                let (name, handle) = spawn(binding);
                collect(&mut report, &name, handle.await);
            }
        }

        info!(
            submitted = report.submitted,
            skipped = report.skipped,
            failed = report.failed,
            cancelled = report.cancelled,
            errors = report.errors.len(),
            "Bulk sync complete"
        );
        report
    }
}

fn collect(
    report: &mut SyncReport,
    name: &str,
    joined: Result<TypeReport, tokio::task::JoinError>,
) {
    match joined {
        Ok(type_report) => report.add(type_report),
        Err(e) => {
            warn!(doc_type = name, error = %e, "Bulk sync task failed");
            let mut type_report = TypeReport::new(name);
            type_report.fatal = Some(format!("task failed: {}", e));
            report.add(type_report);
        }
    }
}

/// Sync one content type on the calling thread.
///
/// Page or count query errors end this type's run and are recorded in
/// [`TypeReport::fatal`]; everything already submitted is still committed.
pub fn sync_type(
    binding: &dyn TypeBinding,
    backend: &dyn IndexBackend,
    per_page: u64,
    mode: SyncMode,
    cancel: &CancellationToken,
    progress: &dyn ProgressCallback,
) -> TypeReport {
    let start = Instant::now();
    let doc_type = binding.name();
    let mut report = TypeReport::new(doc_type);

    let total = match binding.get_items_count() {
        Ok(total) => total,
        Err(e) => {
            warn!(doc_type, error = %e, "Count query failed");
            report.fatal = Some(IndexingError::StoreQuery(e).to_string());
            return report;
        }
    };
    report.total = total;

    let pages = page_count(total, per_page);
    info!(doc_type, total, pages, mode = %mode, "Syncing content type");

    for page in 1..=pages {
        if cancel.is_cancelled() {
            info!(doc_type, page, pages, "Bulk sync cancelled");
            report.cancelled = true;
            break;
        }

        let documents = match fetch_documents(binding, page as i64, per_page, mode) {
            Ok(documents) => documents,
            Err(e) => {
                warn!(doc_type, page, error = %e, "Page query failed");
                report.fatal = Some(IndexingError::StoreQuery(e).to_string());
                break;
            }
        };
        report.pages += 1;

        let mut result = UpdateResult::new();
        for normalized in documents {
            let document = match normalized {
                Ok(document) => document,
                Err(e) => {
                    debug!(doc_type, page, error = %e, "Skipping item");
                    if !e.is_not_found() {
                        report.errors.push(e.to_string());
                    }
                    result.record_skip();
                    continue;
                }
            };
            if let Err(e) = backend.submit(&document) {
                warn!(key = %document.key(), error = %e, "Failed to submit document");
                report.errors.push(format!("{}: {}", document.key(), e));
                result.record_error();
            } else {
                result.record_success();
            }
        }
        report.absorb(&result);

        progress.on_page(&PageProgress {
            doc_type,
            page,
            pages,
            submitted: report.submitted,
            skipped: report.skipped,
            failed: report.failed,
        });
    }

    if report.pages > 0 {
        if let Err(e) = backend.commit() {
            warn!(doc_type, error = %e, "Commit failed after bulk sync");
            report.errors.push(format!("commit: {}", e));
        }
    }

    report.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        doc_type,
        submitted = report.submitted,
        skipped = report.skipped,
        failed = report.failed,
        cancelled = report.cancelled,
        elapsed_ms = report.elapsed_ms,
        "Content type sync complete"
    );
    report
}

/// Fetch a page and normalize every item on it.
fn fetch_documents(
    binding: &dyn TypeBinding,
    page: i64,
    per_page: u64,
    mode: SyncMode,
) -> Result<Vec<Result<Document, NormalizationError>>, sync_storage::StorageError> {
    let items: Vec<ItemRef> = match mode {
        SyncMode::Full => binding
            .get_items(page, per_page)?
            .into_iter()
            .map(ItemRef::Record)
            .collect(),
        SyncMode::Pending => binding
            .get_items_ids(page, per_page)?
            .into_iter()
            .map(ItemRef::Id)
            .collect(),
    };
    Ok(items.into_iter().map(|item| binding.normalize(item)).collect())
}
