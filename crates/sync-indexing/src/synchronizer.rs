//! Entry point tying registry, router, queue and bulk driver together.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use sync_types::{SyncSettings, TieBreak};

use crate::binding::TypeBinding;
use crate::bulk::{BulkSyncDriver, NoOpProgressCallback, ProgressCallback, SyncOptions, SyncReport};
use crate::cycle::SyncCycle;
use crate::registry::TypeRegistry;
use crate::router::EventRouter;
use crate::updater::IndexBackend;

/// Keeps an index backend in step with the registered content types.
pub struct Synchronizer {
    registry: Arc<TypeRegistry>,
    router: Arc<EventRouter>,
    backend: Arc<dyn IndexBackend>,
    progress: Arc<dyn ProgressCallback>,
    tie_break: TieBreak,
    concurrent_types: bool,
}

impl Synchronizer {
    pub fn new(backend: Arc<dyn IndexBackend>) -> Self {
        Self {
            registry: Arc::new(TypeRegistry::new()),
            router: Arc::new(EventRouter::default()),
            backend,
            progress: Arc::new(NoOpProgressCallback),
            tie_break: TieBreak::default(),
            concurrent_types: true,
        }
    }

    /// Build from configuration.
    pub fn from_settings(backend: Arc<dyn IndexBackend>, settings: &SyncSettings) -> Self {
        Self::new(backend)
            .with_tie_break(settings.tie_break)
            .with_concurrent_types(settings.concurrent_types)
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn with_concurrent_types(mut self, concurrent: bool) -> Self {
        self.concurrent_types = concurrent;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    /// Add a content type, replacing any binding with the same name.
    ///
    /// Cycles started earlier keep the routing they were created with.
    pub fn register_type(&mut self, binding: Arc<dyn TypeBinding>) {
        Arc::make_mut(&mut self.registry).register(binding);
        self.router = Arc::new(EventRouter::from_registry(&self.registry));
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn backend(&self) -> &Arc<dyn IndexBackend> {
        &self.backend
    }

    /// Start a unit of incremental work with its own queue.
    pub fn begin_cycle(&self) -> SyncCycle {
        SyncCycle::new(
            self.router.clone(),
            self.registry.clone(),
            self.backend.clone(),
            self.tie_break,
        )
    }

    fn driver(&self) -> BulkSyncDriver {
        BulkSyncDriver::new(self.registry.clone(), self.backend.clone())
            .with_progress(self.progress.clone())
            .with_concurrent_types(self.concurrent_types)
    }

    /// Bulk sync the selected types.
    pub async fn sync_all(&self, options: SyncOptions) -> SyncReport {
        self.sync_all_with_cancel(options, CancellationToken::new())
            .await
    }

    /// Bulk sync, stopping between pages once `cancel` fires.
    pub async fn sync_all_with_cancel(
        &self,
        options: SyncOptions,
        cancel: CancellationToken,
    ) -> SyncReport {
        self.driver().run(options, cancel).await
    }
}
