//! One logical unit of incremental work.
//!
//! A cycle owns its queue: triggers accumulate actions and a single flush
//! at the end pushes them to the backend. Cycles never share queues, so
//! concurrent requests cannot see each other's actions.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use sync_types::{Action, TieBreak, TriggerPayload};

use crate::queue::{ActionQueue, FlushReport};
use crate::registry::TypeRegistry;
use crate::router::EventRouter;
use crate::updater::IndexBackend;

/// Queue plus the collaborators needed to resolve and flush it.
pub struct SyncCycle {
    router: Arc<EventRouter>,
    registry: Arc<TypeRegistry>,
    backend: Arc<dyn IndexBackend>,
    queue: ActionQueue,
}

impl SyncCycle {
    pub fn new(
        router: Arc<EventRouter>,
        registry: Arc<TypeRegistry>,
        backend: Arc<dyn IndexBackend>,
        tie_break: TieBreak,
    ) -> Self {
        Self {
            router,
            registry,
            backend,
            queue: ActionQueue::new(tie_break),
        }
    }

    /// Handle a mutation notification.
    ///
    /// Returns the number of actions the hook resolved to.
    pub fn trigger(&mut self, hook: &str, payload: TriggerPayload) -> usize {
        let actions = self.router.resolve(hook, &payload);
        let resolved = actions.len();
        for action in actions {
            self.queue.enqueue(action);
        }
        debug!(hook, resolved, pending = self.queue.len(), "Handled trigger");
        resolved
    }

    /// Queue an action directly.
    pub fn enqueue(&mut self, action: Action) -> bool {
        self.queue.enqueue(action)
    }

    /// Actions waiting for the flush.
    pub fn pending(&self) -> &[Action] {
        self.queue.actions()
    }

    /// Flush on the calling thread.
    pub fn flush(&mut self) -> FlushReport {
        self.queue.flush(&self.registry, self.backend.as_ref())
    }

    /// Flush on tokio's blocking pool, off the caller's critical path.
    pub fn flush_deferred(mut self) -> JoinHandle<FlushReport> {
        tokio::task::spawn_blocking(move || self.flush())
    }
}
