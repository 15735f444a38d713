//! Per-cycle action queue.
//!
//! Holds at most one action per `(doc_type, id)`. Repeated triggers
//! collapse; an index and a delete for the same record are resolved by the
//! configured [`TieBreak`]. Flushing normalizes every queued index action,
//! submits it, applies deletes, and commits the backend once.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use sync_types::{Action, ActionKind, RecordId, TieBreak};

use crate::binding::TypeBinding;
use crate::error::IndexingError;
use crate::normalizer::ItemRef;
use crate::registry::TypeRegistry;
use crate::updater::{IndexBackend, UpdateResult};

/// Outcome of one flush.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Per-action counters
    pub result: UpdateResult,
    /// One message per failed or dropped action
    pub errors: Vec<String>,
    /// Whether the final backend commit succeeded
    pub committed: bool,
}

impl FlushReport {
    pub fn submitted(&self) -> usize {
        self.result.submitted
    }

    pub fn deleted(&self) -> usize {
        self.result.deleted
    }

    pub fn skipped(&self) -> usize {
        self.result.skipped
    }

    pub fn failed(&self) -> usize {
        self.result.failed
    }
}

/// Deduplicating queue of pending actions, in first-enqueue order.
#[derive(Debug, Default)]
pub struct ActionQueue {
    tie_break: TieBreak,
    actions: Vec<Action>,
    positions: HashMap<(String, RecordId), usize>,
}

impl ActionQueue {
    pub fn new(tie_break: TieBreak) -> Self {
        Self {
            tie_break,
            actions: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Queue an action. Returns `true` when the queue changed.
    pub fn enqueue(&mut self, action: Action) -> bool {
        let key = (action.doc_type.clone(), action.id.clone());
        let Some(&position) = self.positions.get(&key) else {
            self.positions.insert(key, self.actions.len());
            self.actions.push(action);
            return true;
        };

        let existing = &mut self.actions[position];
        let replace = match (existing.kind, action.kind) {
            (current, incoming) if current == incoming => false,
            (ActionKind::IndexItem, ActionKind::DeleteItem) => true,
            (ActionKind::DeleteItem, ActionKind::IndexItem) => {
                self.tie_break == TieBreak::LastWins
            }
            _ => false,
        };

        if replace {
            debug!(
                doc_type = %action.doc_type,
                id = %action.id,
                from = %existing.kind,
                to = %action.kind,
                "Replaced queued action"
            );
            existing.kind = action.kind;
        }
        replace
    }

    /// Queued actions in order.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Remove and return every queued action.
    pub fn drain(&mut self) -> Vec<Action> {
        self.positions.clear();
        std::mem::take(&mut self.actions)
    }

    /// Submit all queued actions to `backend`, then clear the queue.
    ///
    /// Failures are reported per action and never stop the remaining ones.
    pub fn flush(&mut self, registry: &TypeRegistry, backend: &dyn IndexBackend) -> FlushReport {
        let actions = self.drain();
        let mut report = FlushReport::default();
        if actions.is_empty() {
            report.committed = true;
            return report;
        }

        for action in &actions {
            if let Err(e) = apply(registry, backend, action, &mut report.result) {
                warn!(
                    doc_type = %action.doc_type,
                    id = %action.id,
                    action = %action.kind,
                    error = %e,
                    "Failed to apply action"
                );
                report
                    .errors
                    .push(format!("{} {}:{}: {}", action.kind, action.doc_type, action.id, e));
            }
        }

        match backend.commit() {
            Ok(()) => report.committed = true,
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "Commit failed after flush");
                report.errors.push(format!("commit: {}", e));
            }
        }

        info!(
            submitted = report.result.submitted,
            deleted = report.result.deleted,
            skipped = report.result.skipped,
            failed = report.result.failed,
            "Flushed action queue"
        );
        report
    }
}

/// Apply one action, updating `result`.
///
/// Returns an error only for failures worth reporting; vanished records
/// are counted as skipped and logged at debug level.
fn apply(
    registry: &TypeRegistry,
    backend: &dyn IndexBackend,
    action: &Action,
    result: &mut UpdateResult,
) -> Result<(), IndexingError> {
    match action.kind {
        ActionKind::DeleteItem => match backend.delete(&action.doc_type, &action.id) {
            Ok(()) => {
                result.record_delete();
                Ok(())
            }
            Err(e) => {
                result.record_error();
                Err(e.into())
            }
        },
        ActionKind::IndexItem => {
            let Some(binding) = registry.get(&action.doc_type) else {
                result.record_skip();
                return Err(IndexingError::UnknownType(action.doc_type.clone()));
            };
            let document = match binding.normalize(ItemRef::Id(action.id.clone())) {
                Ok(document) => document,
                Err(e) if e.is_not_found() => {
                    debug!(
                        doc_type = %action.doc_type,
                        id = %action.id,
                        "Record vanished before flush"
                    );
                    result.record_skip();
                    return Ok(());
                }
                Err(e) => {
                    result.record_skip();
                    return Err(e.into());
                }
            };
            match backend.submit(&document) {
                Ok(()) => {
                    result.record_success();
                    Ok(())
                }
                Err(e) => {
                    result.record_error();
                    Err(e.into())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_backend::InMemoryBackend;
    use crate::testing::{seed, store_binding};
    use std::sync::Arc;
    use sync_storage::{InMemoryRecordStore, RecordWriter};

    fn fixture(ids: std::ops::RangeInclusive<i64>) -> (Arc<InMemoryRecordStore>, TypeRegistry) {
        let store = Arc::new(InMemoryRecordStore::new());
        seed(&store, "comment", ids);
        let mut registry = TypeRegistry::new();
        registry.register(Arc::new(store_binding(store.clone(), "comment")));
        (store, registry)
    }

    fn index(id: i64) -> Action {
        Action::index("comment", RecordId::Int(id))
    }

    fn delete(id: i64) -> Action {
        Action::delete("comment", RecordId::Int(id))
    }

    #[test]
    fn test_duplicate_index_collapses() {
        let (_store, registry) = fixture(1..=10);
        let backend = InMemoryBackend::new();
        let mut queue = ActionQueue::new(TieBreak::DeleteWins);

        assert!(queue.enqueue(index(5)));
        assert!(!queue.enqueue(index(5)));
        let report = queue.flush(&registry, &backend);

        assert_eq!(report.submitted(), 1);
        assert_eq!(backend.submissions().len(), 1);
        assert!(queue.is_empty());
        assert!(report.committed);
    }

    #[test]
    fn test_delete_wins_regardless_of_order() {
        let (_store, registry) = fixture(1..=10);
        let backend = InMemoryBackend::new();
        let mut queue = ActionQueue::new(TieBreak::DeleteWins);

        queue.enqueue(index(5));
        queue.enqueue(delete(5));
        queue.enqueue(delete(6));
        queue.enqueue(index(6));
        assert_eq!(queue.len(), 2);

        let report = queue.flush(&registry, &backend);
        assert_eq!(report.submitted(), 0);
        assert_eq!(report.deleted(), 2);
        assert!(backend.submissions().is_empty());
    }

    #[test]
    fn test_last_wins_policy() {
        let mut queue = ActionQueue::new(TieBreak::LastWins);
        queue.enqueue(delete(6));
        queue.enqueue(index(6));
        queue.enqueue(index(7));
        queue.enqueue(delete(7));

        assert_eq!(queue.actions(), &[index(6), delete(7)]);
    }

    #[test]
    fn test_actions_are_scoped_by_type() {
        let mut queue = ActionQueue::new(TieBreak::DeleteWins);
        queue.enqueue(Action::index("comment", RecordId::Int(1)));
        queue.enqueue(Action::delete("post", RecordId::Int(1)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_vanished_record_is_skipped() {
        let (store, registry) = fixture(1..=10);
        let backend = InMemoryBackend::new();
        let mut queue = ActionQueue::new(TieBreak::DeleteWins);

        queue.enqueue(index(4));
        store.delete_record("comment", &RecordId::Int(4)).unwrap();
        let report = queue.flush(&registry, &backend);

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.submitted(), 0);
        assert!(report.errors.is_empty());
        assert!(backend.submissions().is_empty());
    }

    #[test]
    fn test_backend_failure_does_not_block_others() {
        let (_store, registry) = fixture(1..=10);
        let backend = InMemoryBackend::new();
        backend.fail_for("comment", &RecordId::Int(2));
        let mut queue = ActionQueue::new(TieBreak::DeleteWins);

        queue.enqueue(index(1));
        queue.enqueue(index(2));
        queue.enqueue(index(3));
        let report = queue.flush(&registry, &backend);

        assert_eq!(report.submitted(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("comment:2"));
        assert_eq!(backend.commits(), 1);
    }

    #[test]
    fn test_unknown_type_is_reported() {
        let (_store, registry) = fixture(1..=1);
        let backend = InMemoryBackend::new();
        let mut queue = ActionQueue::new(TieBreak::DeleteWins);

        queue.enqueue(Action::index("page", RecordId::Int(1)));
        let report = queue.flush(&registry, &backend);
        assert_eq!(report.skipped(), 1);
        assert!(report.errors[0].contains("Unknown content type"));
    }

    #[test]
    fn test_commit_failure_is_reported() {
        let (_store, registry) = fixture(1..=1);
        let backend = InMemoryBackend::new();
        backend.fail_commits(true);
        let mut queue = ActionQueue::new(TieBreak::DeleteWins);

        queue.enqueue(index(1));
        let report = queue.flush(&registry, &backend);
        assert_eq!(report.submitted(), 1);
        assert!(!report.committed);
        assert!(report.errors[0].starts_with("commit:"));
    }

    #[test]
    fn test_empty_flush_does_not_commit() {
        let (_store, registry) = fixture(1..=1);
        let backend = InMemoryBackend::new();
        let mut queue = ActionQueue::new(TieBreak::DeleteWins);

        let report = queue.flush(&registry, &backend);
        assert_eq!(report.result.total(), 0);
        assert_eq!(backend.commits(), 0);
    }
}
