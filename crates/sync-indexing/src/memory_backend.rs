//! In-memory index backend.
//!
//! Keeps the latest document per address plus a log of every operation.
//! Individual submits or deletes can be made to fail for tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use sync_types::{document_key, ActionKind, Document, RecordId};

use crate::error::BackendError;
use crate::updater::IndexBackend;

/// One operation accepted by [`InMemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendOp {
    pub kind: ActionKind,
    pub doc_type: String,
    pub id: RecordId,
}

#[derive(Default)]
struct State {
    documents: BTreeMap<String, Document>,
    ops: Vec<BackendOp>,
    commits: usize,
    failing: HashSet<String>,
    fail_commit: bool,
}

/// Backend holding documents in a map.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, BackendError> {
        self.state
            .lock()
            .map_err(|e| BackendError::Unavailable(e.to_string()))
    }

    fn read<T: Default>(&self, f: impl FnOnce(&State) -> T) -> T {
        self.state.lock().map(|s| f(&s)).unwrap_or_default()
    }

    /// Reject every submit and delete addressed to this document.
    pub fn fail_for(&self, doc_type: &str, id: &RecordId) {
        if let Ok(mut state) = self.lock() {
            state.failing.insert(document_key(doc_type, id));
        }
    }

    /// Reject commits.
    pub fn fail_commits(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.fail_commit = fail;
        }
    }

    /// Current document at an address.
    pub fn document(&self, doc_type: &str, id: &RecordId) -> Option<Document> {
        self.read(|s| s.documents.get(&document_key(doc_type, id)).cloned())
    }

    /// Number of live documents.
    pub fn len(&self) -> usize {
        self.read(|s| s.documents.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accepted operations in call order.
    pub fn ops(&self) -> Vec<BackendOp> {
        self.read(|s| s.ops.clone())
    }

    /// Accepted submissions in call order.
    pub fn submissions(&self) -> Vec<BackendOp> {
        self.read(|s| {
            s.ops
                .iter()
                .filter(|op| op.kind == ActionKind::IndexItem)
                .cloned()
                .collect()
        })
    }

    /// Accepted deletes in call order.
    pub fn deletions(&self) -> Vec<BackendOp> {
        self.read(|s| {
            s.ops
                .iter()
                .filter(|op| op.kind == ActionKind::DeleteItem)
                .cloned()
                .collect()
        })
    }

    /// Number of successful commits.
    pub fn commits(&self) -> usize {
        self.read(|s| s.commits)
    }
}

impl IndexBackend for InMemoryBackend {
    fn submit(&self, document: &Document) -> Result<(), BackendError> {
        let key = document.key();
        let mut state = self.lock()?;
        if state.failing.contains(&key) {
            return Err(BackendError::Rejected {
                operation: "submit",
                key,
                reason: "injected failure".to_string(),
            });
        }
        state.ops.push(BackendOp {
            kind: ActionKind::IndexItem,
            doc_type: document.doc_type.clone(),
            id: document.id.clone(),
        });
        state.documents.insert(key, document.clone());
        Ok(())
    }

    fn delete(&self, doc_type: &str, id: &RecordId) -> Result<(), BackendError> {
        let key = document_key(doc_type, id);
        let mut state = self.lock()?;
        if state.failing.contains(&key) {
            return Err(BackendError::Rejected {
                operation: "delete",
                key,
                reason: "injected failure".to_string(),
            });
        }
        state.ops.push(BackendOp {
            kind: ActionKind::DeleteItem,
            doc_type: doc_type.to_string(),
            id: id.clone(),
        });
        state.documents.remove(&key);
        Ok(())
    }

    fn commit(&self) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        if state.fail_commit {
            return Err(BackendError::Unavailable("injected commit failure".to_string()));
        }
        state.commits += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
