//! Holder for the single "current" index.
//!
//! Readers take an `Arc` snapshot under a short read lock and query it with
//! the lock released, so a concurrent [`RetrievalSession::replace`] never
//! blocks behind a running query. The replaced index is freed once the last
//! snapshot holding it is dropped.
//!
//! Only one document is searchable at a time.

use crate::error::SearchError;
use crate::index::VectorIndex;
use crate::models::ScoredPassage;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

#[derive(Debug, Default)]
struct Slot {
    current: Option<Arc<VectorIndex>>,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct RetrievalSession {
    slot: RwLock<Slot>,
}

impl RetrievalSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `index` as current and returns the new generation number.
    pub fn replace(&self, index: VectorIndex) -> u64 {
        let index = Arc::new(index);
        let (generation, previous) = {
            let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
            slot.generation += 1;
            let previous = slot.current.replace(Arc::clone(&index));
            (slot.generation, previous)
        };

        info!(
            index_id = %index.id(),
            generation,
            passages = index.len(),
            previous_index = ?previous.as_ref().map(|old| old.id()),
            "installed vector index"
        );
        generation
    }

    /// The index current at the time of the call, if any.
    pub fn snapshot(&self) -> Option<Arc<VectorIndex>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.slot.read().unwrap_or_else(PoisonError::into_inner).generation
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot().is_some()
    }

    pub fn retrieve(&self, query_vector: &[f32], k: usize) -> Result<Vec<ScoredPassage>, SearchError> {
        let index = self.current()?;
        index.query(query_vector, k)
    }

    /// Like [`snapshot`](Self::snapshot), but a missing index is an error.
    pub fn current(&self) -> Result<Arc<VectorIndex>, SearchError> {
        self.snapshot().ok_or_else(|| {
            SearchError::NotReady("Knowledge base not loaded. Upload a PDF first.".to_string())
        })
    }
}
