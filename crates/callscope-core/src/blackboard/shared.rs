//! Blackboard handle shared between the loop and its workers

use super::{Blackboard, BlackboardPatch, PatchReport, UnresolvedReference};
use crate::error::PatchError;
use crate::search::Evidence;
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable handle; every method is one atomic update.
#[derive(Debug, Clone)]
pub struct SharedBlackboard {
    inner: Arc<Mutex<Blackboard>>,
}

impl SharedBlackboard {
    pub fn new(blackboard: Blackboard) -> Self {
        Self {
            inner: Arc::new(Mutex::new(blackboard)),
        }
    }

    /// Run `f` against a consistent view.
    pub fn read<R>(&self, f: impl FnOnce(&Blackboard) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Run several edits as one logical unit.
    pub fn update<R>(&self, f: impl FnOnce(&mut Blackboard) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn snapshot(&self) -> Blackboard {
        self.inner.lock().clone()
    }

    pub fn add_evidence(&self, evidence: Evidence) {
        self.inner.lock().add_evidence(evidence);
    }

    pub fn mark_unresolved(&self, reference: UnresolvedReference) -> bool {
        self.inner.lock().mark_unresolved(reference)
    }

    pub fn log(&self, message: impl Into<String>) {
        self.inner.lock().log(message);
    }

    pub fn set_iteration(&self, round: usize) {
        self.inner.lock().set_iteration(round);
    }

    pub fn apply_patch(&self, patch: &BlackboardPatch) -> Result<PatchReport, PatchError> {
        self.inner.lock().apply_patch(patch)
    }

    pub fn into_inner(self) -> Blackboard {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner(),
            Err(shared) => shared.lock().clone(),
        }
    }
}
