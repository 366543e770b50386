//! Shared exploration state
//!
//! The blackboard records what is known about a target: opened declarations
//! (evidence), references that could not be bound (unresolved), usage search
//! results and a timestamped log. A key is never both evidence and
//! unresolved.

mod patch;
mod shared;

pub use patch::{BlackboardPatch, OutOfScopeMark, PatchReport};
pub use shared::SharedBlackboard;

use crate::search::{is_builtin, Evidence, UsageHit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Attempts after which an unresolved reference is considered out of scope
pub const OUT_OF_SCOPE_AFTER: u32 = 2;

/// A callee name that could not be bound to one declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedReference {
    pub reference: String,
    /// Qualified name of the evidence whose body made the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub out_of_scope: bool,
}

impl UnresolvedReference {
    pub fn new(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            origin: None,
            reason: reason.into(),
            candidates: Vec::new(),
            attempts: 1,
            out_of_scope: false,
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn out_of_scope(mut self) -> Self {
        self.out_of_scope = true;
        self
    }
}

/// Timestamped log line tagged with the round it was written in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub round: usize,
    pub message: String,
}

/// Whether `reference` names `key`: equal, or a dotted suffix of it.
pub fn reference_matches(reference: &str, key: &str) -> bool {
    reference == key
        || (key.len() > reference.len()
            && key.ends_with(reference)
            && key.as_bytes()[key.len() - reference.len() - 1] == b'.')
}

/// Whether evidence under `key` settles a reference with the given
/// candidates. An ambiguous reference is settled only by its exact key.
fn settles(reference: &str, candidates: &[String], key: &str) -> bool {
    if reference == key {
        return true;
    }
    match candidates {
        [] => reference_matches(reference, key),
        [only] => only == key && reference_matches(reference, key),
        _ => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blackboard {
    target: String,
    current_focus: String,
    evidence: BTreeMap<String, Evidence>,
    unresolved: BTreeMap<String, UnresolvedReference>,
    usages: BTreeMap<String, Vec<UsageHit>>,
    log: Vec<LogEntry>,
    iterations: usize,
}

impl Blackboard {
    pub fn new(target: impl Into<String>) -> Self {
        let target = target.into();
        Self {
            current_focus: target.clone(),
            target,
            evidence: BTreeMap::new(),
            unresolved: BTreeMap::new(),
            usages: BTreeMap::new(),
            log: Vec::new(),
            iterations: 0,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn current_focus(&self) -> &str {
        &self.current_focus
    }

    pub fn set_focus(&mut self, focus: impl Into<String>) {
        self.current_focus = focus.into();
    }

    pub fn evidence(&self) -> &BTreeMap<String, Evidence> {
        &self.evidence
    }

    pub fn unresolved(&self) -> &BTreeMap<String, UnresolvedReference> {
        &self.unresolved
    }

    pub fn usages(&self) -> &BTreeMap<String, Vec<UsageHit>> {
        &self.usages
    }

    pub fn log_entries(&self) -> &[LogEntry] {
        &self.log
    }

    /// Last `n` log messages, oldest first
    pub fn log_tail(&self, n: usize) -> Vec<&str> {
        let start = self.log.len().saturating_sub(n);
        self.log[start..].iter().map(|e| e.message.as_str()).collect()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn set_iteration(&mut self, round: usize) {
        self.iterations = round;
    }

    /// Insert evidence, replacing any earlier entry for the same name.
    ///
    /// Unresolved entries naming this declaration are dropped. Ambiguous
    /// entries stay unless the key matches exactly.
    pub fn add_evidence(&mut self, evidence: Evidence) {
        let key = evidence.qualified_name().to_string();
        self.unresolved
            .retain(|reference, entry| !settles(reference, &entry.candidates, &key));
        self.evidence.insert(key, evidence);
    }

    /// Drop the unresolved entry for `reference` once an action bound it.
    pub fn settle(&mut self, reference: &str) -> bool {
        self.unresolved.remove(reference.trim()).is_some()
    }

    /// Whether a reference is already covered by evidence.
    pub fn is_resolved(&self, reference: &str) -> bool {
        let candidates = self
            .unresolved
            .get(reference)
            .map(|entry| entry.candidates.as_slice())
            .unwrap_or_default();
        self.is_covered(reference, candidates)
    }

    fn is_covered(&self, reference: &str, candidates: &[String]) -> bool {
        self.evidence.contains_key(reference)
            || self
                .evidence
                .keys()
                .any(|key| settles(reference, candidates, key))
    }

    /// Record an unresolved reference. Returns `true` when it is new.
    ///
    /// References already covered by evidence are ignored. Repeated marks
    /// merge candidates and count attempts; after [`OUT_OF_SCOPE_AFTER`]
    /// attempts the reference is flagged out of scope.
    pub fn mark_unresolved(&mut self, reference: UnresolvedReference) -> bool {
        let key = reference.reference.trim().to_string();
        if key.is_empty() || self.is_covered(&key, &reference.candidates) {
            return false;
        }

        match self.unresolved.get_mut(&key) {
            None => {
                let mut reference = reference;
                reference.reference = key.clone();
                reference.attempts = reference.attempts.max(1);
                if reference.attempts >= OUT_OF_SCOPE_AFTER {
                    reference.out_of_scope = true;
                }
                reference.candidates.sort();
                reference.candidates.dedup();
                self.unresolved.insert(key, reference);
                true
            }
            Some(existing) => {
                existing.attempts += 1;
                if existing.attempts >= OUT_OF_SCOPE_AFTER || reference.out_of_scope {
                    existing.out_of_scope = true;
                }
                if !reference.reason.is_empty() {
                    existing.reason = reference.reason;
                }
                if existing.origin.is_none() {
                    existing.origin = reference.origin;
                }
                let merged: BTreeSet<String> = existing
                    .candidates
                    .drain(..)
                    .chain(reference.candidates)
                    .collect();
                existing.candidates = merged.into_iter().collect();
                false
            }
        }
    }

    pub fn record_usages(&mut self, needle: impl Into<String>, hits: Vec<UsageHit>) {
        self.usages.insert(needle.into(), hits);
    }

    pub fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(round = self.iterations, "{}", message);
        self.log.push(LogEntry {
            at: Utc::now(),
            round: self.iterations,
            message,
        });
    }

    /// Calls made by evidence that are neither opened nor recorded as
    /// unresolved, in evidence order. Builtins are excluded.
    pub fn frontier(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut frontier = Vec::new();
        for evidence in self.evidence.values() {
            for call in &evidence.calls {
                if is_builtin(call)
                    || self.unresolved.contains_key(call)
                    || self.is_resolved(call)
                    || !seen.insert(call.as_str())
                {
                    continue;
                }
                frontier.push(call.clone());
            }
        }
        frontier
    }

    /// Disjointness of evidence and unresolved keys.
    pub fn is_consistent(&self) -> bool {
        self.unresolved
            .iter()
            .all(|(key, entry)| !self.is_covered(key, &entry.candidates))
    }
}
