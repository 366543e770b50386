//! Planner-proposed blackboard edits

use super::{Blackboard, UnresolvedReference};
use crate::error::PatchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Relabel an unresolved reference as out of scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfScopeMark {
    pub symbol: String,
    #[serde(default)]
    pub reason: String,
}

/// A set of edits applied all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackboardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_focus: Option<String>,
    #[serde(alias = "add_frontier")]
    pub add_unresolved: Vec<String>,
    pub remove_unresolved: Vec<String>,
    pub mark_out_of_scope: Vec<OutOfScopeMark>,
}

impl BlackboardPatch {
    pub fn is_empty(&self) -> bool {
        self.current_focus.is_none()
            && self.add_unresolved.is_empty()
            && self.remove_unresolved.is_empty()
            && self.mark_out_of_scope.is_empty()
    }
}

/// What an applied patch changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchReport {
    pub focus_changed: bool,
    pub added: usize,
    pub removed: usize,
    pub relabeled: usize,
}

impl std::fmt::Display for PatchReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "focus_changed={} added={} removed={} out_of_scope={}",
            self.focus_changed, self.added, self.removed, self.relabeled
        )
    }
}

impl Blackboard {
    fn knows(&self, key: &str) -> bool {
        self.evidence.contains_key(key) || self.unresolved.contains_key(key)
    }

    /// Apply a patch, or change nothing.
    ///
    /// Focus, removals and relabels must name keys present in the evidence or
    /// unresolved maps (references added by the same patch count). Otherwise
    /// the patch is rejected with [`PatchError::UnknownKeys`] and the
    /// rejection is logged.
    pub fn apply_patch(&mut self, patch: &BlackboardPatch) -> Result<PatchReport, PatchError> {
        let added: BTreeSet<&str> = patch
            .add_unresolved
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .collect();

        let referenced = patch
            .current_focus
            .iter()
            .chain(patch.remove_unresolved.iter())
            .chain(patch.mark_out_of_scope.iter().map(|m| &m.symbol));
        let mut unknown: Vec<String> = referenced
            .map(|k| k.trim())
            .filter(|k| !self.knows(k) && !added.contains(k))
            .map(str::to_string)
            .collect();

        if !unknown.is_empty() {
            unknown.sort();
            unknown.dedup();
            tracing::warn!(keys = ?unknown, "rejecting blackboard patch");
            self.log(format!("[patch] rejected: unknown keys {}", unknown.join(", ")));
            return Err(PatchError::UnknownKeys(unknown));
        }

        let mut report = PatchReport::default();
        for reference in added {
            if self.mark_unresolved(UnresolvedReference::new(reference, "added by planner")) {
                report.added += 1;
            }
        }
        for mark in &patch.mark_out_of_scope {
            if let Some(entry) = self.unresolved.get_mut(mark.symbol.trim()) {
                entry.out_of_scope = true;
                if !mark.reason.is_empty() {
                    entry.reason = mark.reason.clone();
                }
                report.relabeled += 1;
            }
        }
        for reference in &patch.remove_unresolved {
            if self.unresolved.remove(reference.trim()).is_some() {
                report.removed += 1;
            }
        }
        if let Some(focus) = &patch.current_focus {
            let focus = focus.trim();
            if focus != self.current_focus {
                self.current_focus = focus.to_string();
                report.focus_changed = true;
            }
        }

        self.log(format!("[patch] applied: {}", report));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Blackboard {
        let mut bb = Blackboard::new("a.foo");
        bb.mark_unresolved(UnresolvedReference::new("normalize", "ambiguous"));
        bb.mark_unresolved(UnresolvedReference::new("np.array", "not found"));
        bb
    }

    #[test]
    fn test_apply_valid_patch() {
        let mut bb = board();
        let patch = BlackboardPatch {
            current_focus: Some("normalize".to_string()),
            add_unresolved: vec!["helpers.log".to_string()],
            remove_unresolved: vec![],
            mark_out_of_scope: vec![OutOfScopeMark {
                symbol: "np.array".to_string(),
                reason: "third-party".to_string(),
            }],
        };
        let report = bb.apply_patch(&patch).unwrap();
        assert!(report.focus_changed);
        assert_eq!((report.added, report.relabeled), (1, 1));
        assert_eq!(bb.current_focus(), "normalize");
        assert!(bb.unresolved()["np.array"].out_of_scope);
        assert_eq!(bb.unresolved()["np.array"].reason, "third-party");
        assert!(bb.unresolved().contains_key("helpers.log"));
    }

    #[test]
    fn test_unknown_key_rejects_whole_patch() {
        let mut bb = board();
        let before = bb.unresolved().clone();
        let patch = BlackboardPatch {
            current_focus: Some("normalize".to_string()),
            add_unresolved: vec!["fresh".to_string()],
            remove_unresolved: vec!["never.seen".to_string()],
            mark_out_of_scope: vec![],
        };
        let err = bb.apply_patch(&patch).unwrap_err();
        assert!(matches!(err, PatchError::UnknownKeys(ref keys) if keys == &["never.seen".to_string()]));
        assert_eq!(bb.unresolved(), &before);
        assert_eq!(bb.current_focus(), "a.foo");
        assert!(bb.log_tail(1)[0].contains("rejected"));
    }

    #[test]
    fn test_add_frontier_alias() {
        let patch: BlackboardPatch =
            serde_json::from_str(r#"{"add_frontier": ["x.y"], "current_focus": null}"#).unwrap();
        assert_eq!(patch.add_unresolved, vec!["x.y"]);
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_remove_unresolved() {
        let mut bb = board();
        let patch = BlackboardPatch {
            remove_unresolved: vec!["normalize".to_string()],
            ..Default::default()
        };
        assert_eq!(bb.apply_patch(&patch).unwrap().removed, 1);
        assert!(!bb.unresolved().contains_key("normalize"));
    }
}
