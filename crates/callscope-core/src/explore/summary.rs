//! Bounded blackboard view handed to the planner

use crate::blackboard::Blackboard;
use crate::config::ExplorationConfig;
use crate::search::snippet::{head_lines, truncate_chars};
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub const MAX_EVIDENCE: usize = 50;
pub const MAX_UNRESOLVED: usize = 30;
pub const MAX_FRONTIER: usize = 20;
const MAX_SNIPPET_CHARS: usize = 2000;

/// Summarise the blackboard for one planning round.
///
/// The focus declaration is listed first; every list is capped so the prompt
/// stays bounded regardless of blackboard size.
pub fn planner_summary(bb: &Blackboard, config: &ExplorationConfig) -> Value {
    let focus = bb.current_focus();
    let ordered = bb
        .evidence()
        .get(focus)
        .into_iter()
        .chain(bb.evidence().values().filter(|e| e.qualified_name() != focus));

    let evidence: Vec<Value> = ordered
        .take(MAX_EVIDENCE)
        .map(|e| {
            let snippet = head_lines(&e.snippet, config.summary_snippet_lines);
            json!({
                "qualified_name": e.qualified_name(),
                "kind": e.symbol.kind,
                "defined_in": e.symbol.file_path,
                "span": [e.symbol.line_start, e.symbol.line_end],
                "source": e.source,
                "snippet_head": truncate_chars(&snippet, MAX_SNIPPET_CHARS),
                "calls": e.calls,
            })
        })
        .collect();

    let resolved: Vec<&str> = bb
        .evidence()
        .keys()
        .take(MAX_EVIDENCE)
        .map(String::as_str)
        .collect();
    let short_names: BTreeSet<&str> = bb
        .evidence()
        .values()
        .map(|e| e.symbol.short_name())
        .collect();

    let unresolved: Vec<Value> = bb
        .unresolved()
        .values()
        .take(MAX_UNRESOLVED)
        .map(|r| {
            json!({
                "reference": r.reference,
                "origin": r.origin,
                "reason": r.reason,
                "candidates": r.candidates,
                "attempts": r.attempts,
                "out_of_scope": r.out_of_scope,
            })
        })
        .collect();

    let frontier: Vec<String> = bb.frontier().into_iter().take(MAX_FRONTIER).collect();

    json!({
        "target": bb.target(),
        "current_focus": focus,
        "round": bb.iterations(),
        "resolved_count": bb.evidence().len(),
        "unresolved_count": bb.unresolved().len(),
        "resolved_symbols": resolved,
        "resolved_short_names": short_names,
        "evidence": evidence,
        "unresolved": unresolved,
        "frontier": frontier,
        "recent_log": bb.log_tail(config.log_tail),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::UnresolvedReference;
    use crate::index::{SourceKind, SymbolDef, SymbolKind};
    use crate::search::Evidence;

    fn evidence(name: &str, calls: Vec<String>) -> Evidence {
        Evidence {
            symbol: SymbolDef {
                qualified_name: name.to_string(),
                kind: SymbolKind::Function,
                file_path: "m.py".to_string(),
                line_start: 1,
                line_end: 3,
            },
            snippet: (0..100).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n"),
            calls,
            source: SourceKind::MainRepo,
        }
    }

    #[test]
    fn test_summary_is_bounded() {
        let mut bb = Blackboard::new("m.f0");
        bb.set_focus("m.f70");
        for i in 0..80 {
            let calls = (0..5).map(|j| format!("c{}_{}", i, j)).collect();
            bb.add_evidence(evidence(&format!("m.f{}", i), calls));
        }
        for i in 0..40 {
            bb.mark_unresolved(UnresolvedReference::new(format!("u{}", i), "not found"));
        }
        for i in 0..30 {
            bb.log(format!("entry {}", i));
        }

        let config = ExplorationConfig::default();
        let summary = planner_summary(&bb, &config);
        assert_eq!(summary["evidence"].as_array().unwrap().len(), MAX_EVIDENCE);
        assert_eq!(summary["evidence"][0]["qualified_name"], "m.f70");
        assert_eq!(summary["unresolved"].as_array().unwrap().len(), MAX_UNRESOLVED);
        assert_eq!(summary["frontier"].as_array().unwrap().len(), MAX_FRONTIER);
        assert_eq!(summary["recent_log"].as_array().unwrap().len(), config.log_tail);
        assert_eq!(summary["resolved_count"], 80);

        let head = summary["evidence"][0]["snippet_head"].as_str().unwrap();
        assert_eq!(head.lines().count(), config.summary_snippet_lines);
    }
}
