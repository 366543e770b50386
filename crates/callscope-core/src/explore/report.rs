//! Rendering of the final explanation document

use super::StopReason;
use crate::blackboard::Blackboard;
use crate::llm::{CallEdge, Synthesis};
use crate::search::{is_builtin, Resolution, SearchEngine};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::fmt::Write;

/// Call chain backed by evidence: an edge for every call that resolves, in
/// the caller's file, to exactly one other evidence entry.
///
/// `self.m` and `cls.m` are first tried as methods of the caller's class.
pub fn derive_call_chain(bb: &Blackboard, engine: &SearchEngine) -> Vec<CallEdge> {
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    for (caller, evidence) in bb.evidence() {
        let context = evidence.symbol.file_path.as_str();
        for call in evidence.calls.iter().filter(|c| !is_builtin(c)) {
            let Some(callee) = bind_call(engine, caller, call, context) else {
                continue;
            };
            if callee == *caller || !bb.evidence().contains_key(&callee) {
                continue;
            }
            let edge = CallEdge::new(caller.as_str(), callee);
            if seen.insert(edge.clone()) {
                chain.push(edge);
            }
        }
    }
    chain
}

fn bind_call(engine: &SearchEngine, caller: &str, call: &str, context: &str) -> Option<String> {
    let method = call
        .strip_prefix("self.")
        .or_else(|| call.strip_prefix("cls."));
    if let (Some(method), Some((class, _))) = (method, caller.rsplit_once('.')) {
        let name = format!("{}.{}", class, method);
        if engine.index().contains(&name) {
            return Some(name);
        }
    }
    match engine.resolve_symbol(call, Some(context)) {
        Resolution::Matched { symbol, .. } => Some(symbol.qualified_name),
        _ => None,
    }
}

/// Synthesis assembled from raw evidence when the oracle is unavailable.
pub fn fallback_synthesis(bb: &Blackboard, engine: &SearchEngine) -> Synthesis {
    let mut text = String::from(
        "Synthesis was unavailable; the collected evidence is listed below.\n",
    );
    for evidence in bb.evidence().values() {
        let symbol = &evidence.symbol;
        let _ = write!(
            text,
            "\n### {} ({}) [{}:L{}-L{}]\n\n```python\n{}\n```\n",
            symbol.qualified_name,
            symbol.kind,
            symbol.file_path,
            symbol.line_start,
            symbol.line_end,
            evidence.snippet
        );
        if !evidence.calls.is_empty() {
            let _ = writeln!(text, "\nCalls: {}", evidence.calls.join(", "));
        }
    }
    if bb.evidence().is_empty() {
        let _ = writeln!(text, "\nNo declaration could be opened for `{}`.", bb.target());
    }

    Synthesis {
        explanation: text,
        call_chain: derive_call_chain(bb, engine),
    }
}

/// Hedge words present in `text`, matched as whole words ignoring case.
pub fn hedge_hits(text: &str, words: &[String]) -> Vec<String> {
    lazy_static! {
        static ref WORD: Regex = Regex::new(r"[A-Za-z']+").unwrap();
    }
    let present: HashSet<String> = WORD
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    words
        .iter()
        .filter(|w| present.contains(&w.to_lowercase()))
        .cloned()
        .collect()
}

/// Markdown document for a finished run.
pub fn render_document(
    bb: &Blackboard,
    synthesis: &Synthesis,
    stop_reason: &StopReason,
    fallback: bool,
) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "# {}\n", bb.target());
    let _ = writeln!(doc, "- Focus: `{}`", bb.current_focus());
    let _ = writeln!(doc, "- Rounds: {}", bb.iterations());
    let _ = writeln!(doc, "- Stop reason: {}", stop_reason);
    let _ = writeln!(doc, "- Evidence: {} declarations", bb.evidence().len());
    if fallback {
        let _ = writeln!(doc, "- Synthesis: fallback");
    }

    let _ = writeln!(doc, "\n## Explanation\n\n{}", synthesis.explanation.trim_end());

    let _ = writeln!(doc, "\n## Call chain\n");
    if synthesis.call_chain.is_empty() {
        let _ = writeln!(doc, "_none recorded_");
    }
    for edge in &synthesis.call_chain {
        let _ = writeln!(doc, "- `{}` -> `{}`", edge.caller, edge.callee);
    }

    let _ = writeln!(doc, "\n## Unresolved references\n");
    if bb.unresolved().is_empty() {
        let _ = writeln!(doc, "_none_");
    }
    for reference in bb.unresolved().values() {
        let scope = if reference.out_of_scope {
            " (out of scope)"
        } else {
            ""
        };
        let _ = write!(doc, "- `{}`{}: {}", reference.reference, scope, reference.reason);
        if !reference.candidates.is_empty() {
            let _ = write!(doc, " [candidates: {}]", reference.candidates.join(", "));
        }
        doc.push('\n');
    }
    doc
}
