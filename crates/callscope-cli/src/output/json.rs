//! JSON output formatter

use callscope_core::{Evidence, RepoIndex, Resolution, RunOutput, UsageHit};
use serde_json::{json, Value};

pub fn run(run: &RunOutput) -> Value {
    let bb = &run.blackboard;
    json!({
        "target": bb.target(),
        "current_focus": bb.current_focus(),
        "iterations": bb.iterations(),
        "stop_reason": run.stop_reason,
        "stop_detail": run.stop_reason.to_string(),
        "fallback": run.fallback,
        "explanation": run.synthesis.explanation,
        "call_chain": run.synthesis.call_chain,
        "evidence": bb.evidence().keys().collect::<Vec<_>>(),
        "unresolved": bb.unresolved().values().collect::<Vec<_>>(),
        "artifacts": run.artifacts.as_ref().map(|a| json!({
            "blackboard": a.blackboard,
            "explanation": a.explanation,
            "run_log": a.run_log,
        })),
    })
}

pub fn index(index: &RepoIndex, list_symbols: bool) -> Value {
    let mut value = json!({
        "root": index.root(),
        "stats": index.stats(),
        "skipped": index.skipped_files(),
    });
    if list_symbols {
        value["symbols"] = json!(index.symbols().values().collect::<Vec<_>>());
    }
    value
}

pub fn resolution(query: &str, resolution: &Resolution, evidence: Option<&Evidence>) -> Value {
    let mut value = json!({
        "query": query,
        "resolution": resolution,
    });
    if let Some(evidence) = evidence {
        value["evidence"] = json!(evidence);
    }
    value
}

pub fn usages(needle: &str, hits: &[UsageHit]) -> Value {
    json!({
        "needle": needle,
        "count": hits.len(),
        "hits": hits,
    })
}
