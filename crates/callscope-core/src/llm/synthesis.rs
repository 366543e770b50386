//! Final explanation produced from the blackboard

use super::client::ChatMessage;
use super::json::extract_json;
use super::oracle::SynthesisRequest;
use crate::error::OracleError;
use crate::search::snippet::head_lines;
use serde::{Deserialize, Serialize};

/// One caller to callee step, in qualified names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: String,
    pub callee: String,
}

impl CallEdge {
    pub fn new(caller: impl Into<String>, callee: impl Into<String>) -> Self {
        Self {
            caller: caller.into(),
            callee: callee.into(),
        }
    }
}

impl std::fmt::Display for CallEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.caller, self.callee)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synthesis {
    pub explanation: String,
    #[serde(default)]
    pub call_chain: Vec<CallEdge>,
}

/// Parse a synthesizer response
pub fn parse_synthesis_response(response: &str) -> Result<Synthesis, OracleError> {
    let json_str = extract_json(response);
    let synthesis: Synthesis = serde_json::from_str(json_str).map_err(|e| {
        tracing::warn!("Failed to parse synthesis response: {}", e);
        tracing::debug!("Response was: {}", response);
        OracleError::Malformed(format!("Invalid synthesis JSON: {}", e))
    })?;

    if synthesis.explanation.trim().is_empty() {
        return Err(OracleError::Malformed("empty explanation".to_string()));
    }
    if let Some(edge) = synthesis
        .call_chain
        .iter()
        .find(|e| e.caller.trim().is_empty() || e.callee.trim().is_empty())
    {
        return Err(OracleError::Malformed(format!("incomplete call edge: {}", edge)));
    }
    Ok(synthesis)
}

const SYNTH_SYSTEM: &str = r#"You are a senior engineer explaining code to a colleague.
Explain strictly from the evidence given: every function, class or method you mention must appear in the evidence, cited as [path.py:Lstart-Lend].
State facts plainly; do not hedge.

Structure the explanation as:
1. Overview: what the focus symbol does.
2. Data flow and control flow, step by step.
3. Each dependency in evidence order, with its source.
4. A short call chain summary.

Respond with one JSON object and nothing else:
{"explanation": "<markdown>", "call_chain": [{"caller": "pkg.mod.a", "callee": "pkg.mod.b"}]}
Use qualified names from the evidence in call_chain."#;

pub(crate) fn build_synthesis_messages(
    request: &SynthesisRequest,
    snippet_lines: usize,
) -> Vec<ChatMessage> {
    let bb = &request.blackboard;

    let mut system = SYNTH_SYSTEM.to_string();
    if let Some(prompt) = &request.explanation_prompt {
        system.push_str("\n\nThe user asked for this kind of explanation:\n");
        system.push_str(prompt);
    }
    if !request.banned_words.is_empty() {
        system.push_str("\n\nDo not use these words anywhere: ");
        system.push_str(&request.banned_words.join(", "));
    }

    let evidence: Vec<serde_json::Value> = bb
        .evidence()
        .values()
        .map(|e| {
            serde_json::json!({
                "qualified_name": e.qualified_name(),
                "kind": e.symbol.kind,
                "defined_in": e.symbol.file_path,
                "span": [e.symbol.line_start, e.symbol.line_end],
                "snippet": head_lines(&e.snippet, snippet_lines),
                "calls": e.calls,
            })
        })
        .collect();
    let unresolved: Vec<&str> = bb.unresolved().keys().map(String::as_str).collect();

    let payload = serde_json::json!({
        "target": bb.target(),
        "current_focus": bb.current_focus(),
        "stop_reason": request.stop_reason,
        "evidence": evidence,
        "unresolved": unresolved,
    });
    let payload = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());

    vec![
        ChatMessage::system(system),
        ChatMessage::user(format!("blackboard_evidence:\n{}", payload)),
    ]
}
