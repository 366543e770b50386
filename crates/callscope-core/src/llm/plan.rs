//! Planner output: actions, stop decision and blackboard patch

use super::client::ChatMessage;
use super::json::extract_json;
use super::oracle::PlanRequest;
use crate::blackboard::BlackboardPatch;
use crate::error::OracleError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref SYMBOL_REF: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").unwrap();
}

fn default_hybrid_top_k() -> usize {
    5
}

fn default_usages_top_k() -> usize {
    10
}

/// One search request proposed by the planner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Resolve a reference and open its declaration
    OpenSymbol {
        symbol_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint_file: Option<String>,
        #[serde(default)]
        purpose: String,
    },
    /// Resolution, falling back to literal text search
    HybridSearch {
        query: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint_file: Option<String>,
        #[serde(default = "default_hybrid_top_k")]
        top_k: usize,
    },
    /// Literal text search only
    FindUsages {
        needle: String,
        #[serde(default = "default_usages_top_k")]
        top_k: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    OpenSymbol,
    HybridSearch,
    FindUsages,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::OpenSymbol => "OPEN_SYMBOL",
            ActionKind::HybridSearch => "HYBRID_SEARCH",
            ActionKind::FindUsages => "FIND_USAGES",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    pub fn open(symbol_ref: impl Into<String>) -> Self {
        Action::OpenSymbol {
            symbol_ref: symbol_ref.into(),
            hint_file: None,
            purpose: String::new(),
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::OpenSymbol { .. } => ActionKind::OpenSymbol,
            Action::HybridSearch { .. } => ActionKind::HybridSearch,
            Action::FindUsages { .. } => ActionKind::FindUsages,
        }
    }

    /// The reference, query or needle the action is about
    pub fn target(&self) -> &str {
        match self {
            Action::OpenSymbol { symbol_ref, .. } => symbol_ref,
            Action::HybridSearch { query, .. } => query,
            Action::FindUsages { needle, .. } => needle,
        }
    }

    pub fn hint_file(&self) -> Option<&str> {
        match self {
            Action::OpenSymbol { hint_file, .. } | Action::HybridSearch { hint_file, .. } => {
                hint_file.as_deref()
            }
            Action::FindUsages { .. } => None,
        }
    }

    fn validate(&self) -> Result<(), OracleError> {
        let target = self.target().trim();
        if target.is_empty() {
            return Err(OracleError::Malformed(format!(
                "{} action without a target",
                self.kind()
            )));
        }
        if self.kind() == ActionKind::OpenSymbol && !SYMBOL_REF.is_match(target) {
            return Err(OracleError::Malformed(format!(
                "OPEN_SYMBOL target is not a dotted identifier: {}",
                target
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.target())
    }
}

/// A planner decision for one round
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerOutput {
    #[serde(default)]
    pub actions: Vec<Action>,
    pub stop: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default, alias = "blackboard_patch", skip_serializing_if = "Option::is_none")]
    pub patch: Option<BlackboardPatch>,
}

impl PlannerOutput {
    pub fn stop(reason: impl Into<String>) -> Self {
        Self {
            stop: true,
            reason: reason.into(),
            ..Default::default()
        }
    }

    pub fn actions(actions: Vec<Action>, reason: impl Into<String>) -> Self {
        Self {
            actions,
            reason: reason.into(),
            ..Default::default()
        }
    }

    pub fn with_patch(mut self, patch: BlackboardPatch) -> Self {
        self.patch = Some(patch);
        self
    }

    pub fn validate(&self) -> Result<(), OracleError> {
        self.actions.iter().try_for_each(Action::validate)
    }
}

/// Parse and validate a planner response
pub fn parse_planner_response(response: &str) -> Result<PlannerOutput, OracleError> {
    let json_str = extract_json(response);
    let output: PlannerOutput = serde_json::from_str(json_str).map_err(|e| {
        tracing::warn!("Failed to parse planner response: {}", e);
        tracing::debug!("Response was: {}", response);
        OracleError::Malformed(format!("Invalid planner JSON: {}", e))
    })?;
    output.validate()?;
    Ok(output)
}

const PLANNER_SYSTEM: &str = r#"You are the planner of an evidence-driven code reading agent.
You receive a summary of a blackboard: the declarations opened so far (evidence), references that could not be bound (unresolved), calls not yet explored (frontier) and a recent log.

Goal: collect the smallest set of declarations that lets a reviewer explain current_focus without guessing. Do not chase every call.

Rules:
1. Judge only from evidence on the blackboard. A symbol without evidence is a gap.
2. Start the reason field with a short draft explanation of current_focus from its snippet.
3. Request a lookup only when the callee decides the output, side effects or control flow of current_focus, or when current_focus hands it key data whose handling the snippet does not show.
4. Prefer OPEN_SYMBOL, then HYBRID_SEARCH, then FIND_USAGES. Plan every necessary lookup for this round at once (at most 10).
5. Never OPEN_SYMBOL a name listed in resolved_symbols or resolved_short_names.
6. Ignore builtins, logging, string formatting and argument forwarding.
7. Unresolved references marked out_of_scope must not be requested again.
8. Set stop=true when the evidence suffices, or when no new lookup remains.

Respond with one JSON object and nothing else:
{
  "actions": [
    {"type": "OPEN_SYMBOL", "symbol_ref": "pkg.mod.func", "hint_file": "pkg/mod.py", "purpose": "..."},
    {"type": "HYBRID_SEARCH", "query": "name", "top_k": 5},
    {"type": "FIND_USAGES", "needle": "text", "top_k": 10}
  ],
  "stop": false,
  "reason": "...",
  "patch": {
    "current_focus": null,
    "add_unresolved": [],
    "remove_unresolved": [],
    "mark_out_of_scope": [{"symbol": "name", "reason": "..."}]
  }
}
The patch may only name keys present in evidence or unresolved."#;

pub(crate) fn build_planner_messages(request: &PlanRequest) -> Vec<ChatMessage> {
    let mut system = PLANNER_SYSTEM.to_string();
    if let Some(prompt) = &request.explanation_prompt {
        system.push_str("\n\nThe user asked for this kind of explanation; plan depth accordingly:\n");
        system.push_str(prompt);
    }

    let summary =
        serde_json::to_string_pretty(&request.summary).unwrap_or_else(|_| request.summary.to_string());
    let mut user = format!("Round {}.\n\nblackboard_summary:\n{}", request.round, summary);
    if let Some(hint) = &request.hint_file {
        user.push_str(&format!("\n\nDefault hint_file for lookups: {}", hint));
    }

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
