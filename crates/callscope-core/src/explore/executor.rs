//! Concurrent execution of planner actions

use crate::blackboard::{Blackboard, UnresolvedReference};
use crate::llm::{Action, ActionKind};
use crate::search::{
    is_builtin, Evidence, HybridOutcome, MatchStrategy, Resolution, SearchEngine, UsageHit,
};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of running one action against the search engine
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Opened {
        action: Action,
        evidence: Evidence,
        strategy: MatchStrategy,
        unresolved_calls: Vec<UnresolvedReference>,
    },
    Usages {
        action: Action,
        hits: Vec<UsageHit>,
        candidates: Vec<String>,
    },
    Failed {
        action: Action,
        reason: String,
        candidates: Vec<String>,
    },
    Skipped {
        action: Action,
        reason: String,
    },
}

/// An action removed before dispatch
#[derive(Debug, Clone)]
pub struct DroppedAction {
    pub action: Action,
    pub reason: &'static str,
}

/// Runs a round of actions with bounded concurrency
#[derive(Clone)]
pub struct Executor {
    engine: Arc<SearchEngine>,
    concurrency: usize,
    usage_max_hits: usize,
    default_context: Option<String>,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(engine: Arc<SearchEngine>, concurrency: usize, usage_max_hits: usize) -> Self {
        Self {
            engine,
            concurrency: concurrency.max(1),
            usage_max_hits,
            default_context: None,
            cancel: CancellationToken::new(),
        }
    }

    /// File used as import context when an action names none
    pub fn with_default_context(mut self, context: Option<String>) -> Self {
        self.default_context = context;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drop actions that cannot add information, keeping at most `max`.
    ///
    /// Removed: duplicates within the round, OPEN_SYMBOL on references already
    /// covered by evidence or flagged out of scope, and anything past `max`.
    pub fn prepare(
        &self,
        actions: Vec<Action>,
        bb: &Blackboard,
        max: usize,
    ) -> (Vec<Action>, Vec<DroppedAction>) {
        let mut seen: HashSet<(ActionKind, String)> = HashSet::new();
        let mut kept = Vec::new();
        let mut dropped = Vec::new();

        for action in actions {
            let target = action.target().trim().to_string();
            let reason = if !seen.insert((action.kind(), target.clone())) {
                Some("duplicate in round")
            } else if action.kind() == ActionKind::OpenSymbol
                && self.already_opened(&target, action.hint_file(), bb)
            {
                Some("already resolved")
            } else if bb.unresolved().get(&target).is_some_and(|r| r.out_of_scope) {
                Some("out of scope")
            } else if kept.len() >= max {
                Some("round action limit reached")
            } else {
                None
            };

            match reason {
                Some(reason) => dropped.push(DroppedAction { action, reason }),
                None => kept.push(action),
            }
        }
        (kept, dropped)
    }

    /// Whether opening `target` would only reproduce existing evidence.
    ///
    /// A reference the blackboard considers covered is re-resolved in the
    /// action's context, so a disambiguating hint can still reach another
    /// candidate.
    fn already_opened(&self, target: &str, hint_file: Option<&str>, bb: &Blackboard) -> bool {
        if bb.evidence().contains_key(target) {
            return true;
        }
        if !bb.is_resolved(target) {
            return false;
        }
        let context = hint_file.or(self.default_context.as_deref());
        match self.engine.resolve_symbol(target, context) {
            Resolution::Matched { symbol, .. } => bb.evidence().contains_key(&symbol.qualified_name),
            _ => false,
        }
    }

    /// Run actions concurrently; outcomes come back in action order.
    pub async fn execute_round(&self, actions: Vec<Action>) -> Vec<ActionOutcome> {
        let mut results: Vec<(usize, ActionOutcome)> = stream::iter(actions.into_iter().enumerate())
            .map(|(idx, action)| {
                let engine = Arc::clone(&self.engine);
                let context = self.default_context.clone();
                let max_hits = self.usage_max_hits;
                let cancel = self.cancel.clone();
                async move {
                    if cancel.is_cancelled() {
                        let outcome = ActionOutcome::Skipped {
                            action,
                            reason: "run cancelled".to_string(),
                        };
                        return (idx, outcome);
                    }
                    let fallback = action.clone();
                    let outcome = tokio::task::spawn_blocking(move || {
                        execute_action(&engine, action, context.as_deref(), max_hits)
                    })
                    .await
                    .unwrap_or_else(|e| ActionOutcome::Failed {
                        action: fallback,
                        reason: format!("action worker failed: {}", e),
                        candidates: Vec::new(),
                    });
                    (idx, outcome)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }
}

/// Run a single action synchronously.
pub fn execute_action(
    engine: &SearchEngine,
    action: Action,
    default_context: Option<&str>,
    usage_max_hits: usize,
) -> ActionOutcome {
    match &action {
        Action::OpenSymbol {
            symbol_ref,
            hint_file,
            ..
        } => {
            let context = hint_file.as_deref().or(default_context);
            let opened = engine
                .resolve_symbol(symbol_ref, context)
                .into_result(symbol_ref)
                .and_then(|(symbol, strategy)| {
                    engine.open_resolved(&symbol).map(|e| (e, strategy))
                });
            match opened {
                Ok((evidence, strategy)) => {
                    let unresolved_calls = classify_calls(engine, &evidence);
                    ActionOutcome::Opened {
                        action,
                        evidence,
                        strategy,
                        unresolved_calls,
                    }
                }
                Err(e) => ActionOutcome::Failed {
                    reason: e.to_string(),
                    candidates: e.candidates().to_vec(),
                    action,
                },
            }
        }
        Action::HybridSearch {
            query,
            hint_file,
            top_k,
        } => {
            let context = hint_file.as_deref().or(default_context);
            let result = engine.hybrid_search(query, context, (*top_k).min(usage_max_hits));
            match result.outcome {
                HybridOutcome::Definition {
                    evidence,
                    matched_by,
                } => {
                    let unresolved_calls = classify_calls(engine, &evidence);
                    ActionOutcome::Opened {
                        action,
                        evidence,
                        strategy: matched_by,
                        unresolved_calls,
                    }
                }
                HybridOutcome::Usages { hits, candidates } => ActionOutcome::Usages {
                    action,
                    hits,
                    candidates,
                },
                HybridOutcome::Empty { candidates } => ActionOutcome::Failed {
                    action,
                    reason: "no definition and no usages".to_string(),
                    candidates,
                },
            }
        }
        Action::FindUsages { needle, top_k } => {
            let hits = engine.find_usages(needle, (*top_k).min(usage_max_hits));
            ActionOutcome::Usages {
                action,
                hits,
                candidates: Vec::new(),
            }
        }
    }
}

/// Calls of `evidence` that do not resolve to exactly one declaration.
///
/// Builtins are ignored. Calls through an import of a module outside the
/// index are flagged out of scope at once.
pub fn classify_calls(engine: &SearchEngine, evidence: &Evidence) -> Vec<UnresolvedReference> {
    let file = evidence.symbol.file_path.as_str();
    let origin = evidence.qualified_name();
    let imports = engine.index().imports_for(file);

    evidence
        .calls
        .iter()
        .filter(|call| !is_builtin(call))
        .filter_map(|call| match engine.resolve_symbol(call, Some(file)) {
            Resolution::Matched { .. } => None,
            Resolution::Ambiguous { candidates } => Some(
                UnresolvedReference::new(
                    call.as_str(),
                    format!("ambiguous: {} candidates", candidates.len()),
                )
                .with_origin(origin)
                .with_candidates(candidates),
            ),
            Resolution::NotFound => {
                let head = call.split('.').next().unwrap_or(call);
                let reference = UnresolvedReference::new(call.as_str(), "not found in index")
                    .with_origin(origin);
                match imports.and_then(|m| m.get(head)) {
                    Some(module) => Some(
                        UnresolvedReference {
                            reason: format!("imported from {}, outside the index", module),
                            ..reference
                        }
                        .out_of_scope(),
                    ),
                    None => Some(reference),
                }
            }
        })
        .collect()
}

/// Fold one outcome into the blackboard and log it.
pub fn fold_outcome(bb: &mut Blackboard, outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Opened {
            action,
            evidence,
            strategy,
            unresolved_calls,
        } => {
            let via = match action.kind() {
                ActionKind::HybridSearch => format!("resolution:{}", strategy),
                _ => strategy.to_string(),
            };
            let message = format!(
                "[executor] {} ok: {} @ {}:{}-{} via {} (calls={})",
                action.kind(),
                evidence.qualified_name(),
                evidence.symbol.file_path,
                evidence.symbol.line_start,
                evidence.symbol.line_end,
                via,
                evidence.calls.len(),
            );
            bb.add_evidence(evidence);
            bb.settle(action.target());
            let added = unresolved_calls
                .into_iter()
                .filter(|r| bb.mark_unresolved(r.clone()))
                .count();
            bb.log(format!("{} unresolved+={}", message, added));
        }
        ActionOutcome::Usages {
            action,
            hits,
            candidates,
        } => {
            bb.log(format!(
                "[executor] {} {}: via text_search hits={}",
                action.kind(),
                action.target(),
                hits.len()
            ));
            if action.kind() == ActionKind::HybridSearch {
                bb.mark_unresolved(
                    UnresolvedReference::new(action.target(), "definition not resolved; usages recorded")
                        .with_candidates(candidates),
                );
            }
            bb.record_usages(action.target(), hits);
        }
        ActionOutcome::Failed {
            action,
            reason,
            candidates,
        } => {
            bb.log(format!(
                "[executor] {} miss: {} ({})",
                action.kind(),
                action.target(),
                reason
            ));
            bb.mark_unresolved(
                UnresolvedReference::new(action.target(), reason).with_candidates(candidates),
            );
        }
        ActionOutcome::Skipped { action, reason } => {
            bb.log(format!("[executor] {} skipped: {} ({})", action.kind(), action.target(), reason));
        }
    }
}
