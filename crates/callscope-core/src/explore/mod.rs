//! Exploration loop
//!
//! Drives a run through `Bootstrap -> Iterating -> Synthesizing -> Done`.
//! Bootstrap opens the target. Each iteration asks the oracle for a plan,
//! applies its patch, runs the surviving actions concurrently and folds the
//! outcomes into the blackboard in action order. Synthesis turns the final
//! blackboard into an explanation, falling back to the raw evidence when the
//! oracle is unavailable.

mod artifacts;
mod executor;
mod report;
mod retry;
mod summary;

pub use artifacts::{
    write_artifacts, write_snapshot, RunArtifacts, RunLog, BLACKBOARD_FILE, EXPLANATION_FILE,
    RUN_LOG_FILE,
};
pub use executor::{
    classify_calls, execute_action, fold_outcome, ActionOutcome, DroppedAction, Executor,
};
pub use report::{derive_call_chain, fallback_synthesis, hedge_hits, render_document};
pub use retry::with_oracle_retry;
pub use summary::planner_summary;

use crate::blackboard::{Blackboard, SharedBlackboard};
use crate::config::ExplorationConfig;
use crate::error::OracleError;
use crate::index::RepoIndex;
use crate::llm::{Action, PlanRequest, PlannerOutput, ReasoningOracle, Synthesis, SynthesisRequest};
use crate::search::SearchEngine;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Why iteration ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    /// The planner declared the evidence sufficient, or had nothing left to do
    Planner(String),
    BudgetExhausted,
    PlannerUnavailable,
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Planner(reason) => write!(f, "planner stop: {}", reason),
            StopReason::BudgetExhausted => f.write_str("budget exhausted"),
            StopReason::PlannerUnavailable => f.write_str("planner unavailable"),
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Loop state
#[derive(Debug)]
pub enum Phase {
    Bootstrap,
    Iterating { round: usize },
    Synthesizing { reason: StopReason },
    Done(Box<RunOutput>),
}

/// Per-run inputs
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Qualified or partial name of the symbol to explain
    pub target: String,
    /// Root-relative file whose imports disambiguate the target
    pub hint_file: Option<String>,
    /// Free-form guidance passed to planner and synthesizer
    pub explanation_prompt: Option<String>,
    /// Where snapshots and the final document go; nothing is written if unset
    pub outdir: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub blackboard: Blackboard,
    pub synthesis: Synthesis,
    pub stop_reason: StopReason,
    /// Synthesis was built from raw evidence
    pub fallback: bool,
    /// Rendered markdown document
    pub document: String,
    pub artifacts: Option<RunArtifacts>,
}

/// The `<module>.py` (or `<pkg>/<module>.py`) file named by the longest
/// module-like prefix of `target`, if indexed.
pub fn infer_hint_file(index: &RepoIndex, target: &str) -> Option<String> {
    let segments: Vec<&str> = target.split('.').collect();
    (1..segments.len()).rev().find_map(|n| {
        let path = format!("{}.py", segments[..n].join("/"));
        index.file(&path).map(|f| f.relative_path.clone())
    })
}

pub struct Explorer {
    engine: Arc<SearchEngine>,
    oracle: Arc<dyn ReasoningOracle>,
    config: ExplorationConfig,
    options: RunOptions,
    cancel: CancellationToken,
    blackboard: SharedBlackboard,
    run_log: Option<RunLog>,
}

impl Explorer {
    pub fn new(
        engine: Arc<SearchEngine>,
        oracle: Arc<dyn ReasoningOracle>,
        config: ExplorationConfig,
        options: RunOptions,
    ) -> Self {
        let blackboard = SharedBlackboard::new(Blackboard::new(options.target.trim()));
        let run_log = options.outdir.as_deref().and_then(|outdir| match RunLog::create(outdir) {
            Ok(log) => Some(log),
            Err(e) => {
                tracing::warn!(outdir = %outdir.display(), error = %e, "cannot open run log");
                None
            }
        });
        Self {
            engine,
            oracle,
            config,
            options,
            cancel: CancellationToken::new(),
            blackboard,
            run_log,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Live view of the blackboard while the run progresses
    pub fn blackboard(&self) -> SharedBlackboard {
        self.blackboard.clone()
    }

    fn executor(&self) -> Executor {
        Executor::new(
            Arc::clone(&self.engine),
            self.config.action_concurrency,
            self.config.usage_max_hits,
        )
        .with_default_context(self.options.hint_file.clone())
        .with_cancellation(self.cancel.clone())
    }

    /// Run to completion.
    ///
    /// Oracle and artifact failures degrade the output instead of failing
    /// the run.
    pub async fn run(self) -> RunOutput {
        self.audit(|log| {
            log.line(&format!(
                "[init] target={} oracle={} hint_file={} max_iters={} symbols={}",
                self.options.target.trim(),
                self.oracle.name(),
                self.options.hint_file.as_deref().unwrap_or("-"),
                self.config.max_iters,
                self.engine.index().len(),
            ))
        });
        let mut phase = Phase::Bootstrap;
        loop {
            if !matches!(phase, Phase::Done(_)) {
                tracing::debug!(?phase, "exploration phase");
            }
            phase = match phase {
                Phase::Bootstrap => {
                    self.bootstrap().await;
                    self.checkpoint("blackboard_after_bootstrap");
                    Phase::Iterating { round: 1 }
                }
                Phase::Iterating { round } => {
                    if self.cancel.is_cancelled() {
                        Phase::Synthesizing {
                            reason: StopReason::Cancelled,
                        }
                    } else if round > self.config.max_iters {
                        Phase::Synthesizing {
                            reason: StopReason::BudgetExhausted,
                        }
                    } else {
                        let next = self.iterate(round).await;
                        self.checkpoint(&format!("blackboard_after_round_{}", round));
                        match next {
                            Some(reason) => Phase::Synthesizing { reason },
                            None => Phase::Iterating { round: round + 1 },
                        }
                    }
                }
                Phase::Synthesizing { reason } => Phase::Done(Box::new(self.finish(reason).await)),
                Phase::Done(output) => return *output,
            };
        }
    }

    async fn bootstrap(&self) {
        let target = self.blackboard.read(|bb| bb.target().to_string());
        let hint = self
            .options
            .hint_file
            .clone()
            .or_else(|| infer_hint_file(self.engine.index(), &target));
        tracing::info!(target = %target, hint = ?hint, "bootstrapping");

        let action = Action::OpenSymbol {
            symbol_ref: target.clone(),
            hint_file: hint.clone(),
            purpose: "bootstrap".to_string(),
        };
        let outcomes = self.executor().execute_round(vec![action]).await;

        self.blackboard.update(|bb| {
            bb.log(format!(
                "[bootstrap] target={} hint_file={}",
                target,
                hint.as_deref().unwrap_or("-")
            ));
            for outcome in outcomes {
                if let ActionOutcome::Opened { evidence, .. } = &outcome {
                    bb.set_focus(evidence.qualified_name());
                }
                fold_outcome(bb, outcome);
            }
        });
    }

    /// One planning round; returns the stop reason when iteration should end.
    async fn iterate(&self, round: usize) -> Option<StopReason> {
        let request = self.blackboard.update(|bb| {
            bb.set_iteration(round);
            bb.log(format!("[loop] round {} focus={}", round, bb.current_focus()));
            PlanRequest {
                summary: planner_summary(bb, &self.config),
                hint_file: self.options.hint_file.clone(),
                explanation_prompt: self.options.explanation_prompt.clone(),
                round,
            }
        });
        tracing::info!(round, "planning");

        let planned = tokio::select! {
            result = with_oracle_retry(&self.config, "plan", || self.oracle.plan(&request)) => result,
            _ = self.cancel.cancelled() => {
                self.blackboard.log("[loop] cancelled while planning");
                return Some(StopReason::Cancelled);
            }
        };
        let plan: PlannerOutput = match planned {
            Ok(plan) => plan,
            Err(e) => {
                self.blackboard.log(format!("[planner] unavailable: {}", e));
                return Some(StopReason::PlannerUnavailable);
            }
        };

        self.audit(|log| log.json(&format!("planner_output_round_{}", round), &plan));
        self.blackboard.log(format!(
            "[planner] stop={} actions={} reason={}",
            plan.stop,
            plan.actions.len(),
            plan.reason
        ));
        if plan.stop {
            return Some(StopReason::Planner(plan.reason));
        }

        if let Some(patch) = plan.patch.as_ref().filter(|p| !p.is_empty()) {
            match self.blackboard.apply_patch(patch) {
                Ok(report) => tracing::debug!(round, %report, "patch applied"),
                Err(e) => tracing::debug!(round, error = %e, "patch rejected"),
            }
        }

        let executor = self.executor();
        let (actions, dropped) = self.blackboard.update(|bb| {
            let (kept, dropped) = executor.prepare(plan.actions, bb, self.config.max_actions_per_round);
            for d in &dropped {
                bb.log(format!("[loop] dropped {}: {}", d.action, d.reason));
            }
            (kept, dropped)
        });
        if actions.is_empty() {
            let reason = if dropped.is_empty() {
                format!("{} (no actions planned)", plan.reason)
            } else {
                format!("{} (all planned actions already resolved)", plan.reason)
            };
            return Some(StopReason::Planner(reason));
        }
        if self.cancel.is_cancelled() {
            return Some(StopReason::Cancelled);
        }

        tracing::info!(round, actions = actions.len(), "executing actions");
        let outcomes = executor.execute_round(actions).await;
        self.blackboard.update(|bb| {
            for outcome in outcomes {
                fold_outcome(bb, outcome);
            }
        });
        None
    }

    async fn finish(&self, reason: StopReason) -> RunOutput {
        tracing::info!(reason = %reason, "synthesizing");
        self.blackboard.log(format!("[loop] stop: {}", reason));

        let (synthesis, fallback) = self.synthesize(&reason).await;
        let blackboard = self.blackboard.snapshot();
        let document = render_document(&blackboard, &synthesis, &reason, fallback);

        self.audit(|log| {
            log.mirror(&blackboard);
            log.json("final_blackboard", &blackboard);
            log.line(&format!("final_explanation:\n{}", document));
            log.line("[done] run finished");
        });

        let artifacts = self.options.outdir.as_deref().and_then(|outdir| {
            match write_artifacts(outdir, &blackboard, &document) {
                Ok(artifacts) => Some(RunArtifacts {
                    run_log: self.run_log.as_ref().map(|log| log.path().to_path_buf()),
                    ..artifacts
                }),
                Err(e) => {
                    tracing::warn!(outdir = %outdir.display(), error = %e, "cannot write run artifacts");
                    None
                }
            }
        });

        RunOutput {
            blackboard,
            synthesis,
            stop_reason: reason,
            fallback,
            document,
            artifacts,
        }
    }

    async fn synthesize(&self, reason: &StopReason) -> (Synthesis, bool) {
        let snapshot = self.blackboard.snapshot();
        if *reason == StopReason::Cancelled {
            self.blackboard.log("[synthesizer] skipped after cancellation");
            return (fallback_synthesis(&snapshot, &self.engine), true);
        }

        let mut request = SynthesisRequest {
            blackboard: snapshot,
            stop_reason: reason.to_string(),
            explanation_prompt: self.options.explanation_prompt.clone(),
            banned_words: Vec::new(),
        };

        let first = with_oracle_retry(&self.config, "synthesize", || {
            self.oracle.synthesize(&request)
        })
        .await;
        let synthesis = match first {
            Ok(synthesis) => synthesis,
            Err(e) => return self.fallback(&request.blackboard, e),
        };

        let hedged = hedge_hits(&synthesis.explanation, &self.config.hedge_words);
        if hedged.is_empty() {
            return (synthesis, false);
        }

        self.blackboard
            .log(format!("[synthesizer] rewriting to avoid: {}", hedged.join(", ")));
        request.banned_words = hedged;
        match with_oracle_retry(&self.config, "synthesize", || self.oracle.synthesize(&request)).await {
            Ok(rewritten) => (rewritten, false),
            Err(e) => {
                tracing::warn!(error = %e, "rewrite failed; keeping first explanation");
                (synthesis, false)
            }
        }
    }

    fn fallback(&self, snapshot: &Blackboard, error: OracleError) -> (Synthesis, bool) {
        tracing::warn!(error = %error, "synthesis unavailable; using raw evidence");
        self.blackboard
            .log(format!("[synthesizer] unavailable: {}; using raw evidence", error));
        (fallback_synthesis(snapshot, &self.engine), true)
    }

    fn audit(&self, f: impl FnOnce(&RunLog)) {
        if let Some(log) = &self.run_log {
            f(log);
        }
    }

    fn checkpoint(&self, label: &str) {
        let Some(outdir) = &self.options.outdir else {
            return;
        };
        let snapshot = self.blackboard.snapshot();
        self.audit(|log| {
            log.mirror(&snapshot);
            log.json(label, &snapshot);
        });
        if let Err(e) = write_snapshot(outdir, &snapshot) {
            tracing::warn!(error = %e, "cannot write blackboard snapshot");
        }
    }
}
