//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use callscope_core::{
    OracleError, PlanRequest, PlannerOutput, ReasoningOracle, Synthesis, SynthesisRequest,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write `files` (relative path, content) under a fresh temp dir.
pub fn write_tree(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    write_into(dir.path(), files);
    dir
}

pub fn write_into(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
}

/// `a.foo` calls `bar`, imported from `b`; `b.bar` calls `helper`.
pub fn call_chain_repo() -> TempDir {
    write_tree(&[
        ("a.py", "from b import bar\n\n\ndef foo():\n    return bar()\n"),
        (
            "b.py",
            "def bar():\n    return helper()\n\n\ndef helper():\n    return 1\n",
        ),
    ])
}

type PlanReply = Result<PlannerOutput, OracleError>;
type SynthReply = Result<Synthesis, OracleError>;

/// Oracle replaying scripted replies.
///
/// When the plan script runs out it keeps repeating `plan_default`; the
/// synthesis script falls back to a fixed explanation.
pub struct ScriptedOracle {
    plans: Mutex<VecDeque<PlanReply>>,
    plan_default: Box<dyn Fn() -> PlanReply + Send + Sync>,
    syntheses: Mutex<VecDeque<SynthReply>>,
    pub plan_requests: Mutex<Vec<PlanRequest>>,
    pub synthesis_requests: Mutex<Vec<SynthesisRequest>>,
    on_plan: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ScriptedOracle {
    pub fn new(plans: Vec<PlanReply>) -> Self {
        Self {
            plans: Mutex::new(plans.into()),
            plan_default: Box::new(|| Ok(PlannerOutput::stop("script finished"))),
            syntheses: Mutex::new(VecDeque::new()),
            plan_requests: Mutex::new(Vec::new()),
            synthesis_requests: Mutex::new(Vec::new()),
            on_plan: None,
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::new())
            .with_plan_default(|| Err(OracleError::Transport("connection refused".to_string())))
            .with_syntheses(Vec::new())
            .with_synthesis_failure()
    }

    pub fn with_plan_default(
        mut self,
        default: impl Fn() -> PlanReply + Send + Sync + 'static,
    ) -> Self {
        self.plan_default = Box::new(default);
        self
    }

    pub fn with_syntheses(self, replies: Vec<SynthReply>) -> Self {
        *self.syntheses.lock() = replies.into();
        self
    }

    /// Every synthesis attempt fails once the script is exhausted.
    pub fn with_synthesis_failure(self) -> Self {
        let failures: Vec<SynthReply> = (0..32)
            .map(|_| Err(OracleError::Unavailable("synthesizer down".to_string())))
            .collect();
        self.syntheses.lock().extend(failures);
        self
    }

    pub fn on_plan(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_plan = Some(Box::new(hook));
        self
    }

    pub fn plan_calls(&self) -> usize {
        self.plan_requests.lock().len()
    }

    pub fn synthesis_calls(&self) -> usize {
        self.synthesis_requests.lock().len()
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    async fn plan(&self, request: &PlanRequest) -> Result<PlannerOutput, OracleError> {
        self.plan_requests.lock().push(request.clone());
        if let Some(hook) = &self.on_plan {
            hook();
        }
        let next = self.plans.lock().pop_front();
        next.unwrap_or_else(|| (self.plan_default)())
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Synthesis, OracleError> {
        self.synthesis_requests.lock().push(request.clone());
        let next = self.syntheses.lock().pop_front();
        next.unwrap_or_else(|| {
            Ok(Synthesis {
                explanation: "foo returns the result of bar.".to_string(),
                call_chain: Vec::new(),
            })
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
