//! Callscope Core Library
//!
//! Explains a symbol in a Python repository by exploring its call graph.
//!
//! # Features
//! - Tree-sitter index of functions, classes, methods and import aliases
//! - Layered symbol resolution with import-context disambiguation
//! - A blackboard of evidence and unresolved references with atomic patches
//! - A bounded exploration loop driven by a planning oracle, with concurrent
//!   actions, retries, cancellation and a fallback synthesis

pub mod blackboard;
pub mod config;
pub mod error;
pub mod explore;
pub mod index;
pub mod llm;
pub mod search;

pub use blackboard::{
    Blackboard, BlackboardPatch, LogEntry, OutOfScopeMark, SharedBlackboard, UnresolvedReference,
};
pub use config::{Config, ExplorationConfig, LLMServiceConfig, ScanConfig};
pub use error::{CallscopeError, Error, OracleError, PatchError, ResolutionError, Result};
pub use explore::{Explorer, Phase, RunOptions, RunOutput, StopReason};
pub use index::{IndexStats, RepoIndex, SourceKind, SymbolDef, SymbolKind};
pub use llm::{
    Action, CallEdge, ChatMessage, HttpChatClient, LLMClient, LlmOracle, OfflineOracle,
    PlanRequest, PlannerOutput, ReasoningOracle, Synthesis, SynthesisRequest,
};
pub use search::{
    Evidence, HybridOutcome, HybridResult, HybridStrategy, MatchStrategy, Resolution,
    SearchEngine, UsageHit,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "callscope";

/// Default output directory for run artifacts
pub const DEFAULT_OUTDIR: &str = "_callscope_out";
