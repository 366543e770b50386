//! LLM integration
//!
//! Provides:
//! - An OpenAI-compatible chat client
//! - The reasoning oracle trait with planner and synthesizer prompts
//! - Parsing of planner actions and synthesized explanations

mod client;
mod json;
mod oracle;
mod plan;
mod synthesis;

pub use client::{ChatMessage, HttpChatClient, LLMClient};
pub use oracle::{LlmOracle, OfflineOracle, PlanRequest, ReasoningOracle, SynthesisRequest};
pub use plan::{parse_planner_response, Action, ActionKind, PlannerOutput};
pub use synthesis::{parse_synthesis_response, CallEdge, Synthesis};
