//! Reasoning oracle: the planner and synthesizer behind one trait

use super::client::{HttpChatClient, LLMClient};
use super::plan::{build_planner_messages, parse_planner_response, PlannerOutput};
use super::synthesis::{build_synthesis_messages, parse_synthesis_response, Synthesis};
use crate::blackboard::Blackboard;
use crate::config::LLMServiceConfig;
use crate::error::{OracleError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Input to one planning round
#[derive(Debug, Clone)]
pub struct PlanRequest {
    /// Bounded view of the blackboard
    pub summary: serde_json::Value,
    pub hint_file: Option<String>,
    pub explanation_prompt: Option<String>,
    pub round: usize,
}

/// Input to the final synthesis
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub blackboard: Blackboard,
    pub stop_reason: String,
    pub explanation_prompt: Option<String>,
    /// Words the explanation must avoid; set when rewriting a hedged answer
    pub banned_words: Vec<String>,
}

/// Decides what to look at next and writes the final explanation.
///
/// Implementations may fail in any way; the exploration loop bounds each call
/// with a timeout and retries.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn plan(&self, request: &PlanRequest) -> std::result::Result<PlannerOutput, OracleError>;

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> std::result::Result<Synthesis, OracleError>;

    fn name(&self) -> &str;
}

/// Oracle backed by chat completion services, one per role
pub struct LlmOracle {
    planner: Arc<dyn LLMClient>,
    synthesizer: Arc<dyn LLMClient>,
    name: String,
    snippet_lines: usize,
}

impl LlmOracle {
    /// Plan and synthesize with the same client
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self::with_clients(Arc::clone(&client), client)
    }

    pub fn with_clients(planner: Arc<dyn LLMClient>, synthesizer: Arc<dyn LLMClient>) -> Self {
        let name = if planner.model_name() == synthesizer.model_name() {
            planner.model_name().to_string()
        } else {
            format!(
                "planner={} synth={}",
                planner.model_name(),
                synthesizer.model_name()
            )
        };
        Self {
            planner,
            synthesizer,
            name,
            snippet_lines: 40,
        }
    }

    pub fn from_config(config: &LLMServiceConfig) -> Result<Self> {
        let planner = HttpChatClient::new(config.for_model(config.planner_model()))?;
        let synthesizer = HttpChatClient::new(config.for_model(config.synth_model()))?;
        Ok(Self::with_clients(Arc::new(planner), Arc::new(synthesizer)))
    }

    /// Snippet lines per evidence entry sent to the synthesizer
    pub fn with_snippet_lines(mut self, lines: usize) -> Self {
        self.snippet_lines = lines.max(1);
        self
    }
}

#[async_trait]
impl ReasoningOracle for LlmOracle {
    async fn plan(&self, request: &PlanRequest) -> std::result::Result<PlannerOutput, OracleError> {
        let messages = build_planner_messages(request);
        let response = self.planner.chat_completion(messages).await?;
        parse_planner_response(&response)
    }

    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> std::result::Result<Synthesis, OracleError> {
        let messages = build_synthesis_messages(request, self.snippet_lines);
        let response = self.synthesizer.chat_completion(messages).await?;
        parse_synthesis_response(&response)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Oracle that is never available; runs end with fallback synthesis
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineOracle;

#[async_trait]
impl ReasoningOracle for OfflineOracle {
    async fn plan(&self, _request: &PlanRequest) -> std::result::Result<PlannerOutput, OracleError> {
        Err(OracleError::Unavailable("offline mode".to_string()))
    }

    async fn synthesize(
        &self,
        _request: &SynthesisRequest,
    ) -> std::result::Result<Synthesis, OracleError> {
        Err(OracleError::Unavailable("offline mode".to_string()))
    }

    fn name(&self) -> &str {
        "offline"
    }
}
