//! Configuration management

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service backing the reasoning oracle
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Exploration loop budgets and limits
    #[serde(default)]
    pub exploration: ExplorationConfig,

    /// Source tree scanning
    #[serde(default)]
    pub scan: ScanConfig,
}

/// LLM service configuration for the planner and synthesizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of an OpenAI-compatible chat/completions service
    #[serde(default = "default_url")]
    pub url: String,

    /// Model name for planning and synthesis
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Planner model, when it differs from `model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planner_model: Option<String>,

    /// Synthesizer model, when it differs from `model`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synth_model: Option<String>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_chat_model(),
            planner_model: None,
            synth_model: None,
            api_key: std::env::var("CALLSCOPE_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl LLMServiceConfig {
    pub fn planner_model(&self) -> &str {
        self.planner_model.as_deref().unwrap_or(&self.model)
    }

    pub fn synth_model(&self) -> &str {
        self.synth_model.as_deref().unwrap_or(&self.model)
    }

    /// Copy of this config talking to `model`
    pub fn for_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            planner_model: None,
            synth_model: None,
            ..self.clone()
        }
    }
}

fn default_url() -> String {
    std::env::var("CALLSCOPE_LLM_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn default_chat_model() -> String {
    std::env::var("CALLSCOPE_LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string())
}

fn default_timeout() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_tokens() -> u32 {
    2048
}

/// Budgets for one exploration run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// Maximum number of planner rounds
    pub max_iters: usize,
    /// Actions beyond this count in one plan are dropped
    pub max_actions_per_round: usize,
    /// Actions executed concurrently within a round
    pub action_concurrency: usize,
    /// Per-call bound on a planner or synthesizer round trip
    pub oracle_timeout_secs: u64,
    /// Retries after the first failed oracle call
    pub oracle_max_retries: u32,
    /// Initial retry delay, doubled after every failure
    pub retry_backoff_ms: u64,
    pub snippet_max_lines: usize,
    /// Snippet lines shown to the planner per evidence entry
    pub summary_snippet_lines: usize,
    pub usage_max_hits: usize,
    /// Log entries shown to the planner
    pub log_tail: usize,
    /// Words that trigger one rewrite of the final explanation
    pub hedge_words: Vec<String>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            max_iters: 3,
            max_actions_per_round: 10,
            action_concurrency: 4,
            oracle_timeout_secs: 90,
            oracle_max_retries: 2,
            retry_backoff_ms: 500,
            snippet_max_lines: 160,
            summary_snippet_lines: 40,
            usage_max_hits: 30,
            log_tail: 12,
            hedge_words: ["maybe", "perhaps", "probably", "possibly", "might"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Directories never descended into while indexing
const EXCLUDE_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    ".mypy_cache",
    ".pytest_cache",
    "node_modules",
    "build",
    "dist",
];

/// Source tree scanning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Glob pattern for source files, relative to the root
    pub pattern: String,
    pub exclude_dirs: Vec<String>,
    pub exclude_hidden: bool,
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pattern: "**/*.py".to_string(),
            exclude_dirs: EXCLUDE_DIRS.iter().map(|s| s.to_string()).collect(),
            exclude_hidden: true,
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, falling back to defaults when absent
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_yaml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }

    fn validate(&self) -> Result<()> {
        if self.exploration.action_concurrency == 0 {
            return Err(crate::Error::Config(
                "exploration.action_concurrency must be at least 1".to_string(),
            ));
        }
        if self.exploration.snippet_max_lines == 0 {
            return Err(crate::Error::Config(
                "exploration.snippet_max_lines must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
