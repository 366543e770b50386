//! Error types for callscope

use thiserror::Error;

/// Result type alias using CallscopeError
pub type Result<T> = std::result::Result<T, CallscopeError>;

/// Error type alias for convenience
pub type Error = CallscopeError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// Main error type for callscope
#[derive(Debug, Error)]
pub enum CallscopeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),

    /// Root path of the repository cannot be indexed. Fatal for a run.
    #[error("Index error: {0}")]
    Index(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CallscopeError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Resolution(ResolutionError::NotFound { .. }) => exit_codes::NOT_FOUND,
            Self::Index(_) | Self::Config(_) | Self::InvalidInput(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }
}

/// Failure to bind a reference to exactly one declaration.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("symbol not found: {query}")]
    NotFound { query: String },

    #[error("ambiguous symbol {query}: {} candidates ({})", .candidates.len(), .candidates.join(", "))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },

    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ResolutionError {
    /// Candidates carried by an ambiguous resolution, empty otherwise.
    pub fn candidates(&self) -> &[String] {
        match self {
            Self::Ambiguous { candidates, .. } => candidates,
            _ => &[],
        }
    }
}

/// Failure of one planner or synthesizer round trip.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle call timed out after {0}s")]
    Timeout(u64),

    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

impl From<CallscopeError> for OracleError {
    fn from(err: CallscopeError) -> Self {
        match err {
            CallscopeError::Oracle(inner) => inner,
            other => OracleError::Transport(other.to_string()),
        }
    }
}

/// A blackboard patch that names keys the blackboard does not hold.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("patch references unknown keys: {}", .0.join(", "))]
    UnknownKeys(Vec<String>),
}
