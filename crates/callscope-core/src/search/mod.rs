//! Search engine over a repository index
//!
//! Provides symbol resolution, opening of declarations as evidence, literal
//! usage search, and a hybrid of the two.

mod calls;
mod resolve;
pub mod snippet;
mod usages;

pub use calls::{extract_calls_from_def, is_builtin};
pub use resolve::{resolve, MatchStrategy, Resolution};
pub use usages::{find_usages, UsageHit, MAX_LINE_CHARS};

use crate::error::ResolutionError;
use crate::index::{RepoIndex, SourceKind, SymbolDef};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default snippet bound in lines
pub const DEFAULT_SNIPPET_MAX_LINES: usize = 160;

/// An opened declaration: its location, source text and outgoing calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub symbol: SymbolDef,
    pub snippet: String,
    /// Call references extracted from the full declaration
    pub calls: Vec<String>,
    pub source: SourceKind,
}

impl Evidence {
    pub fn qualified_name(&self) -> &str {
        &self.symbol.qualified_name
    }
}

/// Which half of a hybrid search produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HybridStrategy {
    Resolution,
    TextSearch,
}

impl HybridStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            HybridStrategy::Resolution => "resolution",
            HybridStrategy::TextSearch => "text_search",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HybridOutcome {
    Definition {
        evidence: Evidence,
        matched_by: MatchStrategy,
    },
    Usages {
        hits: Vec<UsageHit>,
        /// Candidates of an ambiguous resolution, if any
        candidates: Vec<String>,
    },
    Empty {
        candidates: Vec<String>,
    },
}

/// Result of [`SearchEngine::hybrid_search`]
#[derive(Debug, Clone, Serialize)]
pub struct HybridResult {
    pub query: String,
    pub strategy: HybridStrategy,
    pub outcome: HybridOutcome,
}

/// Search engine sharing a read-only index
#[derive(Debug, Clone)]
pub struct SearchEngine {
    index: Arc<RepoIndex>,
    snippet_max_lines: usize,
}

impl SearchEngine {
    pub fn new(index: Arc<RepoIndex>) -> Self {
        Self {
            index,
            snippet_max_lines: DEFAULT_SNIPPET_MAX_LINES,
        }
    }

    pub fn with_snippet_max_lines(mut self, max_lines: usize) -> Self {
        self.snippet_max_lines = max_lines.max(1);
        self
    }

    pub fn index(&self) -> &RepoIndex {
        &self.index
    }

    /// Bind a reference to one declaration. See [`resolve`].
    pub fn resolve_symbol(&self, query: &str, context: Option<&str>) -> Resolution {
        resolve(&self.index, query, context)
    }

    /// Resolve and open a declaration.
    pub fn open_symbol(
        &self,
        query: &str,
        context: Option<&str>,
    ) -> std::result::Result<Evidence, ResolutionError> {
        let (symbol, _) = self.resolve_symbol(query, context).into_result(query)?;
        self.open_resolved(&symbol)
    }

    /// Read the span of an already resolved declaration.
    ///
    /// Calls are extracted from the full span before the snippet is clipped.
    pub fn open_resolved(&self, symbol: &SymbolDef) -> std::result::Result<Evidence, ResolutionError> {
        let file = self.index.file(&symbol.file_path);
        let path = file
            .map(|f| f.absolute_path())
            .unwrap_or_else(|| self.index.root().join(&symbol.file_path));
        let source = file.map(|f| f.source).unwrap_or(SourceKind::MainRepo);

        let full = snippet::read_span(&path, symbol.line_start, symbol.line_end).map_err(|e| {
            ResolutionError::Read {
                path: symbol.file_path.clone(),
                source: e,
            }
        })?;
        let calls = extract_calls_from_def(&full);

        Ok(Evidence {
            symbol: symbol.clone(),
            snippet: snippet::clip_lines(&full, self.snippet_max_lines),
            calls,
            source,
        })
    }

    /// Literal search for `needle`; I/O problems yield no hits.
    pub fn find_usages(&self, needle: &str, max_hits: usize) -> Vec<UsageHit> {
        find_usages(&self.index, needle, max_hits).unwrap_or_else(|e| {
            tracing::warn!(needle, error = %e, "usage search failed");
            Vec::new()
        })
    }

    /// Resolve `query`; when that fails, fall back to a usage search.
    pub fn hybrid_search(&self, query: &str, context: Option<&str>, top_k: usize) -> HybridResult {
        let max_hits = (top_k * 4).max(10);
        let candidates = match self.resolve_symbol(query, context) {
            Resolution::Matched { symbol, strategy } => match self.open_resolved(&symbol) {
                Ok(evidence) => {
                    return HybridResult {
                        query: query.to_string(),
                        strategy: HybridStrategy::Resolution,
                        outcome: HybridOutcome::Definition {
                            evidence,
                            matched_by: strategy,
                        },
                    };
                }
                Err(e) => {
                    tracing::debug!(query, error = %e, "cannot open resolved symbol");
                    Vec::new()
                }
            },
            Resolution::Ambiguous { candidates } => candidates,
            Resolution::NotFound => Vec::new(),
        };

        let mut hits = self.find_usages(query, max_hits);
        if hits.is_empty() {
            if let Some((_, short)) = query.trim().rsplit_once('.') {
                hits = self.find_usages(short, max_hits);
            }
        }

        let outcome = if hits.is_empty() {
            HybridOutcome::Empty { candidates }
        } else {
            HybridOutcome::Usages { hits, candidates }
        };
        HybridResult {
            query: query.to_string(),
            strategy: HybridStrategy::TextSearch,
            outcome,
        }
    }
}
