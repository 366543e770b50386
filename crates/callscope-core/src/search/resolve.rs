//! Symbol resolution
//!
//! A textual reference is bound to a declaration through an ordered ladder of
//! strategies. The first strategy producing exactly one declaration wins:
//!
//! 1. exact qualified name (or its import-alias expansion in the context file)
//! 2. unique qualified name ending with the full reference
//! 3. unique match on the last two segments
//! 4. unique match on the last three segments
//! 5. short name, narrowed by the context file's imports
//!
//! Resolution is a pure function of the index, the reference and the context.

use crate::error::ResolutionError;
use crate::index::{RepoIndex, SymbolDef};
use serde::Serialize;

/// Strategy that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    Exact,
    Suffix,
    TwoSegment,
    ThreeSegment,
    ShortName,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Exact => "exact",
            MatchStrategy::Suffix => "suffix",
            MatchStrategy::TwoSegment => "two_segment",
            MatchStrategy::ThreeSegment => "three_segment",
            MatchStrategy::ShortName => "short_name",
        }
    }
}

impl std::fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving one reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Matched {
        symbol: SymbolDef,
        strategy: MatchStrategy,
    },
    Ambiguous {
        candidates: Vec<String>,
    },
    NotFound,
}

impl Resolution {
    pub fn symbol(&self) -> Option<&SymbolDef> {
        match self {
            Resolution::Matched { symbol, .. } => Some(symbol),
            _ => None,
        }
    }

    /// Convert to a result, naming `query` in the error.
    pub fn into_result(
        self,
        query: &str,
    ) -> std::result::Result<(SymbolDef, MatchStrategy), ResolutionError> {
        match self {
            Resolution::Matched { symbol, strategy } => Ok((symbol, strategy)),
            Resolution::Ambiguous { candidates } => Err(ResolutionError::Ambiguous {
                query: query.to_string(),
                candidates,
            }),
            Resolution::NotFound => Err(ResolutionError::NotFound {
                query: query.to_string(),
            }),
        }
    }
}

fn matched(index: &RepoIndex, name: &str, strategy: MatchStrategy) -> Resolution {
    match index.get(name) {
        Some(symbol) => Resolution::Matched {
            symbol: symbol.clone(),
            strategy,
        },
        None => Resolution::NotFound,
    }
}

/// Resolve `query` against the index, optionally in the context of the file
/// `context` (root-relative) whose imports disambiguate short names.
pub fn resolve(index: &RepoIndex, query: &str, context: Option<&str>) -> Resolution {
    let query = query.trim();
    if query.is_empty() {
        return Resolution::NotFound;
    }

    let imports = context.and_then(|file| index.imports_for(file));
    let segments: Vec<&str> = query.split('.').collect();
    let head = segments[0];
    let expanded = imports.and_then(|map| map.get(head)).map(|module| {
        let mut name = module.clone();
        for segment in &segments[1..] {
            name.push('.');
            name.push_str(segment);
        }
        name
    });

    // 1. exact
    if index.contains(query) {
        return matched(index, query, MatchStrategy::Exact);
    }
    if let Some(name) = expanded.as_deref() {
        if index.contains(name) {
            return matched(index, name, MatchStrategy::Exact);
        }
    }

    // 2-4. suffixes, keeping the narrowest multi-hit set for ambiguity reports
    let mut narrowed: Option<Vec<String>> = None;
    let mut ladder = Vec::with_capacity(3);
    if segments.len() > 1 {
        ladder.push((query.to_string(), MatchStrategy::Suffix));
    }
    for (width, strategy) in [(2, MatchStrategy::TwoSegment), (3, MatchStrategy::ThreeSegment)] {
        if segments.len() > width {
            ladder.push((segments[segments.len() - width..].join("."), strategy));
        }
    }
    for (tail, strategy) in ladder {
        let hits = index.names_ending_with(&tail);
        match hits.len() {
            0 => {}
            1 => return matched(index, &hits[0], strategy),
            _ => {
                if narrowed.as_ref().map_or(true, |n| hits.len() < n.len()) {
                    narrowed = Some(hits);
                }
            }
        }
    }

    // 5. short name
    let short = segments[segments.len() - 1];
    let Some(all) = index.shortname_candidates(short) else {
        return Resolution::NotFound;
    };
    let mut pool: Vec<String> = all.iter().cloned().collect();

    if let Some(prefix) = expanded.as_deref().filter(|_| segments.len() > 1) {
        // `alias.name` where the alias names a module: only that module counts.
        let module = &prefix[..prefix.len() - short.len() - 1];
        pool.retain(|c| is_within(c, module));
        if pool.is_empty() {
            return Resolution::NotFound;
        }
    } else if let (Some(file), Some(imports)) = (context, imports) {
        let filtered: Vec<String> = pool
            .iter()
            .filter(|c| in_import_context(index, c, file, imports.values()))
            .cloned()
            .collect();
        if !filtered.is_empty() {
            pool = filtered;
        }
    } else if let Some(file) = context {
        let local: Vec<String> = pool
            .iter()
            .filter(|c| index.get(c).is_some_and(|d| d.file_path == file))
            .cloned()
            .collect();
        if !local.is_empty() {
            pool = local;
        }
    }

    if let Some(narrowed) = narrowed {
        let intersection: Vec<String> = pool
            .iter()
            .filter(|c| narrowed.contains(c))
            .cloned()
            .collect();
        if !intersection.is_empty() {
            pool = intersection;
        }
    }

    match pool.len() {
        0 => Resolution::NotFound,
        1 => matched(index, &pool[0], MatchStrategy::ShortName),
        _ => Resolution::Ambiguous { candidates: pool },
    }
}

fn is_within(name: &str, prefix: &str) -> bool {
    name == prefix
        || (name.len() > prefix.len()
            && name.starts_with(prefix)
            && name.as_bytes()[prefix.len()] == b'.')
}

fn in_import_context<'a>(
    index: &RepoIndex,
    candidate: &str,
    file: &str,
    mut imported: impl Iterator<Item = &'a String>,
) -> bool {
    if index.get(candidate).is_some_and(|d| d.file_path == file) {
        return true;
    }
    imported.any(|name| is_within(candidate, name))
}
