//! CLI command handlers

pub mod explain;
pub mod index;
pub mod resolve;
pub mod usages;

use crate::app::RepoArgs;
use callscope_core::{Config, RepoIndex, SearchEngine};
use std::sync::Arc;

/// Build the index for `args` with the configured scan rules.
pub fn load_index(args: &RepoArgs, config: &Config) -> callscope_core::Result<RepoIndex> {
    let index = RepoIndex::build_with(&args.repo, &args.extra_paths, &config.scan)?;
    tracing::info!(
        root = %index.root().display(),
        symbols = index.len(),
        skipped = index.skipped_files().len(),
        "index ready"
    );
    Ok(index)
}

pub fn load_engine(args: &RepoArgs, config: &Config) -> callscope_core::Result<SearchEngine> {
    let index = load_index(args, config)?;
    Ok(SearchEngine::new(Arc::new(index))
        .with_snippet_max_lines(config.exploration.snippet_max_lines))
}
