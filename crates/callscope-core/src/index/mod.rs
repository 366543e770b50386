//! Repository indexing
//!
//! Scans a source tree, parses every Python file with tree-sitter and builds
//! a read-only [`RepoIndex`] of qualified declarations and import aliases.

pub mod parser;
mod repo_index;
mod scanner;
mod symbols;

pub use repo_index::{IndexStats, IndexedFile, RepoIndex, SkippedFile, SourceKind};
pub use scanner::{scan_files, ScanResult};
pub use symbols::{extract_file_symbols, module_name, FileSymbols, SymbolDef, SymbolKind};
