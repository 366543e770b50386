//! In-memory symbol table for a repository

use super::scanner::scan_files;
use super::symbols::{extract_file_symbols, short_name, SymbolDef, SymbolKind};
use crate::config::ScanConfig;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Where an indexed file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    MainRepo,
    ExtraPath,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::MainRepo => "main_repo",
            SourceKind::ExtraPath => "extra_path",
        }
    }
}

/// A readable source file under one of the indexed roots
#[derive(Debug, Clone)]
pub struct IndexedFile {
    pub relative_path: String,
    pub root: PathBuf,
    pub source: SourceKind,
    /// Declarations were extracted; unparsed files are only text-searchable
    pub parsed: bool,
}

impl IndexedFile {
    pub fn absolute_path(&self) -> PathBuf {
        self.root.join(&self.relative_path)
    }
}

/// A file left out of the index and why
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    pub reason: String,
}

/// Index statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexStats {
    pub files: usize,
    pub symbols: usize,
    pub functions: usize,
    pub methods: usize,
    pub classes: usize,
    pub skipped: usize,
}

/// Symbol table built once per run and read-only afterwards.
///
/// Every qualified name maps to exactly one declaration. When two files
/// declare the same qualified name, the first one indexed wins; the main
/// repository is always indexed before extra paths.
#[derive(Debug, Clone)]
pub struct RepoIndex {
    root: PathBuf,
    symbols: BTreeMap<String, SymbolDef>,
    shortname_map: HashMap<String, BTreeSet<String>>,
    import_map: HashMap<String, BTreeMap<String, String>>,
    files: Vec<IndexedFile>,
    file_lookup: HashMap<String, usize>,
    skipped: Vec<SkippedFile>,
}

impl RepoIndex {
    /// Index every Python file under `root`.
    pub fn build(root: &Path) -> Result<Self> {
        Self::build_with(root, &[], &ScanConfig::default())
    }

    /// Index `root` plus additional source roots.
    pub fn build_with_extra(root: &Path, extra_roots: &[PathBuf]) -> Result<Self> {
        Self::build_with(root, extra_roots, &ScanConfig::default())
    }

    pub fn build_with(root: &Path, extra_roots: &[PathBuf], scan: &ScanConfig) -> Result<Self> {
        check_root(root)?;

        let mut index = Self {
            root: root.to_path_buf(),
            symbols: BTreeMap::new(),
            shortname_map: HashMap::new(),
            import_map: HashMap::new(),
            files: Vec::new(),
            file_lookup: HashMap::new(),
            skipped: Vec::new(),
        };

        index.index_root(root, SourceKind::MainRepo, scan)?;
        for extra in extra_roots {
            if let Err(e) = check_root(extra) {
                tracing::warn!(path = %extra.display(), error = %e, "skipping extra path");
                continue;
            }
            index.index_root(extra, SourceKind::ExtraPath, scan)?;
        }

        tracing::info!(
            root = %root.display(),
            files = index.files().count(),
            symbols = index.symbols.len(),
            skipped = index.skipped.len(),
            "repository indexed"
        );
        Ok(index)
    }

    fn index_root(&mut self, root: &Path, source: SourceKind, scan: &ScanConfig) -> Result<()> {
        for entry in scan_files(root, scan)? {
            let relative = entry.relative_path;
            if self.file_lookup.contains_key(&relative) {
                tracing::debug!(path = %relative, "already indexed from an earlier root");
                continue;
            }

            let bytes = match std::fs::read(&entry.path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.skip(relative, format!("unreadable: {}", e));
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&bytes);

            let file_symbols = match extract_file_symbols(&text, &relative) {
                Ok(symbols) => symbols,
                Err(e) => {
                    self.skip(relative.clone(), e.to_string());
                    self.push_file(relative, root, source, false);
                    continue;
                }
            };

            for def in file_symbols.declarations {
                if let Some(existing) = self.symbols.get(&def.qualified_name) {
                    tracing::debug!(
                        symbol = %def.qualified_name,
                        kept = %existing.file_path,
                        dropped = %def.file_path,
                        "duplicate declaration"
                    );
                    continue;
                }
                self.shortname_map
                    .entry(def.short_name().to_string())
                    .or_default()
                    .insert(def.qualified_name.clone());
                self.symbols.insert(def.qualified_name.clone(), def);
            }

            if !file_symbols.imports.is_empty() {
                self.import_map.insert(relative.clone(), file_symbols.imports);
            }
            self.push_file(relative, root, source, true);
        }
        Ok(())
    }

    fn push_file(&mut self, relative: String, root: &Path, source: SourceKind, parsed: bool) {
        self.file_lookup.insert(relative.clone(), self.files.len());
        self.files.push(IndexedFile {
            relative_path: relative,
            root: root.to_path_buf(),
            source,
            parsed,
        });
    }

    fn skip(&mut self, path: String, reason: String) {
        tracing::warn!(path = %path, reason = %reason, "skipping file");
        self.skipped.push(SkippedFile { path, reason });
    }

    /// Primary repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All declarations keyed by qualified name, in name order
    pub fn symbols(&self) -> &BTreeMap<String, SymbolDef> {
        &self.symbols
    }

    pub fn get(&self, qualified_name: &str) -> Option<&SymbolDef> {
        self.symbols.get(qualified_name)
    }

    pub fn contains(&self, qualified_name: &str) -> bool {
        self.symbols.contains_key(qualified_name)
    }

    /// Qualified names sharing a last segment, sorted
    pub fn shortname_candidates(&self, short: &str) -> Option<&BTreeSet<String>> {
        self.shortname_map.get(short)
    }

    /// Import aliases of one file: local name to imported qualified name
    pub fn imports_for(&self, relative_path: &str) -> Option<&BTreeMap<String, String>> {
        self.import_map.get(relative_path)
    }

    /// Files that contributed declarations, in scan order
    pub fn files(&self) -> impl Iterator<Item = &IndexedFile> + '_ {
        self.files.iter().filter(|f| f.parsed)
    }

    /// Every readable file, parsed or not, in scan order
    pub fn searchable_files(&self) -> &[IndexedFile] {
        &self.files
    }

    pub fn file(&self, relative_path: &str) -> Option<&IndexedFile> {
        self.file_lookup
            .get(relative_path)
            .and_then(|&i| self.files.get(i))
            .filter(|f| f.parsed)
    }

    pub fn skipped_files(&self) -> &[SkippedFile] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let mut stats = IndexStats {
            files: self.files().count(),
            symbols: self.symbols.len(),
            skipped: self.skipped.len(),
            ..Default::default()
        };
        for def in self.symbols.values() {
            match def.kind {
                SymbolKind::Function => stats.functions += 1,
                SymbolKind::Method => stats.methods += 1,
                SymbolKind::Class => stats.classes += 1,
            }
        }
        stats
    }

    /// Qualified names equal to `tail` or ending in `.tail`, sorted.
    pub fn names_ending_with(&self, tail: &str) -> Vec<String> {
        let Some(candidates) = self.shortname_map.get(short_name(tail)) else {
            return Vec::new();
        };
        let dotted = format!(".{}", tail);
        candidates
            .iter()
            .filter(|name| name.as_str() == tail || name.ends_with(&dotted))
            .cloned()
            .collect()
    }
}

fn check_root(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root).map_err(|e| {
        Error::Index(format!("cannot read repository root {}: {}", root.display(), e))
    })?;
    if !metadata.is_dir() {
        return Err(Error::Index(format!(
            "repository root {} is not a directory",
            root.display()
        )));
    }
    std::fs::read_dir(root).map_err(|e| {
        Error::Index(format!("cannot list repository root {}: {}", root.display(), e))
    })?;
    Ok(())
}
