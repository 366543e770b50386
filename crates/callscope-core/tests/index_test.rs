//! Integration tests for repository indexing

mod common;

use callscope_core::{CallscopeError, RepoIndex, SourceKind, SymbolKind};
use common::{write_into, write_tree};
use std::collections::HashSet;

#[test]
fn test_malformed_file_is_skipped() {
    let mut files: Vec<(String, String)> = (0..9)
        .map(|i| (format!("mod{}.py", i), format!("def func{}():\n    return {}\n", i, i)))
        .collect();
    files.push(("broken.py".to_string(), "def broken(:\n    pass\n".to_string()));
    let borrowed: Vec<(&str, &str)> = files.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let dir = write_tree(&borrowed);

    let index = RepoIndex::build(dir.path()).unwrap();

    assert_eq!(index.len(), 9);
    for i in 0..9 {
        assert!(index.contains(&format!("mod{}.func{}", i, i)));
    }
    assert_eq!(index.skipped_files().len(), 1);
    assert_eq!(index.skipped_files()[0].path, "broken.py");
    assert!(index.file("broken.py").is_none());
    assert_eq!(index.stats().files, 9);
    // Still available to text search.
    let unparsed: Vec<&str> = index
        .searchable_files()
        .iter()
        .filter(|f| !f.parsed)
        .map(|f| f.relative_path.as_str())
        .collect();
    assert_eq!(unparsed, vec!["broken.py"]);
    assert_eq!(index.searchable_files().len(), 10);
}

#[test]
fn test_qualified_names_unique_and_spans_ordered() {
    let dir = write_tree(&[
        (
            "pkg/__init__.py",
            "from .engine import Engine\n\n\ndef version():\n    return '1'\n",
        ),
        (
            "pkg/engine.py",
            r#"import logging


class Engine:
    """Runs jobs."""

    def __init__(self, workers):
        self.workers = workers

    @property
    def size(self):
        return len(self.workers)

    async def run(self, job):
        def step(x):
            return x
        return step(job)


if logging:
    def configure():
        pass
else:
    def configure():
        raise RuntimeError()
"#,
        ),
    ]);

    let index = RepoIndex::build(dir.path()).unwrap();
    let names: HashSet<&String> = index.symbols().keys().collect();
    assert_eq!(names.len(), index.len());

    for def in index.symbols().values() {
        assert!(def.line_start >= 1);
        assert!(def.line_start <= def.line_end, "{:?}", def);
    }

    let kinds = |name: &str| index.get(name).map(|d| d.kind);
    assert_eq!(kinds("pkg.version"), Some(SymbolKind::Function));
    assert_eq!(kinds("pkg.engine.Engine"), Some(SymbolKind::Class));
    assert_eq!(kinds("pkg.engine.Engine.size"), Some(SymbolKind::Method));
    assert_eq!(kinds("pkg.engine.Engine.run"), Some(SymbolKind::Method));
    assert_eq!(kinds("pkg.engine.Engine.run.step"), Some(SymbolKind::Function));

    // The first of two conditional definitions wins.
    assert_eq!(index.get("pkg.engine.configure").unwrap().line_start, 21);

    // Decorator lines belong to the span.
    assert_eq!(index.get("pkg.engine.Engine.size").unwrap().line_start, 10);

    assert_eq!(
        index
            .imports_for("pkg/__init__.py")
            .and_then(|m| m.get("Engine"))
            .map(String::as_str),
        Some("pkg.engine.Engine")
    );
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = write_tree(&[]);
    let err = RepoIndex::build(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, CallscopeError::Index(_)));
    assert_eq!(err.exit_code(), callscope_core::error::exit_codes::INVALID_INPUT);
}

#[test]
fn test_excluded_directories() {
    let dir = write_tree(&[
        ("app.py", "def main():\n    pass\n"),
        ("build/lib/app.py", "def main():\n    pass\n"),
        (".venv/site.py", "def hidden():\n    pass\n"),
        ("__pycache__/app.py", "def cached():\n    pass\n"),
    ]);
    let index = RepoIndex::build(dir.path()).unwrap();
    let files: Vec<&str> = index.files().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(files, vec!["app.py"]);
}

#[test]
fn test_extra_paths_lose_collisions() {
    let repo = write_tree(&[("core.py", "def run():\n    return 1\n")]);
    let vendor = write_tree(&[]);
    write_into(
        vendor.path(),
        &[
            ("core.py", "def run():\n    return 2\n\n\ndef shadow():\n    pass\n"),
            ("thirdparty/lib.py", "def assist():\n    pass\n"),
        ],
    );

    let index = RepoIndex::build_with_extra(repo.path(), &[vendor.path().to_path_buf()]).unwrap();

    assert!(index.contains("core.run"));
    // The vendored core.py is shadowed entirely by the primary root.
    assert!(!index.contains("core.shadow"));
    assert!(index.contains("thirdparty.lib.assist"));
    assert_eq!(
        index.file("thirdparty/lib.py").map(|f| f.source),
        Some(SourceKind::ExtraPath)
    );
    assert_eq!(index.file("core.py").map(|f| f.source), Some(SourceKind::MainRepo));
}

#[test]
fn test_builds_are_deterministic() {
    let dir = write_tree(&[
        ("z.py", "def normalize():\n    pass\n"),
        ("a.py", "def normalize():\n    pass\n"),
        ("m/n.py", "class normalize:\n    pass\n"),
    ]);
    let first = RepoIndex::build(dir.path()).unwrap();
    let second = RepoIndex::build(dir.path()).unwrap();
    assert_eq!(first.symbols(), second.symbols());
    let candidates: Vec<&String> = first.shortname_candidates("normalize").unwrap().iter().collect();
    assert_eq!(candidates, vec!["a.normalize", "m.n.normalize", "z.normalize"]);
}
