//! Declaration and import extraction from Python syntax trees

use super::parser::{self, node_text};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tree_sitter::Node;

/// Kind of declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named declaration located in an indexed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDef {
    pub qualified_name: String,
    pub kind: SymbolKind,
    /// Root-relative path of the defining file
    pub file_path: String,
    /// 1-based, inclusive
    pub line_start: usize,
    /// 1-based, inclusive
    pub line_end: usize,
}

impl SymbolDef {
    /// Last dotted segment of the qualified name.
    pub fn short_name(&self) -> &str {
        short_name(&self.qualified_name)
    }
}

pub(crate) fn short_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Declarations and import aliases of a single file
#[derive(Debug, Clone, Default)]
pub struct FileSymbols {
    /// Declarations in source order
    pub declarations: Vec<SymbolDef>,
    /// Local alias to fully qualified imported name
    pub imports: BTreeMap<String, String>,
}

/// Dotted module name for a root-relative path.
///
/// `pkg/sub/mod.py` becomes `pkg.sub.mod`; a package `__init__.py` is named
/// after its directory.
pub fn module_name(relative_path: &str) -> String {
    let trimmed = relative_path.strip_suffix(".py").unwrap_or(relative_path);
    let mut parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
    if parts.len() > 1 && parts.last() == Some(&"__init__") {
        parts.pop();
    }
    parts.join(".")
}

fn is_package_init(relative_path: &str) -> bool {
    relative_path == "__init__.py" || relative_path.ends_with("/__init__.py")
}

/// Parse one file and extract its declarations and imports.
///
/// Files with syntax errors are rejected with [`crate::Error::Parse`].
pub fn extract_file_symbols(source: &str, relative_path: &str) -> Result<FileSymbols> {
    let tree = parser::parse_strict(source)?;
    let module = module_name(relative_path);
    let bytes = source.as_bytes();
    let root = tree.root_node();

    let mut symbols = FileSymbols::default();
    let scope = Scope {
        prefix: &module,
        in_class: false,
        file: relative_path,
    };
    collect_declarations(root, bytes, &scope, &mut symbols.declarations);

    let package = ImportBase {
        module: &module,
        is_package: is_package_init(relative_path),
    };
    collect_imports(root, bytes, &package, &mut symbols.imports);

    Ok(symbols)
}

struct Scope<'a> {
    prefix: &'a str,
    in_class: bool,
    file: &'a str,
}

fn collect_declarations(node: Node, source: &[u8], scope: &Scope, out: &mut Vec<SymbolDef>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "decorated_definition" => {
                if let Some(definition) = child.child_by_field_name("definition") {
                    declare(definition, child, source, scope, out);
                }
            }
            "function_definition" | "class_definition" => {
                declare(child, child, source, scope, out);
            }
            // Lambdas and comprehensions never hold declarations.
            "lambda" | "list_comprehension" | "dictionary_comprehension"
            | "set_comprehension" | "generator_expression" | "string" | "comment" => {}
            _ => collect_declarations(child, source, scope, out),
        }
    }
}

/// Record a definition whose span is taken from `span` (the decorated node
/// when decorators are present) and descend into its body.
fn declare(definition: Node, span: Node, source: &[u8], scope: &Scope, out: &mut Vec<SymbolDef>) {
    let Some(name_node) = definition.child_by_field_name("name") else {
        return;
    };
    let name = node_text(name_node, source);
    if name.is_empty() {
        return;
    }

    let qualified_name = if scope.prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", scope.prefix, name)
    };
    let is_class = definition.kind() == "class_definition";
    let kind = match (is_class, scope.in_class) {
        (true, _) => SymbolKind::Class,
        (false, true) => SymbolKind::Method,
        (false, false) => SymbolKind::Function,
    };

    out.push(SymbolDef {
        qualified_name: qualified_name.clone(),
        kind,
        file_path: scope.file.to_string(),
        line_start: span.start_position().row + 1,
        line_end: span.end_position().row + 1,
    });

    if let Some(body) = definition.child_by_field_name("body") {
        let inner = Scope {
            prefix: &qualified_name,
            in_class: is_class,
            file: scope.file,
        };
        collect_declarations(body, source, &inner, out);
    }
}

struct ImportBase<'a> {
    module: &'a str,
    is_package: bool,
}

fn collect_imports(node: Node, source: &[u8], base: &ImportBase, out: &mut BTreeMap<String, String>) {
    match node.kind() {
        "import_statement" => {
            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                match name.kind() {
                    "dotted_name" => {
                        let full = node_text(name, source);
                        let alias = full.rsplit('.').next().unwrap_or(full);
                        insert_alias(out, alias, full.to_string());
                    }
                    "aliased_import" => {
                        if let Some((full, alias)) = aliased(name, source) {
                            insert_alias(out, alias, full.to_string());
                        }
                    }
                    _ => {}
                }
            }
        }
        "import_from_statement" => {
            let Some(module_node) = node.child_by_field_name("module_name") else {
                return;
            };
            let module = match module_node.kind() {
                "relative_import" => resolve_relative(module_node, source, base),
                _ => node_text(module_node, source).to_string(),
            };

            let mut cursor = node.walk();
            for name in node.children_by_field_name("name", &mut cursor) {
                let (imported, alias) = match name.kind() {
                    "dotted_name" => {
                        let imported = node_text(name, source);
                        (imported, imported)
                    }
                    "aliased_import" => match aliased(name, source) {
                        Some(pair) => pair,
                        None => continue,
                    },
                    _ => continue,
                };
                let full = if module.is_empty() {
                    imported.to_string()
                } else {
                    format!("{}.{}", module, imported)
                };
                insert_alias(out, alias, full);
            }
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_imports(child, source, base, out);
            }
        }
    }
}

fn aliased<'a>(node: Node, source: &'a [u8]) -> Option<(&'a str, &'a str)> {
    let name = node.child_by_field_name("name")?;
    let alias = node.child_by_field_name("alias")?;
    Some((node_text(name, source), node_text(alias, source)))
}

fn insert_alias(out: &mut BTreeMap<String, String>, alias: &str, full: String) {
    if !alias.is_empty() && !full.is_empty() {
        out.insert(alias.to_string(), full);
    }
}

/// Rebase `from ..pkg import x` onto the importing module's package.
fn resolve_relative(node: Node, source: &[u8], base: &ImportBase) -> String {
    let mut level = 0;
    let mut tail = "";
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "import_prefix" => level = node_text(child, source).matches('.').count(),
            "dotted_name" => tail = node_text(child, source),
            _ => {}
        }
    }

    let parts: Vec<&str> = base.module.split('.').filter(|p| !p.is_empty()).collect();
    // A package's own __init__ is one level shallower than its modules.
    let drop = if base.is_package {
        level.saturating_sub(1)
    } else {
        level
    };
    let keep = parts.len().saturating_sub(drop);

    let mut rebased: Vec<&str> = parts[..keep].to_vec();
    if !tail.is_empty() {
        rebased.push(tail);
    }
    rebased.join(".")
}
