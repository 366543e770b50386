//! Call-site extraction from declaration snippets

use crate::index::parser::{self, node_text};
use std::collections::HashSet;
use tree_sitter::Node;

/// Builtins never worth chasing through the index
const PYTHON_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bin", "bool", "bytes", "callable", "chr", "dict", "dir", "divmod",
    "enumerate", "filter", "float", "format", "frozenset", "getattr", "hasattr", "hash", "hex",
    "id", "input", "int", "isinstance", "issubclass", "iter", "len", "list", "map", "max", "min",
    "next", "object", "oct", "open", "ord", "pow", "print", "range", "repr", "reversed", "round",
    "set", "setattr", "slice", "sorted", "str", "sum", "super", "tuple", "type", "vars", "zip",
];

/// Whether a call name refers to a Python builtin.
pub fn is_builtin(name: &str) -> bool {
    PYTHON_BUILTINS.contains(&name)
}

/// Extract call references from a declaration snippet.
///
/// Recognised forms are `name(...)`, `base.attr(...)` where `base` is a plain
/// name, and `Cls(...).attr(...)` for a capitalised `Cls`, reported as
/// `Cls.attr`. Results are deduplicated in first-occurrence order. A snippet
/// that cannot be parsed yields nothing.
pub fn extract_calls_from_def(snippet: &str) -> Vec<String> {
    let source = textwrap::dedent(snippet);
    let tree = match parser::parse(&source) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::debug!(error = %e, "cannot parse snippet for calls");
            return Vec::new();
        }
    };

    let mut calls = Vec::new();
    let mut seen = HashSet::new();
    collect_calls(tree.root_node(), source.as_bytes(), &mut |name| {
        if seen.insert(name.clone()) {
            calls.push(name);
        }
    });
    calls
}

fn collect_calls(node: Node, source: &[u8], emit: &mut impl FnMut(String)) {
    if node.kind() == "call" {
        if let Some(name) = call_reference(node, source) {
            emit(name);
        }
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_calls(child, source, emit);
    }
}

fn call_reference(call: Node, source: &[u8]) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => non_empty(node_text(function, source)),
        "attribute" => {
            let object = function.child_by_field_name("object")?;
            let attr = node_text(function.child_by_field_name("attribute")?, source);
            match object.kind() {
                "identifier" => Some(format!("{}.{}", node_text(object, source), attr)),
                "call" => {
                    let ctor = object.child_by_field_name("function")?;
                    let name = node_text(ctor, source);
                    let capitalised = name.chars().next().is_some_and(char::is_uppercase);
                    (ctor.kind() == "identifier" && capitalised)
                        .then(|| format!("{}.{}", name, attr))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}
