//! Tree-sitter parser wrapper

use crate::error::{Error, Result};
use tree_sitter::{Language, Node, Parser, Tree};

fn python() -> Language {
    tree_sitter_python::LANGUAGE.into()
}

/// Parse Python source into a tree-sitter AST.
///
/// Tree-sitter recovers from syntax errors, so a returned tree may still
/// contain `ERROR` nodes; see [`first_syntax_error`].
pub fn parse(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&python())
        .map_err(|e| Error::Parse(e.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| Error::Parse("Failed to parse source".to_string()))
}

/// Parse and reject trees containing syntax errors.
pub fn parse_strict(source: &str) -> Result<Tree> {
    let tree = parse(source)?;
    if let Some(line) = first_syntax_error(&tree) {
        return Err(Error::Parse(format!("syntax error at line {}", line)));
    }
    Ok(tree)
}

/// 1-based line of the first error or missing node, if any.
pub fn first_syntax_error(tree: &Tree) -> Option<usize> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }
    find_error(root).map(|node| node.start_position().row + 1)
}

fn find_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(find_error)
}

/// Source text of a node, empty when the bytes are not valid UTF-8.
pub(crate) fn node_text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python() {
        let source = "def main():\n    print('Hello')";
        let tree = parse(source).unwrap();
        assert_eq!(tree.root_node().kind(), "module");
        assert_eq!(first_syntax_error(&tree), None);
    }

    #[test]
    fn test_syntax_error_line() {
        let source = "def ok():\n    pass\n\ndef broken(:\n    pass\n";
        let tree = parse(source).unwrap();
        assert!(first_syntax_error(&tree).is_some());
        assert!(parse_strict(source).is_err());
    }
}
