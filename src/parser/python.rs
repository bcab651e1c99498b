//! Python source parsing via tree-sitter.
//!
//! Produces the structural tree consumed by the analysis passes. Trees
//! containing ERROR nodes are rejected outright (the file is not analyzed);
//! trees containing only MISSING nodes parse, but the zero-width synthesized
//! nodes make byte positions unreliable, so callers suppress edit planning
//! for them while still reporting usages.

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

/// Errors that can occur while parsing Python source.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The source contains a syntax error. Analysis is aborted for the file.
    #[error("Syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },

    /// The parser produced no tree at all (cancelled or internal failure).
    #[error("Parser produced no tree")]
    Failed,

    /// Tree-sitter language initialization failed.
    #[error("Tree-sitter language initialization failed")]
    LanguageInit,
}

/// Result type for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parser for Python source files.
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    /// Create a new PythonParser.
    pub fn new() -> ParseResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|_| ParseError::LanguageInit)?;

        Ok(Self { parser })
    }

    /// Parse source text into a tree.
    ///
    /// Returns `ParseError::Syntax` with the position of the first ERROR
    /// node if the source is not well-formed.
    pub fn parse(&mut self, source: &str) -> ParseResult<Tree> {
        let tree = self.parser.parse(source, None).ok_or(ParseError::Failed)?;

        if let Some(node) = find_node(tree.root_node(), &|n| n.is_error()) {
            let pos = node.start_position();
            return Err(ParseError::Syntax {
                line: pos.row + 1,
                column: pos.column,
            });
        }

        Ok(tree)
    }
}

/// Returns true if the tree contains MISSING nodes.
///
/// Missing nodes are zero-width tokens the parser synthesized during
/// recovery; their positions cannot anchor text edits.
pub fn has_missing_nodes(tree: &Tree) -> bool {
    find_node(tree.root_node(), &|n| n.is_missing()).is_some()
}

/// Depth-first search for the first node matching the predicate.
fn find_node<'a>(node: Node<'a>, pred: &dyn Fn(Node) -> bool) -> Option<Node<'a>> {
    if pred(node) {
        return Some(node);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = find_node(child, pred) {
            return Some(found);
        }
    }

    None
}

/// Extract the text content of a node.
pub fn node_text<'a>(node: &Node, source: &'a str) -> Option<&'a str> {
    source.get(node.start_byte()..node.end_byte())
}
