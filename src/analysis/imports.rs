//! Import extraction from parsed Python source.
//!
//! Walks the tree and produces one binding per imported name, together with
//! a per-statement table carrying the byte ranges the edit planner needs.

use std::ops::Range;

use tree_sitter::{Node, Tree};

use crate::parser::node_text;

/// Opaque handle identifying an import statement within one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementId(usize);

impl StatementId {
    /// Index of the statement in the extraction-order statement table.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The kind of import statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import a.b` or `import a.b as c`
    Plain,
    /// `from m import x, y as z` (including relative `from . import x`)
    From,
    /// `from __future__ import annotations`
    Future,
}

/// A source position. Lines are 1-indexed, columns 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

/// A name introduced into a scope by an import statement.
#[derive(Debug, Clone)]
pub struct ImportBinding {
    /// The name this import binds in the enclosing scope.
    pub bound_name: String,
    /// The module the name comes from (`os.path` for `import os.path`,
    /// `typing` for `from typing import List`).
    pub origin_module: String,
    /// The name as written in the source module (differs from `bound_name`
    /// when aliased).
    pub declared_name: String,
    /// True for `from m import *`. Star imports are never edit candidates,
    /// since the bound names cannot be enumerated statically.
    pub is_star_import: bool,
    /// True for the redundant-alias re-export convention
    /// (`from m import x as x`, `import m as m`).
    pub is_reexport: bool,
    /// The statement that introduced this binding.
    pub statement: StatementId,
    /// Position of the binding site.
    pub position: Position,
    /// Byte offset of the binding site, used for shadowing order.
    pub offset: usize,
    /// Byte span of this binding's name clause (including any `as` alias),
    /// used by the edit planner for single-name removal.
    pub clause_range: Range<usize>,
}

/// Per-statement record behind a [`StatementId`].
#[derive(Debug, Clone)]
pub struct ImportStatement {
    pub id: StatementId,
    pub kind: ImportKind,
    /// Byte span of the statement node.
    pub range: Range<usize>,
    /// First and last source line of the statement, 1-indexed.
    pub start_line: usize,
    pub end_line: usize,
    /// Indices into the binding list for the names this statement binds.
    pub binding_indices: Vec<usize>,
    /// Byte span of an inline `#` comment trailing the statement, if any.
    pub trailing_comment: Option<Range<usize>>,
    /// True if other code shares a line with this statement (`;`-joined).
    pub shares_line: bool,
    /// True if this statement is the only statement of its block, in which
    /// case removing it outright would leave the block empty.
    pub sole_in_block: bool,
}

/// The ordered import bindings and statements of one source file.
#[derive(Debug, Default)]
pub struct ImportTable {
    pub bindings: Vec<ImportBinding>,
    pub statements: Vec<ImportStatement>,
}

impl ImportTable {
    /// Returns the statement record for a binding.
    pub fn statement_of(&self, binding: &ImportBinding) -> &ImportStatement {
        &self.statements[binding.statement.index()]
    }
}

/// Extract all import bindings from a parsed module tree.
///
/// Statements are visited in source order; imports nested inside functions
/// or branches are included (they register in their enclosing scope during
/// scope construction).
pub fn extract_imports(tree: &Tree, source: &str) -> ImportTable {
    let mut table = ImportTable::default();
    visit(tree.root_node(), source, &mut table);
    table
}

fn visit(node: Node, source: &str, table: &mut ImportTable) {
    match node.kind() {
        "import_statement" => {
            extract_statement(node, source, ImportKind::Plain, table);
        }
        "import_from_statement" => {
            extract_statement(node, source, ImportKind::From, table);
        }
        "future_import_statement" => {
            extract_statement(node, source, ImportKind::Future, table);
        }
        _ => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                visit(child, source, table);
            }
        }
    }
}

fn extract_statement(node: Node, source: &str, kind: ImportKind, table: &mut ImportTable) {
    let id = StatementId(table.statements.len());
    let range = node.start_byte()..node.end_byte();

    let module = match kind {
        ImportKind::Future => "__future__".to_string(),
        ImportKind::From => node
            .child_by_field_name("module_name")
            .and_then(|m| node_text(&m, source))
            .unwrap_or("")
            .to_string(),
        ImportKind::Plain => String::new(),
    };

    let mut binding_indices = Vec::new();

    // Named clauses: `a.b`, `x as y`.
    let mut cursor = node.walk();
    for clause in node.children_by_field_name("name", &mut cursor) {
        if let Some(binding) = parse_clause(&clause, source, kind, &module, id) {
            binding_indices.push(table.bindings.len());
            table.bindings.push(binding);
        }
    }

    // `from m import *` keeps the wildcard outside the name field.
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "wildcard_import" {
            let pos = child.start_position();
            binding_indices.push(table.bindings.len());
            table.bindings.push(ImportBinding {
                bound_name: "*".to_string(),
                origin_module: module.clone(),
                declared_name: "*".to_string(),
                is_star_import: true,
                is_reexport: false,
                statement: id,
                position: Position {
                    line: pos.row + 1,
                    column: pos.column,
                },
                offset: child.start_byte(),
                clause_range: child.start_byte()..child.end_byte(),
            });
        }
    }

    let trailing_comment = find_trailing_comment(source, range.end);
    let shares_line = detect_shared_line(source, &range);

    table.statements.push(ImportStatement {
        id,
        kind,
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
        range,
        binding_indices,
        trailing_comment,
        shares_line,
        sole_in_block: is_sole_in_block(node),
    });
}

/// Parse one name clause of an import statement into a binding.
fn parse_clause(
    clause: &Node,
    source: &str,
    kind: ImportKind,
    module: &str,
    statement: StatementId,
) -> Option<ImportBinding> {
    let clause_range = clause.start_byte()..clause.end_byte();

    match clause.kind() {
        "dotted_name" => {
            let declared = node_text(clause, source)?.to_string();
            // `import a.b` binds `a`; `from m import x` binds `x` whole.
            let bound = match kind {
                ImportKind::Plain => declared.split('.').next().unwrap_or("").to_string(),
                _ => declared.clone(),
            };
            let origin = match kind {
                ImportKind::Plain => declared.clone(),
                _ => module.to_string(),
            };
            let pos = clause.start_position();
            Some(ImportBinding {
                bound_name: bound,
                origin_module: origin,
                declared_name: declared,
                is_star_import: false,
                is_reexport: false,
                statement,
                position: Position {
                    line: pos.row + 1,
                    column: pos.column,
                },
                offset: clause.start_byte(),
                clause_range,
            })
        }
        "aliased_import" => {
            let name_node = clause.child_by_field_name("name")?;
            let alias_node = clause.child_by_field_name("alias")?;
            let declared = node_text(&name_node, source)?.to_string();
            let bound = node_text(&alias_node, source)?.to_string();
            let origin = match kind {
                ImportKind::Plain => declared.clone(),
                _ => module.to_string(),
            };
            let pos = alias_node.start_position();
            Some(ImportBinding {
                is_reexport: bound == declared,
                bound_name: bound,
                origin_module: origin,
                declared_name: declared,
                is_star_import: false,
                statement,
                position: Position {
                    line: pos.row + 1,
                    column: pos.column,
                },
                offset: alias_node.start_byte(),
                clause_range,
            })
        }
        _ => None,
    }
}

/// Scan for an inline `#` comment between the statement end and the newline.
fn find_trailing_comment(source: &str, stmt_end: usize) -> Option<Range<usize>> {
    let bytes = source.as_bytes();
    let mut i = stmt_end;

    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t' || bytes[i] == b';') {
        i += 1;
    }

    if i < bytes.len() && bytes[i] == b'#' {
        let end = source[i..]
            .find('\n')
            .map(|n| i + n)
            .unwrap_or(source.len());
        return Some(i..end);
    }

    None
}

/// True if non-whitespace code precedes the statement on its first line or
/// follows it (past a `;`) on its last line.
fn detect_shared_line(source: &str, range: &Range<usize>) -> bool {
    let bytes = source.as_bytes();

    let line_start = source[..range.start]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    if source[line_start..range.start]
        .bytes()
        .any(|b| b != b' ' && b != b'\t')
    {
        return true;
    }

    let mut i = range.end;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b';' {
        i += 1;
        while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
            i += 1;
        }
        if i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'#' {
            return true;
        }
    }

    false
}

/// True if the statement is the only statement of a suite, so that deleting
/// it would leave the enclosing block empty.
fn is_sole_in_block(node: Node) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    if parent.kind() != "block" {
        return false;
    }

    let mut cursor = parent.walk();
    parent
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .count()
        == 1
}
