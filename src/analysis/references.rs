//! Reference collection.
//!
//! Walks every non-import expression and records each name lookup with its
//! enclosing scope. Two secondary contexts are covered: string literals in
//! annotation position are re-parsed best-effort as expressions, and
//! `__all__` assignments are gathered as re-export markers.
//!
//! The traversal enters scopes in the same depth-first pre-order the scope
//! builder creates them, so scope ids line up by construction.

use std::collections::HashSet;

use tree_sitter::{Node, Parser, Tree};

use super::imports::Position;
use super::scopes::ScopeId;
use crate::parser::node_text;

/// Where a reference occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceContext {
    /// A name in ordinary expression position.
    Expression,
    /// A name found inside a string-literal type annotation.
    StringAnnotation,
}

/// A single name lookup.
#[derive(Debug, Clone)]
pub struct Reference {
    pub name: String,
    /// The scope the lookup starts from.
    pub scope: ScopeId,
    pub context: ReferenceContext,
    pub position: Position,
    /// Byte offset of the lookup site, used for shadowing order.
    pub offset: usize,
}

/// Everything the collector produces for one source file.
#[derive(Debug, Default)]
pub struct CollectedReferences {
    pub references: Vec<Reference>,
    /// Names listed in `__all__`: imports matching these are re-exports.
    pub exported_names: HashSet<String>,
}

/// Hands out scope ids in the builder's creation order.
#[derive(Debug)]
struct ScopeCounter {
    next: usize,
}

impl Default for ScopeCounter {
    fn default() -> Self {
        // scope 0 is the module; children start at 1
        ScopeCounter { next: 1 }
    }
}

impl ScopeCounter {
    fn enter(&mut self) -> ScopeId {
        let id = ScopeId(self.next);
        self.next += 1;
        id
    }
}

/// Collect all references from a parsed module.
pub fn collect_references(tree: &Tree, source: &str) -> CollectedReferences {
    let mut collector = Collector {
        source,
        output: CollectedReferences::default(),
        counter: ScopeCounter::default(),
        annotation_parser: None,
    };
    collector.visit(tree.root_node(), ScopeId(0), false);
    collector.output
}

struct Collector<'a> {
    source: &'a str,
    output: CollectedReferences,
    counter: ScopeCounter,
    annotation_parser: Option<Parser>,
}

impl<'a> Collector<'a> {
    fn visit(&mut self, node: Node, scope: ScopeId, in_annotation: bool) {
        match node.kind() {
            "import_statement" | "import_from_statement" | "future_import_statement" => {}
            "identifier" => {
                self.record(node, scope, ReferenceContext::Expression);
            }
            "attribute" => {
                // `m.attr` uses `m`; the attribute name itself is not a lookup
                if let Some(object) = node.child_by_field_name("object") {
                    self.visit(object, scope, in_annotation);
                }
            }
            "member_type" => {
                // dotted annotations (`x: np.ndarray`) read only the base
                if let Some(base) = node.named_child(0) {
                    self.visit(base, scope, in_annotation);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value, scope, in_annotation);
                }
            }
            "function_definition" => {
                let inner = self.counter.enter();
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.visit_parameters(params, scope);
                }
                if let Some(rt) = node.child_by_field_name("return_type") {
                    self.visit(rt, scope, in_annotation);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, inner, false);
                }
            }
            "lambda" => {
                let inner = self.counter.enter();
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.visit_parameters(params, scope);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, inner, false);
                }
            }
            "class_definition" => {
                let inner = self.counter.enter();
                if let Some(bases) = node.child_by_field_name("superclasses") {
                    self.visit(bases, scope, in_annotation);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, inner, false);
                }
            }
            "list_comprehension" | "set_comprehension" | "dictionary_comprehension"
            | "generator_expression" => {
                self.visit_comprehension(node, scope);
            }
            "assignment" => {
                self.collect_dunder_all(node, scope);
                if let Some(t) = node.child_by_field_name("type") {
                    self.visit(t, scope, in_annotation);
                }
                if let Some(r) = node.child_by_field_name("right") {
                    self.visit(r, scope, false);
                }
                if let Some(l) = node.child_by_field_name("left") {
                    self.visit_target(l, scope);
                }
            }
            "augmented_assignment" => {
                self.collect_dunder_all(node, scope);
                // the target of `x += 1` is read before being rebound
                if let Some(l) = node.child_by_field_name("left") {
                    self.visit(l, scope, false);
                }
                if let Some(r) = node.child_by_field_name("right") {
                    self.visit(r, scope, false);
                }
            }
            "named_expression" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value, scope, in_annotation);
                }
            }
            "for_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.visit_target(left, scope);
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right, scope, false);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, scope, false);
                }
                let mut cursor = node.walk();
                for alt in node.children_by_field_name("alternative", &mut cursor) {
                    self.visit(alt, scope, false);
                }
            }
            "while_statement" | "if_statement" => {
                if let Some(cond) = node.child_by_field_name("condition") {
                    self.visit(cond, scope, false);
                }
                for field in ["consequence", "body"] {
                    if let Some(body) = node.child_by_field_name(field) {
                        self.visit(body, scope, false);
                    }
                }
                let mut cursor = node.walk();
                for alt in node.children_by_field_name("alternative", &mut cursor) {
                    self.visit(alt, scope, false);
                }
            }
            "except_clause" | "except_group_clause" => {
                self.visit_except(node, scope);
            }
            "as_pattern" => {
                if let Some(value) = node.named_child(0) {
                    self.visit(value, scope, in_annotation);
                }
            }
            "type" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit(child, scope, true);
                }
            }
            "string" => {
                self.visit_string(node, scope, in_annotation);
            }
            "global_statement" | "nonlocal_statement" | "comment" => {}
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit(child, scope, in_annotation);
                }
            }
        }
    }

    /// Mirrors the scope builder: parameter names are bindings, while
    /// annotations and defaults are expressions of the enclosing scope.
    fn visit_parameters(&mut self, params: Node, outer: ScopeId) {
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            match child.kind() {
                "default_parameter" => {
                    if let Some(value) = child.child_by_field_name("value") {
                        self.visit(value, outer, false);
                    }
                }
                "typed_parameter" => {
                    if let Some(ty) = child.child_by_field_name("type") {
                        self.visit(ty, outer, false);
                    }
                }
                "typed_default_parameter" => {
                    if let Some(ty) = child.child_by_field_name("type") {
                        self.visit(ty, outer, false);
                    }
                    if let Some(value) = child.child_by_field_name("value") {
                        self.visit(value, outer, false);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_comprehension(&mut self, node: Node, scope: ScopeId) {
        let inner = self.counter.enter();
        let mut first_clause = true;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "for_in_clause" => {
                    if let Some(left) = child.child_by_field_name("left") {
                        self.visit_target(left, inner);
                    }
                    let right_scope = if first_clause { scope } else { inner };
                    let mut c2 = child.walk();
                    for right in child.children_by_field_name("right", &mut c2) {
                        self.visit(right, right_scope, false);
                    }
                    first_clause = false;
                }
                "comment" => {}
                _ => self.visit(child, inner, false),
            }
        }
    }

    fn visit_except(&mut self, node: Node, scope: ScopeId) {
        let mut seen_type = false;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "block" => self.visit(child, scope, false),
                "as_pattern" => self.visit(child, scope, false),
                "comment" => {}
                "identifier" if seen_type => {}
                _ => {
                    self.visit(child, scope, false);
                    seen_type = true;
                }
            }
        }
    }

    /// Assignment targets bind rather than reference; only the object of an
    /// attribute or subscript target is read.
    fn visit_target(&mut self, node: Node, scope: ScopeId) {
        match node.kind() {
            "identifier" => {}
            "tuple_pattern" | "list_pattern" | "pattern_list" | "list_splat_pattern"
            | "dictionary_splat_pattern" | "parenthesized_expression" | "as_pattern_target" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit_target(child, scope);
                }
            }
            _ => self.visit(node, scope, false),
        }
    }

    fn visit_string(&mut self, node: Node, scope: ScopeId, in_annotation: bool) {
        let mut has_interpolation = false;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "interpolation" {
                has_interpolation = true;
                self.visit(child, scope, false);
            }
        }

        if in_annotation && !has_interpolation {
            self.collect_annotation_string(node, scope);
        }
    }

    /// Best-effort sub-parse of a string annotation. Failure to parse means
    /// "no references found in this string".
    fn collect_annotation_string(&mut self, string_node: Node, scope: ScopeId) {
        let content = string_content(string_node, self.source);
        if content.trim().is_empty() {
            return;
        }

        if self.annotation_parser.is_none() {
            let mut parser = Parser::new();
            if parser
                .set_language(&tree_sitter_python::LANGUAGE.into())
                .is_err()
            {
                return;
            }
            self.annotation_parser = Some(parser);
        }

        let Some(tree) = self
            .annotation_parser
            .as_mut()
            .and_then(|p| p.parse(&content, None))
        else {
            return;
        };

        let pos = string_node.start_position();
        let position = Position {
            line: pos.row + 1,
            column: pos.column,
        };
        self.collect_sub(
            tree.root_node(),
            &content,
            scope,
            position,
            string_node.start_byte(),
        );
    }

    fn collect_sub(
        &mut self,
        node: Node,
        content: &str,
        scope: ScopeId,
        position: Position,
        offset: usize,
    ) {
        match node.kind() {
            "identifier" => {
                if let Some(name) = node_text(&node, content) {
                    self.output.references.push(Reference {
                        name: name.to_string(),
                        scope,
                        context: ReferenceContext::StringAnnotation,
                        position,
                        offset,
                    });
                }
            }
            "attribute" => {
                if let Some(object) = node.child_by_field_name("object") {
                    self.collect_sub(object, content, scope, position, offset);
                }
            }
            "keyword_argument" => {
                if let Some(value) = node.child_by_field_name("value") {
                    self.collect_sub(value, content, scope, position, offset);
                }
            }
            "string" => {}
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.collect_sub(child, content, scope, position, offset);
                }
            }
        }
    }

    /// Gather `__all__ = [...]` / `__all__ += [...]` entries.
    fn collect_dunder_all(&mut self, node: Node, scope: ScopeId) {
        if scope != ScopeId(0) {
            return;
        }
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        if left.kind() != "identifier" || node_text(&left, self.source) != Some("__all__") {
            return;
        }
        let Some(right) = node.child_by_field_name("right") else {
            return;
        };

        collect_string_literals(right, self.source, &mut self.output.exported_names);
    }

    fn record(&mut self, node: Node, scope: ScopeId, context: ReferenceContext) {
        if let Some(name) = node_text(&node, self.source) {
            let pos = node.start_position();
            self.output.references.push(Reference {
                name: name.to_string(),
                scope,
                context,
                position: Position {
                    line: pos.row + 1,
                    column: pos.column,
                },
                offset: node.start_byte(),
            });
        }
    }
}

/// The literal content of a string node, without quotes or prefixes.
fn string_content(node: Node, source: &str) -> String {
    let mut content = String::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "string_content" {
            if let Some(text) = node_text(&child, source) {
                content.push_str(text);
            }
        }
    }
    content
}

fn collect_string_literals(node: Node, source: &str, out: &mut HashSet<String>) {
    if node.kind() == "string" {
        let content = string_content(node, source);
        if !content.is_empty() {
            out.insert(content);
        }
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_string_literals(child, source, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::PythonParser;

    fn collect(source: &str) -> CollectedReferences {
        let mut parser = PythonParser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        collect_references(&tree, source)
    }

    fn names(collected: &CollectedReferences) -> Vec<&str> {
        collected
            .references
            .iter()
            .map(|r| r.name.as_str())
            .collect()
    }

    // ===== Expression Context Tests =====

    #[test]
    fn test_attribute_base_counts_as_reference() {
        let collected = collect("import sys\nprint(sys.argv)\n");
        let names = names(&collected);

        assert!(names.contains(&"print"));
        assert!(names.contains(&"sys"));
        assert!(!names.contains(&"argv"));
    }

    #[test]
    fn test_chained_attribute_only_base() {
        let collected = collect("import os\nos.path.join(a, b)\n");
        let names = names(&collected);

        assert!(names.contains(&"os"));
        assert!(!names.contains(&"path"));
        assert!(!names.contains(&"join"));
    }

    #[test]
    fn test_keyword_argument_name_is_not_a_reference() {
        let collected = collect("f(timeout=retries)\n");
        let names = names(&collected);

        assert!(names.contains(&"f"));
        assert!(names.contains(&"retries"));
        assert!(!names.contains(&"timeout"));
    }

    #[test]
    fn test_assignment_target_is_not_a_reference() {
        let collected = collect("x = y\n");
        let names = names(&collected);

        assert!(!names.contains(&"x"));
        assert!(names.contains(&"y"));
    }

    #[test]
    fn test_augmented_target_is_a_reference() {
        let collected = collect("x += 1\n");

        assert!(names(&collected).contains(&"x"));
    }

    #[test]
    fn test_attribute_assignment_reads_object() {
        let collected = collect("cfg.value = 1\n");

        assert!(names(&collected).contains(&"cfg"));
    }

    #[test]
    fn test_fstring_interpolation() {
        let collected = collect("import sys\nprint(f\"argv: {sys.argv}\")\n");

        assert!(names(&collected).contains(&"sys"));
    }

    #[test]
    fn test_plain_string_yields_no_references() {
        let collected = collect("x = \"os.path\"\n");

        assert!(!names(&collected).contains(&"os"));
    }

    #[test]
    fn test_decorator_is_a_reference() {
        let collected = collect("@register\ndef f():\n    pass\n");

        assert!(names(&collected).contains(&"register"));
    }

    #[test]
    fn test_import_statements_yield_no_references() {
        let collected = collect("from typing import List\n");

        assert!(collected.references.is_empty());
    }

    // ===== Scope Attribution Tests =====

    #[test]
    fn test_reference_in_function_scope() {
        let collected = collect("import os\ndef f():\n    return os.sep\n");

        let os_ref = collected
            .references
            .iter()
            .find(|r| r.name == "os")
            .unwrap();
        assert_eq!(os_ref.scope, ScopeId(1));
    }

    #[test]
    fn test_leftmost_iterable_in_enclosing_scope() {
        let collected = collect("xs = [f(i) for i in items]\n");

        let items = collected
            .references
            .iter()
            .find(|r| r.name == "items")
            .unwrap();
        assert_eq!(items.scope, ScopeId(0));

        let f = collected.references.iter().find(|r| r.name == "f").unwrap();
        assert_eq!(f.scope, ScopeId(1));
    }

    #[test]
    fn test_default_value_in_enclosing_scope() {
        let collected = collect("def f(x=fallback):\n    return x\n");

        let fallback = collected
            .references
            .iter()
            .find(|r| r.name == "fallback")
            .unwrap();
        assert_eq!(fallback.scope, ScopeId(0));
    }

    // ===== String Annotation Tests =====

    #[test]
    fn test_string_annotation_references() {
        let collected = collect("def f(x: \"List[int]\") -> None:\n    return x\n");

        let list_ref = collected
            .references
            .iter()
            .find(|r| r.name == "List")
            .unwrap();
        assert_eq!(list_ref.context, ReferenceContext::StringAnnotation);
    }

    #[test]
    fn test_string_annotation_on_variable() {
        let collected = collect("value: \"Mapping[str, int]\" = {}\n");

        assert!(names(&collected).contains(&"Mapping"));
    }

    #[test]
    fn test_string_annotation_attribute_base() {
        let collected = collect("x: \"np.ndarray\" = make()\n");
        let names = names(&collected);

        assert!(names.contains(&"np"));
        assert!(!names.contains(&"ndarray"));
    }

    #[test]
    fn test_unparseable_annotation_string_is_ignored() {
        let collected = collect("x: \"not ( valid [\" = 1\n");

        // best-effort: no panic, whatever parsed is fine, `make` absent
        assert!(collected
            .references
            .iter()
            .all(|r| r.context == ReferenceContext::StringAnnotation || r.name != "x"));
    }

    #[test]
    fn test_nested_forward_reference() {
        let collected = collect("from typing import Optional\nx: Optional[\"Config\"] = None\n");
        let names = names(&collected);

        assert!(names.contains(&"Optional"));
        assert!(names.contains(&"Config"));
    }

    // ===== Re-export Marker Tests =====

    #[test]
    fn test_dunder_all_collects_names() {
        let collected = collect("__all__ = [\"helper\", \"Runner\"]\n");

        assert!(collected.exported_names.contains("helper"));
        assert!(collected.exported_names.contains("Runner"));
    }

    #[test]
    fn test_dunder_all_augmented() {
        let collected = collect("__all__ = [\"a\"]\n__all__ += [\"b\"]\n");

        assert!(collected.exported_names.contains("a"));
        assert!(collected.exported_names.contains("b"));
    }

    #[test]
    fn test_dunder_all_only_at_module_level() {
        let collected = collect("def f():\n    __all__ = [\"x\"]\n");

        assert!(collected.exported_names.is_empty());
    }
}
