//! Scope graph construction.
//!
//! A single top-down traversal produces an arena of scope records, each
//! linked to its parent by index, with every binding registered into the
//! nearest enclosing scope at its point of definition. Parent links are
//! handles rather than owning references, so lookup can walk the chain
//! without any cyclic ownership.

use std::collections::HashMap;

use tree_sitter::{Node, Tree};

use super::imports::ImportBinding;
use crate::parser::node_text;

/// Handle to a scope in the arena. The module scope is always index 0;
/// ids are assigned in depth-first pre-order of the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub(crate) usize);

/// The lexical kind of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Class,
    Comprehension,
}

/// What introduced a binding into its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// An import binding; carries the index into the extracted import list.
    Import(usize),
    Assignment,
    FunctionDef,
    ClassDef,
    Parameter,
    ComprehensionTarget,
    LoopTarget,
    ExceptName,
    WithTarget,
}

/// A single name binding registered in a scope.
#[derive(Debug, Clone)]
pub struct ScopeBinding {
    pub kind: BindingKind,
    /// Byte offset of the binding site, used for shadowing order.
    pub offset: usize,
    /// True if the binding sits under a branch, loop, or try block within
    /// its scope. Conditional non-import bindings do not hide an earlier
    /// import during resolution (fallback-import patterns).
    pub conditional: bool,
}

/// One lexical scope: kind, parent handle, and bindings by name in
/// source order.
#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    bindings: HashMap<String, Vec<ScopeBinding>>,
}

/// Arena of scope records for one source file.
#[derive(Debug)]
pub struct ScopeGraph {
    scopes: Vec<Scope>,
}

impl ScopeGraph {
    /// Handle of the module scope.
    pub fn module() -> ScopeId {
        ScopeId(0)
    }

    /// Number of scopes in the graph.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Returns true if the graph holds no scopes (never the case after a
    /// build, which always creates the module scope).
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn kind(&self, id: ScopeId) -> ScopeKind {
        self.scopes[id.0].kind
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scopes[id.0].parent
    }

    /// The bindings a scope holds for a name, in source order.
    pub fn bindings_of(&self, id: ScopeId, name: &str) -> Option<&[ScopeBinding]> {
        self.scopes[id.0].bindings.get(name).map(|v| v.as_slice())
    }

    fn push(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent,
            bindings: HashMap::new(),
        });
        id
    }

    fn register(&mut self, scope: ScopeId, name: &str, binding: ScopeBinding) {
        self.scopes[scope.0]
            .bindings
            .entry(name.to_string())
            .or_default()
            .push(binding);
    }
}

/// Build the scope graph for a parsed module.
///
/// `imports` must be the bindings extracted from the same tree; they are
/// matched by binding-site offset so scope lookups can resolve straight to
/// an import index.
pub fn build_scope_graph(tree: &Tree, source: &str, imports: &[ImportBinding]) -> ScopeGraph {
    let import_by_offset: HashMap<usize, usize> = imports
        .iter()
        .enumerate()
        .filter(|(_, b)| !b.is_star_import)
        .map(|(i, b)| (b.offset, i))
        .collect();

    let mut builder = Builder {
        graph: ScopeGraph { scopes: Vec::new() },
        source,
        import_by_offset,
        imports,
    };

    let module = builder.graph.push(ScopeKind::Module, None);
    builder.visit(tree.root_node(), module, false);
    builder.graph
}

struct Builder<'a> {
    graph: ScopeGraph,
    source: &'a str,
    import_by_offset: HashMap<usize, usize>,
    imports: &'a [ImportBinding],
}

impl<'a> Builder<'a> {
    fn visit(&mut self, node: Node, scope: ScopeId, conditional: bool) {
        match node.kind() {
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                self.register_imports(node, scope, conditional);
            }
            "function_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(scope, name, BindingKind::FunctionDef, conditional);
                }
                let inner = self.graph.push(ScopeKind::Function, Some(scope));
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.visit_parameters(params, inner, scope, conditional);
                }
                if let Some(rt) = node.child_by_field_name("return_type") {
                    self.visit(rt, scope, conditional);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, inner, false);
                }
            }
            "lambda" => {
                let inner = self.graph.push(ScopeKind::Function, Some(scope));
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.visit_parameters(params, inner, scope, conditional);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, inner, false);
                }
            }
            "class_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(scope, name, BindingKind::ClassDef, conditional);
                }
                let inner = self.graph.push(ScopeKind::Class, Some(scope));
                if let Some(bases) = node.child_by_field_name("superclasses") {
                    self.visit(bases, scope, conditional);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, inner, false);
                }
            }
            "list_comprehension" | "set_comprehension" | "dictionary_comprehension"
            | "generator_expression" => {
                self.visit_comprehension(node, scope, conditional);
            }
            "assignment" => {
                if let Some(t) = node.child_by_field_name("type") {
                    self.visit(t, scope, conditional);
                }
                if let Some(r) = node.child_by_field_name("right") {
                    self.visit(r, scope, conditional);
                }
                if let Some(l) = node.child_by_field_name("left") {
                    self.bind_target(l, scope, BindingKind::Assignment, conditional);
                }
            }
            "augmented_assignment" => {
                if let Some(l) = node.child_by_field_name("left") {
                    self.bind_target(l, scope, BindingKind::Assignment, conditional);
                }
                if let Some(r) = node.child_by_field_name("right") {
                    self.visit(r, scope, conditional);
                }
            }
            "named_expression" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(scope, name, BindingKind::Assignment, conditional);
                }
                if let Some(value) = node.child_by_field_name("value") {
                    self.visit(value, scope, conditional);
                }
            }
            "for_statement" => {
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind_target(left, scope, BindingKind::LoopTarget, true);
                }
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right, scope, conditional);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, scope, true);
                }
                let mut cursor = node.walk();
                for alt in node.children_by_field_name("alternative", &mut cursor) {
                    self.visit(alt, scope, true);
                }
            }
            "while_statement" => {
                if let Some(cond) = node.child_by_field_name("condition") {
                    self.visit(cond, scope, conditional);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body, scope, true);
                }
                let mut cursor = node.walk();
                for alt in node.children_by_field_name("alternative", &mut cursor) {
                    self.visit(alt, scope, true);
                }
            }
            "if_statement" => {
                if let Some(cond) = node.child_by_field_name("condition") {
                    self.visit(cond, scope, conditional);
                }
                if let Some(cons) = node.child_by_field_name("consequence") {
                    self.visit(cons, scope, true);
                }
                let mut cursor = node.walk();
                for alt in node.children_by_field_name("alternative", &mut cursor) {
                    self.visit(alt, scope, true);
                }
            }
            "try_statement" | "match_statement" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit(child, scope, true);
                }
            }
            "except_clause" | "except_group_clause" => {
                self.visit_except(node, scope);
            }
            "as_pattern" => {
                if let Some(value) = node.named_child(0) {
                    self.visit(value, scope, conditional);
                }
                if let Some(alias) = node.child_by_field_name("alias") {
                    self.bind_target(alias, scope, BindingKind::WithTarget, conditional);
                }
            }
            "global_statement" | "nonlocal_statement" | "comment" => {}
            _ => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.visit(child, scope, conditional);
                }
            }
        }
    }

    fn register_imports(&mut self, node: Node, scope: ScopeId, conditional: bool) {
        let mut cursor = node.walk();
        for clause in node.children_by_field_name("name", &mut cursor) {
            let offset = match clause.kind() {
                "dotted_name" => clause.start_byte(),
                "aliased_import" => match clause.child_by_field_name("alias") {
                    Some(alias) => alias.start_byte(),
                    None => continue,
                },
                _ => continue,
            };
            if let Some(&idx) = self.import_by_offset.get(&offset) {
                let name = self.imports[idx].bound_name.clone();
                self.graph.register(
                    scope,
                    &name,
                    ScopeBinding {
                        kind: BindingKind::Import(idx),
                        offset,
                        conditional,
                    },
                );
            }
        }
    }

    /// Parameters bind in the function scope; their annotations and default
    /// values belong to the enclosing scope.
    fn visit_parameters(
        &mut self,
        params: Node,
        inner: ScopeId,
        outer: ScopeId,
        conditional: bool,
    ) {
        let mut cursor = params.walk();
        for child in params.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => {
                    self.bind(inner, child, BindingKind::Parameter, false);
                }
                "default_parameter" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        self.bind_target(name, inner, BindingKind::Parameter, false);
                    }
                    if let Some(value) = child.child_by_field_name("value") {
                        self.visit(value, outer, conditional);
                    }
                }
                "typed_parameter" => {
                    if let Some(name) = child.named_child(0) {
                        self.bind_target(name, inner, BindingKind::Parameter, false);
                    }
                    if let Some(ty) = child.child_by_field_name("type") {
                        self.visit(ty, outer, conditional);
                    }
                }
                "typed_default_parameter" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        self.bind_target(name, inner, BindingKind::Parameter, false);
                    }
                    if let Some(ty) = child.child_by_field_name("type") {
                        self.visit(ty, outer, conditional);
                    }
                    if let Some(value) = child.child_by_field_name("value") {
                        self.visit(value, outer, conditional);
                    }
                }
                "list_splat_pattern" | "dictionary_splat_pattern" | "tuple_pattern" => {
                    self.bind_target(child, inner, BindingKind::Parameter, false);
                }
                _ => {}
            }
        }
    }

    fn visit_comprehension(&mut self, node: Node, scope: ScopeId, conditional: bool) {
        let inner = self.graph.push(ScopeKind::Comprehension, Some(scope));
        // Targets are visible to the whole comprehension, including the
        // body that precedes them textually.
        let comp_start = node.start_byte();

        let mut first_clause = true;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "for_in_clause" => {
                    if let Some(left) = child.child_by_field_name("left") {
                        self.bind_target_at(
                            left,
                            inner,
                            BindingKind::ComprehensionTarget,
                            conditional,
                            comp_start,
                        );
                    }
                    // The leftmost iterable is evaluated in the enclosing
                    // scope; everything after belongs to the comprehension.
                    let right_scope = if first_clause { scope } else { inner };
                    let mut c2 = child.walk();
                    for right in child.children_by_field_name("right", &mut c2) {
                        self.visit(right, right_scope, conditional);
                    }
                    first_clause = false;
                }
                "comment" => {}
                _ => self.visit(child, inner, conditional),
            }
        }
    }

    fn visit_except(&mut self, node: Node, scope: ScopeId) {
        let mut seen_type = false;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "block" => self.visit(child, scope, true),
                "as_pattern" => self.visit(child, scope, true),
                "comment" => {}
                "identifier" if seen_type => {
                    self.bind(scope, child, BindingKind::ExceptName, true);
                }
                _ => {
                    self.visit(child, scope, true);
                    seen_type = true;
                }
            }
        }
    }

    /// Register bindings for an assignment-like target. Attribute and
    /// subscript targets mutate an existing object rather than binding a
    /// name, so only their inner expressions are walked.
    fn bind_target(&mut self, node: Node, scope: ScopeId, kind: BindingKind, conditional: bool) {
        self.bind_target_at(node, scope, kind, conditional, node.start_byte());
    }

    fn bind_target_at(
        &mut self,
        node: Node,
        scope: ScopeId,
        kind: BindingKind,
        conditional: bool,
        offset: usize,
    ) {
        match node.kind() {
            "identifier" => {
                if let Some(name) = node_text(&node, self.source) {
                    self.graph.register(
                        scope,
                        name,
                        ScopeBinding {
                            kind,
                            offset,
                            conditional,
                        },
                    );
                }
            }
            "tuple_pattern" | "list_pattern" | "pattern_list" | "list_splat_pattern"
            | "dictionary_splat_pattern" | "parenthesized_expression" | "as_pattern_target" => {
                let mut cursor = node.walk();
                for child in node.named_children(&mut cursor) {
                    self.bind_target_at(child, scope, kind, conditional, child.start_byte());
                }
            }
            _ => {
                // attribute / subscript targets: walk for nested scopes
                self.visit(node, scope, conditional);
            }
        }
    }

    fn bind(&mut self, scope: ScopeId, name_node: Node, kind: BindingKind, conditional: bool) {
        if let Some(name) = node_text(&name_node, self.source) {
            self.graph.register(
                scope,
                name,
                ScopeBinding {
                    kind,
                    offset: name_node.start_byte(),
                    conditional,
                },
            );
        }
    }
}
