//! Usage resolution.
//!
//! Resolves every collected reference to the nearest binding along the
//! lexical parent chain and marks the import bindings that win at least one
//! lookup. Class scopes are skipped unless they are the reference's own
//! scope, matching Python's lexical scoping rules.

use super::imports::{ImportBinding, ImportTable};
use super::references::{CollectedReferences, Reference};
use super::scopes::{BindingKind, ScopeBinding, ScopeGraph, ScopeKind};

/// Usage verdict for one import binding.
#[derive(Debug, Clone)]
pub struct UsageResult {
    pub binding: ImportBinding,
    pub is_used: bool,
    /// References that resolved to this binding; empty when unused or when
    /// the binding is used by policy only.
    pub used_by: Vec<Reference>,
}

/// Resolve usage for every extracted import binding.
///
/// Results are returned in extraction order, one per binding. Star imports,
/// re-exports (redundant alias or `__all__` listing), and `__future__`
/// imports are always reported used regardless of reference count.
pub fn resolve_usage(
    table: &ImportTable,
    scopes: &ScopeGraph,
    collected: &CollectedReferences,
) -> Vec<UsageResult> {
    let mut used_by: Vec<Vec<Reference>> = vec![Vec::new(); table.bindings.len()];

    for reference in &collected.references {
        if let Some(idx) = resolve_reference(scopes, reference) {
            used_by[idx].push(reference.clone());
        }
    }

    table
        .bindings
        .iter()
        .zip(used_by)
        .map(|(binding, used_by)| {
            let mut binding = binding.clone();
            if collected.exported_names.contains(&binding.bound_name) {
                binding.is_reexport = true;
            }
            let policy_used = binding.is_star_import
                || binding.is_reexport
                || binding.origin_module == "__future__";
            let is_used = policy_used || !used_by.is_empty();
            UsageResult {
                binding,
                is_used,
                used_by,
            }
        })
        .collect()
}

/// Resolve one reference to an import binding index, if that is what the
/// nearest matching binding turns out to be.
fn resolve_reference(scopes: &ScopeGraph, reference: &Reference) -> Option<usize> {
    let mut current = Some(reference.scope);

    while let Some(scope) = current {
        let is_own_scope = scope == reference.scope;
        // class bodies do not contribute names to nested scopes
        let skip = scopes.kind(scope) == ScopeKind::Class && !is_own_scope;

        if !skip {
            if let Some(bindings) = scopes.bindings_of(scope, &reference.name) {
                if is_own_scope {
                    if let Some(result) = resolve_in_own_scope(bindings, reference.offset) {
                        return result;
                    }
                    // nothing bound at or before the reference yet; a later
                    // local binding does not capture the lookup, keep walking
                } else if !bindings.is_empty() {
                    // enclosing scopes are position-independent: their body
                    // has fully executed by the time a nested scope runs
                    return bindings.iter().rev().find_map(import_index);
                }
            }
        }

        current = scopes.parent(scope);
    }

    None
}

/// Within the reference's own scope, the latest binding at or before the
/// reference wins. A conditional non-import binding does not hide an
/// earlier import (fallback patterns like `except ImportError: json = None`).
///
/// Returns `None` to keep walking outward, `Some(None)` when the name
/// resolved to a local binding, `Some(Some(idx))` for an import.
fn resolve_in_own_scope(bindings: &[ScopeBinding], offset: usize) -> Option<Option<usize>> {
    let candidates: Vec<&ScopeBinding> =
        bindings.iter().filter(|b| b.offset <= offset).collect();
    let latest = candidates.last()?;

    match latest.kind {
        BindingKind::Import(idx) => Some(Some(idx)),
        _ if latest.conditional => {
            // fall back to the import this conditional binding may replace
            match candidates.iter().rev().find_map(|b| import_index(b)) {
                Some(idx) => Some(Some(idx)),
                None => Some(None),
            }
        }
        _ => Some(None),
    }
}

fn import_index(binding: &ScopeBinding) -> Option<usize> {
    match binding.kind {
        BindingKind::Import(idx) => Some(idx),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::imports::extract_imports;
    use crate::analysis::references::collect_references;
    use crate::analysis::scopes::build_scope_graph;
    use crate::parser::PythonParser;

    fn usages(source: &str) -> Vec<UsageResult> {
        let mut parser = PythonParser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        let table = extract_imports(&tree, source);
        let scopes = build_scope_graph(&tree, source, &table.bindings);
        let collected = collect_references(&tree, source);
        resolve_usage(&table, &scopes, &collected)
    }

    fn usage_of<'a>(results: &'a [UsageResult], name: &str) -> &'a UsageResult {
        results
            .iter()
            .find(|u| u.binding.bound_name == name)
            .unwrap_or_else(|| panic!("no binding named {}", name))
    }

    // ===== Basic Usage Tests =====

    #[test]
    fn test_used_and_unused_imports() {
        let results = usages("import os\nimport sys\nprint(sys.argv)\n");

        assert!(!usage_of(&results, "os").is_used);
        let sys = usage_of(&results, "sys");
        assert!(sys.is_used);
        assert_eq!(sys.used_by.len(), 1);
    }

    #[test]
    fn test_annotation_usage() {
        let results = usages("from typing import List, Dict\nx: List[int] = []\n");

        assert!(usage_of(&results, "List").is_used);
        assert!(!usage_of(&results, "Dict").is_used);
    }

    #[test]
    fn test_aliased_import_used_by_alias() {
        let results = usages("from collections import OrderedDict as OD\nd = OD()\n");

        assert!(usage_of(&results, "OD").is_used);
    }

    #[test]
    fn test_multiple_references_all_recorded() {
        let results = usages("import os\nprint(os.sep)\nprint(os.curdir)\n");

        assert_eq!(usage_of(&results, "os").used_by.len(), 2);
    }

    #[test]
    fn test_unresolved_names_are_not_errors() {
        let results = usages("import os\nprint(undefined_name)\n");

        assert!(!usage_of(&results, "os").is_used);
    }

    // ===== Shadowing Tests =====

    #[test]
    fn test_assignment_before_reference_shadows_import() {
        let results = usages("import os\nos = object()\nprint(os)\n");

        assert!(!usage_of(&results, "os").is_used);
    }

    #[test]
    fn test_reference_before_assignment_uses_import() {
        let results = usages("import os\nprint(os)\nos = object()\n");

        assert!(usage_of(&results, "os").is_used);
    }

    #[test]
    fn test_local_shadow_in_function_keeps_import_unused() {
        let source = "import json\ndef f():\n    json = {}\n    return json\n";
        let results = usages(source);

        assert!(!usage_of(&results, "json").is_used);
    }

    #[test]
    fn test_later_import_shadows_earlier_one() {
        let results = usages("import os\nimport os\nprint(os.sep)\n");

        // the reference resolves to the second binding; the first stays
        // an unused edit candidate
        assert!(!results[0].is_used);
        assert!(results[1].is_used);
    }

    #[test]
    fn test_conditional_reassignment_keeps_import_used() {
        let source =
            "try:\n    import json\nexcept ImportError:\n    json = None\nprint(json.dumps({}))\n";
        let results = usages(source);

        assert!(usage_of(&results, "json").is_used);
    }

    // ===== Scope Chain Tests =====

    #[test]
    fn test_nested_scope_reaches_module_import() {
        let source = "import os\ndef f():\n    def g():\n        return os.sep\n    return g\n";
        let results = usages(source);

        assert!(usage_of(&results, "os").is_used);
    }

    #[test]
    fn test_class_scope_skipped_for_nested_function() {
        let source = "import os\nclass C:\n    os = 1\n    def m(self):\n        return os.sep\n";
        let results = usages(source);

        // the method's lookup skips the class body and lands on the import
        assert!(usage_of(&results, "os").is_used);
    }

    #[test]
    fn test_class_body_reference_resolves_in_class_scope() {
        let source = "import abc\nclass C:\n    abc = 1\n    x = abc\n";
        let results = usages(source);

        assert!(!usage_of(&results, "abc").is_used);
    }

    #[test]
    fn test_function_level_import_used_locally() {
        let source = "def load():\n    import json\n    return json.loads\n";
        let results = usages(source);

        assert!(usage_of(&results, "json").is_used);
    }

    #[test]
    fn test_function_body_above_module_import_is_conservative() {
        let source = "def f():\n    return settings.DEBUG\nimport settings\n";
        let results = usages(source);

        // the function may run after the import completes
        assert!(usage_of(&results, "settings").is_used);
    }

    #[test]
    fn test_comprehension_body_usage() {
        let source = "from math import sqrt\nxs = [sqrt(i) for i in range(3)]\n";
        let results = usages(source);

        assert!(usage_of(&results, "sqrt").is_used);
    }

    #[test]
    fn test_comprehension_target_does_not_mark_import() {
        let source = "import i\nxs = [i for i in range(3)]\n";
        let results = usages(source);

        // every `i` inside the comprehension is the loop target
        assert!(!usage_of(&results, "i").is_used);
    }

    // ===== Policy Tests =====

    #[test]
    fn test_star_import_always_used() {
        let results = usages("from os.path import *\n");

        assert!(results[0].is_used);
        assert!(results[0].used_by.is_empty());
    }

    #[test]
    fn test_redundant_alias_always_used() {
        let results = usages("from .core import helper as helper\n");

        assert!(results[0].is_used);
    }

    #[test]
    fn test_dunder_all_marks_reexport() {
        let results = usages("from .core import helper\n__all__ = [\"helper\"]\n");

        let helper = usage_of(&results, "helper");
        assert!(helper.is_used);
        assert!(helper.binding.is_reexport);
    }

    #[test]
    fn test_future_import_always_used() {
        let results = usages("from __future__ import annotations\n");

        assert!(results[0].is_used);
    }

    #[test]
    fn test_string_annotation_marks_usage() {
        let source = "from typing import List\ndef f(x: \"List[int]\") -> None:\n    return x\n";
        let results = usages(source);

        assert!(usage_of(&results, "List").is_used);
    }
}
