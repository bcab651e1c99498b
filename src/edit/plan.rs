//! Edit planning for unused import removal.
//!
//! Converts the unused bindings of one analysis run into a minimal,
//! syntax-preserving removal plan: whole statements where every bound name
//! is unused, single-name excisions otherwise. Plan entries follow original
//! statement order; application proceeds bottom-to-top so earlier offsets
//! stay valid.

use std::collections::HashSet;
use std::ops::Range;

use crate::analysis::imports::{ImportStatement, ImportTable, StatementId};
use crate::analysis::usage::UsageResult;

/// The removal action for one plan entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditAction {
    /// Delete the entire import statement.
    RemoveWholeStatement,
    /// Remove a single bound name from a multi-name statement.
    RemoveNameFromStatement(String),
}

/// One planned edit.
#[derive(Debug, Clone)]
pub struct PlannedEdit {
    pub statement: StatementId,
    pub action: EditAction,
    /// The text that replaces `removal_range`. Empty for deletions; for
    /// single-name removals this is the statement with every planned name
    /// of that statement excised.
    pub resulting_text: String,
    /// Byte span of the source text the edit replaces.
    pub removal_range: Range<usize>,
}

/// Non-fatal condition attached to a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditWarning {
    pub statement: StatementId,
    pub message: String,
}

/// Ordered removal plan for one source file.
#[derive(Debug, Clone, Default)]
pub struct EditPlan {
    pub entries: Vec<PlannedEdit>,
    pub warnings: Vec<EditWarning>,
}

impl EditPlan {
    /// True if the plan removes nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of plan entries.
    pub fn removal_count(&self) -> usize {
        self.entries.len()
    }
}

/// Plan removal edits for the unused bindings of an analysis run.
///
/// `usages` must be in extraction order (one entry per binding, as produced
/// by the usage resolver). Names in `exempt` are never removed.
pub fn plan_edits(
    table: &ImportTable,
    usages: &[UsageResult],
    source: &str,
    exempt: &HashSet<String>,
) -> EditPlan {
    let mut plan = EditPlan::default();

    for stmt in &table.statements {
        let removable: Vec<usize> = stmt
            .binding_indices
            .iter()
            .copied()
            .filter(|&i| {
                let usage = &usages[i];
                !usage.is_used
                    && !usage.binding.is_star_import
                    && !exempt.contains(&usage.binding.bound_name)
            })
            .collect();

        if removable.is_empty() {
            continue;
        }

        if removable.len() == stmt.binding_indices.len() {
            plan_whole_statement(stmt, source, &mut plan);
        } else {
            plan_name_removals(table, stmt, &removable, source, &mut plan);
        }
    }

    plan
}

fn plan_whole_statement(stmt: &ImportStatement, source: &str, plan: &mut EditPlan) {
    if stmt.sole_in_block || starts_inline_suite(source, stmt.range.start) {
        // deleting the only statement of a suite would leave it empty
        plan.entries.push(PlannedEdit {
            statement: stmt.id,
            action: EditAction::RemoveWholeStatement,
            resulting_text: "pass".to_string(),
            removal_range: stmt.range.clone(),
        });
        return;
    }

    let removal_range = if stmt.shares_line {
        spliced_statement_range(source, &stmt.range)
    } else {
        if stmt.trailing_comment.is_some() {
            plan.warnings.push(EditWarning {
                statement: stmt.id,
                message: "inline comment dropped with removed import statement".to_string(),
            });
        }
        full_line_range(source, &stmt.range)
    };

    plan.entries.push(PlannedEdit {
        statement: stmt.id,
        action: EditAction::RemoveWholeStatement,
        resulting_text: String::new(),
        removal_range,
    });
}

fn plan_name_removals(
    table: &ImportTable,
    stmt: &ImportStatement,
    removable: &[usize],
    source: &str,
    plan: &mut EditPlan,
) {
    let stmt_text = &source[stmt.range.clone()];

    // clause spans relative to the statement, removed back to front
    let mut clause_ranges: Vec<Range<usize>> = removable
        .iter()
        .map(|&i| {
            let clause = &table.bindings[i].clause_range;
            clause.start - stmt.range.start..clause.end - stmt.range.start
        })
        .collect();
    clause_ranges.sort_by(|a, b| b.start.cmp(&a.start));

    let mut new_text = stmt_text.to_string();
    for clause in &clause_ranges {
        remove_clause(&mut new_text, clause);
    }

    for &i in removable {
        plan.entries.push(PlannedEdit {
            statement: stmt.id,
            action: EditAction::RemoveNameFromStatement(table.bindings[i].bound_name.clone()),
            resulting_text: new_text.clone(),
            removal_range: stmt.range.clone(),
        });
    }
}

/// Excise one name clause plus one adjacent comma, preserving the
/// formatting of the remaining names.
fn remove_clause(text: &mut String, clause: &Range<usize>) {
    let bytes = text.as_bytes();
    let mut start = clause.start;
    let mut end = clause.end;

    // prefer the comma after the clause
    let mut i = end;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b',' {
        end = i + 1;
        while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
            end += 1;
        }
    } else {
        // fall back to the comma before it
        let mut j = start;
        while j > 0 && (bytes[j - 1] == b' ' || bytes[j - 1] == b'\t') {
            j -= 1;
        }
        if j > 0 && bytes[j - 1] == b',' {
            start = j - 1;
        }
    }

    // a clause alone on an interior line takes the whole line with it
    let line_start = text[..start].rfind('\n').map(|n| n + 1);
    let line_end = text[end..].find('\n').map(|n| end + n);
    if let (Some(ls), Some(le)) = (line_start, line_end) {
        let before_blank = text[ls..start].bytes().all(|b| b == b' ' || b == b'\t');
        let after_blank = text[end..le].bytes().all(|b| b == b' ' || b == b'\t');
        if before_blank && after_blank {
            start = ls;
            end = le + 1;
        }
    }

    text.replace_range(start..end, "");
}

/// True when the statement is the inline suite of a compound statement
/// (`def f(): import os`), where splicing it out would orphan the colon.
fn starts_inline_suite(source: &str, stmt_start: usize) -> bool {
    source[..stmt_start]
        .trim_end_matches([' ', '\t'])
        .ends_with(':')
}

/// Expand a statement span to cover its full lines, including the trailing
/// newline and any inline comment.
fn full_line_range(source: &str, range: &Range<usize>) -> Range<usize> {
    let start = source[..range.start]
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    let end = source[range.end..]
        .find('\n')
        .map(|i| range.end + i + 1)
        .unwrap_or(source.len());
    start..end
}

/// Expand a `;`-joined statement span to swallow one adjacent separator.
fn spliced_statement_range(source: &str, range: &Range<usize>) -> Range<usize> {
    let bytes = source.as_bytes();

    let mut end = range.end;
    while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b';' {
        end += 1;
        while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
            end += 1;
        }
        return range.start..end;
    }

    let mut start = range.start;
    while start > 0 && (bytes[start - 1] == b' ' || bytes[start - 1] == b'\t') {
        start -= 1;
    }
    if start > 0 && bytes[start - 1] == b';' {
        start -= 1;
    }
    start..range.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::imports::extract_imports;
    use crate::analysis::references::collect_references;
    use crate::analysis::scopes::build_scope_graph;
    use crate::analysis::usage::resolve_usage;
    use crate::parser::PythonParser;

    fn plan(source: &str) -> EditPlan {
        plan_with_exempt(source, &HashSet::new())
    }

    fn plan_with_exempt(source: &str, exempt: &HashSet<String>) -> EditPlan {
        let mut parser = PythonParser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        let table = extract_imports(&tree, source);
        let scopes = build_scope_graph(&tree, source, &table.bindings);
        let collected = collect_references(&tree, source);
        let usages = resolve_usage(&table, &scopes, &collected);
        plan_edits(&table, &usages, source, exempt)
    }

    // ===== Whole Statement Removal =====

    #[test]
    fn test_remove_whole_statement() {
        let plan = plan("import os\nimport sys\nprint(sys.argv)\n");

        assert_eq!(plan.entries.len(), 1);
        let edit = &plan.entries[0];
        assert_eq!(edit.action, EditAction::RemoveWholeStatement);
        assert_eq!(edit.resulting_text, "");
        assert_eq!(edit.removal_range, 0..10);
    }

    #[test]
    fn test_all_names_unused_removes_statement() {
        let plan = plan("from typing import List, Dict\n");

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].action, EditAction::RemoveWholeStatement);
    }

    #[test]
    fn test_comment_dropped_with_statement_warns() {
        let plan = plan("import os  # needed later?\n");

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].statement, plan.entries[0].statement);
    }

    #[test]
    fn test_sole_statement_in_block_becomes_pass() {
        let plan = plan("def f():\n    import os\n");

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].resulting_text, "pass");
    }

    #[test]
    fn test_inline_suite_becomes_pass() {
        let plan = plan("def f(): import os\n");

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].resulting_text, "pass");
    }

    // ===== Single Name Removal =====

    #[test]
    fn test_remove_one_name_preserves_rest() {
        let source = "from typing import List, Dict\nx: List[int] = []\n";
        let plan = plan(source);

        assert_eq!(plan.entries.len(), 1);
        let edit = &plan.entries[0];
        assert_eq!(
            edit.action,
            EditAction::RemoveNameFromStatement("Dict".to_string())
        );
        assert_eq!(edit.resulting_text, "from typing import List");
    }

    #[test]
    fn test_remove_first_name_of_plain_import() {
        let plan = plan("import os, sys\nprint(sys.path)\n");

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].resulting_text, "import sys");
    }

    #[test]
    fn test_remove_middle_name() {
        let source = "from typing import List, Dict, Set\nx: List[int] = []\ny: Set[int] = set()\n";
        let plan = plan(source);

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].resulting_text, "from typing import List, Set");
    }

    #[test]
    fn test_two_removals_share_resulting_text() {
        let source = "from typing import List, Dict, Set\nx: List[int] = []\n";
        let plan = plan(source);

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].resulting_text, "from typing import List");
        assert_eq!(plan.entries[1].resulting_text, "from typing import List");
    }

    #[test]
    fn test_partial_removal_keeps_inline_comment() {
        let source = "from typing import List, Dict  # typing helpers\nx: List[int] = []\n";
        let plan = plan(source);

        assert!(plan.warnings.is_empty());
        // the comment sits outside the statement span and is untouched
        assert_eq!(plan.entries[0].resulting_text, "from typing import List");
    }

    #[test]
    fn test_aliased_clause_removed_entirely() {
        let source = "from collections import deque, OrderedDict as OD\nq = deque()\n";
        let plan = plan(source);

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(
            plan.entries[0].action,
            EditAction::RemoveNameFromStatement("OD".to_string())
        );
        assert_eq!(
            plan.entries[0].resulting_text,
            "from collections import deque"
        );
    }

    #[test]
    fn test_multiline_removal_takes_whole_line() {
        let source = "from typing import (\n    List,\n    Dict,\n)\nx: List[int] = []\n";
        let plan = plan(source);

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(
            plan.entries[0].resulting_text,
            "from typing import (\n    List,\n)"
        );
    }

    // ===== Policy and Ordering =====

    #[test]
    fn test_exempt_names_are_kept() {
        let mut exempt = HashSet::new();
        exempt.insert("os".to_string());
        let plan = plan_with_exempt("import os\nimport sys\n", &exempt);

        assert_eq!(plan.entries.len(), 1);
        assert!(matches!(
            plan.entries[0].action,
            EditAction::RemoveWholeStatement
        ));
        assert_eq!(plan.entries[0].removal_range.start, 10);
    }

    #[test]
    fn test_star_import_never_planned() {
        let plan = plan("from os.path import *\n");

        assert!(plan.is_empty());
    }

    #[test]
    fn test_entries_follow_statement_order() {
        let plan = plan("import os\nimport sys\nimport json\n");

        assert_eq!(plan.entries.len(), 3);
        let starts: Vec<usize> = plan.entries.iter().map(|e| e.removal_range.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_used_imports_produce_no_entries() {
        let plan = plan("import sys\nprint(sys.argv)\n");

        assert!(plan.is_empty());
        assert_eq!(plan.removal_count(), 0);
    }

    #[test]
    fn test_semicolon_joined_statement_spliced() {
        let source = "import os; x = 1\n";
        let plan = plan(source);

        assert_eq!(plan.entries.len(), 1);
        let range = &plan.entries[0].removal_range;
        assert_eq!(&source[range.clone()], "import os; ");
    }
}
