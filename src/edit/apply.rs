//! Applying an edit plan to source text.
//!
//! Statements are rewritten bottom-to-top so earlier byte offsets stay
//! valid. Adjacent whole-statement deletions (`;`-joined imports) may
//! produce overlapping spans; those are merged before application.

use std::collections::HashSet;
use std::ops::Range;

use super::plan::EditPlan;

/// Apply every edit of a plan to the source text, returning the new text.
///
/// Each statement is rewritten at most once: the per-name entries of a
/// multi-name statement all carry the statement's final text.
pub fn apply_edits(source: &str, plan: &EditPlan) -> String {
    let mut seen = HashSet::new();
    let mut deletions: Vec<Range<usize>> = Vec::new();
    let mut replacements: Vec<(Range<usize>, &str)> = Vec::new();

    for edit in &plan.entries {
        if !seen.insert(edit.statement) {
            continue;
        }
        let range = clamp(&edit.removal_range, source.len());
        if edit.resulting_text.is_empty() {
            deletions.push(range);
        } else {
            replacements.push((range, &edit.resulting_text));
        }
    }

    let mut edits: Vec<(Range<usize>, &str)> = merge_deletions(deletions)
        .into_iter()
        .map(|r| (r, ""))
        .chain(replacements)
        .collect();
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));

    let mut result = source.to_string();
    for (range, text) in edits {
        result.replace_range(range, text);
    }
    result
}

fn clamp(range: &Range<usize>, len: usize) -> Range<usize> {
    range.start.min(len)..range.end.min(len)
}

/// Merge overlapping or touching deletion spans into one.
fn merge_deletions(mut spans: Vec<Range<usize>>) -> Vec<Range<usize>> {
    spans.sort_by_key(|r| r.start);

    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => {
                last.end = last.end.max(span.end);
            }
            _ => merged.push(span),
        }
    }
    merged
}
