//! Incremental vs. full reparse planning.
//!
//! A batch of LSP content changes is classified up front; only batches that
//! look safe for incremental application (small, range-addressed edits) skip
//! the full reparse. The incremental path is always validated against the
//! resulting tree before being trusted.

use crate::position::position_to_offset;
use crate::query::Grammar;
use tower_lsp_server::lsp_types::TextDocumentContentChangeEvent;
use tree_sitter::{InputEdit, Parser, Point, Tree};

/// Largest single edit span, in bytes, still eligible for incremental parse.
const MAX_INCREMENTAL_EDIT_BYTES: usize = 1000;

/// Largest change batch size still eligible for incremental parse.
const MAX_INCREMENTAL_BATCH_SIZE: usize = 5;

/// Outcome of an incremental-vs-full reparse attempt.
pub struct ReparseOutcome {
    pub tree: Tree,
    pub used_incremental: bool,
}

/// Decides whether `changes` are small enough to attempt an incremental
/// parse, given the document's content *before* the changes are applied.
#[must_use]
pub fn should_attempt_incremental(old_content: &str, changes: &[TextDocumentContentChangeEvent]) -> bool {
    if changes.is_empty() {
        return true;
    }
    if changes.len() > MAX_INCREMENTAL_BATCH_SIZE {
        return false;
    }
    for change in changes {
        let Some(range) = change.range else {
            return false;
        };
        let start = position_to_offset(old_content, range.start);
        let end = position_to_offset(old_content, range.end);
        let span = end.saturating_sub(start).max(change.text.len());
        if span >= MAX_INCREMENTAL_EDIT_BYTES {
            return false;
        }
    }
    true
}

/// Computes tree-sitter [`InputEdit`]s for `changes`, applying them to
/// `old_content` as we go so successive edits compute offsets against
/// whatever the document looked like at that point in the batch.
///
/// Returns the edits plus the final content string.
#[must_use]
pub fn compute_edits_and_apply(
    old_content: &str,
    changes: &[TextDocumentContentChangeEvent],
) -> (Vec<InputEdit>, String) {
    let mut content = old_content.to_string();
    let mut edits = Vec::with_capacity(changes.len());

    for change in changes {
        let Some(range) = change.range else {
            content = change.text.clone();
            continue;
        };
        let start_byte = position_to_offset(&content, range.start);
        let old_end_byte = position_to_offset(&content, range.end);
        let new_end_byte = start_byte + change.text.len();

        let start_position = byte_to_point(&content, start_byte);
        let old_end_position = byte_to_point(&content, old_end_byte);

        content.replace_range(start_byte..old_end_byte, &change.text);

        let new_end_position = byte_to_point(&content, new_end_byte);

        edits.push(InputEdit {
            start_byte,
            old_end_byte,
            new_end_byte,
            start_position,
            old_end_position,
            new_end_position,
        });
    }

    (edits, content)
}

fn byte_to_point(content: &str, offset: usize) -> Point {
    let clamped = offset.min(content.len());
    let line_start = content[..clamped].rfind('\n').map_or(0, |i| i + 1);
    let row = content[..clamped].matches('\n').count();
    Point {
        row,
        column: clamped - line_start,
    }
}

/// Applies `edits` to `old_tree`, reparses `new_content` using the edited
/// tree as a hint, and validates the result. Falls back to a clean full
/// parse when the incremental result fails validation.
pub fn reparse_incremental(
    parser: &mut Parser,
    old_tree: &Tree,
    edits: &[InputEdit],
    new_content: &str,
) -> ReparseOutcome {
    let mut edited = old_tree.clone();
    for edit in edits {
        edited.edit(edit);
    }

    if let Some(tree) = parser.parse(new_content, Some(&edited)) {
        if validate_tree(&tree, new_content) {
            return ReparseOutcome {
                tree,
                used_incremental: true,
            };
        }
    }

    let tree = parser
        .parse(new_content, None)
        .expect("a parser must always produce a tree for well-formed byte input");
    ReparseOutcome {
        tree,
        used_incremental: false,
    }
}

/// `true` when `tree`'s root spans all of `content` and contains no error
/// nodes; used to decide whether an incremental parse may be trusted.
#[must_use]
pub fn validate_tree(tree: &Tree, content: &str) -> bool {
    let root = tree.root_node();
    root.end_byte() == content.len() && !root.has_error()
}

/// Picks the grammar for a document based on its URI path.
#[must_use]
pub fn grammar_for_path(path: &str) -> Grammar {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".html") || lower.ends_with(".htm") {
        Grammar::Html
    } else {
        Grammar::TypeScript
    }
}
