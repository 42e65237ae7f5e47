//! Comment-line detection for edited lines.

use std::collections::BTreeSet;

use crate::signal::LineChange;

/// Tokens that introduce a comment line.
pub const COMMENT_PREFIXES: [&str; 3] = ["//", "/*", "#"];

/// Returns true if the trimmed line starts with a comment token.
pub fn is_comment_line(text: &str) -> bool {
    let trimmed = text.trim();
    COMMENT_PREFIXES
        .iter()
        .any(|prefix| trimmed.starts_with(prefix))
}

/// Set of line numbers that were edited into comments.
///
/// Keyed by line number, so repeated edits to one line count once and a line
/// stays counted after it stops being a comment.
#[derive(Debug, Clone, Default)]
pub struct CommentLines {
    lines: BTreeSet<u32>,
}

impl CommentLines {
    /// Records the change if it inserted text into a comment line.
    ///
    /// Returns true if the line was not counted before.
    pub fn observe(&mut self, change: &LineChange) -> bool {
        if !change.inserted_non_blank || !is_comment_line(&change.text) {
            return false;
        }
        self.lines.insert(change.line)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
