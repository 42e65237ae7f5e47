//! Timeline merging.
//!
//! Collapses overlapping intervals into a minimal, chronologically ordered set
//! of disjoint spans so overlapping raw intervals are not double-counted.

use serde::Serialize;

use crate::types::{Category, TimeInterval};

/// A span of time that can be merged.
///
/// This trait allows merging raw [`TimeInterval`]s as well as already-merged
/// [`MergedSpan`]s.
pub trait Spanned {
    /// Inclusive start, in milliseconds since the Unix epoch.
    fn start_ms(&self) -> i64;

    /// Exclusive end, in milliseconds since the Unix epoch.
    fn end_ms(&self) -> i64;

    /// The activity category, if the span has a single one.
    fn category(&self) -> Option<Category>;

    fn workspace(&self) -> &str;

    fn language(&self) -> &str;
}

impl Spanned for TimeInterval {
    fn start_ms(&self) -> i64 {
        self.start
    }

    fn end_ms(&self) -> i64 {
        self.end
    }

    fn category(&self) -> Option<Category> {
        Some(self.category)
    }

    fn workspace(&self) -> &str {
        &self.workspace
    }

    fn language(&self) -> &str {
        &self.language
    }
}

/// A disjoint span of active time.
///
/// `workspace` and `language` come from the interval that last extended the
/// span. When sessions from two projects interleave, the earlier project's
/// share of the overlap is attributed to the later one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedSpan {
    pub start: i64,
    pub end: i64,
    pub workspace: String,
    pub language: String,
}

impl MergedSpan {
    pub const fn duration_ms(&self) -> i64 {
        self.end - self.start
    }

    fn open<S: Spanned>(span: &S) -> Self {
        Self {
            start: span.start_ms(),
            end: span.end_ms(),
            workspace: span.workspace().to_string(),
            language: span.language().to_string(),
        }
    }
}

impl Spanned for MergedSpan {
    fn start_ms(&self) -> i64 {
        self.start
    }

    fn end_ms(&self) -> i64 {
        self.end
    }

    fn category(&self) -> Option<Category> {
        None
    }

    fn workspace(&self) -> &str {
        &self.workspace
    }

    fn language(&self) -> &str {
        &self.language
    }
}

/// Half-open window `[from, until)` on interval start times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope {
    pub from: Option<i64>,
    pub until: Option<i64>,
}

impl Scope {
    /// The whole history.
    pub const ALL: Self = Self {
        from: None,
        until: None,
    };

    pub const fn between(from: i64, until: i64) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
        }
    }

    pub fn contains(&self, start: i64) -> bool {
        self.from.is_none_or(|from| start >= from) && self.until.is_none_or(|until| start < until)
    }
}

/// Merges the active intervals whose start falls in `scope`.
///
/// # Algorithm
///
/// 1. Drop `rest` intervals, intervals outside the scope, and intervals with
///    `end <= start`
/// 2. Sort by start (stable, so ties keep their input order)
/// 3. Sweep left to right: an interval starting strictly before the open
///    span's end extends it; otherwise the open span is closed
pub fn merge_timeline<S: Spanned>(items: &[S], scope: Scope) -> Vec<MergedSpan> {
    let mut sorted: Vec<&S> = items
        .iter()
        .filter(|s| s.category() != Some(Category::Rest))
        .filter(|s| s.end_ms() > s.start_ms())
        .filter(|s| scope.contains(s.start_ms()))
        .collect();
    sorted.sort_by_key(|s| s.start_ms());

    let mut merged: Vec<MergedSpan> = Vec::new();
    for span in sorted {
        if let Some(last) = merged.last_mut() {
            if span.start_ms() < last.end {
                if span.end_ms() > last.end {
                    last.end = span.end_ms();
                    span.workspace().clone_into(&mut last.workspace);
                    span.language().clone_into(&mut last.language);
                }
                continue;
            }
        }
        merged.push(MergedSpan::open(span));
    }
    merged
}

/// Total duration of a merged timeline.
pub fn total_duration_ms(spans: &[MergedSpan]) -> i64 {
    spans.iter().map(MergedSpan::duration_ms).sum()
}

/// Merges `items` in `scope` and returns the total active time.
pub fn active_time_ms<S: Spanned>(items: &[S], scope: Scope) -> i64 {
    total_duration_ms(&merge_timeline(items, scope))
}
