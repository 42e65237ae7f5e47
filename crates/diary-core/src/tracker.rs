//! Tracker facade: feeds host signals to the classifier and persists its
//! output.

use crate::classifier::{Classifier, ClassifierConfig, ClassifierState, Signal};
use crate::comments::CommentLines;
use crate::signal::{HostEvent, HostEventKind};
use crate::store::{Snapshot, Store, keys};
use crate::types::{ErrorEvent, TimeInterval};

/// Owns the live classifier and the store it appends to.
///
/// Signals must be delivered one at a time, in order.
#[derive(Debug)]
pub struct Tracker<S: Store> {
    store: S,
    classifier: Classifier,
    comments: CommentLines,
    /// Comment-line count persisted before this session started.
    comment_base: i64,
    commits: i64,
}

impl<S: Store> Tracker<S> {
    /// Creates a tracker, loading the persisted counters from `store`.
    pub fn open(store: S, config: ClassifierConfig) -> Result<Self, S::Error> {
        let commits = store.load_counter(keys::COMMITS)?;
        let comment_base = store.load_counter(keys::COMMENT_LINES)?;
        Ok(Self {
            store,
            classifier: Classifier::new(config),
            comments: CommentLines::default(),
            comment_base,
            commits,
        })
    }

    /// Handles one host signal received at `now`.
    pub fn handle(&mut self, event: &HostEvent, now: i64) -> Result<(), S::Error> {
        match &event.kind {
            HostEventKind::Focus { focused } => {
                self.classify(&Signal::FocusChanged { focused: *focused }, now)?;
            }
            HostEventKind::TextEdit {
                language,
                workspace,
                changes,
            } => {
                if self.classifier.state().window_focused {
                    let mut added = false;
                    for change in changes {
                        added |= self.comments.observe(change);
                    }
                    if added {
                        self.store
                            .store_counter(keys::COMMENT_LINES, self.comment_line_count())?;
                    }
                }
                self.classify(
                    &Signal::TextChanged {
                        language: language.clone(),
                        workspace: workspace.clone(),
                    },
                    now,
                )?;
            }
            HostEventKind::DebugStart => self.classify(&Signal::DebugStarted, now)?,
            HostEventKind::DebugEnd => self.classify(&Signal::DebugEnded, now)?,
            HostEventKind::DebugStderr {
                message,
                language,
                workspace,
            } => {
                self.advance(now)?;
                let state = self.classifier.state();
                let error = ErrorEvent {
                    timestamp: now,
                    message: message.clone(),
                    language: non_empty_or(language.as_deref(), &state.last_language),
                    workspace: non_empty_or(workspace.as_deref(), &state.last_workspace),
                };
                tracing::debug!(workspace = %error.workspace, "recording debug stderr");
                self.store.append_to_list(keys::ERRORS, &error)?;
            }
            HostEventKind::GitCommit => {
                self.advance(now)?;
                self.commits += 1;
                self.store.store_counter(keys::COMMITS, self.commits)?;
            }
        }
        Ok(())
    }

    /// Fires the idle timer if it is due at `now`.
    pub fn advance(&mut self, now: i64) -> Result<(), S::Error> {
        if let Some(interval) = self.classifier.advance(now) {
            self.record(&interval)?;
        }
        Ok(())
    }

    /// When the pending idle check is due, if one is armed.
    pub const fn idle_deadline(&self) -> Option<i64> {
        self.classifier.idle_deadline()
    }

    /// Commits the open interval with `end = now`.
    pub fn shutdown(&mut self, now: i64) -> Result<(), S::Error> {
        if let Some(interval) = self.classifier.shutdown(now) {
            self.record(&interval)?;
        }
        tracing::info!(now, "tracker flushed");
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<TimeInterval>, S::Error> {
        self.store.load_list(keys::INTERVALS)
    }

    pub fn errors(&self) -> Result<Vec<ErrorEvent>, S::Error> {
        self.store.load_list(keys::ERRORS)
    }

    pub const fn commit_count(&self) -> i64 {
        self.commits
    }

    pub fn comment_line_count(&self) -> i64 {
        self.comment_base + i64::try_from(self.comments.len()).unwrap_or(i64::MAX)
    }

    /// Copies the current logs for aggregation.
    pub fn snapshot(&self) -> Result<Snapshot, S::Error> {
        Snapshot::load(&self.store)
    }

    pub const fn classifier_state(&self) -> &ClassifierState {
        self.classifier.state()
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn classify(&mut self, signal: &Signal, now: i64) -> Result<(), S::Error> {
        for interval in self.classifier.handle(signal, now) {
            self.record(&interval)?;
        }
        Ok(())
    }

    fn record(&mut self, interval: &TimeInterval) -> Result<(), S::Error> {
        tracing::debug!(
            category = %interval.category,
            start = interval.start,
            end = interval.end,
            workspace = %interval.workspace,
            "interval closed"
        );
        self.store.append_to_list(keys::INTERVALS, interval)
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or(fallback).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::LineChange;
    use crate::store::MemoryStore;
    use crate::types::Category;

    fn tracker() -> Tracker<MemoryStore> {
        Tracker::open(MemoryStore::new(), ClassifierConfig::default()).unwrap()
    }

    fn focus(focused: bool) -> HostEvent {
        HostEvent::new(HostEventKind::Focus { focused })
    }

    fn edit(line: u32, text: &str) -> HostEvent {
        HostEvent::new(HostEventKind::TextEdit {
            language: Some("python".to_string()),
            workspace: Some("api".to_string()),
            changes: vec![LineChange {
                line,
                text: text.to_string(),
                inserted_non_blank: true,
            }],
        })
    }

    #[test]
    fn intervals_are_appended_to_the_store() {
        let mut tracker = tracker();
        tracker.handle(&focus(true), 0).unwrap();
        tracker.handle(&edit(0, "x = 1"), 1_000).unwrap();
        tracker.handle(&focus(false), 5_000).unwrap();
        tracker.shutdown(9_000).unwrap();

        let categories: Vec<_> = tracker
            .entries()
            .unwrap()
            .iter()
            .map(|i| (i.category, i.start, i.end))
            .collect();
        assert_eq!(
            categories,
            vec![
                (Category::Thinking, 0, 1_000),
                (Category::Writing, 1_000, 5_000),
                (Category::Rest, 5_000, 9_000),
            ]
        );
    }

    #[test]
    fn stderr_falls_back_to_last_context() {
        let mut tracker = tracker();
        tracker.handle(&focus(true), 0).unwrap();
        tracker.handle(&edit(0, "x = 1"), 1_000).unwrap();
        tracker
            .handle(
                &HostEvent::new(HostEventKind::DebugStderr {
                    message: "Traceback".to_string(),
                    language: None,
                    workspace: None,
                }),
                2_000,
            )
            .unwrap();

        let errors = tracker.errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].language, "python");
        assert_eq!(errors[0].workspace, "api");
        assert_eq!(errors[0].timestamp, 2_000);
    }

    #[test]
    fn counters_persist_across_sessions() {
        let mut tracker = tracker();
        tracker.handle(&focus(true), 0).unwrap();
        tracker.handle(&edit(3, "# why"), 1_000).unwrap();
        tracker.handle(&edit(3, "# why not"), 2_000).unwrap();
        tracker.handle(&edit(4, "pass"), 3_000).unwrap();
        tracker
            .handle(&HostEvent::new(HostEventKind::GitCommit), 4_000)
            .unwrap();
        assert_eq!(tracker.comment_line_count(), 1);
        assert_eq!(tracker.commit_count(), 1);

        let store = tracker.into_store();
        let mut tracker = Tracker::open(store, ClassifierConfig::default()).unwrap();
        assert_eq!(tracker.comment_line_count(), 1);
        tracker.handle(&focus(true), 10_000).unwrap();
        tracker.handle(&edit(3, "# again"), 11_000).unwrap();
        tracker
            .handle(&HostEvent::new(HostEventKind::GitCommit), 12_000)
            .unwrap();

        let snapshot = tracker.snapshot().unwrap();
        assert_eq!(snapshot.comment_lines, 2);
        assert_eq!(snapshot.commits, 2);
    }

    #[test]
    fn unfocused_edits_do_not_count_comments() {
        let mut tracker = tracker();
        tracker.handle(&edit(1, "// hidden"), 0).unwrap();
        assert_eq!(tracker.comment_line_count(), 0);
        assert!(tracker.entries().unwrap().is_empty());
    }

    #[test]
    fn side_signals_fire_overdue_idle_timer() {
        let mut tracker = tracker();
        tracker.handle(&focus(true), 0).unwrap();
        tracker.handle(&edit(0, "x = 1"), 1_000).unwrap();
        tracker
            .handle(&HostEvent::new(HostEventKind::GitCommit), 30_000)
            .unwrap();
        assert_eq!(
            tracker.classifier_state().current_category(),
            Category::Thinking
        );
        let entries = tracker.entries().unwrap();
        assert_eq!(entries.last().map(|i| i.end), Some(12_000));
    }
}
