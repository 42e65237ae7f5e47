//! Raw signals delivered by the host editor.

use serde::{Deserialize, Serialize};

/// A signal from the host, as read from the wire.
///
/// The host writes one JSON object per line, e.g.
/// `{"type":"focus","focused":true,"at":1736931600000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEvent {
    /// When the signal happened, in milliseconds since the Unix epoch.
    /// Unstamped signals are timed by the receiver's clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at: Option<i64>,
    #[serde(flatten)]
    pub kind: HostEventKind,
}

/// The kind of host signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEventKind {
    /// The editor window gained or lost focus.
    Focus { focused: bool },
    /// A document was edited.
    TextEdit {
        /// Language of the active document, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        /// Name of the open workspace, if known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workspace: Option<String>,
        /// Lines touched by the edit.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        changes: Vec<LineChange>,
    },
    /// A debug session started.
    DebugStart,
    /// A debug session terminated.
    DebugEnd,
    /// A debug session wrote to stderr.
    DebugStderr {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workspace: Option<String>,
    },
    /// A git commit was made in an open repository.
    GitCommit,
}

/// One line touched by an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineChange {
    /// Zero-based line number.
    pub line: u32,
    /// Full text of the line after the edit.
    pub text: String,
    /// Whether the inserted text contained anything besides whitespace.
    pub inserted_non_blank: bool,
}

impl HostEvent {
    /// Creates an unstamped event.
    pub const fn new(kind: HostEventKind) -> Self {
        Self { at: None, kind }
    }

    /// Creates an event stamped at `at`.
    pub const fn at(at: i64, kind: HostEventKind) -> Self {
        Self { at: Some(at), kind }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stamped_focus() {
        let event: HostEvent =
            serde_json::from_str(r#"{"type":"focus","focused":false,"at":42}"#).unwrap();
        assert_eq!(event, HostEvent::at(42, HostEventKind::Focus { focused: false }));
    }

    #[test]
    fn text_edit_context_is_optional() {
        let event: HostEvent = serde_json::from_str(r#"{"type":"text_edit"}"#).unwrap();
        assert_eq!(
            event.kind,
            HostEventKind::TextEdit {
                language: None,
                workspace: None,
                changes: Vec::new(),
            }
        );
        assert_eq!(event.at, None);
    }

    #[test]
    fn text_edit_with_changes() {
        let json = r#"{
            "type": "text_edit",
            "language": "go",
            "workspace": "api",
            "changes": [{"line": 3, "text": "// hi", "inserted_non_blank": true}]
        }"#;
        let event: HostEvent = serde_json::from_str(json).unwrap();
        let HostEventKind::TextEdit { changes, .. } = event.kind else {
            panic!("expected text edit");
        };
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].line, 3);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result: Result<HostEvent, _> = serde_json::from_str(r#"{"type":"scroll"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unit_variants_serialize_as_tag_only() {
        let json = serde_json::to_string(&HostEvent::new(HostEventKind::DebugStart)).unwrap();
        assert_eq!(json, r#"{"type":"debug_start"}"#);
    }
}
