//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The category name is not one of the known categories.
    #[error("unknown category: {value}")]
    UnknownCategory { value: String },
}

/// What the developer was doing during an interval.
///
/// This is a closed set; aggregation keys on it directly instead of on
/// free-form strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Typing into a focused editor.
    Writing,
    /// Editor focused but no recent input.
    Thinking,
    /// A debug session is running.
    Debugging,
    /// Editor window not focused.
    Rest,
    /// Synthesized from the error stream, never a classifier state.
    Error,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 5] = [
        Self::Writing,
        Self::Thinking,
        Self::Debugging,
        Self::Rest,
        Self::Error,
    ];

    /// String representation for storage and display.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Writing => "writing",
            Self::Thinking => "thinking",
            Self::Debugging => "debugging",
            Self::Rest => "rest",
            Self::Error => "error",
        }
    }

    /// Whether time in this category counts as active time.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Rest)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "writing" => Ok(Self::Writing),
            "thinking" => Ok(Self::Thinking),
            "debugging" => Ok(Self::Debugging),
            "rest" => Ok(Self::Rest),
            "error" => Ok(Self::Error),
            _ => Err(ValidationError::UnknownCategory {
                value: s.to_string(),
            }),
        }
    }
}

/// A closed, labeled span of time emitted by the classifier.
///
/// Timestamps are milliseconds since the Unix epoch. Intervals with
/// `end <= start` may exist in the raw log; consumers discard them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    /// Inclusive start.
    pub start: i64,
    /// Exclusive end.
    pub end: i64,
    /// Activity during the interval.
    pub category: Category,
    /// Workspace (project) the developer was in.
    pub workspace: String,
    /// Language of the active document.
    pub language: String,
}

impl TimeInterval {
    /// Duration in milliseconds. Negative for malformed intervals.
    pub const fn duration_ms(&self) -> i64 {
        self.end - self.start
    }

    /// Whether the interval has a positive duration.
    pub const fn is_valid(&self) -> bool {
        self.end > self.start
    }
}

/// An error captured from a debug session's stderr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// When the output was received, in milliseconds since the Unix epoch.
    pub timestamp: i64,
    /// The raw stderr text.
    pub message: String,
    pub language: String,
    pub workspace: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_from_str() {
        for category in Category::ALL {
            let parsed: Category = category.as_str().parse().unwrap();
            assert_eq!(parsed, category);
        }
        let err = "coding".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "unknown category: coding");
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Debugging).unwrap();
        assert_eq!(json, "\"debugging\"");
        assert!(serde_json::from_str::<Category>("\"Debugging\"").is_err());
    }

    #[test]
    fn only_rest_is_inactive() {
        let inactive: Vec<_> = Category::ALL
            .into_iter()
            .filter(|c| !c.is_active())
            .collect();
        assert_eq!(inactive, vec![Category::Rest]);
    }

    #[test]
    fn interval_reads_stored_json() {
        let json = r#"{"start":1000,"end":4000,"category":"writing","workspace":"api","language":"rust"}"#;
        let interval: TimeInterval = serde_json::from_str(json).unwrap();
        assert_eq!(interval.duration_ms(), 3000);
        assert!(interval.is_valid());
        assert_eq!(interval.category, Category::Writing);
    }

    #[test]
    fn zero_length_interval_is_invalid() {
        let interval = TimeInterval {
            start: 5,
            end: 5,
            category: Category::Thinking,
            workspace: String::new(),
            language: String::new(),
        };
        assert!(!interval.is_valid());
    }
}
