//! Key-value persistence contract.
//!
//! The classifier and aggregator never manage storage layout; they only
//! append to and read from lists and counters behind this trait.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::types::{ErrorEvent, TimeInterval};

/// Keys used for the diary's lists and counters.
pub mod keys {
    /// Append-only list of [`TimeInterval`](crate::TimeInterval)s.
    pub const INTERVALS: &str = "intervals";
    /// Append-only list of [`ErrorEvent`](crate::ErrorEvent)s.
    pub const ERRORS: &str = "errors";
    /// Number of git commits observed.
    pub const COMMITS: &str = "commits";
    /// Number of lines edited into comments.
    pub const COMMENT_LINES: &str = "comment_lines";
}

/// Append-only lists and integer counters addressed by key.
pub trait Store {
    /// Error raised by the underlying storage.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Loads every item of a list, in append order. Missing lists are empty.
    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, Self::Error>;

    /// Appends one item to a list.
    fn append_to_list<T: Serialize>(&mut self, key: &str, item: &T) -> Result<(), Self::Error>;

    /// Loads a counter. Missing counters are zero.
    fn load_counter(&self, key: &str) -> Result<i64, Self::Error>;

    fn store_counter(&mut self, key: &str, value: i64) -> Result<(), Self::Error>;
}

/// Errors from [`MemoryStore`].
#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("invalid item in list {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// In-memory [`Store`], holding list items as JSON values.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    lists: HashMap<String, Vec<serde_json::Value>>,
    counters: HashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    type Error = MemoryStoreError;

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, Self::Error> {
        let json = |source| MemoryStoreError::Json {
            key: key.to_string(),
            source,
        };
        self.lists
            .get(key)
            .map_or(&[][..], Vec::as_slice)
            .iter()
            .map(|value| T::deserialize(value).map_err(json))
            .collect()
    }

    fn append_to_list<T: Serialize>(&mut self, key: &str, item: &T) -> Result<(), Self::Error> {
        let value = serde_json::to_value(item).map_err(|source| MemoryStoreError::Json {
            key: key.to_string(),
            source,
        })?;
        self.lists.entry(key.to_string()).or_default().push(value);
        Ok(())
    }

    fn load_counter(&self, key: &str) -> Result<i64, Self::Error> {
        Ok(self.counters.get(key).copied().unwrap_or(0))
    }

    fn store_counter(&mut self, key: &str, value: i64) -> Result<(), Self::Error> {
        self.counters.insert(key.to_string(), value);
        Ok(())
    }
}

/// Immutable copy of the logs and counters, taken at one instant.
///
/// Aggregation runs over a snapshot so new appends never affect a query in
/// progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub entries: Vec<TimeInterval>,
    pub errors: Vec<ErrorEvent>,
    pub commits: i64,
    pub comment_lines: i64,
}

impl Snapshot {
    pub fn load<S: Store>(store: &S) -> Result<Self, S::Error> {
        Ok(Self {
            entries: store.load_list(keys::INTERVALS)?,
            errors: store.load_list(keys::ERRORS)?,
            commits: store.load_counter(keys::COMMITS)?,
            comment_lines: store.load_counter(keys::COMMENT_LINES)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    #[test]
    fn missing_keys_are_empty() {
        let store = MemoryStore::new();
        let items: Vec<TimeInterval> = store.load_list(keys::INTERVALS).unwrap();
        assert!(items.is_empty());
        assert_eq!(store.load_counter(keys::COMMITS).unwrap(), 0);
    }

    #[test]
    fn lists_keep_append_order() {
        let mut store = MemoryStore::new();
        for start in [30, 10, 20] {
            let interval = TimeInterval {
                start,
                end: start + 5,
                category: Category::Writing,
                workspace: "A".to_string(),
                language: "go".to_string(),
            };
            store.append_to_list(keys::INTERVALS, &interval).unwrap();
        }
        store.store_counter(keys::COMMITS, 3).unwrap();

        let snapshot = Snapshot::load(&store).unwrap();
        let starts: Vec<_> = snapshot.entries.iter().map(|i| i.start).collect();
        assert_eq!(starts, vec![30, 10, 20]);
        assert_eq!(snapshot.commits, 3);
        assert!(snapshot.errors.is_empty());
    }

    #[test]
    fn wrong_item_type_is_an_error() {
        let mut store = MemoryStore::new();
        store.append_to_list(keys::ERRORS, &"not an error").unwrap();
        let result: Result<Vec<ErrorEvent>, _> = store.load_list(keys::ERRORS);
        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("invalid item in list errors"));
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut store = MemoryStore::new();
        let snapshot = Snapshot::load(&store).unwrap();
        store
            .append_to_list(
                keys::ERRORS,
                &ErrorEvent {
                    timestamp: 1,
                    message: "boom".to_string(),
                    language: "go".to_string(),
                    workspace: "A".to_string(),
                },
            )
            .unwrap();
        assert!(snapshot.errors.is_empty());
        assert_eq!(Snapshot::load(&store).unwrap().errors.len(), 1);
    }
}
