//! Storage layer for the editor time diary.
//!
//! Provides a SQLite implementation of the [`Store`] contract using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. The tracker is driven from
//! a single thread, so one connection per process is enough.
//!
//! # Schema
//!
//! ## Lists
//!
//! `list_items` holds every list item as a JSON document. Items are keyed by
//! list name and ordered by an autoincrement `seq`, so loading a list returns
//! items in append order. Adding fields to a stored type is safe: old rows
//! deserialize with serde defaults where present. Renaming or removing fields
//! breaks deserialization of old rows.
//!
//! ## Counters
//!
//! `counters` holds one integer per key, upserted on every store.

use std::path::Path;

use diary_core::Store;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A list item could not be encoded or decoded.
    #[error("invalid item in list {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// Number of items stored under one list key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSize {
    pub key: String,
    pub items: i64,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- List items: one JSON document per row, in append order
            CREATE TABLE IF NOT EXISTS list_items (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_list_items_key ON list_items(key, seq);

            CREATE TABLE IF NOT EXISTS counters (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Counts the items of every non-empty list, ordered by key.
    pub fn list_sizes(&self) -> Result<Vec<ListSize>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT key, COUNT(*)
            FROM list_items
            GROUP BY key
            ORDER BY key ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ListSize {
                key: row.get(0)?,
                items: row.get(1)?,
            })
        })?;
        let mut sizes = Vec::new();
        for row in rows {
            sizes.push(row?);
        }
        Ok(sizes)
    }
}

impl Store for Database {
    type Error = DbError;

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM list_items WHERE key = ? ORDER BY seq ASC")?;
        let rows = stmt.query_map([key], |row| row.get::<_, String>(0))?;
        let mut items = Vec::new();
        for row in rows {
            let value = row?;
            let item = serde_json::from_str(&value).map_err(|source| DbError::Json {
                key: key.to_string(),
                source,
            })?;
            items.push(item);
        }
        Ok(items)
    }

    fn append_to_list<T: Serialize>(&mut self, key: &str, item: &T) -> Result<(), DbError> {
        let value = serde_json::to_string(item).map_err(|source| DbError::Json {
            key: key.to_string(),
            source,
        })?;
        self.conn.execute(
            "INSERT INTO list_items (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    fn load_counter(&self, key: &str) -> Result<i64, DbError> {
        let value = self
            .conn
            .query_row("SELECT value FROM counters WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value.unwrap_or(0))
    }

    fn store_counter(&mut self, key: &str, value: i64) -> Result<(), DbError> {
        self.conn.execute(
            "
            INSERT INTO counters (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            ",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diary_core::store::keys;
    use diary_core::{Category, ErrorEvent, Snapshot, TimeInterval};
    use std::collections::HashSet;

    fn interval(start: i64, category: Category) -> TimeInterval {
        TimeInterval {
            start,
            end: start + 1_000,
            category,
            workspace: "api".to_string(),
            language: "rust".to_string(),
        }
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");
        assert_eq!(
            table_columns(&db.conn, "list_items"),
            vec!["seq", "key", "value"]
        );
        assert_eq!(table_columns(&db.conn, "counters"), vec!["key", "value"]);
        assert!(index_names(&db.conn, "list_items").contains("idx_list_items_key"));
    }

    #[test]
    fn lists_load_in_append_order() {
        let mut db = Database::open_in_memory().unwrap();
        for (start, category) in [
            (5_000, Category::Writing),
            (1_000, Category::Thinking),
            (3_000, Category::Rest),
        ] {
            db.append_to_list(keys::INTERVALS, &interval(start, category))
                .unwrap();
        }

        let loaded: Vec<TimeInterval> = db.load_list(keys::INTERVALS).unwrap();
        let starts: Vec<_> = loaded.iter().map(|i| i.start).collect();
        assert_eq!(starts, vec![5_000, 1_000, 3_000]);
        assert_eq!(loaded[0].category, Category::Writing);

        let missing: Vec<TimeInterval> = db.load_list("nothing").unwrap();
        assert!(missing.is_empty());
    }

    #[test]
    fn counters_default_to_zero_and_overwrite() {
        let mut db = Database::open_in_memory().unwrap();
        assert_eq!(db.load_counter(keys::COMMITS).unwrap(), 0);
        db.store_counter(keys::COMMITS, 2).unwrap();
        db.store_counter(keys::COMMITS, 7).unwrap();
        assert_eq!(db.load_counter(keys::COMMITS).unwrap(), 7);
        assert_eq!(db.load_counter(keys::COMMENT_LINES).unwrap(), 0);
    }

    #[test]
    fn undecodable_item_reports_its_list() {
        let mut db = Database::open_in_memory().unwrap();
        db.append_to_list(keys::ERRORS, &42).unwrap();
        let err = db.load_list::<ErrorEvent>(keys::ERRORS).unwrap_err();
        assert!(matches!(err, DbError::Json { ref key, .. } if key == keys::ERRORS));
    }

    #[test]
    fn list_sizes_group_by_key() {
        let mut db = Database::open_in_memory().unwrap();
        db.append_to_list(keys::INTERVALS, &interval(0, Category::Writing))
            .unwrap();
        db.append_to_list(keys::INTERVALS, &interval(1_000, Category::Rest))
            .unwrap();
        db.append_to_list(
            keys::ERRORS,
            &ErrorEvent {
                timestamp: 10,
                message: "panic".to_string(),
                language: "rust".to_string(),
                workspace: "api".to_string(),
            },
        )
        .unwrap();

        let sizes = db.list_sizes().unwrap();
        assert_eq!(
            sizes,
            vec![
                ListSize {
                    key: "errors".to_string(),
                    items: 1,
                },
                ListSize {
                    key: "intervals".to_string(),
                    items: 2,
                },
            ]
        );
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diary.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.append_to_list(keys::INTERVALS, &interval(0, Category::Debugging))
                .unwrap();
            db.store_counter(keys::COMMENT_LINES, 4).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let snapshot = Snapshot::load(&db).unwrap();
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].category, Category::Debugging);
        assert_eq!(snapshot.comment_lines, 4);
        assert_eq!(snapshot.commits, 0);
    }
}
