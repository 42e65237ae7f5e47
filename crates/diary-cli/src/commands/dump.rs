//! Dump commands for inspecting the raw logs.
//!
//! `entries` and `errors` print the stored items as JSONL, in append order.

use std::io::Write;

use anyhow::{Context, Result};
use diary_core::store::keys;
use diary_core::{ErrorEvent, Store, TimeInterval};
use serde::Serialize;

/// Writes every recorded interval as one JSON object per line.
pub fn entries<S, W>(store: &S, writer: &mut W) -> Result<()>
where
    S: Store,
    W: Write,
{
    let items: Vec<TimeInterval> = store
        .load_list(keys::INTERVALS)
        .context("failed to load intervals")?;
    write_jsonl(writer, &items)
}

/// Writes every recorded debugger error as one JSON object per line.
pub fn errors<S, W>(store: &S, writer: &mut W) -> Result<()>
where
    S: Store,
    W: Write,
{
    let items: Vec<ErrorEvent> = store
        .load_list(keys::ERRORS)
        .context("failed to load errors")?;
    write_jsonl(writer, &items)
}

fn write_jsonl<T: Serialize, W: Write>(writer: &mut W, items: &[T]) -> Result<()> {
    for item in items {
        let json = serde_json::to_string(item)?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diary_core::{Category, MemoryStore};
    use insta::assert_snapshot;

    #[test]
    fn entries_are_printed_in_append_order() {
        let mut store = MemoryStore::new();
        for (start, category) in [(2_000, Category::Rest), (0, Category::Writing)] {
            store
                .append_to_list(
                    keys::INTERVALS,
                    &TimeInterval {
                        start,
                        end: start + 1_000,
                        category,
                        workspace: "api".to_string(),
                        language: "rust".to_string(),
                    },
                )
                .unwrap();
        }

        let mut output = Vec::new();
        entries(&store, &mut output).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r#"
        {"start":2000,"end":3000,"category":"rest","workspace":"api","language":"rust"}
        {"start":0,"end":1000,"category":"writing","workspace":"api","language":"rust"}
        "#);
    }

    #[test]
    fn no_errors_prints_nothing() {
        let store = MemoryStore::new();
        let mut output = Vec::new();
        errors(&store, &mut output).unwrap();
        assert!(output.is_empty());
    }
}
