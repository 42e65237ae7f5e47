//! Status command: today's coding time and what the database holds.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use diary_core::merge::active_time_ms;
use diary_core::store::keys;
use diary_core::{Periods, Store, TimeInterval};
use diary_db::Database;

/// Formats the status-bar line, e.g. `Today coding: 02h:05m`.
pub fn coding_line(today_ms: i64) -> String {
    let total_minutes = today_ms.max(0) / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    format!("Today coding: {hours:02}h:{minutes:02}m")
}

/// Merged active time today, in `now`'s time zone.
pub fn today_coding_ms<Tz: TimeZone>(entries: &[TimeInterval], now: &DateTime<Tz>) -> i64 {
    active_time_ms(entries, Periods::at(now).today())
}

pub fn run<W, Tz>(writer: &mut W, db: &Database, database_path: &Path, now: &DateTime<Tz>) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
{
    let entries: Vec<TimeInterval> = db
        .load_list(keys::INTERVALS)
        .context("failed to load intervals")?;
    let commits = db.load_counter(keys::COMMITS)?;
    let comment_lines = db.load_counter(keys::COMMENT_LINES)?;
    let sizes = db.list_sizes()?;

    writeln!(writer, "Editor time diary status")?;
    writeln!(writer, "Database: {}", database_path.display())?;
    writeln!(writer, "{}", coding_line(today_coding_ms(&entries, now)))?;
    writeln!(writer, "Commits: {commits}")?;
    writeln!(writer, "Comment lines: {comment_lines}")?;

    if sizes.is_empty() {
        writeln!(writer, "No activity recorded.")?;
        return Ok(());
    }

    writeln!(writer, "Logs:")?;
    for size in sizes {
        writeln!(writer, "- {}: {}", size.key, size.items)?;
    }

    Ok(())
}
