//! Report command for rendering the aggregated analytics.
//!
//! This module implements `diary report`: the whole analytics surface computed
//! as of one instant, rendered as text or as JSON.

use std::fmt::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use diary_core::aggregate::{CodingStyle, WorkRhythm};
use diary_core::{AggregationConfig, AggregationResult, Category, Snapshot, Store, aggregate};
use serde::Serialize;

/// Computed report data.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub generated_at: DateTime<Utc>,
    /// Local calendar day the report is anchored at.
    pub today: NaiveDate,
    /// IANA name of the time zone local buckets are computed in.
    pub timezone: String,
    pub entry_count: usize,
    pub commits: i64,
    pub comment_lines: i64,
    pub result: AggregationResult,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    timezone: &'a str,
    /// Local date the report is anchored at.
    date: String,
    commits: i64,
    comment_lines: i64,
    #[serde(flatten)]
    analytics: &'a AggregationResult,
}

// ========== Duration Formatting ==========

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

// ========== Progress Bar ==========

/// Generates a 10-character progress bar.
/// Values <5% of max get a single block for visibility.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn progress_bar(value: i64, max: i64) -> String {
    if max <= 0 {
        return "░░░░░░░░░░".to_string();
    }

    let ratio = value.max(0) as f64 / max as f64;
    let filled = if ratio < 0.05 && value > 0 {
        1
    } else {
        (ratio * 10.0).round().min(10.0) as usize
    };

    let empty = 10 - filled;
    format!("{}{}", "█".repeat(filled), "░".repeat(empty))
}

// ========== Report Generation ==========

/// Loads a snapshot of the logs and aggregates it as of `now`.
pub fn generate_report_data<S, Tz>(
    store: &S,
    now: &DateTime<Tz>,
    config: &AggregationConfig,
    timezone: String,
) -> Result<ReportData>
where
    S: Store,
    Tz: TimeZone,
{
    let snapshot = Snapshot::load(store).context("failed to load diary logs")?;
    let result = aggregate(&snapshot.entries, &snapshot.errors, now, config);
    tracing::debug!(
        entries = snapshot.entries.len(),
        errors = snapshot.errors.len(),
        "aggregated logs"
    );

    Ok(ReportData {
        generated_at: now.with_timezone(&Utc),
        today: now.date_naive(),
        timezone,
        entry_count: snapshot.entries.len(),
        commits: snapshot.commits,
        comment_lines: snapshot.comment_lines,
        result,
    })
}

const fn rhythm_label(rhythm: WorkRhythm) -> &'static str {
    match rhythm {
        WorkRhythm::MorningPerson => "morning person",
        WorkRhythm::NightOwl => "night owl",
        WorkRhythm::Normal => "normal",
    }
}

const fn style_label(style: CodingStyle) -> &'static str {
    match style {
        CodingStyle::Thinker => "thinker",
        CodingStyle::Doer => "doer",
        CodingStyle::FocusedCoder => "focused coder",
    }
}

fn section(output: &mut String, title: &str) -> std::fmt::Result {
    writeln!(output)?;
    writeln!(output, "{title}")?;
    writeln!(output, "{}", "─".repeat(title.chars().count()))
}

/// Map entries sorted by value descending, then key.
fn ranked<K: Ord + Clone>(map: &std::collections::BTreeMap<K, i64>) -> Vec<(K, i64)> {
    let mut entries: Vec<(K, i64)> = map.iter().map(|(k, &v)| (k.clone(), v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries
}

/// Formats the human-readable report output.
pub fn format_report(data: &ReportData) -> Result<String> {
    let mut output = String::new();
    let result = &data.result;

    writeln!(
        output,
        "DIARY REPORT: {}",
        data.today.format("%A, %b %-d, %Y")
    )?;

    if data.entry_count == 0 && result.total_errors == 0 {
        writeln!(output)?;
        writeln!(output, "No activity recorded.")?;
        writeln!(output)?;
        writeln!(
            output,
            "Hint: pipe editor signals into 'diary track' to start recording."
        )?;
        return Ok(output);
    }

    let summary = &result.summary;
    section(&mut output, "SUMMARY")?;
    writeln!(output, "{:<16}{}", "Total active:", format_duration(summary.total_ms))?;
    writeln!(output, "{:<16}{}", "Today:", format_duration(summary.today_ms))?;
    writeln!(output, "{:<16}{}", "Yesterday:", format_duration(summary.yesterday_ms))?;
    for (label, total, average) in [
        ("This week:", summary.this_week_ms, summary.this_week_avg_ms),
        ("Last week:", summary.last_week_ms, summary.last_week_avg_ms),
        ("This month:", summary.this_month_ms, summary.this_month_avg_ms),
        ("Last month:", summary.last_month_ms, summary.last_month_avg_ms),
    ] {
        writeln!(
            output,
            "{label:<16}{} ({}/day)",
            format_duration(total),
            format_duration(average)
        )?;
    }
    writeln!(output, "{:<16}{}", "Errors:", result.total_errors)?;

    section(&mut output, "TODAY")?;
    let max = Category::ALL
        .iter()
        .map(|&c| result.today.get(c))
        .max()
        .unwrap_or(0);
    for category in Category::ALL {
        let ms = result.today.get(category);
        writeln!(
            output,
            "  {:<10} {}  {}",
            category.as_str(),
            progress_bar(ms, max),
            format_duration(ms)
        )?;
    }

    section(&mut output, "BY PROJECT")?;
    let projects = ranked(&result.by_project);
    let max = projects.first().map_or(0, |p| p.1);
    if projects.is_empty() {
        writeln!(output, "(no active time)")?;
    }
    for (workspace, ms) in &projects {
        writeln!(
            output,
            "  {workspace:<20} {}  {}",
            progress_bar(*ms, max),
            format_duration(*ms)
        )?;
    }

    section(&mut output, "BY LANGUAGE")?;
    let languages = ranked(&result.by_language);
    let max = languages.first().map_or(0, |l| l.1);
    if languages.is_empty() {
        writeln!(output, "(no active time)")?;
    }
    for (language, ms) in &languages {
        let lines = result.lines_by_language.get(language).copied().unwrap_or(0);
        let rate = result
            .productivity_per_language
            .get(language)
            .copied()
            .unwrap_or(0.0);
        writeln!(
            output,
            "  {language:<20} {}  {:<8} {lines} lines, {rate:.1}/min",
            progress_bar(*ms, max),
            format_duration(*ms)
        )?;
    }

    section(&mut output, "LAST 7 DAYS")?;
    let max = result.week_trend.iter().copied().max().unwrap_or(0);
    for (offset, ms) in (0_i64..).zip(result.week_trend) {
        let date = result.week_trend_start + Duration::days(offset);
        writeln!(
            output,
            "  {}  {}  {}",
            date.format("%a %b %d"),
            progress_bar(ms, max),
            format_duration(ms)
        )?;
    }

    let profile = &result.profile;
    section(&mut output, "INSIGHTS")?;
    writeln!(output, "{:<18}{:.0}", "Focus score:", result.focus_score)?;
    writeln!(output, "{:<18}{}", "Context switches:", result.context_switches)?;
    writeln!(output, "{:<18}{}", "Overwork days:", result.overwork_days)?;
    let peak = peak_hour(&result.by_hour).map_or_else(|| "-".to_string(), |h| format!("{h:02}:00"));
    writeln!(output, "{:<18}{peak}", "Peak hour:")?;
    writeln!(output, "{:<18}{}", "Commits:", data.commits)?;
    writeln!(output, "{:<18}{}", "Comment lines:", data.comment_lines)?;
    writeln!(output, "{:<18}{}", "Work rhythm:", rhythm_label(profile.rhythm))?;
    writeln!(output, "{:<18}{}", "Coding style:", style_label(profile.style))?;
    writeln!(
        output,
        "{:<18}{}",
        "Mean interval:",
        format_duration(profile.mean_interval_ms)
    )?;
    let mut shares: Vec<_> = profile.specialization.iter().collect();
    shares.sort_by(|a, b| b.percent.cmp(&a.percent).then_with(|| a.language.cmp(&b.language)));
    let specialization = if shares.is_empty() {
        "-".to_string()
    } else {
        shares
            .iter()
            .map(|s| format!("{} {}%", s.language, s.percent))
            .collect::<Vec<_>>()
            .join(", ")
    };
    writeln!(output, "{:<18}{specialization}", "Specialization:")?;

    Ok(output)
}

/// Hour with the most merged active time; the earliest wins ties.
fn peak_hour(by_hour: &[i64; 24]) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (hour, &ms) in by_hour.iter().enumerate() {
        if ms > best.map_or(0, |b| b.1) {
            best = Some((hour, ms));
        }
    }
    best.map(|b| b.0)
}

/// Formats the report as JSON.
pub fn format_report_json(data: &ReportData) -> Result<String> {
    let report = JsonReport {
        generated_at: data.generated_at.to_rfc3339(),
        timezone: &data.timezone,
        date: data.today.format("%Y-%m-%d").to_string(),
        commits: data.commits,
        comment_lines: data.comment_lines,
        analytics: &data.result,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Runs the report command.
pub fn run<S, W, Tz>(
    writer: &mut W,
    store: &S,
    now: &DateTime<Tz>,
    config: &AggregationConfig,
    json: bool,
) -> Result<()>
where
    S: Store,
    W: std::io::Write,
    Tz: TimeZone,
{
    let timezone = iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string());
    let data = generate_report_data(store, now, config, timezone)?;

    if json {
        writeln!(writer, "{}", format_report_json(&data)?)?;
    } else {
        write!(writer, "{}", format_report(&data)?)?;
    }

    Ok(())
}
