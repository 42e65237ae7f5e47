//! Aggregation engine.
//!
//! A pure function of `(intervals, errors, now)`: every call recomputes the
//! full analytics surface from the logs it is given, so callers pass a
//! snapshot and may keep appending to the live log meanwhile.

pub mod calendar;
mod profile;

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::merge::{MergedSpan, Scope, active_time_ms, merge_timeline};
use crate::types::{Category, ErrorEvent, TimeInterval};

pub use calendar::{DAY_MS, Periods};
pub use profile::{CodingStyle, LanguageShare, Profile, WorkRhythm};

/// Configuration for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Raw active time above which a calendar day counts as overwork.
    /// Default: 36000000 (10 hours).
    pub overwork_threshold_ms: i64,

    /// Writing time per estimated line of code.
    /// Default: 10000 (one line per 10 seconds).
    pub writing_ms_per_line: i64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            overwork_threshold_ms: 36_000_000, // 10 hours
            writing_ms_per_line: 10_000,       // 10 seconds
        }
    }
}

/// Milliseconds per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    pub writing: i64,
    pub thinking: i64,
    pub debugging: i64,
    pub rest: i64,
    pub error: i64,
}

impl CategoryTotals {
    pub const fn get(&self, category: Category) -> i64 {
        match category {
            Category::Writing => self.writing,
            Category::Thinking => self.thinking,
            Category::Debugging => self.debugging,
            Category::Rest => self.rest,
            Category::Error => self.error,
        }
    }

    pub const fn add(&mut self, category: Category, ms: i64) {
        match category {
            Category::Writing => self.writing += ms,
            Category::Thinking => self.thinking += ms,
            Category::Debugging => self.debugging += ms,
            Category::Rest => self.rest += ms,
            Category::Error => self.error += ms,
        }
    }

    /// Sum over every category except `rest`.
    pub const fn active(&self) -> i64 {
        self.writing + self.thinking + self.debugging + self.error
    }
}

/// Rolling comparisons over merged active time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Whole history.
    pub total_ms: i64,
    pub today_ms: i64,
    pub yesterday_ms: i64,
    pub this_week_ms: i64,
    pub last_week_ms: i64,
    /// This week's total divided by the days elapsed this week.
    pub this_week_avg_ms: i64,
    pub last_week_avg_ms: i64,
    pub this_month_ms: i64,
    pub last_month_ms: i64,
    pub this_month_avg_ms: i64,
    pub last_month_avg_ms: i64,
}

/// Everything derived from the logs. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    /// Merged active time per workspace.
    pub by_project: BTreeMap<String, i64>,
    /// Merged active time per language.
    pub by_language: BTreeMap<String, i64>,
    /// Merged active time by local hour of span start.
    pub by_hour: [i64; 24],
    /// Merged active time by local weekday (Sunday = 0) and hour.
    pub activity_heat: [[i64; 24]; 7],
    /// Error count by local weekday (Sunday = 0) and hour.
    pub error_heat: [[u32; 24]; 7],
    /// First day of `week_trend`.
    pub week_trend_start: NaiveDate,
    /// Merged active time for each of the trailing seven days ending today.
    pub week_trend: [i64; 7],
    pub context_switches: u32,
    pub overwork_days: u32,
    /// Today's writing minutes per thinking minute, times 100.
    pub focus_score: f64,
    /// Today's raw time per category.
    pub today: CategoryTotals,
    /// All-time raw time per category.
    pub distribution: CategoryTotals,
    /// Raw time per category for each local day.
    pub daily: BTreeMap<NaiveDate, CategoryTotals>,
    /// Raw active time per workspace for each local day.
    pub project_calendar: BTreeMap<NaiveDate, BTreeMap<String, i64>>,
    /// Estimated lines written per language.
    pub lines_by_language: BTreeMap<String, i64>,
    /// Estimated lines per minute spent in the language, rest included.
    pub productivity_per_language: BTreeMap<String, f64>,
    pub total_errors: usize,
    pub summary: Summary,
    pub profile: Profile,
}

/// Computes the analytics surface.
///
/// Local hours, weekdays and calendar days are taken in `now`'s time zone.
#[allow(clippy::too_many_lines)]
pub fn aggregate<Tz: TimeZone>(
    intervals: &[TimeInterval],
    errors: &[ErrorEvent],
    now: &DateTime<Tz>,
    config: &AggregationConfig,
) -> AggregationResult {
    let tz = now.timezone();
    let periods = Periods::at(now);

    let mut error_heat = [[0_u32; 24]; 7];
    for error in errors {
        if let Some((weekday, hour)) = calendar::weekday_hour(&tz, error.timestamp) {
            error_heat[weekday][hour] += 1;
        }
    }

    let timeline = merge_timeline(intervals, Scope::ALL);
    let mut by_project: BTreeMap<String, i64> = BTreeMap::new();
    let mut by_language: BTreeMap<String, i64> = BTreeMap::new();
    let mut by_hour = [0_i64; 24];
    let mut activity_heat = [[0_i64; 24]; 7];
    for span in &timeline {
        let duration = span.duration_ms();
        *by_project.entry(span.workspace.clone()).or_default() += duration;
        *by_language.entry(span.language.clone()).or_default() += duration;
        if let Some((weekday, hour)) = calendar::weekday_hour(&tz, span.start) {
            by_hour[hour] += duration;
            activity_heat[weekday][hour] += duration;
        }
    }

    let week_trend = week_trend(intervals, &periods, &tz);

    // Raw, per-interval metrics.
    let mut valid: Vec<&TimeInterval> = intervals.iter().filter(|i| i.is_valid()).collect();
    valid.sort_by_key(|i| i.start);

    let mut today = CategoryTotals::default();
    let mut distribution = CategoryTotals::default();
    let mut daily: BTreeMap<NaiveDate, CategoryTotals> = BTreeMap::new();
    let mut project_calendar: BTreeMap<NaiveDate, BTreeMap<String, i64>> = BTreeMap::new();
    let mut lines_by_language: BTreeMap<String, i64> = BTreeMap::new();
    let mut ms_by_language: HashMap<&str, i64> = HashMap::new();
    let mut context_switches = 0;
    let mut previous_workspace: Option<&str> = None;

    for interval in &valid {
        let duration = interval.duration_ms();
        distribution.add(interval.category, duration);
        if periods.today().contains(interval.start) {
            today.add(interval.category, duration);
        }
        // Every category counts toward time spent in a language, rest included.
        *ms_by_language
            .entry(interval.language.as_str())
            .or_default() += duration;
        let date = calendar::local_date(&tz, interval.start);
        if let Some(date) = date {
            daily
                .entry(date)
                .or_default()
                .add(interval.category, duration);
        }

        if !interval.category.is_active() {
            continue;
        }

        if previous_workspace.is_some_and(|w| w != interval.workspace) {
            context_switches += 1;
        }
        previous_workspace = Some(interval.workspace.as_str());

        if let Some(date) = date {
            *project_calendar
                .entry(date)
                .or_default()
                .entry(interval.workspace.clone())
                .or_default() += duration;
        }

        if interval.category == Category::Writing && config.writing_ms_per_line > 0 {
            *lines_by_language
                .entry(interval.language.clone())
                .or_default() += duration / config.writing_ms_per_line;
        }
    }

    let overwork_days = daily
        .values()
        .filter(|totals| totals.active() > config.overwork_threshold_ms)
        .count();

    #[allow(clippy::cast_precision_loss)]
    let productivity_per_language = lines_by_language
        .iter()
        .map(|(language, &lines)| {
            let minutes = minutes(ms_by_language.get(language.as_str()).copied().unwrap_or(0));
            let rate = if minutes > 0.0 {
                lines as f64 / minutes
            } else {
                0.0
            };
            (language.clone(), rate)
        })
        .collect();

    let summary = summarize(intervals, &timeline, &periods);
    let profile = profile::profile(&by_hour, &by_language, &today, &valid);

    AggregationResult {
        by_project,
        by_language,
        by_hour,
        activity_heat,
        error_heat,
        week_trend_start: week_trend_start(&periods),
        week_trend,
        context_switches,
        overwork_days: u32::try_from(overwork_days).unwrap_or(u32::MAX),
        focus_score: focus_score(&today),
        today,
        distribution,
        daily,
        project_calendar,
        lines_by_language,
        productivity_per_language,
        total_errors: errors.len(),
        summary,
        profile,
    }
}

/// Writing minutes per thinking minute, times 100. Thinking time under a
/// minute counts as one minute, so the score is always finite.
pub fn focus_score(totals: &CategoryTotals) -> f64 {
    minutes(totals.writing) / minutes(totals.thinking).max(1.0) * 100.0
}

#[allow(clippy::cast_precision_loss)]
fn minutes(ms: i64) -> f64 {
    ms as f64 / 60_000.0
}

/// First local day of the trailing week.
fn week_trend_start(periods: &Periods) -> NaiveDate {
    periods.today - chrono::Duration::days(6)
}

/// Buckets the merged trailing week by the local day each span starts on.
///
/// Days are counted by calendar date, not in 24-hour steps, so a week that
/// crosses a DST change still has exactly seven buckets.
fn week_trend<Tz: TimeZone>(intervals: &[TimeInterval], periods: &Periods, tz: &Tz) -> [i64; 7] {
    let first_day = week_trend_start(periods);
    let mut trend = [0_i64; 7];
    for span in merge_timeline(intervals, periods.trend()) {
        let Some(date) = calendar::local_date(tz, span.start) else {
            continue;
        };
        if let Ok(index) = usize::try_from((date - first_day).num_days()) {
            if let Some(bucket) = trend.get_mut(index) {
                *bucket += span.duration_ms();
            }
        }
    }
    trend
}

/// Divides `total_ms` over `days`, returning 0 for an empty period.
fn per_day(total_ms: i64, days: i64) -> i64 {
    if days > 0 { total_ms / days } else { 0 }
}

fn summarize(intervals: &[TimeInterval], timeline: &[MergedSpan], periods: &Periods) -> Summary {
    let this_week_ms = active_time_ms(intervals, periods.this_week());
    let last_week_ms = active_time_ms(intervals, periods.last_week());
    let this_month_ms = active_time_ms(intervals, periods.this_month());
    let last_month_ms = active_time_ms(intervals, periods.last_month());

    Summary {
        total_ms: crate::merge::total_duration_ms(timeline),
        today_ms: active_time_ms(intervals, periods.today()),
        yesterday_ms: active_time_ms(intervals, periods.yesterday()),
        this_week_ms,
        last_week_ms,
        this_week_avg_ms: per_day(this_week_ms, periods.week_days_elapsed),
        last_week_avg_ms: per_day(last_week_ms, 7),
        this_month_ms,
        last_month_ms,
        this_month_avg_ms: per_day(this_month_ms, periods.month_days_elapsed),
        last_month_avg_ms: per_day(last_month_ms, periods.last_month_days),
    }
}
