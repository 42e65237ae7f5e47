//! Developer profile derived from the aggregated metrics.

use std::collections::BTreeMap;

use serde::Serialize;

use super::CategoryTotals;
use crate::types::TimeInterval;

/// Mean interval length above which a developer counts as a focused coder.
const FOCUSED_INTERVAL_MS: i64 = 2 * 3_600_000;

/// When most of the day's work happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkRhythm {
    /// Hours 6-11 outweigh hours 18-23 by more than 1.5x.
    MorningPerson,
    /// Hours 18-23 outweigh hours 6-11 by more than 1.5x.
    NightOwl,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodingStyle {
    /// More thinking than writing today.
    Thinker,
    Doer,
    /// Intervals average more than two hours.
    FocusedCoder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageShare {
    pub language: String,
    /// Rounded share of merged active time.
    pub percent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub rhythm: WorkRhythm,
    pub style: CodingStyle,
    /// Mean length of the valid raw intervals, rest included.
    pub mean_interval_ms: i64,
    pub specialization: Vec<LanguageShare>,
}

pub(super) fn profile(
    by_hour: &[i64; 24],
    by_language: &BTreeMap<String, i64>,
    today: &CategoryTotals,
    valid: &[&TimeInterval],
) -> Profile {
    let morning: i64 = by_hour[6..12].iter().sum();
    let night: i64 = by_hour[18..24].iter().sum();
    let rhythm = if morning * 2 > night * 3 {
        WorkRhythm::MorningPerson
    } else if night * 2 > morning * 3 {
        WorkRhythm::NightOwl
    } else {
        WorkRhythm::Normal
    };

    let count = i64::try_from(valid.len()).unwrap_or(i64::MAX);
    let mean_interval_ms = if count > 0 {
        valid.iter().map(|i| i.duration_ms()).sum::<i64>() / count
    } else {
        0
    };

    let style = if mean_interval_ms > FOCUSED_INTERVAL_MS {
        CodingStyle::FocusedCoder
    } else if today.thinking > today.writing {
        CodingStyle::Thinker
    } else {
        CodingStyle::Doer
    };

    let total: i64 = by_language.values().sum();
    let specialization = if total > 0 {
        by_language
            .iter()
            .map(|(language, &ms)| LanguageShare {
                language: language.clone(),
                percent: (ms * 100 + total / 2) / total,
            })
            .collect()
    } else {
        Vec::new()
    };

    Profile {
        rhythm,
        style,
        mean_interval_ms,
        specialization,
    }
}
