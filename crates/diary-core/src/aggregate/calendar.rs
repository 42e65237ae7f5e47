//! Calendar boundaries in the reporting time zone.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike};

use crate::merge::Scope;

/// Milliseconds in a day.
pub const DAY_MS: i64 = 86_400_000;

/// Converts milliseconds since the epoch into the time zone of `tz`.
pub fn local_datetime<Tz: TimeZone>(tz: &Tz, ms: i64) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp_millis(ms).map(|utc| utc.with_timezone(tz))
}

/// Local weekday (Sunday = 0) and hour of a timestamp.
pub fn weekday_hour<Tz: TimeZone>(tz: &Tz, ms: i64) -> Option<(usize, usize)> {
    let local = local_datetime(tz, ms)?;
    let weekday = local.weekday().num_days_from_sunday() as usize;
    Some((weekday, local.hour() as usize))
}

/// Local calendar date of a timestamp.
pub fn local_date<Tz: TimeZone>(tz: &Tz, ms: i64) -> Option<NaiveDate> {
    local_datetime(tz, ms).map(|local| local.date_naive())
}

/// Local midnight of `date`, in milliseconds since the epoch.
///
/// Handles DST ambiguity by picking the earlier time, and a DST gap at
/// midnight by using 1am.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> i64 {
    let midnight = date.and_time(NaiveTime::MIN);
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.timestamp_millis(),
        LocalResult::None => {
            let one_am = midnight + Duration::hours(1);
            tz.from_local_datetime(&one_am)
                .earliest()
                .map_or_else(|| one_am.and_utc().timestamp_millis(), |dt| dt.timestamp_millis())
        }
    }
}

/// First day of the month `months_back` months before `date`'s month.
fn month_start(date: NaiveDate, months_back: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 - months_back as i32;
    NaiveDate::from_ymd_opt(total.div_euclid(12), total.rem_euclid(12) as u32 + 1, 1)
        .unwrap_or(date)
}

/// The calendar windows a report compares, anchored at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Periods {
    pub today: NaiveDate,
    pub today_start: i64,
    pub tomorrow_start: i64,
    pub yesterday_start: i64,
    /// Start of the trailing seven days ending today (today minus six days).
    pub trend_start: i64,
    /// Sunday of the current week.
    pub week_start: i64,
    pub next_week_start: i64,
    pub last_week_start: i64,
    pub month_start: i64,
    pub next_month_start: i64,
    pub last_month_start: i64,
    /// Calendar days of the current week up to and including today.
    pub week_days_elapsed: i64,
    /// Calendar days of the current month up to and including today.
    pub month_days_elapsed: i64,
    /// Length of the previous month in days.
    pub last_month_days: i64,
}

impl Periods {
    /// Computes the windows around `now` in `now`'s time zone.
    pub fn at<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let midnight = |date: NaiveDate| local_midnight(&tz, date);

        let days_since_sunday = i64::from(today.weekday().num_days_from_sunday());
        let sunday = today - Duration::days(days_since_sunday);
        let this_month = month_start(today, 0);
        let last_month = month_start(today, 1);
        let next_month = month_start(this_month + Duration::days(32), 0);

        Self {
            today,
            today_start: midnight(today),
            tomorrow_start: midnight(today + Duration::days(1)),
            yesterday_start: midnight(today - Duration::days(1)),
            trend_start: midnight(today - Duration::days(6)),
            week_start: midnight(sunday),
            next_week_start: midnight(sunday + Duration::days(7)),
            last_week_start: midnight(sunday - Duration::days(7)),
            month_start: midnight(this_month),
            next_month_start: midnight(next_month),
            last_month_start: midnight(last_month),
            week_days_elapsed: days_since_sunday + 1,
            month_days_elapsed: i64::from(today.day()),
            last_month_days: (this_month - last_month).num_days(),
        }
    }

    pub const fn today(&self) -> Scope {
        Scope::between(self.today_start, self.tomorrow_start)
    }

    pub const fn yesterday(&self) -> Scope {
        Scope::between(self.yesterday_start, self.today_start)
    }

    pub const fn trend(&self) -> Scope {
        Scope::between(self.trend_start, self.tomorrow_start)
    }

    pub const fn this_week(&self) -> Scope {
        Scope::between(self.week_start, self.next_week_start)
    }

    pub const fn last_week(&self) -> Scope {
        Scope::between(self.last_week_start, self.week_start)
    }

    pub const fn this_month(&self) -> Scope {
        Scope::between(self.month_start, self.next_month_start)
    }

    pub const fn last_month(&self) -> Scope {
        Scope::between(self.last_month_start, self.month_start)
    }
}
