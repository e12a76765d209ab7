use std::cmp::Ordering;
use std::fmt;

use chrono::{Duration, Local, NaiveDate};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ChoreError, Result};

pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Current calendar day in the local time zone.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

pub fn parse_day(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DAY_FORMAT)
        .map_err(|_| ChoreError::InvalidDay(input.to_string()))
}

/// Calendar arithmetic on naive dates, so no DST or offset drift can move the result
/// across a day boundary. Out-of-range results saturate at `day`.
pub fn shift_days(day: NaiveDate, delta: i64) -> NaiveDate {
    Duration::try_days(delta)
        .and_then(|delta| day.checked_add_signed(delta))
        .unwrap_or(day)
}

/// Number of calendar days from `from` to `to`; an unparseable side means the chore
/// was never completed.
pub fn days_between(from: &str, to: &str) -> DaysSince {
    match (parse_day(from), parse_day(to)) {
        (Ok(from), Ok(to)) => DaysSince::Days(days_between_dates(from, to)),
        _ => DaysSince::Never,
    }
}

pub fn days_between_dates(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

/// Elapsed days since a completion. `Never` compares greater than every finite count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaysSince {
    Days(i64),
    Never,
}

impl DaysSince {
    pub fn since(last: Option<NaiveDate>, today: NaiveDate) -> Self {
        match last {
            Some(day) => DaysSince::Days(days_between_dates(day, today)),
            None => DaysSince::Never,
        }
    }

    pub fn days(self) -> Option<i64> {
        match self {
            DaysSince::Days(days) => Some(days),
            DaysSince::Never => None,
        }
    }
}

impl Ord for DaysSince {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DaysSince::Days(a), DaysSince::Days(b)) => a.cmp(b),
            (DaysSince::Days(_), DaysSince::Never) => Ordering::Less,
            (DaysSince::Never, DaysSince::Days(_)) => Ordering::Greater,
            (DaysSince::Never, DaysSince::Never) => Ordering::Equal,
        }
    }
}

impl PartialOrd for DaysSince {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DaysSince {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaysSince::Days(days) => write!(f, "{days}"),
            DaysSince::Never => f.write_str("never"),
        }
    }
}

impl Serialize for DaysSince {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            DaysSince::Days(days) => serializer.serialize_i64(*days),
            DaysSince::Never => serializer.serialize_none(),
        }
    }
}

/// Deserializes an optional day, mapping anything that is not a `YYYY-MM-DD` string to
/// `None` instead of failing the enclosing document.
pub fn lenient_day<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().and_then(|raw| parse_day(raw).ok()))
}

/// Source of "today" and of the display-only completion time.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
    fn time_label(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        today()
    }

    fn time_label(&self) -> String {
        Local::now().format("%H:%M:%S").to_string()
    }
}

#[derive(Debug)]
pub struct FixedClock {
    day: RwLock<NaiveDate>,
    time_label: String,
}

impl FixedClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            day: RwLock::new(day),
            time_label: "09:00:00".to_string(),
        }
    }

    pub fn with_time_label(mut self, label: impl Into<String>) -> Self {
        self.time_label = label.into();
        self
    }

    pub fn set_today(&self, day: NaiveDate) {
        *self.day.write() = day;
    }

    pub fn advance(&self, days: i64) {
        let mut day = self.day.write();
        *day = shift_days(*day, days);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.day.read()
    }

    fn time_label(&self) -> String {
        self.time_label.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn shift_days_crosses_month_and_year_boundaries() {
        assert_eq!(shift_days(day(2025, 12, 30), 3), day(2026, 1, 2));
        assert_eq!(shift_days(day(2024, 3, 1), -1), day(2024, 2, 29));
        assert_eq!(shift_days(day(2025, 3, 30), 0), day(2025, 3, 30));
    }

    #[test]
    fn days_between_counts_calendar_days() {
        assert_eq!(days_between("2025-03-01", "2025-03-10"), DaysSince::Days(9));
        assert_eq!(days_between("2025-03-10", "2025-03-01"), DaysSince::Days(-9));
        assert_eq!(days_between("2025-03-29", "2025-03-31"), DaysSince::Days(2));
    }

    #[test]
    fn unparseable_day_is_never() {
        assert_eq!(days_between("yesterday", "2025-03-10"), DaysSince::Never);
        assert_eq!(days_between("2025-03-10", ""), DaysSince::Never);
        assert!(DaysSince::Never > DaysSince::Days(i64::MAX));
    }

    #[test]
    fn formats_canonical_day_string() {
        assert_eq!(format_day(day(2025, 1, 5)), "2025-01-05");
        assert_eq!(parse_day("2025-01-05").unwrap(), day(2025, 1, 5));
        assert!(matches!(parse_day("2025-13-01"), Err(ChoreError::InvalidDay(_))));
    }

    #[test]
    fn fixed_clock_advances() {
        let clock = FixedClock::new(day(2025, 6, 30));
        clock.advance(1);
        assert_eq!(clock.today(), day(2025, 7, 1));
    }
}
