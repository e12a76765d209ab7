use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::chore::Chore;
use crate::dates::{shift_days, DaysSince};

/// Due classification. Variant order is display rank: most urgent first.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DueStatus {
    Overdue,
    DueSoon,
    Ok,
}

impl DueStatus {
    pub fn label(self) -> &'static str {
        match self {
            DueStatus::Overdue => "Overdue",
            DueStatus::DueSoon => "Due today",
            DueStatus::Ok => "OK",
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DueState {
    pub status: DueStatus,
    pub days_since: DaysSince,
    /// Absent when the chore has no readable completion day.
    pub next_due: Option<NaiveDate>,
}

/// Classifies `chore` against `today`. Pure; callers re-run it on every query since the
/// answer changes at midnight.
pub fn evaluate(chore: &Chore, today: NaiveDate) -> DueState {
    let cadence = chore.category.cadence_days();
    let days_since = DaysSince::since(chore.last_completed, today);
    let next_due = chore
        .last_completed
        .map(|last| shift_days(last, cadence));
    DueState {
        status: classify(days_since, cadence),
        days_since,
        next_due,
    }
}

pub fn classify(days_since: DaysSince, cadence: i64) -> DueStatus {
    match days_since {
        DaysSince::Never => DueStatus::Overdue,
        DaysSince::Days(days) if days > cadence => DueStatus::Overdue,
        DaysSince::Days(days) if days == cadence => DueStatus::DueSoon,
        DaysSince::Days(_) => DueStatus::Ok,
    }
}
