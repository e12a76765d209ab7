use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::chore::{Category, Chore, ChoreId};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionRecord {
    #[serde(rename = "id")]
    pub chore_id: ChoreId,
    pub title: String,
    pub category: Category,
    #[serde(rename = "dateISO", alias = "date")]
    pub date: NaiveDate,
    /// Display only.
    pub time: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CompletionGroup {
    pub category: Category,
    pub records: Vec<CompletionRecord>,
}

/// Completions keyed by (chore, day); at most one record per pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CompletionLog {
    records: Vec<CompletionRecord>,
}

impl CompletionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any record for `(chore.id, day)` with a fresh snapshot of the chore.
    pub fn record(&mut self, chore: &Chore, day: NaiveDate, time_label: impl Into<String>) {
        self.records
            .retain(|record| !(record.chore_id == chore.id && record.date == day));
        self.records.push(CompletionRecord {
            chore_id: chore.id.clone(),
            title: chore.title.clone(),
            category: chore.category,
            date: day,
            time: time_label.into(),
        });
    }

    /// Keeps only records dated `day`; returns how many were dropped.
    pub fn retain_day(&mut self, day: NaiveDate) -> usize {
        let before = self.records.len();
        self.records.retain(|record| record.date == day);
        before - self.records.len()
    }

    pub fn completed_on(&self, id: &ChoreId, day: NaiveDate) -> bool {
        self.records
            .iter()
            .any(|record| &record.chore_id == id && record.date == day)
    }

    pub fn records_for<'a>(
        &'a self,
        id: &'a ChoreId,
    ) -> impl Iterator<Item = &'a CompletionRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| &record.chore_id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompletionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dated `day`, by category then title.
    pub fn grouped(&self, day: NaiveDate) -> Vec<CompletionGroup> {
        Category::ALL
            .into_iter()
            .map(|category| {
                let mut records: Vec<CompletionRecord> = self
                    .records
                    .iter()
                    .filter(|record| record.category == category && record.date == day)
                    .cloned()
                    .collect();
                records.sort_by(|a, b| a.title.cmp(&b.title));
                CompletionGroup { category, records }
            })
            .collect()
    }
}

impl FromIterator<CompletionRecord> for CompletionLog {
    fn from_iter<I: IntoIterator<Item = CompletionRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
