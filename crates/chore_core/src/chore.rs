use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{lenient_day, shift_days};
use crate::due::{self, DueState};
use crate::error::ChoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Daily,
    Weekly,
    Monthly,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Daily, Category::Weekly, Category::Monthly];

    pub fn cadence_days(self) -> i64 {
        match self {
            Category::Daily => 1,
            Category::Weekly => 7,
            Category::Monthly => 30,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Daily => "Daily",
            Category::Weekly => "Weekly",
            Category::Monthly => "Monthly",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Category::Daily => "DAILY",
            Category::Weekly => "WEEKLY",
            Category::Monthly => "MONTHLY",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ChoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| {
                category.key().eq_ignore_ascii_case(s.trim())
                    || category.label().eq_ignore_ascii_case(s.trim())
            })
            .ok_or_else(|| ChoreError::InvalidRequest(format!("unknown category `{s}`")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ChoreId(String);

impl ChoreId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChoreId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chore {
    pub id: ChoreId,
    pub title: String,
    pub category: Category,
    /// `None` when the stored day could not be read; such a chore counts as never done.
    #[serde(
        rename = "lastCompleted",
        alias = "last_completed",
        deserialize_with = "lenient_day",
        default
    )]
    pub last_completed: Option<NaiveDate>,
}

impl Chore {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        category: Category,
        last_completed: NaiveDate,
    ) -> Self {
        Self {
            id: ChoreId::new(id),
            title: title.into(),
            category,
            last_completed: Some(last_completed),
        }
    }

    pub fn due_state(&self, today: NaiveDate) -> DueState {
        due::evaluate(self, today)
    }
}

/// Chores listed under one category, most urgent first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChoreGroup {
    pub category: Category,
    pub entries: Vec<ChoreView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChoreView {
    pub chore: Chore,
    pub due: DueState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ChoreRegistry {
    chores: Vec<Chore>,
}

impl ChoreRegistry {
    pub fn new(chores: Vec<Chore>) -> Self {
        Self { chores }
    }

    pub fn seeded(today: NaiveDate) -> Self {
        Self::new(default_chores(today))
    }

    pub fn get(&self, id: &ChoreId) -> Option<&Chore> {
        self.chores.iter().find(|chore| &chore.id == id)
    }

    pub fn contains(&self, id: &ChoreId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chore> {
        self.chores.iter()
    }

    pub fn len(&self) -> usize {
        self.chores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chores.is_empty()
    }

    /// Marks the chore as done on `today`. Unknown ids are a no-op; returns whether a
    /// chore was updated.
    pub fn complete(&mut self, id: &ChoreId, today: NaiveDate) -> bool {
        match self.chores.iter_mut().find(|chore| &chore.id == id) {
            Some(chore) => {
                chore.last_completed = Some(today);
                true
            }
            None => false,
        }
    }

    pub fn grouped(&self, today: NaiveDate) -> Vec<ChoreGroup> {
        Category::ALL
            .into_iter()
            .map(|category| {
                let mut entries: Vec<ChoreView> = self
                    .chores
                    .iter()
                    .filter(|chore| chore.category == category)
                    .map(|chore| ChoreView {
                        chore: chore.clone(),
                        due: due::evaluate(chore, today),
                    })
                    .collect();
                entries.sort_by(compare_views);
                ChoreGroup { category, entries }
            })
            .collect()
    }
}

fn compare_views(a: &ChoreView, b: &ChoreView) -> Ordering {
    a.due
        .status
        .cmp(&b.due.status)
        .then_with(|| a.chore.title.cmp(&b.chore.title))
}

pub fn default_chores(today: NaiveDate) -> Vec<Chore> {
    let ago = |days: i64| shift_days(today, -days);
    vec![
        Chore::new("d1", "Make bed", Category::Daily, today),
        Chore::new("d2", "Dishes / load dishwasher", Category::Daily, today),
        Chore::new("d3", "Wipe kitchen counters", Category::Daily, today),
        Chore::new("d4", "Tidy living room (10 min)", Category::Daily, today),
        Chore::new("d5", "Laundry pickup/fold small batch", Category::Daily, today),
        Chore::new("w1", "Vacuum floors", Category::Weekly, ago(5)),
        Chore::new("w2", "Mop kitchen/bath", Category::Weekly, ago(9)),
        Chore::new("w3", "Clean bathroom sink/mirror", Category::Weekly, ago(6)),
        Chore::new("w4", "Change sheets", Category::Weekly, ago(12)),
        Chore::new("w5", "Take out trash & recycling", Category::Weekly, ago(8)),
        Chore::new("m1", "Deep clean fridge", Category::Monthly, ago(35)),
        Chore::new("m2", "Dust baseboards & vents", Category::Monthly, ago(14)),
        Chore::new("m3", "Clean oven/microwave", Category::Monthly, ago(45)),
        Chore::new("m4", "Wash windows (main rooms)", Category::Monthly, ago(20)),
        Chore::new("m5", "Declutter one drawer/area", Category::Monthly, ago(25)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::due::DueStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()
    }

    #[test]
    fn seeds_fifteen_chores_across_categories() {
        let registry = ChoreRegistry::seeded(today());
        assert_eq!(registry.len(), 15);
        for category in Category::ALL {
            assert_eq!(
                registry.iter().filter(|c| c.category == category).count(),
                5
            );
        }
        let w2 = registry.get(&ChoreId::from("w2")).unwrap();
        assert_eq!(w2.last_completed, Some(shift_days(today(), -9)));
    }

    #[test]
    fn complete_updates_known_chore_only() {
        let mut registry = ChoreRegistry::seeded(today());
        let later = shift_days(today(), 3);
        assert!(registry.complete(&ChoreId::from("m3"), later));
        assert_eq!(
            registry.get(&ChoreId::from("m3")).unwrap().last_completed,
            Some(later)
        );

        let before = registry.clone();
        assert!(!registry.complete(&ChoreId::from("nope"), later));
        assert_eq!(registry, before);
    }

    #[test]
    fn groups_by_category_then_urgency_then_title() {
        let registry = ChoreRegistry::new(vec![
            Chore::new("a", "Zebra", Category::Weekly, shift_days(today(), -1)),
            Chore::new("b", "Apple", Category::Weekly, shift_days(today(), -1)),
            Chore::new("c", "Mango", Category::Weekly, shift_days(today(), -7)),
            Chore::new("d", "Kiwi", Category::Weekly, shift_days(today(), -10)),
            Chore::new("e", "Bed", Category::Daily, today()),
        ]);
        let groups = registry.grouped(today());
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].category, Category::Daily);
        assert_eq!(groups[2].category, Category::Monthly);
        assert!(groups[2].entries.is_empty());

        let weekly: Vec<&str> = groups[1]
            .entries
            .iter()
            .map(|view| view.chore.id.as_str())
            .collect();
        assert_eq!(weekly, vec!["d", "c", "b", "a"]);
        assert_eq!(groups[1].entries[0].due.status, DueStatus::Overdue);
        assert_eq!(groups[1].entries[1].due.status, DueStatus::DueSoon);
    }

    #[test]
    fn category_parses_key_or_label() {
        assert_eq!("weekly".parse::<Category>().unwrap(), Category::Weekly);
        assert_eq!("MONTHLY".parse::<Category>().unwrap(), Category::Monthly);
        assert!("yearly".parse::<Category>().is_err());
    }

    #[test]
    fn unreadable_last_completed_deserializes_as_never() {
        let raw = r#"{"id":"x","title":"X","category":"DAILY","lastCompleted":"soon"}"#;
        let chore: Chore = serde_json::from_str(raw).unwrap();
        assert_eq!(chore.last_completed, None);
    }
}
