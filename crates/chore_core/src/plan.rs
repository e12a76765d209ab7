use serde::{Deserialize, Serialize};

use crate::chore::ChoreId;

/// Chores picked for today, in the order they were added.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Plan {
    ids: Vec<ChoreId>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the id was already planned.
    pub fn add(&mut self, id: ChoreId) -> bool {
        if self.ids.contains(&id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Returns `false` when the id was not planned.
    pub fn remove(&mut self, id: &ChoreId) -> bool {
        let before = self.ids.len();
        self.ids.retain(|planned| planned != id);
        self.ids.len() != before
    }

    pub fn is_planned(&self, id: &ChoreId) -> bool {
        self.ids.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChoreId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drops duplicates left behind by hand-edited state, keeping first occurrences.
    pub(crate) fn dedup(&mut self) {
        let mut seen = Vec::with_capacity(self.ids.len());
        self.ids.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
    }
}

impl FromIterator<ChoreId> for Plan {
    fn from_iter<I: IntoIterator<Item = ChoreId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
