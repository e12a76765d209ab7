use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chore::{Chore, ChoreGroup, ChoreId, ChoreRegistry};
use crate::completion::{CompletionGroup, CompletionLog};
use crate::error::ChoreError;
use crate::plan::Plan;

/// Drop targets on the board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Master,
    Plan,
    Completed,
}

impl FromStr for Region {
    type Err = ChoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "master" => Ok(Region::Master),
            "plan" => Ok(Region::Plan),
            "completed" | "done" => Ok(Region::Completed),
            other => Err(ChoreError::InvalidRequest(format!("unknown region `{other}`"))),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Region::Master => "master",
            Region::Plan => "plan",
            Region::Completed => "completed",
        })
    }
}

/// Which pane currently owns a chore. Plan membership wins over a same-day completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoreState {
    Unplanned,
    Planned,
    CompletedToday,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    AddToPlan,
    RemoveFromPlan,
    Complete,
}

/// The legal moves of the board. `None` means the drop leaves state untouched.
pub fn transition(state: ChoreState, region: Region) -> Option<Transition> {
    match (state, region) {
        (ChoreState::Unplanned | ChoreState::CompletedToday, Region::Plan) => {
            Some(Transition::AddToPlan)
        }
        (ChoreState::Planned, Region::Master) => Some(Transition::RemoveFromPlan),
        (_, Region::Completed) => Some(Transition::Complete),
        (ChoreState::Planned, Region::Plan) => None,
        (ChoreState::Unplanned | ChoreState::CompletedToday, Region::Master) => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    MalformedPayload,
    UnknownChore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Applied(Transition),
    Unchanged,
    Ignored(IgnoreReason),
}

impl DropOutcome {
    pub fn changed(self) -> bool {
        matches!(self, DropOutcome::Applied(_))
    }
}

/// What a drag source hands to a drop target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DragPayload {
    pub id: ChoreId,
}

impl DragPayload {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ChoreId::new(id),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str::<DragPayload>(raw)
            .ok()
            .filter(|payload| !payload.id.as_str().is_empty())
    }

    pub fn to_json(&self) -> String {
        serde_json::json!({ "id": self.id }).to_string()
    }
}

/// Registry, plan and completion log, persisted and mutated as one unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoreBoard {
    pub chores: ChoreRegistry,
    pub plan: Plan,
    #[serde(rename = "completed")]
    pub completions: CompletionLog,
}

impl ChoreBoard {
    pub fn new(chores: ChoreRegistry, plan: Plan, completions: CompletionLog) -> Self {
        Self {
            chores,
            plan,
            completions,
        }
    }

    pub fn seeded(today: NaiveDate) -> Self {
        Self::new(ChoreRegistry::seeded(today), Plan::new(), CompletionLog::new())
    }

    pub fn state_of(&self, id: &ChoreId, today: NaiveDate) -> Option<ChoreState> {
        if !self.chores.contains(id) {
            return None;
        }
        Some(if self.plan.is_planned(id) {
            ChoreState::Planned
        } else if self.completions.completed_on(id, today) {
            ChoreState::CompletedToday
        } else {
            ChoreState::Unplanned
        })
    }

    pub fn add_to_plan(&mut self, id: &ChoreId) -> bool {
        if !self.chores.contains(id) {
            return false;
        }
        self.plan.add(id.clone())
    }

    pub fn remove_from_plan(&mut self, id: &ChoreId) -> bool {
        self.plan.remove(id)
    }

    pub fn is_planned(&self, id: &ChoreId) -> bool {
        self.plan.is_planned(id)
    }

    /// Logs the completion, drops the chore from the plan and moves its last-completed
    /// day to `today`. All three happen or, for an unknown id, none do.
    pub fn record_completion(
        &mut self,
        id: &ChoreId,
        today: NaiveDate,
        time_label: impl Into<String>,
    ) -> bool {
        let Some(chore) = self.chores.get(id).cloned() else {
            return false;
        };
        self.completions.record(&chore, today, time_label);
        self.plan.remove(id);
        self.chores.complete(id, today);
        true
    }

    pub fn apply(
        &mut self,
        region: Region,
        id: &ChoreId,
        today: NaiveDate,
        time_label: impl Into<String>,
    ) -> DropOutcome {
        let Some(state) = self.state_of(id, today) else {
            debug!(%id, %region, "ignoring drop of unknown chore");
            return DropOutcome::Ignored(IgnoreReason::UnknownChore);
        };
        let Some(step) = transition(state, region) else {
            return DropOutcome::Unchanged;
        };
        match step {
            Transition::AddToPlan => {
                self.add_to_plan(id);
            }
            Transition::RemoveFromPlan => {
                self.remove_from_plan(id);
            }
            Transition::Complete => {
                self.record_completion(id, today, time_label);
            }
        }
        DropOutcome::Applied(step)
    }

    /// Routes a raw drag payload to `region`.
    pub fn apply_drop(
        &mut self,
        region: Region,
        payload: &str,
        today: NaiveDate,
        time_label: impl Into<String>,
    ) -> DropOutcome {
        match DragPayload::parse(payload) {
            Some(payload) => self.apply(region, &payload.id, today, time_label),
            None => {
                debug!(%region, "ignoring drop with unreadable payload");
                DropOutcome::Ignored(IgnoreReason::MalformedPayload)
            }
        }
    }

    /// Drops completions from other days and duplicate plan entries; returns how many
    /// completion records were discarded.
    pub fn normalize(&mut self, today: NaiveDate) -> usize {
        self.plan.dedup();
        self.completions.retain_day(today)
    }

    pub fn grouped_chores(&self, today: NaiveDate) -> Vec<ChoreGroup> {
        self.chores.grouped(today)
    }

    pub fn grouped_completions(&self, day: NaiveDate) -> Vec<CompletionGroup> {
        self.completions.grouped(day)
    }

    /// Planned chores in plan order; ids that no longer resolve are skipped.
    pub fn planned_chores(&self) -> Vec<&Chore> {
        self.plan
            .iter()
            .filter_map(|id| self.chores.get(id))
            .collect()
    }
}
