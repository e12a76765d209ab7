use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dates::{shift_days, Clock, SystemClock};
use crate::error::{ChoreError, Result};
use crate::session::SessionProvider;

pub const DEFAULT_STATS_DAYS: u32 = 21;
pub const MAX_STATS_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimePeriod {
    Morning,
    Afternoon,
    Night,
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimePeriod::Morning => "MORNING",
            TimePeriod::Afternoon => "AFTERNOON",
            TimePeriod::Night => "NIGHT",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecklistItem {
    pub habit_id: String,
    pub name: String,
    pub period: TimePeriod,
    pub local_time: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitLogRequest {
    pub habit_id: String,
    pub period: TimePeriod,
    pub day: NaiveDate,
    #[serde(default = "default_completed")]
    pub completed: bool,
    #[serde(default)]
    pub note: Option<String>,
}

fn default_completed() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitLogEntry {
    pub habit_id: String,
    pub period: TimePeriod,
    pub day: NaiveDate,
    pub completed: bool,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewHabit {
    pub user_id: String,
    pub name: String,
    pub period: TimePeriod,
    #[serde(default)]
    pub local_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedHabit {
    pub id: String,
    pub name: String,
    pub period: TimePeriod,
    pub local_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsQuery {
    pub user_id: String,
    #[serde(default = "default_stats_days")]
    pub days: u32,
    #[serde(default)]
    pub end_day: Option<NaiveDate>,
}

fn default_stats_days() -> u32 {
    DEFAULT_STATS_DAYS
}

impl StatsQuery {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            days: DEFAULT_STATS_DAYS,
            end_day: None,
        }
    }

    pub fn days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn ending(mut self, day: NaiveDate) -> Self {
        self.end_day = Some(day);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyCompletion {
    pub date: NaiveDate,
    pub completed: u32,
    pub total: u32,
    pub pct: f64,
}

/// Remote habit endpoints: `GET /checklist`, `POST /habit_log`, `POST /habits` and
/// `GET /stats/daily_completion`.
pub trait HabitApi: Send + Sync {
    fn checklist(&self, user_id: &str, day: NaiveDate) -> Result<Vec<ChecklistItem>>;
    fn log_habit(&self, user_id: &str, request: &HabitLogRequest) -> Result<HabitLogEntry>;
    fn create_habit(&self, request: &NewHabit) -> Result<CreatedHabit>;
    fn daily_completion(&self, query: &StatsQuery) -> Result<Vec<DailyCompletion>>;
}

impl<T: HabitApi + ?Sized> HabitApi for Arc<T> {
    fn checklist(&self, user_id: &str, day: NaiveDate) -> Result<Vec<ChecklistItem>> {
        (**self).checklist(user_id, day)
    }

    fn log_habit(&self, user_id: &str, request: &HabitLogRequest) -> Result<HabitLogEntry> {
        (**self).log_habit(user_id, request)
    }

    fn create_habit(&self, request: &NewHabit) -> Result<CreatedHabit> {
        (**self).create_habit(request)
    }

    fn daily_completion(&self, query: &StatsQuery) -> Result<Vec<DailyCompletion>> {
        (**self).daily_completion(query)
    }
}

pub fn parse_local_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ChoreError::InvalidTime(raw.to_string()))
}

#[derive(Debug, Clone)]
struct HabitRow {
    id: String,
    user_id: String,
    name: String,
    archived: bool,
    period: TimePeriod,
    local_time: Option<NaiveTime>,
}

#[derive(Debug, Clone)]
struct LogRow {
    completed: bool,
    note: Option<String>,
}

#[derive(Debug, Default)]
struct HabitTables {
    habits: Vec<HabitRow>,
    logs: HashMap<(String, NaiveDate, TimePeriod), LogRow>,
    next_id: u64,
}

/// Process-local habit backend with the same contract as the remote service.
pub struct InMemoryHabitApi {
    tables: RwLock<HabitTables>,
    clock: Arc<dyn Clock>,
}

impl InMemoryHabitApi {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: RwLock::new(HabitTables::default()),
            clock,
        }
    }

    /// Hides a habit from checklists and statistics.
    pub fn archive(&self, habit_id: &str) -> bool {
        let mut tables = self.tables.write();
        match tables.habits.iter_mut().find(|habit| habit.id == habit_id) {
            Some(habit) => {
                habit.archived = true;
                true
            }
            None => false,
        }
    }
}

impl Default for InMemoryHabitApi {
    fn default() -> Self {
        Self::new()
    }
}

impl HabitApi for InMemoryHabitApi {
    fn checklist(&self, user_id: &str, day: NaiveDate) -> Result<Vec<ChecklistItem>> {
        let tables = self.tables.read();
        let latest = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default();
        let mut rows: Vec<&HabitRow> = tables
            .habits
            .iter()
            .filter(|habit| habit.user_id == user_id && !habit.archived)
            .collect();
        rows.sort_by(|a, b| {
            a.period
                .cmp(&b.period)
                .then_with(|| {
                    a.local_time
                        .unwrap_or(latest)
                        .cmp(&b.local_time.unwrap_or(latest))
                })
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(rows
            .into_iter()
            .map(|habit| ChecklistItem {
                habit_id: habit.id.clone(),
                name: habit.name.clone(),
                period: habit.period,
                local_time: habit.local_time.map(|t| t.format("%H:%M").to_string()),
                completed: tables
                    .logs
                    .get(&(habit.id.clone(), day, habit.period))
                    .map(|log| log.completed)
                    .unwrap_or(false),
            })
            .collect())
    }

    fn log_habit(&self, user_id: &str, request: &HabitLogRequest) -> Result<HabitLogEntry> {
        let mut tables = self.tables.write();
        let owned = tables
            .habits
            .iter()
            .any(|habit| habit.id == request.habit_id && habit.user_id == user_id);
        if !owned {
            return Err(ChoreError::NotFound(format!("habit `{}`", request.habit_id)));
        }
        let key = (request.habit_id.clone(), request.day, request.period);
        let note = request
            .note
            .clone()
            .or_else(|| tables.logs.get(&key).and_then(|log| log.note.clone()));
        tables.logs.insert(
            key,
            LogRow {
                completed: request.completed,
                note: note.clone(),
            },
        );
        debug!(habit_id = %request.habit_id, day = %request.day, completed = request.completed, "habit log upserted");
        Ok(HabitLogEntry {
            habit_id: request.habit_id.clone(),
            period: request.period,
            day: request.day,
            completed: request.completed,
            note,
        })
    }

    fn create_habit(&self, request: &NewHabit) -> Result<CreatedHabit> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ChoreError::InvalidRequest("habit name is empty".into()));
        }
        let local_time = request
            .local_time
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_local_time)
            .transpose()?;
        let mut tables = self.tables.write();
        tables.next_id += 1;
        let id = format!("h{}", tables.next_id);
        tables.habits.push(HabitRow {
            id: id.clone(),
            user_id: request.user_id.clone(),
            name: name.to_string(),
            archived: false,
            period: request.period,
            local_time,
        });
        Ok(CreatedHabit {
            id,
            name: name.to_string(),
            period: request.period,
            local_time: local_time.map(|t| t.format("%H:%M").to_string()),
        })
    }

    fn daily_completion(&self, query: &StatsQuery) -> Result<Vec<DailyCompletion>> {
        if query.days == 0 || query.days > MAX_STATS_DAYS {
            return Err(ChoreError::InvalidRequest(format!(
                "days must be between 1 and {MAX_STATS_DAYS}"
            )));
        }
        let end = query.end_day.unwrap_or_else(|| self.clock.today());
        let tables = self.tables.read();
        let slots: Vec<&HabitRow> = tables
            .habits
            .iter()
            .filter(|habit| habit.user_id == query.user_id && !habit.archived)
            .collect();
        let total = slots.len() as u32;

        let start = shift_days(end, -(i64::from(query.days) - 1));
        let mut days = Vec::with_capacity(query.days as usize);
        for offset in 0..i64::from(query.days) {
            let date = shift_days(start, offset);
            let completed = slots
                .iter()
                .filter(|habit| {
                    tables
                        .logs
                        .get(&(habit.id.clone(), date, habit.period))
                        .is_some_and(|log| log.completed)
                })
                .count() as u32;
            let pct = if total > 0 {
                f64::from(completed) / f64::from(total)
            } else {
                0.0
            };
            days.push(DailyCompletion {
                date,
                completed,
                total,
                pct,
            });
        }
        Ok(days)
    }
}

/// Today's habit checklist as shown to the signed-in user. Local state only changes
/// after the backend accepts a write.
pub struct ChecklistPanel<A: HabitApi> {
    api: A,
    user_id: String,
    day: NaiveDate,
    items: Vec<ChecklistItem>,
    message: Option<String>,
}

impl<A: HabitApi> ChecklistPanel<A> {
    pub fn new(api: A, user_id: impl Into<String>, day: NaiveDate) -> Self {
        Self {
            api,
            user_id: user_id.into(),
            day,
            items: Vec::new(),
            message: None,
        }
    }

    /// `None` when nobody is signed in.
    pub fn for_session(api: A, session: &dyn SessionProvider, day: NaiveDate) -> Option<Self> {
        session
            .current_user()
            .map(|user| Self::new(api, user.id, day))
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    /// Transient error text from the last failed call, cleared on read.
    pub fn take_message(&mut self) -> Option<String> {
        self.message.take()
    }

    pub fn progress(&self) -> (usize, usize) {
        let done = self.items.iter().filter(|item| item.completed).count();
        (done, self.items.len())
    }

    pub fn refresh(&mut self) -> Result<()> {
        match self.api.checklist(&self.user_id, self.day) {
            Ok(items) => {
                self.items = items;
                Ok(())
            }
            Err(err) => {
                warn!(%err, "checklist refresh failed");
                self.message = Some(format!("Could not load checklist: {err}"));
                Err(err)
            }
        }
    }

    pub fn toggle(&mut self, habit_id: &str) -> Result<bool> {
        let Some(index) = self.items.iter().position(|item| item.habit_id == habit_id) else {
            return Err(ChoreError::NotFound(format!("habit `{habit_id}`")));
        };
        let item = &self.items[index];
        let request = HabitLogRequest {
            habit_id: item.habit_id.clone(),
            period: item.period,
            day: self.day,
            completed: !item.completed,
            note: None,
        };
        match self.api.log_habit(&self.user_id, &request) {
            Ok(entry) => {
                self.items[index].completed = entry.completed;
                Ok(entry.completed)
            }
            Err(err) => {
                warn!(%err, habit_id, "habit log failed");
                self.message = Some(format!("Could not save: {err}"));
                Err(err)
            }
        }
    }

    pub fn add_habit(
        &mut self,
        name: &str,
        period: TimePeriod,
        local_time: Option<&str>,
    ) -> Result<CreatedHabit> {
        let request = NewHabit {
            user_id: self.user_id.clone(),
            name: name.to_string(),
            period,
            local_time: local_time.map(str::to_string),
        };
        let created = self.api.create_habit(&request).inspect_err(|err| {
            self.message = Some(format!("Could not create habit: {err}"));
        })?;
        // The habit exists either way; a failed reload is left in `message`.
        if self.refresh().is_err() {
            debug!(habit = %created.id, "created habit but could not reload checklist");
        }
        Ok(created)
    }

    pub fn stats(&self, days: u32) -> Result<Vec<DailyCompletion>> {
        self.api
            .daily_completion(&StatsQuery::new(self.user_id.clone()).days(days).ending(self.day))
    }
}
