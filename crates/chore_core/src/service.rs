use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use crate::board::{ChoreBoard, DropOutcome, Region};
use crate::chore::{Chore, ChoreGroup, ChoreId};
use crate::completion::{CompletionGroup, CompletionRecord};
use crate::dates::{Clock, SystemClock};
use crate::due::{self, DueState};
use crate::storage::{FileStore, MemoryStore, Persistence, StateStore, DEFAULT_STORAGE_KEY};

/// Owns the board for one session. Every change is persisted before it becomes visible.
pub struct ChoreService {
    board: RwLock<ChoreBoard>,
    persistence: Persistence,
    clock: Arc<dyn Clock>,
    loaded_on: RwLock<NaiveDate>,
}

pub struct ChoreServiceBuilder {
    store: Option<Box<dyn StateStore>>,
    key: String,
    clock: Arc<dyn Clock>,
}

impl ChoreServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            key: DEFAULT_STORAGE_KEY.to_string(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_store(mut self, store: Box<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_state_dir(self, dir: impl AsRef<Path>) -> Self {
        self.with_store(Box::new(FileStore::new(dir)))
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<ChoreService> {
        let store = self
            .store
            .unwrap_or_else(|| Box::new(MemoryStore::new()));
        let persistence = Persistence::with_key(store, self.key);
        let today = self.clock.today();
        let board = persistence.load(today);
        persistence
            .save(&board)
            .context("failed to write initial board")?;
        Ok(ChoreService {
            board: RwLock::new(board),
            persistence,
            clock: self.clock,
            loaded_on: RwLock::new(today),
        })
    }
}

impl Default for ChoreServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChoreService {
    pub fn builder() -> ChoreServiceBuilder {
        ChoreServiceBuilder::new()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn board(&self) -> ChoreBoard {
        self.board.read().clone()
    }

    pub fn chore(&self, id: &ChoreId) -> Option<Chore> {
        self.board.read().chores.get(id).cloned()
    }

    pub fn due_state(&self, id: &ChoreId) -> Option<DueState> {
        let today = self.today();
        self.board
            .read()
            .chores
            .get(id)
            .map(|chore| due::evaluate(chore, today))
    }

    pub fn grouped_chores(&self) -> Vec<ChoreGroup> {
        let today = self.today();
        self.board.read().grouped_chores(today)
    }

    pub fn planned(&self) -> Vec<Chore> {
        self.board
            .read()
            .planned_chores()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn is_planned(&self, id: &ChoreId) -> bool {
        self.board.read().is_planned(id)
    }

    pub fn completed_today(&self) -> Vec<CompletionRecord> {
        let today = self.today();
        self.board
            .read()
            .completions
            .iter()
            .filter(|record| record.date == today)
            .cloned()
            .collect()
    }

    /// Today's completions only, even before `refresh_day` has run.
    pub fn grouped_completions(&self) -> Vec<CompletionGroup> {
        let today = self.today();
        self.board.read().grouped_completions(today)
    }

    #[instrument(skip(self))]
    pub fn add_to_plan(&self, id: &ChoreId) -> Result<bool> {
        self.mutate(|board, _, _| board.add_to_plan(id))
    }

    #[instrument(skip(self))]
    pub fn remove_from_plan(&self, id: &ChoreId) -> Result<bool> {
        self.mutate(|board, _, _| board.remove_from_plan(id))
    }

    #[instrument(skip(self))]
    pub fn record_completion(&self, id: &ChoreId) -> Result<bool> {
        self.mutate(|board, today, time_label| board.record_completion(id, today, time_label))
    }

    /// Handles a drop of `payload` onto `region`.
    #[instrument(skip(self))]
    pub fn drop_on(&self, region: Region, payload: &str) -> Result<DropOutcome> {
        let mut outcome = DropOutcome::Unchanged;
        self.mutate(|board, today, time_label| {
            outcome = board.apply_drop(region, payload, today, time_label);
            outcome.changed()
        })?;
        if let DropOutcome::Applied(step) = outcome {
            info!(%region, ?step, "drop applied");
        }
        Ok(outcome)
    }

    /// Re-applies the same-day completion filter once the clock has moved past the day
    /// the board was loaded or last refreshed on. Returns the number of records dropped.
    #[instrument(skip(self))]
    pub fn refresh_day(&self) -> Result<usize> {
        let today = self.today();
        if *self.loaded_on.read() == today {
            return Ok(0);
        }
        let (_, dropped) = self.commit(|_, _, _| false)?;
        *self.loaded_on.write() = today;
        info!(%today, dropped, "day rolled over");
        Ok(dropped)
    }

    /// Replaces the board with the seeded defaults.
    #[instrument(skip(self))]
    pub fn reset(&self) -> Result<()> {
        let today = self.today();
        let fresh = ChoreBoard::seeded(today);
        let mut board = self.board.write();
        self.persistence
            .save(&fresh)
            .context("failed to persist reset board")?;
        *board = fresh;
        *self.loaded_on.write() = today;
        info!("board reset to defaults");
        Ok(())
    }

    /// Applies `change` to a copy of the board and commits it only after a successful
    /// save. `change` reports whether anything changed.
    fn mutate(
        &self,
        change: impl FnOnce(&mut ChoreBoard, NaiveDate, String) -> bool,
    ) -> Result<bool> {
        self.commit(change).map(|(changed, _)| changed)
    }

    /// Like `mutate`, but first drops completions dated before today so a save never
    /// carries another day's records. Returns whether `change` changed anything and how
    /// many stale records were dropped.
    fn commit(
        &self,
        change: impl FnOnce(&mut ChoreBoard, NaiveDate, String) -> bool,
    ) -> Result<(bool, usize)> {
        let today = self.today();
        let mut board = self.board.write();
        let mut next = board.clone();
        let stale = next.normalize(today);
        let changed = change(&mut next, today, self.clock.time_label());
        if !changed && stale == 0 {
            return Ok((false, 0));
        }
        self.persistence
            .save(&next)
            .with_context(|| format!("failed to persist board under `{}`", self.persistence.key()))?;
        *board = next;
        if stale > 0 {
            *self.loaded_on.write() = today;
            debug!(%today, stale, "dropped completions from earlier days");
        }
        Ok((changed, stale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::DragPayload;
    use crate::dates::FixedClock;
    use crate::error::ChoreError;

    struct FailingStore;

    impl StateStore for FailingStore {
        fn get(&self, _key: &str) -> crate::error::Result<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> crate::error::Result<()> {
            Err(ChoreError::Io(std::io::Error::other("disk full")))
        }

        fn remove(&self, _key: &str) -> crate::error::Result<()> {
            Ok(())
        }
    }

    /// Shares one `MemoryStore` between the service and the test.
    struct SharedStore(Arc<MemoryStore>);

    impl StateStore for SharedStore {
        fn get(&self, key: &str) -> crate::error::Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> crate::error::Result<()> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> crate::error::Result<()> {
            self.0.remove(key)
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()
    }

    #[test]
    fn failed_save_leaves_state_unchanged() {
        let store = Box::new(FailingStore);
        let persistence = Persistence::new(store);
        let service = ChoreService {
            board: RwLock::new(ChoreBoard::seeded(day())),
            persistence,
            clock: Arc::new(FixedClock::new(day())),
            loaded_on: RwLock::new(day()),
        };
        let before = service.board();
        assert!(service.record_completion(&ChoreId::from("w2")).is_err());
        assert_eq!(service.board(), before);
    }

    #[test]
    fn drop_flow_updates_views() {
        let service = ChoreService::builder()
            .with_clock(Arc::new(FixedClock::new(day()).with_time_label("18:05:00")))
            .build()
            .unwrap();
        let payload = DragPayload::new("w2").to_json();
        service.drop_on(Region::Plan, &payload).unwrap();
        assert_eq!(service.planned().len(), 1);

        service.drop_on(Region::Completed, &payload).unwrap();
        assert!(service.planned().is_empty());
        let done = service.completed_today();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].time, "18:05:00");
        assert_eq!(
            service.chore(&ChoreId::from("w2")).unwrap().last_completed,
            Some(day())
        );
    }

    #[test]
    fn refresh_day_drops_yesterdays_completions() {
        let clock = Arc::new(FixedClock::new(day()));
        let service = ChoreService::builder()
            .with_clock(clock.clone())
            .build()
            .unwrap();
        service.record_completion(&ChoreId::from("d1")).unwrap();
        assert_eq!(service.refresh_day().unwrap(), 0);

        clock.advance(1);
        assert_eq!(service.refresh_day().unwrap(), 1);
        assert!(service.grouped_completions().iter().all(|g| g.records.is_empty()));
    }

    #[test]
    fn mutation_after_midnight_drops_yesterdays_completions() {
        let clock = Arc::new(FixedClock::new(day()));
        let store = Arc::new(MemoryStore::new());
        let service = ChoreService::builder()
            .with_store(Box::new(SharedStore(store.clone())))
            .with_clock(clock.clone())
            .build()
            .unwrap();
        service.record_completion(&ChoreId::from("d1")).unwrap();
        assert_eq!(service.board().completions.len(), 1);

        clock.advance(1);
        assert!(service.grouped_completions().iter().all(|g| g.records.is_empty()));
        let payload = DragPayload::new("w1").to_json();
        service.drop_on(Region::Plan, &payload).unwrap();

        assert!(service.board().completions.is_empty());
        assert!(service.is_planned(&ChoreId::from("w1")));
        let saved = store.get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(value["completed"].as_array().map(Vec::len), Some(0));
        assert_eq!(service.refresh_day().unwrap(), 0);
    }

    #[test]
    fn noop_change_after_midnight_still_saves_the_trimmed_log() {
        let clock = Arc::new(FixedClock::new(day()));
        let service = ChoreService::builder()
            .with_clock(clock.clone())
            .build()
            .unwrap();
        service.record_completion(&ChoreId::from("d2")).unwrap();
        clock.advance(1);
        assert!(!service.remove_from_plan(&ChoreId::from("d2")).unwrap());
        assert!(service.board().completions.is_empty());
    }

    #[test]
    fn noop_mutations_report_false() {
        let service = ChoreService::builder()
            .with_clock(Arc::new(FixedClock::new(day())))
            .build()
            .unwrap();
        assert!(!service.remove_from_plan(&ChoreId::from("d1")).unwrap());
        assert!(!service.add_to_plan(&ChoreId::from("missing")).unwrap());
        assert!(service.add_to_plan(&ChoreId::from("d1")).unwrap());
        assert!(!service.add_to_plan(&ChoreId::from("d1")).unwrap());
    }
}
