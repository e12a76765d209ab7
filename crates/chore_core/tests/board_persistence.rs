use std::fs;
use std::sync::Arc;

use chore_core::dates::{shift_days, FixedClock};
use chore_core::due::DueStatus;
use chore_core::storage::{FileStore, Persistence, DEFAULT_STORAGE_KEY};
use chore_core::{ChoreBoard, ChoreId, ChoreService, DragPayload, DropOutcome, Region};
use chrono::NaiveDate;
use serde_json::Value;
use tempfile::tempdir;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 7).unwrap()
}

#[test]
fn board_survives_restart_on_disk() {
    let temp = tempdir().expect("tempdir");
    let clock = Arc::new(FixedClock::new(day()));

    let service = ChoreService::builder()
        .with_state_dir(temp.path())
        .with_clock(clock.clone())
        .build()
        .expect("build chore service");
    assert!(temp.path().join(format!("{DEFAULT_STORAGE_KEY}.json")).exists());

    let d1 = DragPayload::new("d1").to_json();
    let w4 = DragPayload::new("w4").to_json();
    service.drop_on(Region::Plan, &d1).expect("plan d1");
    service.drop_on(Region::Plan, &w4).expect("plan w4");
    service.drop_on(Region::Completed, &d1).expect("complete d1");
    let before = service.board();
    drop(service);

    let reopened = ChoreService::builder()
        .with_state_dir(temp.path())
        .with_clock(clock)
        .build()
        .expect("reopen chore service");
    assert_eq!(reopened.board(), before);
    assert!(reopened.is_planned(&ChoreId::from("w4")));
    assert!(!reopened.is_planned(&ChoreId::from("d1")));
    assert_eq!(reopened.completed_today().len(), 1);
}

#[test]
fn next_day_load_forgets_completions_but_keeps_progress() {
    let temp = tempdir().expect("tempdir");
    let clock = Arc::new(FixedClock::new(day()));
    let service = ChoreService::builder()
        .with_state_dir(temp.path())
        .with_clock(clock.clone())
        .build()
        .expect("build chore service");
    service
        .drop_on(Region::Completed, &DragPayload::new("w1").to_json())
        .expect("complete w1");
    service
        .drop_on(Region::Plan, &DragPayload::new("m3").to_json())
        .expect("plan m3");
    drop(service);

    clock.advance(1);
    let reopened = ChoreService::builder()
        .with_state_dir(temp.path())
        .with_clock(clock)
        .build()
        .expect("reopen chore service");
    assert!(reopened.completed_today().is_empty());
    assert!(reopened.is_planned(&ChoreId::from("m3")));
    let w1 = reopened.chore(&ChoreId::from("w1")).expect("w1 exists");
    assert_eq!(w1.last_completed, Some(day()));
    assert_eq!(
        reopened.due_state(&ChoreId::from("w1")).map(|s| s.status),
        Some(DueStatus::Ok)
    );
}

#[test]
fn corrupt_state_file_reseeds() {
    let temp = tempdir().expect("tempdir");
    let store = FileStore::new(temp.path());
    let path = store.path_for(DEFAULT_STORAGE_KEY).expect("path");
    fs::write(&path, "]]]").expect("write garbage");

    let board = Persistence::new(Box::new(store)).load(day());
    assert_eq!(board, ChoreBoard::seeded(day()));
}

#[test]
fn grouped_view_reflects_completion() {
    let service = ChoreService::builder()
        .with_clock(Arc::new(FixedClock::new(day())))
        .build()
        .expect("build chore service");
    let weekly = &service.grouped_chores()[1];
    assert_eq!(weekly.entries[0].chore.id.as_str(), "w4");
    assert_eq!(weekly.entries[0].due.status, DueStatus::Overdue);

    let outcome = service
        .drop_on(Region::Completed, &DragPayload::new("w4").to_json())
        .expect("complete w4");
    assert!(outcome.changed());
    let weekly = &service.grouped_chores()[1];
    let w4 = weekly
        .entries
        .iter()
        .find(|view| view.chore.id.as_str() == "w4")
        .expect("w4 listed");
    assert_eq!(w4.due.status, DueStatus::Ok);
    assert_eq!(w4.due.next_due, Some(shift_days(day(), 7)));

    assert_eq!(
        service.drop_on(Region::Plan, "not a payload").expect("ignored"),
        DropOutcome::Ignored(chore_core::board::IgnoreReason::MalformedPayload)
    );
}

#[test]
fn mutation_past_midnight_saves_only_todays_completions() {
    let temp = tempdir().expect("tempdir");
    let clock = Arc::new(FixedClock::new(day()));
    let service = ChoreService::builder()
        .with_state_dir(temp.path())
        .with_clock(clock.clone())
        .build()
        .expect("build chore service");
    service
        .drop_on(Region::Completed, &DragPayload::new("d1").to_json())
        .expect("complete d1");

    clock.advance(1);
    service
        .drop_on(Region::Plan, &DragPayload::new("w1").to_json())
        .expect("plan w1");
    assert!(service.board().completions.is_empty());
    assert!(service
        .grouped_completions()
        .iter()
        .all(|group| group.records.is_empty()));

    let path = temp.path().join(format!("{DEFAULT_STORAGE_KEY}.json"));
    let saved: Value = serde_json::from_str(&fs::read_to_string(path).expect("read state"))
        .expect("state is json");
    assert_eq!(saved["completed"], Value::Array(Vec::new()));
    assert_eq!(saved["plan"][0], "w1");
}

#[test]
fn loads_board_saved_by_the_browser_app() {
    let temp = tempdir().expect("tempdir");
    let raw = r#"{
        "chores": [
            {"id":"w1","title":"Vacuum floors","category":"WEEKLY","lastCompleted":"2025-11-05"},
            {"id":"d1","title":"Make bed","category":"DAILY","lastCompleted":"2025-11-07"}
        ],
        "plan": ["w1"],
        "completed": [
            {"id":"d1","title":"Make bed","category":"DAILY","dateISO":"2025-11-07","time":"7:42:10 AM"},
            {"id":"w1","title":"Vacuum floors","category":"WEEKLY","dateISO":"2025-11-06","time":"6:00:00 PM"}
        ]
    }"#;
    fs::write(temp.path().join(format!("{DEFAULT_STORAGE_KEY}.json")), raw)
        .expect("write state");

    let service = ChoreService::builder()
        .with_state_dir(temp.path())
        .with_clock(Arc::new(FixedClock::new(day())))
        .build()
        .expect("build chore service");
    let w1 = service.chore(&ChoreId::from("w1")).expect("w1 restored");
    assert_eq!(w1.last_completed, Some(shift_days(day(), -2)));
    assert!(service.is_planned(&ChoreId::from("w1")));
    let done = service.completed_today();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].chore_id.as_str(), "d1");
    assert_eq!(done[0].time, "7:42:10 AM");
}

#[test]
fn one_bad_chore_does_not_reseed_the_rest() {
    let temp = tempdir().expect("tempdir");
    let raw = r#"{
        "chores": [
            {"id":"w1","title":"Vacuum floors","category":"WEEKLY","lastCompleted":"2025-11-05"},
            {"id":"q","title":"Clean gutters","category":"YEARLY","lastCompleted":"2025-01-01"}
        ],
        "plan": [],
        "completed": [
            {"id":"w1","title":"Vacuum floors","category":"WEEKLY","dateISO":"2025-11-07","time":"09:00:00"},
            {"id":"w1","title":"Vacuum floors","dateISO":"2025-11-07"}
        ]
    }"#;
    fs::write(temp.path().join(format!("{DEFAULT_STORAGE_KEY}.json")), raw)
        .expect("write state");

    let service = ChoreService::builder()
        .with_state_dir(temp.path())
        .with_clock(Arc::new(FixedClock::new(day())))
        .build()
        .expect("build chore service");
    let board = service.board();
    assert_eq!(board.chores.len(), 1);
    assert_eq!(
        board.chores.get(&ChoreId::from("w1")).and_then(|c| c.last_completed),
        Some(shift_days(day(), -2))
    );
    assert!(board.chores.get(&ChoreId::from("q")).is_none());
    assert_eq!(service.completed_today().len(), 1);
}
