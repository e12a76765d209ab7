use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chore_core::board::{DropOutcome, IgnoreReason};
use chore_core::dates::{Clock, SystemClock};
use chore_core::due::DueState;
use chore_core::storage::DEFAULT_STORAGE_KEY;
use chore_core::{ChoreService, DragPayload, Region};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) state_dir: PathBuf,
    pub(crate) storage_key: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("CHORES_STATE_DIR") {
            if !dir.trim().is_empty() {
                config.state_dir = PathBuf::from(dir);
            }
        }
        if let Ok(key) = std::env::var("CHORES_STORAGE_KEY") {
            if !key.trim().is_empty() {
                config.storage_key = key.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn state_dir(&self) -> &PathBuf {
        &self.state_dir
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    fn apply_cli(&mut self, cli: &Cli) {
        if let Some(dir) = &cli.state_dir {
            self.state_dir = dir.clone();
        }
        if let Some(key) = &cli.key {
            self.storage_key = key.clone();
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let state_dir = std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share/chores"))
            .unwrap_or_else(|| PathBuf::from(".chores"));
        Self {
            state_dir,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "chores", version, about = "Plan and track household chores")]
pub struct Cli {
    /// Directory holding the saved board
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,
    /// Storage key of the saved board
    #[arg(long, global = true)]
    pub key: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Master list grouped by category, most urgent first
    #[command(alias = "ls")]
    List,
    /// Today's plan and completions
    Today,
    /// Add a chore to today's plan
    Plan { id: String },
    /// Take a chore off today's plan
    Unplan { id: String },
    /// Mark a chore done today
    #[command(alias = "complete")]
    Done { id: String },
    /// Drop a raw drag payload (`{"id": "..."}`) onto master, plan or completed
    Drop { region: Region, payload: String },
    /// Replace the board with the default chores
    Reset,
}

pub fn run(config: AppConfig, cli: Cli) -> Result<String> {
    run_with_clock(config, cli, Arc::new(SystemClock))
}

pub fn run_with_clock(mut config: AppConfig, cli: Cli, clock: Arc<dyn Clock>) -> Result<String> {
    config.apply_cli(&cli);
    info!(
        state_dir = %config.state_dir.display(),
        key = %config.storage_key,
        "opening chore board"
    );
    let service = ChoreService::builder()
        .with_state_dir(&config.state_dir)
        .with_key(config.storage_key.clone())
        .with_clock(clock)
        .build()
        .context("failed to initialize chore service")?;

    let command = cli.command.unwrap_or(Command::List);
    debug!(?command, "dispatching");
    match command {
        Command::List => Ok(render_master(&service)),
        Command::Today => Ok(render_today(&service)),
        Command::Plan { id } => {
            let outcome = service.drop_on(Region::Plan, &DragPayload::new(id.clone()).to_json())?;
            Ok(describe(&id, outcome, "planned for today"))
        }
        Command::Unplan { id } => {
            let outcome =
                service.drop_on(Region::Master, &DragPayload::new(id.clone()).to_json())?;
            Ok(describe(&id, outcome, "removed from today's plan"))
        }
        Command::Done { id } => {
            let outcome =
                service.drop_on(Region::Completed, &DragPayload::new(id.clone()).to_json())?;
            Ok(describe(&id, outcome, "done for today"))
        }
        Command::Drop { region, payload } => {
            let outcome = service.drop_on(region, &payload)?;
            let id = DragPayload::parse(&payload)
                .map(|payload| payload.id.to_string())
                .unwrap_or_default();
            Ok(describe(&id, outcome, &format!("moved to {region}")))
        }
        Command::Reset => {
            service.reset()?;
            Ok("Board reset to the default chores\n".to_string())
        }
    }
}

fn describe(id: &str, outcome: DropOutcome, applied: &str) -> String {
    match outcome {
        DropOutcome::Applied(_) => format!("{id}: {applied}\n"),
        DropOutcome::Unchanged => format!("{id}: nothing to change\n"),
        DropOutcome::Ignored(IgnoreReason::UnknownChore) => {
            "No such chore, nothing changed\n".to_string()
        }
        DropOutcome::Ignored(IgnoreReason::MalformedPayload) => {
            "Drop payload could not be read, nothing changed\n".to_string()
        }
    }
}

fn render_master(service: &ChoreService) -> String {
    let today = service.today();
    let mut out = String::new();
    for group in service.grouped_chores() {
        let _ = writeln!(
            out,
            "{} (every {} day{})",
            group.category,
            group.category.cadence_days(),
            if group.category.cadence_days() == 1 { "" } else { "s" }
        );
        for view in &group.entries {
            let marker = if service.is_planned(&view.chore.id) {
                "*"
            } else {
                " "
            };
            let _ = writeln!(
                out,
                " {marker} {:<4} {:<34} {:<10} {}",
                view.chore.id.as_str(),
                view.chore.title,
                view.due.status.label(),
                describe_due(&view.due, today)
            );
        }
    }
    out
}

fn render_today(service: &ChoreService) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Today's plan");
    let planned = service.planned();
    if planned.is_empty() {
        let _ = writeln!(out, "  (nothing planned)");
    }
    for chore in planned {
        let status = service
            .due_state(&chore.id)
            .map(|state| state.status.label())
            .unwrap_or_default();
        let _ = writeln!(out, "  {:<4} {:<34} {}", chore.id.as_str(), chore.title, status);
    }

    let _ = writeln!(out, "Completed today");
    let mut any = false;
    for group in service.grouped_completions() {
        if group.records.is_empty() {
            continue;
        }
        any = true;
        let _ = writeln!(out, "  {}", group.category);
        for record in &group.records {
            let _ = writeln!(out, "    {:<34} {}", record.title, record.time);
        }
    }
    if !any {
        let _ = writeln!(out, "  (nothing yet)");
    }
    out
}

fn describe_due(due: &DueState, today: NaiveDate) -> String {
    let since = match due.days_since.days() {
        Some(0) => "done today".to_string(),
        Some(1) => "1 day ago".to_string(),
        Some(days) => format!("{days} days ago"),
        None => "never done".to_string(),
    };
    match due.next_due {
        Some(next) => format!("{since}, due {}", format_relative_label(next, today)),
        None => since,
    }
}

fn format_relative_label(date: NaiveDate, today: NaiveDate) -> String {
    let diff = date.signed_duration_since(today).num_days();
    match diff {
        -1 => "yesterday".to_string(),
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        d if d < 0 => format!("{} days ago", -d),
        d => format!("in {} days", d),
    }
}
