use crate::application::bootstrap::{bootstrap_workspace, BootstrapResult};
use crate::domain::calendar::{month_cells, parse_year_month, weekday_name, DateKey};
use crate::domain::models::{BlockDraft, DaySnapshot, ScheduleTemplate};
use crate::domain::progress::progress_percent;
use crate::domain::timeline::{derive_times, export_text};
use crate::infrastructure::config::{
    clamp_start_hour, read_schedule_template, read_start_hour, read_timezone, read_week_start,
    save_start_hour,
};
use crate::infrastructure::day_store::{DayStore, SqliteDayStore};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::history_codec::{export_history, parse_history};
use chrono::{Datelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

fn fresh_block_id(snapshot: &DaySnapshot) -> String {
    loop {
        let id = next_id("x");
        if !snapshot.contains_id(&id) {
            return id;
        }
    }
}

/// One planning session: the injected history store plus the selected day,
/// which is the only snapshot ever edited.
pub struct AppState {
    config_dir: PathBuf,
    logs_dir: PathBuf,
    store: Box<dyn DayStore>,
    timezone: Tz,
    week_start: Weekday,
    session: SessionState,
}

#[derive(Debug, Clone)]
struct SessionState {
    selected_date: DateKey,
    start_hour: u8,
    tasks: DaySnapshot,
    persisted: bool,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let template = read_schedule_template(&bootstrap.config_dir)?;
        let store = SqliteDayStore::new(&bootstrap.database_path, template);
        Self::from_bootstrap(bootstrap, Box::new(store))
    }

    /// Uses `store` for the history instead of the workspace database.
    pub fn with_store(workspace_root: PathBuf, store: Box<dyn DayStore>) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        Self::from_bootstrap(bootstrap, store)
    }

    fn from_bootstrap(bootstrap: BootstrapResult, store: Box<dyn DayStore>) -> Result<Self, InfraError> {
        let config_dir = bootstrap.config_dir;
        let timezone = read_timezone(&config_dir)?;
        let week_start = read_week_start(&config_dir)?;
        let start_hour = read_start_hour(&config_dir)?;
        let today = today_in(timezone);

        let mut state = Self {
            config_dir,
            logs_dir: bootstrap.logs_dir,
            store,
            timezone,
            week_start,
            session: SessionState {
                selected_date: today,
                start_hour,
                tasks: DaySnapshot::default(),
                persisted: false,
            },
        };
        if let Some(quarantine) = bootstrap.quarantined_database {
            state.log_error(
                "bootstrap",
                &format!("moved unreadable database to {}", quarantine.display()),
            );
        }
        let (tasks, persisted) = state.read_day(&today)?;
        state.session.tasks = tasks;
        state.session.persisted = persisted;
        Ok(state)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn selected_date(&self) -> DateKey {
        self.session.selected_date
    }

    pub fn today(&self) -> DateKey {
        today_in(self.timezone)
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    fn template(&self) -> &ScheduleTemplate {
        self.store.template()
    }

    /// Stored snapshot and whether it exists; malformed rows read as absent.
    fn read_day(&self, key: &DateKey) -> Result<(DaySnapshot, bool), InfraError> {
        match self.store.get(key) {
            Ok(Some(snapshot)) => Ok((snapshot, true)),
            Ok(None) => Ok((self.template().clone_template(), false)),
            Err(InfraError::Json(error)) => {
                self.log_error(
                    "load_day",
                    &format!("date={key} stored snapshot is malformed, using template: {error}"),
                );
                Ok((self.template().clone_template(), false))
            }
            Err(error) => Err(error),
        }
    }

    /// Persists `next` for the selected day. Unchanged lists are not written,
    /// so a day only enters the history once something on it changes.
    fn commit(&mut self, command: &str, next: DaySnapshot) -> Result<ScheduleResponse, InfraError> {
        if next == self.session.tasks {
            return Ok(self.schedule_response());
        }
        let key = self.session.selected_date;
        self.store.save(&key, &next)?;
        self.session.tasks = next;
        self.session.persisted = true;
        self.log_info(command, &format!("saved date={key}"));
        Ok(self.schedule_response())
    }

    fn schedule_response(&self) -> ScheduleResponse {
        let entries = derive_times(u64::from(self.session.start_hour) * 60, self.session.tasks.blocks())
            .into_iter()
            .map(|entry| ScheduleEntryResponse {
                id: entry.block.id.clone(),
                title: entry.block.title.clone(),
                start: entry.start_label(),
                end: entry.end_label(),
                start_minutes: entry.start_minutes,
                end_minutes: entry.end_minutes,
                duration_minutes: entry.block.duration_minutes,
                is_break: entry.block.is_break,
                done: entry.block.done,
                sub_items: entry.block.sub_items.clone(),
            })
            .collect();

        ScheduleResponse {
            date: self.session.selected_date.to_string(),
            start_hour: self.session.start_hour,
            progress: progress_percent(&self.session.tasks),
            stored: self.session.persisted,
            entries,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleEntryResponse {
    pub id: String,
    pub title: String,
    pub start: String,
    pub end: String,
    pub start_minutes: u64,
    pub end_minutes: u64,
    pub duration_minutes: u32,
    pub is_break: bool,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScheduleResponse {
    pub date: String,
    pub start_hour: u8,
    pub progress: u8,
    pub stored: bool,
    pub entries: Vec<ScheduleEntryResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarCellResponse {
    pub day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    pub stored: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthViewResponse {
    pub year: i32,
    pub month: u32,
    pub week_start: String,
    pub cells: Vec<CalendarCellResponse>,
    pub stored_days: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoredDaysResponse {
    pub count: usize,
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImportHistoryResponse {
    pub imported: usize,
    pub skipped: usize,
}

pub fn get_schedule_impl(state: &AppState) -> Result<ScheduleResponse, InfraError> {
    Ok(state.schedule_response())
}

pub fn set_start_hour_impl(state: &mut AppState, hour: i64) -> Result<ScheduleResponse, InfraError> {
    let clamped = clamp_start_hour(hour);
    save_start_hour(state.config_dir(), clamped)?;
    state.session.start_hour = clamped;
    state.log_info("set_start_hour", &format!("start_hour={clamped} requested={hour}"));
    Ok(state.schedule_response())
}

/// Switches the working day. Viewing never writes to the history.
pub fn select_date_impl(state: &mut AppState, date: String) -> Result<ScheduleResponse, InfraError> {
    let key = DateKey::parse(&date).map_err(InfraError::InvalidInput)?;
    select_key(state, key)
}

pub fn select_today_impl(state: &mut AppState) -> Result<ScheduleResponse, InfraError> {
    let today = state.today();
    select_key(state, today)
}

fn select_key(state: &mut AppState, key: DateKey) -> Result<ScheduleResponse, InfraError> {
    let (tasks, persisted) = state.read_day(&key)?;
    state.session.selected_date = key;
    state.session.tasks = tasks;
    state.session.persisted = persisted;
    Ok(state.schedule_response())
}

pub fn toggle_done_impl(state: &mut AppState, block_id: String) -> Result<ScheduleResponse, InfraError> {
    let block_id = required_block_id(&block_id)?;
    let next = state.session.tasks.toggle_done(block_id);
    state.commit("toggle_done", next)
}

pub fn rename_block_impl(
    state: &mut AppState,
    block_id: String,
    title: String,
) -> Result<ScheduleResponse, InfraError> {
    let block_id = required_block_id(&block_id)?;
    let next = state.session.tasks.rename_block(block_id, &title);
    state.commit("rename_block", next)
}

pub fn edit_sub_item_impl(
    state: &mut AppState,
    block_id: String,
    index: usize,
    value: String,
) -> Result<ScheduleResponse, InfraError> {
    let block_id = required_block_id(&block_id)?;
    let next = state.session.tasks.edit_sub_item(block_id, index, &value);
    state.commit("edit_sub_item", next)
}

pub fn add_block_impl(
    state: &mut AppState,
    title: Option<String>,
    duration_minutes: Option<u32>,
) -> Result<ScheduleResponse, InfraError> {
    let defaults = BlockDraft::default();
    let draft = BlockDraft {
        title: title
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or(defaults.title),
        duration_minutes: duration_minutes.unwrap_or(defaults.duration_minutes),
    };
    draft.validate().map_err(InfraError::InvalidInput)?;

    let id = fresh_block_id(&state.session.tasks);
    let next = state.session.tasks.add_block(&draft, id);
    state.commit("add_block", next)
}

pub fn remove_block_impl(state: &mut AppState, block_id: String) -> Result<ScheduleResponse, InfraError> {
    let block_id = required_block_id(&block_id)?;
    let next = state.session.tasks.remove_block(block_id);
    state.commit("remove_block", next)
}

pub fn reset_day_impl(state: &mut AppState) -> Result<ScheduleResponse, InfraError> {
    let next = DaySnapshot::reset_to_template(state.template());
    state.commit("reset_day", next)
}

pub fn unmark_all_impl(state: &mut AppState) -> Result<ScheduleResponse, InfraError> {
    let next = state.session.tasks.unmark_all();
    state.commit("unmark_all", next)
}

/// Drops the entire history. Confirmation belongs to the caller.
pub fn clear_all_history_impl(state: &mut AppState) -> Result<ScheduleResponse, InfraError> {
    state.store.clear_all()?;
    state.session.tasks = state.template().clone_template();
    state.session.persisted = false;
    state.log_info("clear_all_history", "cleared all stored days");
    Ok(state.schedule_response())
}

pub fn export_text_impl(state: &AppState) -> Result<String, InfraError> {
    let entries = derive_times(
        u64::from(state.session.start_hour) * 60,
        state.session.tasks.blocks(),
    );
    Ok(export_text(&entries))
}

pub fn export_file_name(state: &AppState) -> String {
    format!("plan-{}.txt", state.session.selected_date)
}

pub fn month_view_impl(state: &AppState, month: Option<String>) -> Result<MonthViewResponse, InfraError> {
    let (year, month) = match month.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_year_month(value).map_err(InfraError::InvalidInput)?,
        None => {
            let selected = state.session.selected_date.date();
            (selected.year(), selected.month())
        }
    };
    let stored_keys = state.store.keys()?.into_iter().collect::<HashSet<_>>();

    let mut cells = Vec::new();
    for cell in month_cells(year, month, state.week_start).map_err(InfraError::InvalidInput)? {
        let Some(day) = cell else {
            cells.push(CalendarCellResponse {
                day: None,
                date: None,
                progress: None,
                stored: false,
                selected: false,
            });
            continue;
        };
        let key = DateKey::from_ymd(year, month, day)
            .ok_or_else(|| InfraError::InvalidInput(format!("invalid day {year}-{month:02}-{day:02}")))?;
        let selected = key == state.session.selected_date;
        let snapshot = if selected {
            state.session.tasks.clone()
        } else {
            state.store.load(&key)?
        };
        cells.push(CalendarCellResponse {
            day: Some(day),
            date: Some(key.to_string()),
            progress: Some(progress_percent(&snapshot)),
            stored: stored_keys.contains(&key),
            selected,
        });
    }

    Ok(MonthViewResponse {
        year,
        month,
        week_start: weekday_name(state.week_start).to_string(),
        cells,
        stored_days: stored_keys.len(),
    })
}

pub fn stored_days_impl(state: &AppState) -> Result<StoredDaysResponse, InfraError> {
    let dates = state
        .store
        .keys()?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    Ok(StoredDaysResponse {
        count: dates.len(),
        dates,
    })
}

pub fn export_history_impl(state: &AppState) -> Result<String, InfraError> {
    export_history(state.store.as_ref())
}

/// Merges a history document into the store. Undecodable documents import
/// nothing.
pub fn import_history_impl(state: &mut AppState, raw: &str) -> Result<ImportHistoryResponse, InfraError> {
    let parsed = parse_history(raw);
    state.store.save_all(&parsed.entries)?;

    let selected = state.session.selected_date;
    if let Some((_, snapshot)) = parsed.entries.iter().find(|(key, _)| *key == selected) {
        state.session.tasks = snapshot.clone();
        state.session.persisted = true;
    }

    state.log_info(
        "import_history",
        &format!("imported={} skipped={}", parsed.entries.len(), parsed.skipped),
    );
    Ok(ImportHistoryResponse {
        imported: parsed.entries.len(),
        skipped: parsed.skipped,
    })
}

fn required_block_id(block_id: &str) -> Result<&str, InfraError> {
    let block_id = block_id.trim();
    if block_id.is_empty() {
        return Err(InfraError::InvalidInput(
            "block_id must not be empty".to_string(),
        ));
    }
    Ok(block_id)
}

fn today_in(timezone: Tz) -> DateKey {
    DateKey::new(Utc::now().with_timezone(&timezone).date_naive())
}
