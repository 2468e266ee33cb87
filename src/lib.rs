pub mod application;
mod cli;
pub mod domain;
pub mod infrastructure;

use application::commands::{
    add_block_impl, clear_all_history_impl, edit_sub_item_impl, export_file_name,
    export_history_impl, export_text_impl, get_schedule_impl, import_history_impl,
    month_view_impl, remove_block_impl, rename_block_impl, reset_day_impl, select_date_impl,
    set_start_hour_impl, stored_days_impl, toggle_done_impl, unmark_all_impl, AppState,
    ImportHistoryResponse, MonthViewResponse, ScheduleResponse, StoredDaysResponse,
};
use clap::Parser;
use cli::{confirm, render_month, render_schedule, render_stored_days, Cli, Command};
use infrastructure::error::InfraError;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn get_schedule(state: &AppState) -> Result<ScheduleResponse, String> {
    get_schedule_impl(state).map_err(|error| state.command_error("get_schedule", &error))
}

fn select_date(state: &mut AppState, date: String) -> Result<ScheduleResponse, String> {
    select_date_impl(state, date).map_err(|error| state.command_error("select_date", &error))
}

fn set_start_hour(state: &mut AppState, hour: i64) -> Result<ScheduleResponse, String> {
    set_start_hour_impl(state, hour).map_err(|error| state.command_error("set_start_hour", &error))
}

fn toggle_done(state: &mut AppState, block_id: String) -> Result<ScheduleResponse, String> {
    toggle_done_impl(state, block_id).map_err(|error| state.command_error("toggle_done", &error))
}

fn rename_block(
    state: &mut AppState,
    block_id: String,
    title: String,
) -> Result<ScheduleResponse, String> {
    rename_block_impl(state, block_id, title)
        .map_err(|error| state.command_error("rename_block", &error))
}

fn edit_sub_item(
    state: &mut AppState,
    block_id: String,
    index: usize,
    value: String,
) -> Result<ScheduleResponse, String> {
    edit_sub_item_impl(state, block_id, index, value)
        .map_err(|error| state.command_error("edit_sub_item", &error))
}

fn add_block(
    state: &mut AppState,
    title: Option<String>,
    duration_minutes: Option<u32>,
) -> Result<ScheduleResponse, String> {
    add_block_impl(state, title, duration_minutes)
        .map_err(|error| state.command_error("add_block", &error))
}

fn remove_block(state: &mut AppState, block_id: String) -> Result<ScheduleResponse, String> {
    remove_block_impl(state, block_id).map_err(|error| state.command_error("remove_block", &error))
}

fn reset_day(state: &mut AppState) -> Result<ScheduleResponse, String> {
    reset_day_impl(state).map_err(|error| state.command_error("reset_day", &error))
}

fn unmark_all(state: &mut AppState) -> Result<ScheduleResponse, String> {
    unmark_all_impl(state).map_err(|error| state.command_error("unmark_all", &error))
}

fn clear_all_history(state: &mut AppState) -> Result<ScheduleResponse, String> {
    clear_all_history_impl(state).map_err(|error| state.command_error("clear_all_history", &error))
}

fn export_text(state: &AppState) -> Result<String, String> {
    export_text_impl(state).map_err(|error| state.command_error("export_text", &error))
}

fn month_view(state: &AppState, month: Option<String>) -> Result<MonthViewResponse, String> {
    month_view_impl(state, month).map_err(|error| state.command_error("month_view", &error))
}

fn stored_days(state: &AppState) -> Result<StoredDaysResponse, String> {
    stored_days_impl(state).map_err(|error| state.command_error("stored_days", &error))
}

fn export_history(state: &AppState) -> Result<String, String> {
    export_history_impl(state).map_err(|error| state.command_error("export_history", &error))
}

fn import_history(state: &mut AppState, path: &Path) -> Result<ImportHistoryResponse, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| state.command_error("import_history", &InfraError::from(error)))?;
    import_history_impl(state, &raw).map_err(|error| state.command_error("import_history", &error))
}

fn write_output(state: &AppState, command: &str, path: &Path, contents: &str) -> Result<String, String> {
    fs::write(path, format!("{contents}\n"))
        .map_err(|error| state.command_error(command, &InfraError::from(error)))?;
    state.log_info(command, &format!("wrote {}", path.display()));
    Ok(format!("wrote {}", path.display()))
}

fn render<T, F>(json: bool, value: &T, text: F) -> Result<String, String>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    if json {
        serde_json::to_string_pretty(value).map_err(|error| error.to_string())
    } else {
        Ok(text(value))
    }
}

fn dispatch(state: &mut AppState, cli: Cli) -> Result<String, String> {
    if let Some(date) = cli.date {
        select_date(state, date)?;
    }
    let json = cli.json;

    match cli.command.unwrap_or(Command::Show) {
        Command::Show => render(json, &get_schedule(state)?, render_schedule),
        Command::StartHour { hour } => render(json, &set_start_hour(state, hour)?, render_schedule),
        Command::Toggle { id } => render(json, &toggle_done(state, id)?, render_schedule),
        Command::Rename { id, title } => {
            render(json, &rename_block(state, id, title.join(" "))?, render_schedule)
        }
        Command::SubItem { id, index, text } => render(
            json,
            &edit_sub_item(state, id, index, text.join(" "))?,
            render_schedule,
        ),
        Command::Add { title, duration } => {
            render(json, &add_block(state, title, duration)?, render_schedule)
        }
        Command::Remove { id } => render(json, &remove_block(state, id)?, render_schedule),
        Command::Reset => render(json, &reset_day(state)?, render_schedule),
        Command::UnmarkAll => render(json, &unmark_all(state)?, render_schedule),
        Command::ClearHistory { yes } => {
            let confirmed = yes
                || confirm("Clear all saved history?")
                    .map_err(|error| state.command_error("clear_all_history", &InfraError::from(error)))?;
            if !confirmed {
                return Ok("history kept".to_string());
            }
            render(json, &clear_all_history(state)?, render_schedule)
        }
        Command::Export { output } => {
            let text = export_text(state)?;
            match output {
                Some(path) => {
                    let path = if path.is_dir() {
                        path.join(export_file_name(state))
                    } else {
                        path
                    };
                    write_output(state, "export_text", &path, &text)
                }
                None => Ok(text),
            }
        }
        Command::Calendar { month } => render(json, &month_view(state, month)?, render_month),
        Command::Days => render(json, &stored_days(state)?, render_stored_days),
        Command::ExportHistory { output } => {
            let document = export_history(state)?;
            match output {
                Some(path) => write_output(state, "export_history", &path, &document),
                None => Ok(document),
            }
        }
        Command::ImportHistory { file } => {
            let imported = import_history(state, &file)?;
            render(json, &imported, |response| {
                format!("imported {} day(s), skipped {}", response.imported, response.skipped)
            })
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let workspace_root = match cli.workspace.clone() {
        Some(path) => path,
        None => match std::env::current_dir() {
            Ok(path) => path,
            Err(error) => {
                eprintln!("error: failed to resolve current directory: {error}");
                return ExitCode::FAILURE;
            }
        },
    };
    let mut state = match AppState::new(workspace_root) {
        Ok(state) => state,
        Err(error) => {
            eprintln!("error: failed to initialize planner: {error}");
            return ExitCode::FAILURE;
        }
    };

    match dispatch(&mut state, cli) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
