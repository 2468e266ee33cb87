use crate::application::commands::{MonthViewResponse, ScheduleResponse, StoredDaysResponse};
use crate::domain::calendar::parse_weekday;
use chrono::{NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "planner",
    version,
    about = "Daily powerhouse planner: time-boxed blocks, progress and per-day history",
    after_help = "Examples:\n  planner show\n  planner toggle t1\n  planner --date 2026-02-16 rename t2 Cold emails\n  planner sub-item t3 0 Control Systems\n  planner start-hour 7\n  planner calendar --month 2026-02\n  planner export --output plans/"
)]
pub struct Cli {
    /// Workspace holding config/, state/ and logs/ (default: current directory)
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,
    /// Day to act on, YYYY-MM-DD (default: today in the configured timezone)
    #[arg(short = 'd', long, global = true)]
    pub date: Option<String>,
    /// Print responses as JSON
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the day's timeline and progress (default)
    Show,
    /// Set the hour the first block starts (clamped to 0-23)
    StartHour {
        #[arg(allow_negative_numbers = true)]
        hour: i64,
    },
    /// Mark a work block done or not done
    Toggle { id: String },
    /// Rename a block
    Rename {
        id: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Set one sub-item slot of a block (0-based index)
    SubItem {
        id: String,
        index: usize,
        /// New text; omit to clear the slot
        text: Vec<String>,
    },
    /// Add a work block before the final block
    Add {
        #[arg(short, long)]
        title: Option<String>,
        /// Duration in minutes
        #[arg(short = 'm', long)]
        duration: Option<u32>,
    },
    /// Remove a block
    Remove { id: String },
    /// Replace the day with the default template
    Reset,
    /// Clear every done mark of the day
    UnmarkAll,
    /// Delete all stored days
    ClearHistory {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Export the day as text lines
    Export {
        /// File or directory to write to (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show a month with per-day progress
    Calendar {
        /// YYYY-MM (default: month of the selected day)
        #[arg(short, long)]
        month: Option<String>,
    },
    /// List stored days
    Days,
    /// Write the whole history as one JSON document
    ExportHistory {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge a history JSON document into the store
    ImportHistory { file: PathBuf },
}

pub fn confirm(prompt: &str) -> io::Result<bool> {
    let mut stderr = io::stderr();
    write!(stderr, "{prompt} [y/N] ")?;
    stderr.flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

pub fn render_schedule(schedule: &ScheduleResponse) -> String {
    let mut lines = vec![format!(
        "{}  progress {}%{}",
        schedule.date,
        schedule.progress,
        if schedule.stored { "" } else { "  (template)" }
    )];
    for entry in &schedule.entries {
        let marker = match (entry.is_break, entry.done) {
            (true, _) => "   ",
            (false, true) => "[x]",
            (false, false) => "[ ]",
        };
        let kind = if entry.is_break { "  (break)" } else { "" };
        lines.push(format!(
            "  {} - {}  {} {}{}  #{}",
            entry.start, entry.end, marker, entry.title, kind, entry.id
        ));
        if let Some(items) = &entry.sub_items {
            lines.push(format!("                    {}", items.join(" | ")));
        }
    }
    lines.join("\n")
}

pub fn render_month(view: &MonthViewResponse) -> String {
    let title = NaiveDate::from_ymd_opt(view.year, view.month, 1)
        .map(|first| first.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{}-{:02}", view.year, view.month));
    let week_start = parse_weekday(&view.week_start).unwrap_or(Weekday::Sun);

    let mut lines = vec![title];
    let mut weekday = week_start;
    let mut header = Vec::with_capacity(7);
    for _ in 0..7 {
        header.push(format!("{:>8}", short_weekday(weekday)));
        weekday = weekday.succ();
    }
    lines.push(header.concat());

    for week in view.cells.chunks(7) {
        let row = week
            .iter()
            .map(|cell| match (cell.day, cell.progress) {
                (Some(day), Some(progress)) => {
                    let marker = if cell.selected { '*' } else { ' ' };
                    format!("{marker}{day:>2} {progress:>3}%")
                }
                _ => String::new(),
            })
            .map(|cell| format!("{cell:>8}"))
            .collect::<String>();
        lines.push(row);
    }
    lines.push(format!("Stored days: {}", view.stored_days));
    lines.join("\n")
}

pub fn render_stored_days(days: &StoredDaysResponse) -> String {
    let mut lines = vec![format!("Stored days: {}", days.count)];
    lines.extend(days.dates.iter().map(|date| format!("  {date}")));
    lines.join("\n")
}

fn short_weekday(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}
