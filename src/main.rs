use anyhow::Result;
use chrono::{Duration, Local};
use clap::{Parser, Subcommand};
use fd_lock::RwLock;
use horarios::calendar::{months_from, start_of_day};
use horarios::config::{self, Config};
use horarios::reminder::{LogNotifier, Notifier, OutboxNotifier, ReminderWorker};
use horarios::storage::{self, JsonStorage, MemoryStorage};
use horarios::tui::{self, CalendarApp};
use horarios::utils::{parse_date, parse_length, parse_month, parse_time_of_day};
use horarios::{report, ShiftStore};
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "horarios")]
#[command(about = "Assign work shifts, mark attendance and get shift reminders", long_about = None)]
struct Cli {
    /// Directory holding the database, reminders and config (default: ~/.horarios)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a shift for an employee on one or more dates
    Add {
        /// Employee name
        #[arg(short, long)]
        name: String,
        /// Work date (YYYY-MM-DD), repeat for several days
        #[arg(short, long = "date")]
        dates: Vec<String>,
        /// Start time (HH:MM)
        #[arg(short, long)]
        start: Option<String>,
        /// End time (HH:MM)
        #[arg(short, long, conflicts_with = "length")]
        end: Option<String>,
        /// Shift length instead of an end time (e.g. 4h, 7h 30m)
        #[arg(long = "for")]
        length: Option<String>,
    },
    /// Show the shifts active today
    Today,
    /// List shifts, optionally between two dates (inclusive)
    List {
        #[arg(long)]
        from: Option<String>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Show who works on a given date
    Day { date: String },
    /// Delete a shift by id (a unique prefix is enough)
    Delete { id: String },
    /// Toggle attendance for a shift
    Attend { id: String },
    /// Print month calendars with peak days and scheduled days
    Calendar {
        /// First month to show (YYYY-MM), defaults to the current month
        #[arg(long)]
        month: Option<String>,
        /// Number of months to show
        #[arg(long)]
        months: Option<usize>,
    },
    /// List reminders that have not fired yet
    Reminders,
    /// Browse the calendar and add shifts interactively
    Tui {
        /// Work on ten sample shifts kept in memory instead of the database
        #[arg(long)]
        sample: bool,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Add { .. }
                | Commands::Delete { .. }
                | Commands::Attend { .. }
                | Commands::Tui { sample: false }
        )
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("horarios=warn")),
        )
        .init();

    let cli = Cli::parse();
    let base_dir = storage::get_base_dir(cli.data_dir.as_deref())?;
    let config = config::load_config(&base_dir)?;

    let lock_file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(base_dir.join("horarios.lock"))?;
    let mut lock = RwLock::new(lock_file);
    let _guard = if cli.command.mutates() {
        Some(lock.try_write().map_err(|_| {
            anyhow::anyhow!("Another horarios instance is changing shifts. Please close it first.")
        })?)
    } else {
        None
    };

    let notifier: Box<dyn Notifier + Send> = if config.notifications {
        Box::new(OutboxNotifier::new(&base_dir))
    } else {
        Box::new(LogNotifier)
    };
    let (tx, rx) = mpsc::channel();
    let worker = ReminderWorker::spawn(rx, notifier);

    let mut store = ShiftStore::open(JsonStorage::new(&base_dir))?.with_events(tx);
    let res = run(cli.command, &mut store, &config, &base_dir);

    drop(store);
    let scheduled = worker.join()?;
    debug!(scheduled, "reminder worker finished");

    res
}

fn run(
    command: Commands,
    store: &mut ShiftStore<JsonStorage>,
    config: &Config,
    base_dir: &Path,
) -> Result<()> {
    let now = Local::now().naive_local();

    match command {
        Commands::Add {
            name,
            dates,
            start,
            end,
            length,
        } => {
            let start = match start {
                Some(s) => parse_time_of_day(&s)?,
                None => config.default_start_time,
            };
            let dates = dates
                .iter()
                .map(|d| parse_date(d))
                .collect::<Result<BTreeSet<_>>>()?;

            let created = match (end, length) {
                (Some(e), _) => store.create(&name, start, parse_time_of_day(&e)?, &dates)?,
                (None, Some(l)) => store.create_for(&name, start, parse_length(&l)?, &dates)?,
                (None, None) => store.create(&name, start, config.default_end_time, &dates)?,
            };
            report::print_shifts(&format!("Added {} shift(s)", created.len()), &created);
        }
        Commands::Today => {
            let shifts = store.today(now);
            report::print_shifts(&format!("Today, {}", now.format("%B %d, %Y")), &shifts);
            report::print_summary(&shifts);
        }
        Commands::List { from, to } => {
            let from = from.as_deref().map(parse_date).transpose()?;
            let to = to.as_deref().map(parse_date).transpose()?;
            let shifts = match (from, to) {
                (None, None) => {
                    let mut all = store.all().to_vec();
                    all.sort_by_key(|s| s.start_time);
                    all
                }
                (from, to) => {
                    let from = from.map(start_of_day).unwrap_or(chrono::NaiveDateTime::MIN);
                    let to = to
                        .map(|d| start_of_day(d) + Duration::days(1))
                        .unwrap_or(chrono::NaiveDateTime::MAX);
                    store.query(from, to)
                }
            };
            report::print_shifts("Shifts", &shifts);
            report::print_summary(&shifts);
        }
        Commands::Day { date } => {
            let date = parse_date(&date)?;
            report::print_day(date, &store.query_by_day(date));
        }
        Commands::Delete { id } => {
            let id = store.resolve(&id)?;
            let removed = store.delete(id)?;
            println!("Deleted {}", report::shift_line(&removed));
        }
        Commands::Attend { id } => {
            let id = store.resolve(&id)?;
            let shift = store.toggle_attendance(id)?;
            println!("{}", report::shift_line(&shift));
        }
        Commands::Calendar { month, months } => {
            let first = match month {
                Some(m) => parse_month(&m)?,
                None => now.date(),
            };
            let months = months_from(first, months.unwrap_or(config.months_ahead));
            report::print_calendar(&months, store.all(), config.week_start);
        }
        Commands::Reminders => {
            let pending = OutboxNotifier::new(base_dir).pending(now)?;
            report::print_reminders(&pending);
        }
        Commands::Tui { sample: false } => {
            let mut app = CalendarApp::new(store, now.date(), config);
            tui::run_tui(&mut app)?;
        }
        Commands::Tui { sample: true } => {
            let mut preview = ShiftStore::open(MemoryStorage::with_sample())?;
            let mut app = CalendarApp::new(&mut preview, now.date(), config);
            tui::run_tui(&mut app)?;
        }
    }

    Ok(())
}
