//! daybook CLI: terminal calendar with an infinite-scroll timeline

use std::error::Error;
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{Datelike, Duration, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use daybook_engine::{
    assistant_available, disconnect_source, events_on_day, push_event, sync_all, upcoming_days,
    Assistant, AssistantReply, AssistantRequest, CalendarEvent, CommandModel, Config, DataPaths,
    EventStore, GoogleCalendarClient, MonthGrid, Settings, SyncRange, YearMonth, GOOGLE_SOURCE,
    WEEKDAY_LABELS,
};
use tracing_subscriber::EnvFilter;

type CliResult = Result<(), Box<dyn Error>>;

/// Terminal calendar with an infinite-scroll timeline and a chat assistant
#[derive(Parser)]
#[command(name = "daybook")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Data directory (default: platform data dir + /daybook)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the TUI (default when no command specified)
    Tui,

    /// List events from today, grouped by day
    List {
        /// Number of days to list
        #[arg(long, default_value = "7")]
        days: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a month grid and its upcoming days
    Month {
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        month: Option<u32>,
    },

    /// Create an event from a natural-language description
    Add {
        text: Vec<String>,

        /// Also insert the event into the connected Google calendar
        #[arg(long)]
        push: bool,
    },

    /// Ask the assistant about your schedule
    Ask { text: Vec<String> },

    /// Sync events from Google Calendar
    Sync,

    /// Remove synced events and forget the connection
    Disconnect,

    /// Print paths and assistant/sync readiness
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let paths = match cli.data_dir {
        Some(dir) => DataPaths::new(dir),
        None => DataPaths::platform_default()?,
    };
    let command = cli.command.unwrap_or(Commands::Tui);
    init_logging(&paths, matches!(command, Commands::Tui))?;

    let config = Config::load_or_default(&paths.config())?;
    tracing::debug!(data_dir = %paths.root().display(), "Resolved data directory");
    let rt = tokio::runtime::Runtime::new()?;

    match command {
        Commands::Tui => rt.block_on(daybook_tui::run_tui(paths, config)),
        Commands::List { days, json } => cmd_list(&paths, days, json),
        Commands::Month { year, month } => cmd_month(&paths, year, month),
        Commands::Add { text, push } => rt.block_on(cmd_add(&paths, &config, &text.join(" "), push)),
        Commands::Ask { text } => rt.block_on(cmd_ask(&paths, &config, &text.join(" "))),
        Commands::Sync => rt.block_on(cmd_sync(&paths, &config)),
        Commands::Disconnect => cmd_disconnect(&paths),
        Commands::Doctor { json } => cmd_doctor(&paths, &config, json),
    }
}

/// Log to `daybook.log` while the TUI owns the terminal, to stderr otherwise.
fn init_logging(paths: &DataPaths, to_file: bool) -> CliResult {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if to_file {
        std::fs::create_dir_all(paths.root())?;
        let file = OpenOptions::new().create(true).append(true).open(paths.log())?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn cmd_list(paths: &DataPaths, days: u32, json: bool) -> CliResult {
    let store = EventStore::load(&paths.events())?;
    let dates: Vec<NaiveDate> = (0..i64::from(days)).map(|d| today() + Duration::days(d)).collect();

    if json {
        let output: Vec<serde_json::Value> = dates
            .iter()
            .map(|day| {
                serde_json::json!({
                    "date": day.to_string(),
                    "events": events_on_day(store.events(), *day),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print!("{}", format_days(&dates, store.events()));
    Ok(())
}

fn format_event(event: &CalendarEvent) -> String {
    let start = event.start.with_timezone(&Local).format("%H:%M");
    let end = event.end.with_timezone(&Local).format("%H:%M");
    let mut line = format!("  {start}-{end}  {} [{}]", event.title, event.category);
    if event.is_external() {
        line.push_str(" (synced)");
    }
    line
}

fn format_days(dates: &[NaiveDate], events: &[CalendarEvent]) -> String {
    let mut out = String::new();
    for day in dates {
        let _ = writeln!(out, "{}", day.format("%a %d %b %Y"));
        let bucket = events_on_day(events, *day);
        if bucket.is_empty() {
            out.push_str("  No events\n");
        }
        for event in bucket {
            let _ = writeln!(out, "{}", format_event(event));
        }
        out.push('\n');
    }
    out
}

fn cmd_month(paths: &DataPaths, year: Option<i32>, month: Option<u32>) -> CliResult {
    let store = EventStore::load(&paths.events())?;
    let now = today();
    let target = YearMonth::new(year.unwrap_or(now.year()), month.unwrap_or(now.month()));
    let grid = MonthGrid::new(target).ok_or_else(|| format!("invalid month: {}-{}", target.year, target.month))?;

    print!("{}", format_month(&grid, store.events()));

    let from = if YearMonth::from(now) == target {
        now
    } else {
        grid.days.first().copied().unwrap_or(now)
    };
    let upcoming = upcoming_days(store.events(), from, 10, &Local);
    if !upcoming.is_empty() {
        println!();
        for (day, events) in upcoming {
            println!("{}", day.format("%a %d %b"));
            for event in events {
                println!("{}", format_event(event));
            }
        }
    }
    Ok(())
}

/// Monday-first grid; days with events are marked with `*`.
fn format_month(grid: &MonthGrid, events: &[CalendarEvent]) -> String {
    let mut out = String::new();
    let title = grid
        .days
        .first()
        .map_or_else(String::new, |d| d.format("%B %Y").to_string());
    let _ = writeln!(out, "{title:^28}");
    for label in WEEKDAY_LABELS {
        let _ = write!(out, "{label:>3} ");
    }
    out.push('\n');

    for week in grid.weeks() {
        let mut line = String::new();
        for cell in week {
            match cell {
                Some(day) => {
                    let marker = if events_on_day(events, day).is_empty() { ' ' } else { '*' };
                    let _ = write!(line, "{:>3}{marker}", day.day());
                }
                None => line.push_str("    "),
            }
        }
        let _ = writeln!(out, "{}", line.trim_end());
    }
    out
}

fn assistant(config: &Config) -> Result<Assistant<CommandModel>, Box<dyn Error>> {
    if !assistant_available(&config.assistant) {
        return Err(format!(
            "assistant command {:?} not found on PATH",
            config.assistant.command_argv.first().map_or("", String::as_str)
        )
        .into());
    }
    Ok(Assistant::new(CommandModel::new(config.assistant.clone())))
}

async fn cmd_add(paths: &DataPaths, config: &Config, text: &str, push: bool) -> CliResult {
    if text.trim().is_empty() {
        return Err("describe the event to add".into());
    }
    let mut store = EventStore::load(&paths.events())?;
    let request = AssistantRequest::ExtractEvent(text.to_string());
    let reply = assistant(config)?.ask(&request, store.events(), Utc::now()).await?;

    let AssistantReply::Event(mut event) = reply else {
        return Err(format!("no event could be extracted from {text:?}").into());
    };

    if push {
        let token = config
            .sync
            .token()
            .ok_or_else(|| format!("set {} to push to Google Calendar", config.sync.token_env))?;
        let client = GoogleCalendarClient::connect(token)?;
        event = push_event(&client, &event).await?;
        client.disconnect();
    }

    println!("Added: {}", format_event(&event).trim_start());
    store.add(event);
    store.save(&paths.events())?;
    Ok(())
}

async fn cmd_ask(paths: &DataPaths, config: &Config, text: &str) -> CliResult {
    if text.trim().is_empty() {
        return Err("ask a question".into());
    }
    let store = EventStore::load(&paths.events())?;
    let request = AssistantRequest::Ask(text.to_string());
    match assistant(config)?.ask(&request, store.events(), Utc::now()).await? {
        AssistantReply::Answer(answer) | AssistantReply::Fallback(answer) => println!("{answer}"),
        other => println!("{other:?}"),
    }
    Ok(())
}

async fn cmd_sync(paths: &DataPaths, config: &Config) -> CliResult {
    let token = config
        .sync
        .token()
        .ok_or_else(|| format!("set {} to an OAuth access token", config.sync.token_env))?;
    let client = GoogleCalendarClient::connect(token)?;
    let range = SyncRange::around(Utc::now(), config.sync.days_back, config.sync.days_forward);
    let report = sync_all(&client, range).await?;
    client.disconnect();

    for name in &report.failed_calendars {
        eprintln!("Warning: could not fetch calendar {name}");
    }

    let mut store = EventStore::load(&paths.events())?;
    let added = report.apply(&mut store);
    store.save(&paths.events())?;

    let mut settings = Settings::load(&paths.settings());
    settings.calendar_connected = true;
    settings.save(&paths.settings())?;

    println!("Synced {added} new events from {GOOGLE_SOURCE}");
    Ok(())
}

fn cmd_disconnect(paths: &DataPaths) -> CliResult {
    let mut store = EventStore::load(&paths.events())?;
    let removed = disconnect_source(&mut store, GOOGLE_SOURCE);
    store.save(&paths.events())?;

    let mut settings = Settings::load(&paths.settings());
    settings.calendar_connected = false;
    settings.save(&paths.settings())?;

    println!("Disconnected; removed {removed} synced events");
    Ok(())
}

fn cmd_doctor(paths: &DataPaths, config: &Config, json: bool) -> CliResult {
    let store = EventStore::load(&paths.events())?;
    let settings = Settings::load(&paths.settings());
    let assistant_ready = assistant_available(&config.assistant);
    let token_set = config.sync.token().is_some();

    if json {
        let output = serde_json::json!({
            "data_dir": paths.root(),
            "events": store.len(),
            "assistant": { "name": config.assistant.name, "ready": assistant_ready },
            "sync": { "connected": settings.calendar_connected, "token_env": config.sync.token_env, "token_set": token_set },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Data dir:  {}", paths.root().display());
    println!("Events:    {}", store.len());
    println!(
        "Assistant: {} ({})",
        config.assistant.name,
        if assistant_ready { "ready" } else { "not found" }
    );
    println!(
        "Sync:      {} ({} {})",
        if settings.calendar_connected { "connected" } else { "not connected" },
        config.sync.token_env,
        if token_set { "set" } else { "unset" }
    );
    Ok(())
}
