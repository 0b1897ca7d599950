use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use taskdeck_storage::TaskStore;

mod channels;
mod tasks;

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(about = "Personal task tracker backed by a local SQLite store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Create the database schema if missing
    Init,
    /// List open tasks grouped by project; `show done` lists done tasks
    Show {
        #[arg(value_enum)]
        filter: Option<ShowFilter>,
    },
    /// Insert a task from a JSON payload
    Insert { json: String },
    /// Mark a task done by id prefix
    Done { id: String },
    /// Snooze a task until a date
    Snooze {
        id: String,
        #[arg(value_name = "YYYY-MM-DD")]
        until: NaiveDate,
    },
    /// Reopen a task by id prefix
    Reopen { id: String },
    /// Partially update a task from a JSON payload
    Update { id: String, json: String },
    /// List open/done task pairs sharing a title
    Dupes,
    /// Check whether a task with this exact title exists
    Exists { title: String },
    /// Print the channel inventory from the Slack export
    Channels,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShowFilter {
    Done,
}

fn resolve_db_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TASKDECK_DB") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(std::env::current_dir()?.join("tasks.db"))
}

fn resolve_slack_export_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TASKDECK_SLACK_EXPORT") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(std::env::current_dir()?.join("slack.json"))
}

fn open_store() -> Result<TaskStore> {
    let path = resolve_db_path()?;
    Ok(TaskStore::open(&path)?)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            open_store()?;
            println!("✓ Database initialised");
            Ok(())
        }
        Commands::Show { filter } => {
            let store = open_store()?;
            match filter {
                Some(ShowFilter::Done) => tasks::show_done(&store),
                None => tasks::show_open(&store),
            }
        }
        Commands::Insert { json } => tasks::insert(&open_store()?, &json),
        Commands::Done { id } => tasks::mark_done(&open_store()?, &id),
        Commands::Snooze { id, until } => tasks::snooze(&open_store()?, &id, until),
        Commands::Reopen { id } => tasks::reopen(&open_store()?, &id),
        Commands::Update { id, json } => tasks::update(&open_store()?, &id, &json),
        Commands::Dupes => tasks::dupes(&open_store()?),
        Commands::Exists { title } => {
            let exists = tasks::exists(&open_store()?, &title)?;
            if !exists {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Channels => channels::show_channels(&resolve_slack_export_path()?),
    }
}
