//! # routinely
//!
//! Terminal tracker for recurring chores and habits.
//!
//! ## Usage
//!
//! ```bash
//! # Water the plants every 3 days, on a fixed schedule starting today
//! routinely add "Water plants" --every 3 --unit day
//!
//! # Change the bed sheets two weeks after the last time it was done
//! routinely add "Change sheets" --every 2 --unit week --adjust
//!
//! # What is due today, tomorrow and over the next days
//! routinely
//!
//! # Mark done, and take it back within five minutes
//! routinely complete 1
//! routinely undo 1 --log 7
//! ```
//!
//! ## Data Storage
//!
//! Tasks are saved in your local data directory:
//! *   Linux: `~/.local/share/routinely/tasks.json`
//! *   macOS: `~/Library/Application Support/routinely/tasks.json`
//! *   Windows: `%APPDATA%\routinely\tasks.json`
//!
//! Override with `--db` or the `ROUTINELY_DB` environment variable.

use std::io;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use routinely::clock::{Clock, FixedClock, SystemClock};
use routinely::commands::*;
use routinely::config::Config;
use routinely::models::parse_datetime;
use routinely::store::JsonStore;

#[derive(Parser)]
#[command(name = "routinely")]
#[command(about = "Recurring task tracker", long_about = None)]
struct Cli {
    /// Task database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Whose tasks to work with
    #[arg(long, global = true)]
    owner: Option<String>,
    /// Pretend the current time is this (YYYY-MM-DD [HH:MM])
    #[arg(long, global = true)]
    at: Option<String>,
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new recurring task
    Add {
        /// Task name (quoted if it has spaces)
        name: String,
        /// Repeat every N units
        #[arg(short, long, default_value_t = 1)]
        every: u32,
        /// Unit of the interval (day, week, month)
        #[arg(short, long, default_value = "day")]
        unit: String,
        /// First day of the schedule in YYYY-MM-DD (default: today)
        #[arg(short, long)]
        start: Option<String>,
        /// Count the next due date from the last completion
        #[arg(short, long)]
        adjust: bool,
    },
    /// List all tasks
    List,
    /// Edit a task
    Edit {
        id: u64,
        /// New task name
        #[arg(short, long)]
        name: Option<String>,
        /// New interval count
        #[arg(short, long)]
        every: Option<u32>,
        /// New interval unit
        #[arg(short, long)]
        unit: Option<String>,
        /// New start date
        #[arg(short, long)]
        start: Option<String>,
        /// Count from the last completion (true) or keep a fixed schedule (false)
        #[arg(short, long)]
        adjust: Option<bool>,
    },
    /// Remove a task and its history
    Remove { id: u64 },
    /// Show tasks due today, tomorrow and in the next days
    Todo,
    /// Mark a task as done
    Complete { id: u64 },
    /// Undo a completion made in the last few minutes
    Undo {
        id: u64,
        /// Completion log to revert, as printed by `complete`
        #[arg(short, long)]
        log: Option<u64>,
    },
    /// Show the completion log of a task
    Logs { id: u64 },
    /// Show all completions, newest first
    History,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() {
    // Tracing is opt-in via RUST_LOG.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<routinely::Error>()
            .map(routinely::Error::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::from_env();
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(owner) = cli.owner {
        config.owner = owner;
    }
    let clock: Box<dyn Clock> = match cli.at.as_deref() {
        Some(at) => Box::new(FixedClock(parse_datetime(at)?)),
        None => Box::new(SystemClock),
    };

    let store = JsonStore::open(&config.db_path)
        .with_context(|| format!("failed to open task database {}", config.db_path.display()))?;
    let mut ctx = Context::new(store, clock, config.owner);
    ctx.undo_grace = config.undo_grace;
    ctx.json = cli.json;

    match cli.command.unwrap_or(Commands::Todo) {
        Commands::Add { name, every, unit, start, adjust } => {
            cmd_add(
                &mut ctx,
                AddArgs {
                    name,
                    every,
                    unit,
                    start,
                    adjust_on_completion: adjust,
                },
            )?;
        }
        Commands::List => {
            cmd_list(&mut ctx)?;
        }
        Commands::Edit { id, name, every, unit, start, adjust } => {
            cmd_edit(
                &mut ctx,
                id,
                EditArgs {
                    name,
                    every,
                    unit,
                    start,
                    adjust_on_completion: adjust,
                },
            )?;
        }
        Commands::Remove { id } => {
            cmd_remove(&mut ctx, id)?;
        }
        Commands::Todo => {
            cmd_todo(&mut ctx)?;
        }
        Commands::Complete { id } => {
            cmd_complete(&mut ctx, id)?;
        }
        Commands::Undo { id, log } => {
            cmd_undo(&mut ctx, id, log)?;
        }
        Commands::Logs { id } => {
            cmd_logs(&mut ctx, id)?;
        }
        Commands::History => {
            cmd_history(&mut ctx)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "routinely", &mut io::stdout());
        }
    }
    Ok(())
}
