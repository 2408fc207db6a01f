//! `taskmaster` command line.
//!
//! Each invocation loads the saved tasks, runs one command and saves the result.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use taskmaster::{Bootstrap, Config, TaskMaster};
use taskmaster_core::types::{
    FilterConfig, Priority, PriorityFilter, SortBy, StatusFilter, Task, TaskDraft, TaskId,
    TaskPatch, TaskStatus,
};
use taskmaster_core::view::TaskStats;
use taskmaster_runtime::PersistenceStatus;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "taskmaster", version, about = "Personal task manager")]
struct Cli {
    /// Directory holding saved tasks (overrides TASKMASTER_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show tasks
    List {
        /// all, pending or completed
        #[arg(long, default_value = "all")]
        status: StatusFilter,
        /// all, low, medium or high
        #[arg(long, default_value = "all")]
        priority: PriorityFilter,
        /// Case-insensitive text to look for in title or description
        #[arg(long, default_value = "")]
        search: String,
        /// date, priority or title
        #[arg(long, default_value = "date")]
        sort: SortBy,
    },
    /// Add a task
    Add {
        /// Task title
        title: String,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Change fields of a task
    Edit {
        /// Task id
        id: TaskId,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        no_due: bool,
        /// Mark as completed
        #[arg(long, conflicts_with = "reopen")]
        done: bool,
        /// Mark as pending
        #[arg(long)]
        reopen: bool,
    },
    /// Flip a task between pending and completed
    Toggle {
        /// Task id
        id: TaskId,
    },
    /// Delete a task
    Delete {
        /// Task id
        id: TaskId,
    },
    /// Delete every completed task
    ClearCompleted,
    /// Show totals and completion rate
    Stats,
    /// Import sample tasks from the remote endpoint
    Seed,
    /// Delete the saved task file
    Reset,
}

#[derive(Args, Debug)]
struct TaskFields {
    /// Longer description
    #[arg(long)]
    description: Option<String>,
    /// low, medium or high
    #[arg(long)]
    priority: Option<Priority>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    due: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskmaster=info,taskmaster_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir.clone() {
        config.storage.data_dir = dir;
    }
    info!(data_dir = %config.storage.data_dir.display(), key = %config.storage.key, "Configuration loaded");

    let app = TaskMaster::open(&config);
    match app.bootstrap().await? {
        Bootstrap::LoadFailed(error) => {
            eprintln!("warning: saved tasks could not be read ({error}); starting empty");
        },
        Bootstrap::Samples(count) => info!(count, "First run: wrote sample tasks"),
        Bootstrap::Loaded(_) | Bootstrap::Empty => {},
    }

    run(&app, cli.command, cli.json).await?;

    if let PersistenceStatus::Failed { error } = app.persistence_status().await {
        eprintln!("warning: changes could not be saved: {error}");
    }
    app.shutdown().await.context("shutting down")?;
    Ok(())
}

async fn run(app: &TaskMaster, command: Command, json: bool) -> Result<()> {
    match command {
        Command::List {
            status,
            priority,
            search,
            sort,
        } => {
            let filter = FilterConfig {
                status,
                priority,
                search,
            };
            let view = app.list(filter, sort).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                if view.tasks.is_empty() {
                    println!("No tasks.");
                }
                for task in &view.tasks {
                    println!("{}", task_line(task));
                }
                println!("{}", stats_line(&view.stats));
            }
        },
        Command::Add { title, fields } => {
            let mut draft = TaskDraft::new(title)
                .with_description(fields.description.unwrap_or_default())
                .with_priority(fields.priority.unwrap_or_default());
            draft.due_date = fields.due;
            let task = app.add(draft).await?;
            print_task(&task, json, "Added")?;
        },
        Command::Edit {
            id,
            title,
            fields,
            no_due,
            done,
            reopen,
        } => {
            let status = match (done, reopen) {
                (true, _) => Some(TaskStatus::Completed),
                (_, true) => Some(TaskStatus::Pending),
                _ => None,
            };
            let patch = TaskPatch {
                title,
                description: fields.description,
                priority: fields.priority,
                due_date: if no_due { Some(None) } else { fields.due.map(Some) },
                status,
            };
            let task = app.edit(id, patch).await?;
            print_task(&task, json, "Updated")?;
        },
        Command::Toggle { id } => {
            let task = app.toggle(id).await?;
            print_task(&task, json, "Toggled")?;
        },
        Command::Delete { id } => {
            let task = app.delete(id).await?;
            print_task(&task, json, "Deleted")?;
        },
        Command::ClearCompleted => {
            let removed = app.clear_completed().await?;
            println!("Removed {removed} completed task(s).");
        },
        Command::Stats => {
            let stats = app.stats().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{}", stats_line(&stats));
            }
        },
        Command::Seed => {
            let added = app.seed().await?;
            println!("Imported {added} task(s).");
        },
        Command::Reset => {
            app.reset().await?;
            println!("Saved tasks deleted.");
        },
    }
    Ok(())
}

fn print_task(task: &Task, json: bool, verb: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(task)?);
    } else {
        println!("{verb}: {}", task_line(task));
    }
    Ok(())
}

fn task_line(task: &Task) -> String {
    let mark = if task.is_completed() { 'x' } else { ' ' };
    let due = task
        .due_date
        .map(|d| format!(", due {d}"))
        .unwrap_or_default();
    format!("[{mark}] #{} {} ({}{due})", task.id, task.title, task.priority)
}

fn stats_line(stats: &TaskStats) -> String {
    format!(
        "{} total, {} in progress, {} completed ({}%)",
        stats.total, stats.in_progress, stats.completed, stats.completion_rate
    )
}
