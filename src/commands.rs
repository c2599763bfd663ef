use chrono::Duration;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use serde::Serialize;
use serde_json::json;

use crate::clock::Clock;
use crate::due::due_date;
use crate::error::{Error, Result};
use crate::ledger::{Completion, CompletionLedger, UndoOutcome, DEFAULT_UNDO_GRACE_SECS};
use crate::models::{parse_date, NewTask, Task, TaskLog, TaskPatch};
use crate::planner::{Plan, TodoPlanner};
use crate::recurrence::{FrequencyUnit, RecurrenceRule};
use crate::store::TaskStore;

/// Everything a command needs: where tasks live, whose they are, and what
/// time it is.
pub struct Context<S: TaskStore, C: Clock> {
    pub store: S,
    pub clock: C,
    pub owner: String,
    pub undo_grace: Duration,
    /// Print JSON instead of tables.
    pub json: bool,
    /// Print nothing.
    pub silent: bool,
}

impl<S: TaskStore, C: Clock> Context<S, C> {
    pub fn new(store: S, clock: C, owner: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            owner: owner.into(),
            undo_grace: Duration::seconds(DEFAULT_UNDO_GRACE_SECS),
            json: false,
            silent: false,
        }
    }

    fn say(&self, msg: impl AsRef<str>) {
        if !self.silent {
            println!("{}", msg.as_ref());
        }
    }

    fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if !self.silent {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        Ok(())
    }
}

/// Fields for `add`, as typed on the command line.
#[derive(Debug, Clone)]
pub struct AddArgs {
    pub name: String,
    pub every: u32,
    pub unit: String,
    /// Defaults to today.
    pub start: Option<String>,
    pub adjust_on_completion: bool,
}

/// Fields for `edit`; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct EditArgs {
    pub name: Option<String>,
    pub every: Option<u32>,
    pub unit: Option<String>,
    pub start: Option<String>,
    pub adjust_on_completion: Option<bool>,
}

/// Adds a new recurring task for the current owner.
pub fn cmd_add<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>, args: AddArgs) -> Result<Task> {
    let unit: FrequencyUnit = args.unit.parse()?;
    let recurrence = RecurrenceRule::new(args.every, unit, args.adjust_on_completion)?;
    let start_date = match &args.start {
        Some(s) => parse_date(s)?,
        None => ctx.clock.today(),
    };
    let task = ctx.store.insert_task(
        NewTask {
            owner: ctx.owner.clone(),
            name: args.name,
            recurrence,
            start_date,
        },
        ctx.clock.now(),
    )?;
    tracing::info!(owner = %ctx.owner, task_id = task.id, "task added");
    if ctx.json {
        ctx.emit_json(&task)?;
    } else {
        ctx.say(format!("Task added (id = {})", task.id));
    }
    Ok(task)
}

/// Lists every task of the owner with its next due date.
pub fn cmd_list<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>) -> Result<Vec<Task>> {
    let tasks = ctx.store.tasks_for_owner(&ctx.owner, None)?;
    if ctx.json {
        ctx.emit_json(&tasks)?;
        return Ok(tasks);
    }
    if tasks.is_empty() {
        ctx.say("No tasks found.");
        return Ok(tasks);
    }

    let today = ctx.clock.today();
    let mut table = new_table(&["ID", "Name", "Repeats", "Start", "Last Done", "Next Due"]);
    for t in &tasks {
        let next = match due_date(t, today)? {
            Some(d) => d.to_string(),
            None => "now".to_string(),
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.name),
            Cell::new(t.recurrence.label()),
            Cell::new(t.start_date),
            Cell::new(last_done(t)),
            Cell::new(next),
        ]);
    }
    ctx.say(table.to_string());
    Ok(tasks)
}

/// Edits an existing task's details.
pub fn cmd_edit<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>, id: u64, args: EditArgs) -> Result<Task> {
    let patch = TaskPatch {
        name: args.name,
        frequency: args.every,
        unit: args.unit.as_deref().map(str::parse::<FrequencyUnit>).transpose()?,
        start_date: args.start.as_deref().map(parse_date).transpose()?,
        adjust_on_completion: args.adjust_on_completion,
    };
    let mut task = ctx.store.task(&ctx.owner, id)?;
    if patch.is_empty() {
        ctx.say(format!("Task {} unchanged.", id));
        return Ok(task);
    }
    patch.apply(&mut task, ctx.clock.now())?;
    ctx.store.update_task(&task)?;
    tracing::info!(owner = %ctx.owner, task_id = id, "task updated");
    ctx.say(format!("Task {} updated.", id));
    Ok(task)
}

/// Removes a task and its completion history.
pub fn cmd_remove<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>, id: u64) -> Result<Task> {
    let task = ctx.store.delete_task(&ctx.owner, id)?;
    tracing::info!(owner = %ctx.owner, task_id = id, "task removed");
    ctx.say(format!("Task {} removed.", id));
    Ok(task)
}

/// Shows what is due today, tomorrow, and over the next days.
pub fn cmd_todo<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>) -> Result<Plan> {
    let plan = TodoPlanner::new(&ctx.store).plan(&ctx.owner, &ctx.clock)?;
    if ctx.json {
        ctx.emit_json(&plan)?;
        return Ok(plan);
    }
    if plan.is_empty() {
        ctx.say("Nothing due this week.");
        return Ok(plan);
    }
    for (title, tasks, color) in [
        ("Today", &plan.due_today, Color::Red),
        ("Tomorrow", &plan.due_tomorrow, Color::Yellow),
        ("Next days", &plan.due_next_days, Color::Green),
    ] {
        if tasks.is_empty() {
            continue;
        }
        let mut table = new_table(&["ID", "Name", "Repeats", "Last Done"]);
        for t in tasks {
            table.add_row(vec![
                Cell::new(t.id),
                Cell::new(&t.name).fg(color),
                Cell::new(t.recurrence.label()),
                Cell::new(last_done(t)),
            ]);
        }
        ctx.say(format!("{} ({})\n{}", title, tasks.len(), table));
    }
    Ok(plan)
}

/// Marks a task as done now.
pub fn cmd_complete<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>, id: u64) -> Result<Completion> {
    let owner = ctx.owner.clone();
    let completion = CompletionLedger::new(&mut ctx.store)
        .with_grace(ctx.undo_grace)
        .complete(&owner, id, &ctx.clock)?;
    if ctx.json {
        ctx.emit_json(&json!({ "task": completion.task, "log": completion.log }))?;
    } else {
        ctx.say(format!(
            "Task {} completed. Undo with: routinely undo {} --log {}",
            id, id, completion.log.id
        ));
    }
    Ok(completion)
}

/// Reverts a completion made within the grace window.
pub fn cmd_undo<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>, id: u64, log: Option<u64>) -> Result<UndoOutcome> {
    let owner = ctx.owner.clone();
    let outcome = CompletionLedger::new(&mut ctx.store)
        .with_grace(ctx.undo_grace)
        .undo_completion(&owner, id, log, &ctx.clock)?;
    let (status, msg) = match &outcome {
        UndoOutcome::Reverted { removed, .. } => (
            "reverted",
            format!("Completion {} of task {} undone.", removed.id, id),
        ),
        UndoOutcome::NothingToUndo => ("nothing_to_undo", format!("Task {} has no completion to undo.", id)),
        UndoOutcome::GraceExpired { completed_at } => (
            "grace_expired",
            format!("Task {} was completed at {}; too late to undo.", id, completed_at),
        ),
    };
    if ctx.json {
        ctx.emit_json(&json!({ "task_id": id, "status": status }))?;
    } else {
        ctx.say(msg);
    }
    Ok(outcome)
}

/// Shows the completion log of one task, newest first.
pub fn cmd_logs<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>, id: u64) -> Result<Vec<TaskLog>> {
    let task = ctx.store.task(&ctx.owner, id)?;
    let logs = ctx.store.recent_logs(task.id, usize::MAX)?;
    if ctx.json {
        ctx.emit_json(&logs)?;
        return Ok(logs);
    }
    if logs.is_empty() {
        ctx.say(format!("Task {} ({}) was never completed.", id, task.name));
        return Ok(logs);
    }
    let mut table = new_table(&["Log", "Completed At"]);
    for l in &logs {
        table.add_row(vec![Cell::new(l.id), Cell::new(l.created_at.format("%Y-%m-%d %H:%M"))]);
    }
    ctx.say(format!("{}\n{}", task.name, table));
    Ok(logs)
}

/// One row of the completion history.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub log: TaskLog,
    pub task_name: String,
}

/// Shows every completion of the owner, newest first.
pub fn cmd_history<S: TaskStore, C: Clock>(ctx: &mut Context<S, C>) -> Result<Vec<HistoryEntry>> {
    let tasks = ctx.store.tasks_for_owner(&ctx.owner, None)?;
    let entries: Vec<HistoryEntry> = ctx
        .store
        .logs_for_owner(&ctx.owner)?
        .into_iter()
        .map(|log| -> Result<HistoryEntry> {
            let task_name = tasks
                .iter()
                .find(|t| t.id == log.task_id)
                .map(|t| t.name.clone())
                .ok_or(Error::TaskNotFound(log.task_id))?;
            Ok(HistoryEntry { log, task_name })
        })
        .collect::<Result<_>>()?;

    if ctx.json {
        ctx.emit_json(&entries)?;
        return Ok(entries);
    }
    if entries.is_empty() {
        ctx.say("No completions yet.");
        return Ok(entries);
    }
    let mut table = new_table(&["Completed At", "Task ID", "Task"]);
    for e in &entries {
        table.add_row(vec![
            Cell::new(e.log.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(e.log.task_id),
            Cell::new(&e.task_name),
        ]);
    }
    ctx.say(table.to_string());
    Ok(entries)
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
    table
}

fn last_done(t: &Task) -> String {
    t.last_completed
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}
