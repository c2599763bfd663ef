use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{NewTask, Task, TaskLog};

/// Changes applied by one completion or undo.
///
/// A store must apply all of them or none.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// New state of the task; must already exist.
    pub task: Task,
    /// Append a completion log stamped with this time.
    pub append_log: Option<NaiveDateTime>,
    /// Remove the log with this id; must belong to `task`.
    pub remove_log: Option<u64>,
}

/// Persistence of tasks and their completion logs.
pub trait TaskStore {
    /// Tasks of `owner` in insertion order, optionally only those starting
    /// on or before a date.
    fn tasks_for_owner(&self, owner: &str, started_on_or_before: Option<NaiveDate>) -> Result<Vec<Task>>;

    /// A single task, `TaskNotFound` if it is missing or belongs to someone else.
    fn task(&self, owner: &str, id: u64) -> Result<Task>;

    /// Up to `limit` logs of a task, newest first.
    fn recent_logs(&self, task_id: u64, limit: usize) -> Result<Vec<TaskLog>>;

    /// Every completion of every task of `owner`, newest first.
    fn logs_for_owner(&self, owner: &str) -> Result<Vec<TaskLog>>;

    fn insert_task(&mut self, task: NewTask, now: NaiveDateTime) -> Result<Task>;

    fn update_task(&mut self, task: &Task) -> Result<()>;

    /// Deletes a task together with its logs.
    fn delete_task(&mut self, owner: &str, id: u64) -> Result<Task>;

    /// Applies a transaction atomically, returning the appended log if any.
    fn commit(&mut self, tx: Transaction) -> Result<Option<TaskLog>>;
}

/// The whole persisted state.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Database {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub logs: Vec<TaskLog>,
    /// Log ids are never reused so an undo handle cannot match a later log.
    #[serde(default)]
    pub next_log_id: u64,
}

impl Database {
    fn find(&self, owner: &str, id: u64) -> Result<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == id && t.owner == owner)
            .ok_or(Error::TaskNotFound(id))
    }

    fn tasks_for_owner(&self, owner: &str, bound: Option<NaiveDate>) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|t| t.owner == owner)
            .filter(|t| bound.map_or(true, |b| t.start_date <= b))
            .cloned()
            .collect()
    }

    fn recent_logs(&self, task_id: u64, limit: usize) -> Vec<TaskLog> {
        let mut logs: Vec<TaskLog> = self.logs.iter().filter(|l| l.task_id == task_id).cloned().collect();
        sort_newest_first(&mut logs);
        logs.truncate(limit);
        logs
    }

    fn logs_for_owner(&self, owner: &str) -> Vec<TaskLog> {
        let mut logs: Vec<TaskLog> = self
            .logs
            .iter()
            .filter(|l| self.tasks.iter().any(|t| t.id == l.task_id && t.owner == owner))
            .cloned()
            .collect();
        sort_newest_first(&mut logs);
        logs
    }

    fn insert_task(&mut self, new: NewTask, now: NaiveDateTime) -> Result<Task> {
        let next_id = self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        let task = Task {
            id: next_id,
            owner: new.owner,
            name: new.name,
            recurrence: new.recurrence,
            start_date: new.start_date,
            last_completed: None,
            created_at: now,
            updated_at: now,
        };
        task.validate()?;
        self.tasks.push(task.clone());
        Ok(task)
    }

    fn update_task(&mut self, task: &Task) -> Result<()> {
        task.validate()?;
        let slot = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id && t.owner == task.owner)
            .ok_or(Error::TaskNotFound(task.id))?;
        *slot = task.clone();
        Ok(())
    }

    fn delete_task(&mut self, owner: &str, id: u64) -> Result<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id && t.owner == owner)
            .ok_or(Error::TaskNotFound(id))?;
        let task = self.tasks.remove(idx);
        self.logs.retain(|l| l.task_id != id);
        Ok(task)
    }

    fn commit(&mut self, tx: Transaction) -> Result<Option<TaskLog>> {
        // Validate everything before touching state.
        self.find(&tx.task.owner, tx.task.id)?;
        tx.task.validate()?;
        if let Some(log_id) = tx.remove_log {
            if !self.logs.iter().any(|l| l.id == log_id && l.task_id == tx.task.id) {
                return Err(Error::LogNotFound {
                    task: tx.task.id,
                    log: log_id,
                });
            }
        }

        if let Some(log_id) = tx.remove_log {
            self.logs.retain(|l| l.id != log_id);
        }
        let appended = tx.append_log.map(|created_at| {
            let first_free = self.logs.iter().map(|l| l.id).max().unwrap_or(0) + 1;
            let id = self.next_log_id.max(first_free);
            self.next_log_id = id + 1;
            let log = TaskLog {
                id,
                task_id: tx.task.id,
                created_at,
            };
            self.logs.push(log.clone());
            log
        });
        self.update_task(&tx.task)?;
        Ok(appended)
    }
}

fn sort_newest_first(logs: &mut [TaskLog]) {
    logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

/// In-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    db: Database,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl TaskStore for MemoryStore {
    fn tasks_for_owner(&self, owner: &str, started_on_or_before: Option<NaiveDate>) -> Result<Vec<Task>> {
        Ok(self.db.tasks_for_owner(owner, started_on_or_before))
    }

    fn task(&self, owner: &str, id: u64) -> Result<Task> {
        self.db.find(owner, id).cloned()
    }

    fn recent_logs(&self, task_id: u64, limit: usize) -> Result<Vec<TaskLog>> {
        Ok(self.db.recent_logs(task_id, limit))
    }

    fn logs_for_owner(&self, owner: &str) -> Result<Vec<TaskLog>> {
        Ok(self.db.logs_for_owner(owner))
    }

    fn insert_task(&mut self, task: NewTask, now: NaiveDateTime) -> Result<Task> {
        self.db.insert_task(task, now)
    }

    fn update_task(&mut self, task: &Task) -> Result<()> {
        self.db.update_task(task)
    }

    fn delete_task(&mut self, owner: &str, id: u64) -> Result<Task> {
        self.db.delete_task(owner, id)
    }

    fn commit(&mut self, tx: Transaction) -> Result<Option<TaskLog>> {
        self.db.commit(tx)
    }
}

/// Store backed by a single JSON file.
///
/// Every write goes to a temp file in the same directory which then
/// replaces the database, so readers never see a half-applied change.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    db: Database,
}

impl JsonStore {
    /// Opens the database at `path`; a missing file is an empty database.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let db = if path.exists() {
            let s = fs::read_to_string(&path)?;
            if s.trim().is_empty() {
                Database::default()
            } else {
                serde_json::from_str(&s)?
            }
        } else {
            Database::default()
        };
        tracing::debug!(path = %path.display(), tasks = db.tasks.len(), "opened task database");
        Ok(Self { path, db })
    }

    /// Runs `f` against a copy of the database and persists it only on success.
    fn write<T>(&mut self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut next = self.db.clone();
        let out = f(&mut next)?;
        let s = serde_json::to_string_pretty(&next)?;
        write_atomic(&self.path, s.as_bytes())?;
        self.db = next;
        Ok(out)
    }
}

impl TaskStore for JsonStore {
    fn tasks_for_owner(&self, owner: &str, started_on_or_before: Option<NaiveDate>) -> Result<Vec<Task>> {
        Ok(self.db.tasks_for_owner(owner, started_on_or_before))
    }

    fn task(&self, owner: &str, id: u64) -> Result<Task> {
        self.db.find(owner, id).cloned()
    }

    fn recent_logs(&self, task_id: u64, limit: usize) -> Result<Vec<TaskLog>> {
        Ok(self.db.recent_logs(task_id, limit))
    }

    fn logs_for_owner(&self, owner: &str) -> Result<Vec<TaskLog>> {
        Ok(self.db.logs_for_owner(owner))
    }

    fn insert_task(&mut self, task: NewTask, now: NaiveDateTime) -> Result<Task> {
        self.write(|db| db.insert_task(task, now))
    }

    fn update_task(&mut self, task: &Task) -> Result<()> {
        self.write(|db| db.update_task(task))
    }

    fn delete_task(&mut self, owner: &str, id: u64) -> Result<Task> {
        self.write(|db| db.delete_task(owner, id))
    }

    fn commit(&mut self, tx: Transaction) -> Result<Option<TaskLog>> {
        self.write(|db| db.commit(tx))
    }
}

/// Writes `data` to a sibling temp file, then renames it over `path`.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let temp_path = path.with_extension(format!(
        "{}.tmp.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or(""),
        std::process::id()
    ));
    let mut temp_file = File::create(&temp_path)?;
    temp_file.write_all(data)?;
    temp_file.sync_all()?;
    drop(temp_file);
    fs::rename(&temp_path, path)?;
    Ok(())
}
