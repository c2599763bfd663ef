use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::recurrence::{FrequencyUnit, RecurrenceRule};

/// Represents a single recurring task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: u64,
    /// Name of the user the task belongs to.
    pub owner: String,
    /// The name or description of the task.
    pub name: String,
    /// How often the task repeats.
    pub recurrence: RecurrenceRule,
    /// First day the task is scheduled.
    pub start_date: NaiveDate,
    /// When the task was last marked done, if ever.
    #[serde(default)]
    pub last_completed: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Task {
    /// Checks the invariants that user edits could break.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidTask("name must not be empty".into()));
        }
        if let Some(done) = self.last_completed {
            if done.date() < self.start_date {
                return Err(Error::InvalidTask(format!(
                    "task {} was completed on {} before its start date {}",
                    self.id,
                    done.date(),
                    self.start_date
                )));
            }
        }
        Ok(())
    }
}

/// A single completion event of a task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TaskLog {
    pub id: u64,
    pub task_id: u64,
    pub created_at: NaiveDateTime,
}

/// Input for creating a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub owner: String,
    pub name: String,
    pub recurrence: RecurrenceRule,
    pub start_date: NaiveDate,
}

/// Partial update of a task; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub frequency: Option<u32>,
    pub unit: Option<FrequencyUnit>,
    pub start_date: Option<NaiveDate>,
    pub adjust_on_completion: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.frequency.is_none()
            && self.unit.is_none()
            && self.start_date.is_none()
            && self.adjust_on_completion.is_none()
    }

    /// Applies the patch and bumps `updated_at`.
    pub fn apply(self, task: &mut Task, now: NaiveDateTime) -> Result<()> {
        if let Some(n) = self.name {
            task.name = n;
        }
        let rule = RecurrenceRule::new(
            self.frequency.unwrap_or(task.recurrence.frequency.get()),
            self.unit.unwrap_or(task.recurrence.unit),
            self.adjust_on_completion
                .unwrap_or(task.recurrence.adjust_on_completion),
        )?;
        task.recurrence = rule;
        if let Some(d) = self.start_date {
            task.start_date = d;
        }
        task.updated_at = now;
        task.validate()
    }
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate(s.to_string()))
}

/// Parses a local timestamp: `YYYY-MM-DD HH:MM[:SS]`, the same with a `T`
/// separator, or a bare date meaning midnight.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    Ok(parse_date(s)?.and_time(NaiveTime::MIN))
}
