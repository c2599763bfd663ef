//! Completion log: marking tasks done and taking it back.

use chrono::{Duration, NaiveDateTime};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::{Task, TaskLog};
use crate::store::{TaskStore, Transaction};

/// How long after a completion it may still be undone.
pub const DEFAULT_UNDO_GRACE_SECS: i64 = 5 * 60;

/// Result of marking a task done. `log.id` identifies this completion for undo.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub task: Task,
    pub log: TaskLog,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    /// The completion was removed and `task` holds the restored state.
    Reverted { task: Task, removed: TaskLog },
    /// The task has no completion to revert.
    NothingToUndo,
    /// The completion to revert is older than the grace window.
    GraceExpired { completed_at: NaiveDateTime },
}

impl UndoOutcome {
    pub fn is_reverted(&self) -> bool {
        matches!(self, UndoOutcome::Reverted { .. })
    }
}

pub struct CompletionLedger<'a, S: TaskStore + ?Sized> {
    store: &'a mut S,
    grace: Duration,
}

impl<'a, S: TaskStore + ?Sized> CompletionLedger<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            grace: Duration::seconds(DEFAULT_UNDO_GRACE_SECS),
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Marks a task done now and records a completion log in the same
    /// transaction.
    ///
    /// Completions never move backwards: `now` must not be earlier than the
    /// task's current last completion.
    pub fn complete(&mut self, owner: &str, task_id: u64, clock: &impl Clock) -> Result<Completion> {
        let now = clock.now();
        let mut task = self.store.task(owner, task_id)?;
        if let Some(last) = task.last_completed.filter(|last| now < *last) {
            return Err(Error::InvalidTask(format!(
                "task {} was already completed at {}, later than {}",
                task_id, last, now
            )));
        }
        task.last_completed = Some(now);

        let log = self
            .store
            .commit(Transaction {
                task: task.clone(),
                append_log: Some(now),
                remove_log: None,
            })?
            .ok_or_else(|| Error::InvalidTask(format!("store did not record a log for task {}", task_id)))?;

        tracing::info!(owner, task_id, log_id = log.id, at = %now, "task completed");
        Ok(Completion { task, log })
    }

    /// Reverts a completion made within the grace window.
    ///
    /// With a `handle` exactly that log is removed, provided it is itself
    /// inside the grace window; without one the newest log of the task is
    /// assumed to be the completion to revert. The task's
    /// last completion falls back to the newest remaining log.
    pub fn undo_completion(
        &mut self,
        owner: &str,
        task_id: u64,
        handle: Option<u64>,
        clock: &impl Clock,
    ) -> Result<UndoOutcome> {
        let now = clock.now();
        let mut task = self.store.task(owner, task_id)?;

        let Some(last_completed) = task.last_completed else {
            tracing::debug!(owner, task_id, "undo ignored: task never completed");
            return Ok(UndoOutcome::NothingToUndo);
        };
        if now - last_completed > self.grace {
            tracing::warn!(owner, task_id, %last_completed, "undo ignored: grace window expired");
            return Ok(UndoOutcome::GraceExpired { completed_at: last_completed });
        }

        let (removed, previous) = match handle {
            Some(log_id) => {
                let mut logs = self.store.recent_logs(task_id, usize::MAX)?;
                let idx = logs
                    .iter()
                    .position(|l| l.id == log_id)
                    .ok_or(Error::LogNotFound { task: task_id, log: log_id })?;
                let removed = logs.remove(idx);
                // The handle may name an older completion than the last one.
                if now - removed.created_at > self.grace {
                    tracing::warn!(owner, task_id, log_id, "undo ignored: grace window expired");
                    return Ok(UndoOutcome::GraceExpired { completed_at: removed.created_at });
                }
                (removed, logs.into_iter().next())
            }
            None => {
                let mut logs = self.store.recent_logs(task_id, 2)?.into_iter();
                match logs.next() {
                    Some(newest) => (newest, logs.next()),
                    None => {
                        tracing::warn!(owner, task_id, "undo ignored: task has no completion logs");
                        return Ok(UndoOutcome::NothingToUndo);
                    }
                }
            }
        };

        task.last_completed = previous.map(|l| l.created_at);
        self.store.commit(Transaction {
            task: task.clone(),
            append_log: None,
            remove_log: Some(removed.id),
        })?;

        tracing::info!(owner, task_id, log_id = removed.id, "task completion undone");
        Ok(UndoOutcome::Reverted { task, removed })
    }
}
