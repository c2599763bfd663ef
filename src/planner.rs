//! Daily planning: which tasks are due today, tomorrow, or later this week.

use std::collections::HashSet;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::clock::Clock;
use crate::due::is_due;
use crate::error::{Error, Result};
use crate::models::Task;
use crate::store::TaskStore;

/// Days from today that count as "tomorrow".
pub const TOMORROW: u64 = 1;
/// Days from today covered by the last bucket.
pub const HORIZON: u64 = 6;

/// Three disjoint buckets of due tasks, in store order.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Plan {
    pub today: NaiveDate,
    pub due_today: Vec<Task>,
    pub due_tomorrow: Vec<Task>,
    pub due_next_days: Vec<Task>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.due_today.is_empty() && self.due_tomorrow.is_empty() && self.due_next_days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.due_today.len() + self.due_tomorrow.len() + self.due_next_days.len()
    }
}

/// Builds the todo list for one owner from a store.
pub struct TodoPlanner<'a, S: TaskStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: TaskStore + ?Sized> TodoPlanner<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Partitions the owner's tasks into due-today, due-tomorrow and
    /// due-within-the-horizon.
    ///
    /// The clock is read once; all buckets and due dates use that day.
    pub fn plan(&self, owner: &str, clock: &impl Clock) -> Result<Plan> {
        let today = clock.today();
        let tomorrow = offset(today, TOMORROW)?;
        let horizon = offset(today, HORIZON)?;

        // A task's due date is never before its start, so nothing starting
        // after the horizon can land in any bucket.
        let candidates = self.store.tasks_for_owner(owner, Some(horizon))?;

        let mut seen = HashSet::new();
        let due_today = take_due(&candidates, today, today, &mut seen)?;
        let due_tomorrow = take_due(&candidates, tomorrow, today, &mut seen)?;
        let due_next_days = take_due(&candidates, horizon, today, &mut seen)?;

        tracing::debug!(
            owner,
            %today,
            candidates = candidates.len(),
            today_count = due_today.len(),
            tomorrow_count = due_tomorrow.len(),
            next_days_count = due_next_days.len(),
            "planned todo list"
        );

        Ok(Plan {
            today,
            due_today,
            due_tomorrow,
            due_next_days,
        })
    }
}

fn offset(today: NaiveDate, days: u64) -> Result<NaiveDate> {
    today
        .checked_add_days(Days::new(days))
        .ok_or(Error::DateOutOfRange(today))
}

/// Tasks due by `on` that are not in an earlier bucket.
fn take_due(
    candidates: &[Task],
    on: NaiveDate,
    today: NaiveDate,
    seen: &mut HashSet<u64>,
) -> Result<Vec<Task>> {
    let mut bucket = Vec::new();
    for task in candidates {
        // Each bucket only sees tasks that have started by its date.
        if seen.contains(&task.id) || task.start_date > on {
            continue;
        }
        if is_due(task, on, today)? {
            seen.insert(task.id);
            bucket.push(task.clone());
        }
    }
    Ok(bucket)
}
