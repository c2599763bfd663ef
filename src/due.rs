use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::error::Result;
use crate::models::Task;
use crate::recurrence::Interval;

/// Computes the date a task is next due, relative to `today`.
///
/// - Adjust-on-completion tasks are due one interval after their last
///   completion. A task that was never completed has no computed date
///   (`None`); callers treat it as due now.
/// - Grid tasks are due on the first occurrence `start + k * interval`
///   that falls on or after `today`. A start date in the future is its
///   own first occurrence.
pub fn due_date(task: &Task, today: NaiveDate) -> Result<Option<NaiveDate>> {
    let interval = task.recurrence.interval();
    if task.recurrence.adjust_on_completion {
        return match task.last_completed {
            Some(done) => Ok(Some(interval.add_to_datetime(done)?.date())),
            None => Ok(None),
        };
    }
    next_on_grid(task.start_date, interval, today).map(Some)
}

/// Whether `task` should be done by `on`.
///
/// `today` anchors the due date computation and must be the same instant
/// for every date evaluated within one planning run.
pub fn is_due(task: &Task, on: NaiveDate, today: NaiveDate) -> Result<bool> {
    let Some(done) = task.last_completed else {
        return Ok(true);
    };
    match due_date(task, today)? {
        // Completed already for the current period if done on/after the due day.
        Some(due) => Ok(due <= on && done < due.and_time(NaiveTime::MIN)),
        None => Ok(true),
    }
}

fn next_on_grid(start: NaiveDate, interval: Interval, today: NaiveDate) -> Result<NaiveDate> {
    if start >= today {
        return Ok(start);
    }
    match interval {
        Interval::Days(n) => {
            let elapsed = (today - start).num_days() as u64;
            let n = u64::from(n);
            let k = elapsed.div_ceil(n);
            let k = u32::try_from(k).map_err(|_| crate::Error::DateOutOfRange(start))?;
            interval.nth_after(start, k)
        }
        Interval::Months(n) => {
            // Jump close to today, staying strictly before it, then walk.
            let months = (today.year() - start.year()) * 12 + today.month() as i32
                - start.month() as i32;
            let mut k = (months.max(0) as u32 / n).saturating_sub(1);
            let mut cursor = interval.nth_after(start, k)?;
            while cursor < today {
                k += 1;
                cursor = interval.nth_after(start, k)?;
            }
            Ok(cursor)
        }
    }
}
