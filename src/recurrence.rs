use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Calendar unit a recurrence is counted in.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyUnit {
    Day,
    Week,
    Month,
}

impl FrequencyUnit {
    /// The interval covered by `count` of this unit.
    pub fn interval(self, count: NonZeroU32) -> Interval {
        let n = count.get();
        match self {
            FrequencyUnit::Day => Interval::Days(n),
            FrequencyUnit::Week => Interval::Days(n.saturating_mul(7)),
            FrequencyUnit::Month => Interval::Months(n),
        }
    }
}

impl FromStr for FrequencyUnit {
    type Err = Error;

    /// Accepts unit names and the numeric ids used by older exports (1, 2, 3).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1" | "d" | "day" | "days" | "daily" => Ok(FrequencyUnit::Day),
            "2" | "w" | "week" | "weeks" | "weekly" => Ok(FrequencyUnit::Week),
            "3" | "m" | "month" | "months" | "monthly" => Ok(FrequencyUnit::Month),
            _ => Err(Error::UnknownFrequencyUnit(s.to_string())),
        }
    }
}

impl fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FrequencyUnit::Day => "day",
            FrequencyUnit::Week => "week",
            FrequencyUnit::Month => "month",
        };
        f.write_str(s)
    }
}

/// Step between two occurrences of a task.
///
/// Month steps clamp to the last day of the target month when the source
/// day does not exist there (Jan 31 + 1 month = Feb 28 or 29).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Days(u32),
    Months(u32),
}

impl Interval {
    pub fn add_to_datetime(self, at: NaiveDateTime) -> Result<NaiveDateTime> {
        let out = match self {
            Interval::Days(n) => at.checked_add_days(Days::new(u64::from(n))),
            Interval::Months(n) => at.checked_add_months(Months::new(n)),
        };
        out.ok_or(Error::DateOutOfRange(at.date()))
    }

    /// `anchor` advanced by `k` whole intervals.
    ///
    /// Always measured from the anchor so month clamping never accumulates.
    pub fn nth_after(self, anchor: NaiveDate, k: u32) -> Result<NaiveDate> {
        let out = match self {
            Interval::Days(n) => anchor.checked_add_days(Days::new(u64::from(n) * u64::from(k))),
            Interval::Months(n) => n
                .checked_mul(k)
                .and_then(|months| anchor.checked_add_months(Months::new(months))),
        };
        out.ok_or(Error::DateOutOfRange(anchor))
    }
}

/// How often a task repeats and what its schedule is anchored to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: NonZeroU32,
    pub unit: FrequencyUnit,
    /// Count from the last completion instead of the fixed start-date grid.
    #[serde(default)]
    pub adjust_on_completion: bool,
}

impl RecurrenceRule {
    pub fn new(frequency: u32, unit: FrequencyUnit, adjust_on_completion: bool) -> Result<Self> {
        let frequency = NonZeroU32::new(frequency).ok_or(Error::InvalidFrequency(frequency))?;
        Ok(Self {
            frequency,
            unit,
            adjust_on_completion,
        })
    }

    pub fn interval(&self) -> Interval {
        self.unit.interval(self.frequency)
    }

    /// Human readable label, e.g. "every 2 weeks (after completion)".
    pub fn label(&self) -> String {
        let n = self.frequency.get();
        let base = if n == 1 {
            format!("every {}", self.unit)
        } else {
            format!("every {} {}s", n, self.unit)
        };
        if self.adjust_on_completion {
            format!("{} (after completion)", base)
        } else {
            base
        }
    }
}
