//! Error types for routinely
//!
//! Exit codes:
//! - 2: User error (bad recurrence, unknown task, invalid date)
//! - 4: Storage failure (I/O, corrupt database)

use chrono::NaiveDate;
use thiserror::Error;

/// Exit codes for the routinely CLI
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const STORAGE_FAILED: i32 = 4;
}

/// Main error type for routinely operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown frequency unit '{0}'. Supported: day, week, month.")]
    UnknownFrequencyUnit(String),

    #[error("Frequency must be at least 1, got {0}")]
    InvalidFrequency(u32),

    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Date arithmetic out of range from {0}")]
    DateOutOfRange(NaiveDate),

    #[error("Task {0} not found")]
    TaskNotFound(u64),

    #[error("Completion log {log} not found for task {task}")]
    LogNotFound { task: u64, log: u64 },

    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnknownFrequencyUnit(_)
            | Error::InvalidFrequency(_)
            | Error::InvalidDate(_)
            | Error::DateOutOfRange(_)
            | Error::TaskNotFound(_)
            | Error::LogNotFound { .. }
            | Error::InvalidTask(_) => exit_codes::USER_ERROR,

            Error::Io(_) | Error::Json(_) => exit_codes::STORAGE_FAILED,
        }
    }
}

/// Result type alias for routinely operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_map_correctly() {
        assert_eq!(Error::TaskNotFound(3).exit_code(), exit_codes::USER_ERROR);
        assert_eq!(
            Error::UnknownFrequencyUnit("fortnight".into()).exit_code(),
            exit_codes::USER_ERROR
        );
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.exit_code(), exit_codes::STORAGE_FAILED);
    }
}
