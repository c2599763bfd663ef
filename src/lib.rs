//! # routinely
//!
//! A recurring task tracker. Tasks repeat every N days, weeks or months,
//! either on a fixed grid anchored at their start date or counted from the
//! moment they were last completed. The planner answers "what is due today,
//! tomorrow, and in the next few days", and the completion ledger records
//! when tasks are done with a short window to undo an accidental completion.
//!
//! # Module Organization
//!
//! - `recurrence`: frequency units, intervals and calendar arithmetic
//! - `due`: due date computation and the "is due" predicate
//! - `planner`: today / tomorrow / next days buckets
//! - `ledger`: completion and undo
//! - `store`: persistence trait with in-memory and JSON file stores
//! - `clock`: injectable time source
//! - `commands`: the operations behind the CLI
//! - `config`: environment configuration
//! - `error`: error type and result alias

pub mod clock;
pub mod commands;
pub mod config;
pub mod due;
pub mod error;
pub mod ledger;
pub mod models;
pub mod planner;
pub mod recurrence;
pub mod store;

pub use error::{Error, Result};
