//! Runtime configuration resolved from the environment.

use std::path::PathBuf;

use chrono::Duration;

use crate::ledger::DEFAULT_UNDO_GRACE_SECS;

pub const DB_ENV: &str = "ROUTINELY_DB";
pub const OWNER_ENV: &str = "ROUTINELY_OWNER";
pub const GRACE_ENV: &str = "ROUTINELY_UNDO_GRACE_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Location of the JSON task database.
    pub db_path: PathBuf,
    /// Whose tasks commands operate on.
    pub owner: String,
    /// How long a completion can be undone.
    pub undo_grace: Duration,
}

impl Config {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary variable lookup.
    ///
    /// The database path is determined in the following order:
    /// 1. `ROUTINELY_DB`.
    /// 2. `<data dir>/routinely/tasks.json` (`~/.local/share` on Linux).
    /// 3. `./tasks.json`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup(DB_ENV)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let owner = non_empty(OWNER_ENV)
            .or_else(|| non_empty("USER"))
            .unwrap_or_else(|| "default".to_string());

        let undo_grace = match lookup(GRACE_ENV) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(secs) if secs >= 0 => Duration::seconds(secs),
                _ => {
                    tracing::warn!(value = %raw, "ignoring invalid {}", GRACE_ENV);
                    Duration::seconds(DEFAULT_UNDO_GRACE_SECS)
                }
            },
            None => Duration::seconds(DEFAULT_UNDO_GRACE_SECS),
        };

        Self {
            db_path,
            owner,
            undo_grace,
        }
    }
}

fn default_db_path() -> PathBuf {
    let mut p = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    p.push("routinely");
    p.push("tasks.json");
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn explicit_variables_win() {
        let cfg = Config::from_lookup(lookup(&[
            (DB_ENV, "/tmp/r.json"),
            (OWNER_ENV, "ana"),
            ("USER", "root"),
            (GRACE_ENV, "60"),
        ]));
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/r.json"));
        assert_eq!(cfg.owner, "ana");
        assert_eq!(cfg.undo_grace, Duration::seconds(60));
    }

    #[test]
    fn falls_back_to_user_and_defaults() {
        let cfg = Config::from_lookup(lookup(&[("USER", "bob"), (GRACE_ENV, "soon")]));
        assert_eq!(cfg.owner, "bob");
        assert_eq!(cfg.undo_grace, Duration::seconds(DEFAULT_UNDO_GRACE_SECS));
        assert!(cfg.db_path.ends_with("routinely/tasks.json") || cfg.db_path.ends_with("tasks.json"));

        let cfg = Config::from_lookup(lookup(&[]));
        assert_eq!(cfg.owner, "default");
    }

    #[test]
    fn blank_owner_falls_back_to_user() {
        let cfg = Config::from_lookup(lookup(&[(OWNER_ENV, "  "), ("USER", "bob")]));
        assert_eq!(cfg.owner, "bob");

        let cfg = Config::from_lookup(lookup(&[(OWNER_ENV, ""), ("USER", "")]));
        assert_eq!(cfg.owner, "default");
    }
}
