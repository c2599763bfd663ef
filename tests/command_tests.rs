use chrono::{NaiveDate, NaiveDateTime};
use routinely::clock::FixedClock;
use routinely::commands::*;
use routinely::ledger::UndoOutcome;
use routinely::recurrence::FrequencyUnit;
use routinely::store::{JsonStore, TaskStore};
use std::path::{Path, PathBuf};

fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(h, m, 0).unwrap()
}

fn ctx_at(path: &Path, now: NaiveDateTime) -> Context<JsonStore, FixedClock> {
    let store = JsonStore::open(path).unwrap();
    let mut ctx = Context::new(store, FixedClock(now), "ana");
    ctx.silent = true;
    ctx
}

fn with_test_db<F>(f: F)
where
    F: FnOnce(PathBuf),
{
    let dir = tempfile::tempdir().unwrap();
    f(dir.path().join("tasks.json"));
}

fn add(name: &str, every: u32, unit: &str, start: &str, adjust: bool) -> AddArgs {
    AddArgs {
        name: name.into(),
        every,
        unit: unit.into(),
        start: Some(start.into()),
        adjust_on_completion: adjust,
    }
}

#[test]
fn test_add_and_list() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        cmd_add(&mut ctx, add("Water plants", 3, "days", "2024-01-01", false)).unwrap();

        let tasks = cmd_list(&mut ctx_at(&path, at(1, 9, 0))).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "Water plants");
        assert_eq!(tasks[0].recurrence.unit, FrequencyUnit::Day);
        assert_eq!(tasks[0].recurrence.frequency.get(), 3);
        assert_eq!(tasks[0].owner, "ana");
    });
}

#[test]
fn test_add_defaults_start_to_today() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(9, 22, 0));
        let task = cmd_add(
            &mut ctx,
            AddArgs {
                name: "Stretch".into(),
                every: 1,
                unit: "day".into(),
                start: None,
                adjust_on_completion: true,
            },
        )
        .unwrap();
        assert_eq!(task.start_date, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap());
    });
}

#[test]
fn test_add_rejects_unknown_unit() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        let err = cmd_add(&mut ctx, add("Bad", 1, "fortnight", "2024-01-01", false)).unwrap_err();
        assert!(matches!(err, routinely::Error::UnknownFrequencyUnit(_)));
        assert!(ctx.store.tasks_for_owner("ana", None).unwrap().is_empty());
    });
}

#[test]
fn test_complete_and_undo_persist() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        let task = cmd_add(&mut ctx, add("Run", 1, "week", "2024-01-01", true)).unwrap();

        let done = cmd_complete(&mut ctx_at(&path, at(2, 7, 0)), task.id).unwrap();

        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.task("ana", task.id).unwrap().last_completed, Some(at(2, 7, 0)));
        assert_eq!(reopened.recent_logs(task.id, 5).unwrap(), vec![done.log.clone()]);

        let outcome = cmd_undo(&mut ctx_at(&path, at(2, 7, 3)), task.id, Some(done.log.id)).unwrap();
        assert!(outcome.is_reverted());

        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.task("ana", task.id).unwrap().last_completed, None);
        assert!(reopened.recent_logs(task.id, 5).unwrap().is_empty());
    });
}

#[test]
fn test_late_undo_keeps_completion() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        let task = cmd_add(&mut ctx, add("Run", 1, "week", "2024-01-01", true)).unwrap();
        cmd_complete(&mut ctx_at(&path, at(2, 7, 0)), task.id).unwrap();

        let outcome = cmd_undo(&mut ctx_at(&path, at(2, 7, 6)), task.id, None).unwrap();
        assert!(matches!(outcome, UndoOutcome::GraceExpired { .. }));
        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.recent_logs(task.id, 5).unwrap().len(), 1);
    });
}

#[test]
fn test_todo_moves_completed_task() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        let task = cmd_add(&mut ctx, add("Vacuum", 3, "day", "2024-01-01", true)).unwrap();

        let plan = cmd_todo(&mut ctx_at(&path, at(5, 8, 0))).unwrap();
        assert_eq!(plan.due_today.len(), 1);

        cmd_complete(&mut ctx_at(&path, at(5, 8, 30)), task.id).unwrap();
        let plan = cmd_todo(&mut ctx_at(&path, at(5, 9, 0))).unwrap();
        assert!(plan.due_today.is_empty());
        assert!(plan.due_tomorrow.is_empty());
        // due again on Jan 8
        assert_eq!(plan.due_next_days.len(), 1);
        assert_eq!(plan.due_next_days[0].id, task.id);
    });
}

#[test]
fn test_edit_task() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        let task = cmd_add(&mut ctx, add("Laundry", 1, "week", "2024-01-01", false)).unwrap();

        let edited = cmd_edit(
            &mut ctx_at(&path, at(3, 9, 0)),
            task.id,
            EditArgs {
                name: Some("Laundry (whites)".into()),
                every: Some(2),
                ..EditArgs::default()
            },
        )
        .unwrap();
        assert_eq!(edited.name, "Laundry (whites)");
        assert_eq!(edited.recurrence.frequency.get(), 2);
        assert_eq!(edited.recurrence.unit, FrequencyUnit::Week);
        assert_eq!(edited.updated_at, at(3, 9, 0));

        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.task("ana", task.id).unwrap(), edited);
    });
}

#[test]
fn test_remove_deletes_history() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        let keep = cmd_add(&mut ctx, add("Keep", 1, "day", "2024-01-01", false)).unwrap();
        let gone = cmd_add(&mut ctx, add("Gone", 1, "day", "2024-01-01", false)).unwrap();
        cmd_complete(&mut ctx_at(&path, at(2, 9, 0)), keep.id).unwrap();
        cmd_complete(&mut ctx_at(&path, at(2, 10, 0)), gone.id).unwrap();

        cmd_remove(&mut ctx_at(&path, at(2, 11, 0)), gone.id).unwrap();

        let history = cmd_history(&mut ctx_at(&path, at(2, 12, 0))).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].task_name, "Keep");
        assert!(matches!(
            cmd_logs(&mut ctx_at(&path, at(2, 12, 0)), gone.id),
            Err(routinely::Error::TaskNotFound(_))
        ));
    });
}

#[test]
fn test_history_is_newest_first() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        let a = cmd_add(&mut ctx, add("A", 1, "day", "2024-01-01", false)).unwrap();
        let b = cmd_add(&mut ctx, add("B", 1, "day", "2024-01-01", false)).unwrap();
        cmd_complete(&mut ctx_at(&path, at(2, 9, 0)), a.id).unwrap();
        cmd_complete(&mut ctx_at(&path, at(3, 9, 0)), b.id).unwrap();
        cmd_complete(&mut ctx_at(&path, at(4, 9, 0)), a.id).unwrap();

        let history = cmd_history(&mut ctx_at(&path, at(4, 10, 0))).unwrap();
        let names: Vec<&str> = history.iter().map(|e| e.task_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "A"]);

        let logs = cmd_logs(&mut ctx_at(&path, at(4, 10, 0)), a.id).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].created_at, at(4, 9, 0));
    });
}

#[test]
fn test_owners_do_not_see_each_other() {
    with_test_db(|path| {
        let mut ctx = ctx_at(&path, at(1, 9, 0));
        let task = cmd_add(&mut ctx, add("Private", 1, "day", "2024-01-01", false)).unwrap();

        let mut bob = ctx_at(&path, at(1, 9, 0));
        bob.owner = "bob".into();
        assert!(cmd_list(&mut bob).unwrap().is_empty());
        assert!(matches!(
            cmd_complete(&mut bob, task.id),
            Err(routinely::Error::TaskNotFound(_))
        ));
    });
}
