use std::path::Path;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use fieldops::board::Board;
use fieldops::db::{Database, Snapshot};
use fieldops::employee::{Actor, Employee};
use fieldops::error::Error;
use fieldops::fields::{Priority, Status, WorkMode};
use fieldops::notify::MemorySink;
use fieldops::store::TaskStore;
use fieldops::task::NewTask;
use fieldops::workflow::Command;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn boss() -> Actor {
    Actor::admin("boss", "Meera")
}

fn ravi() -> Actor {
    Actor::technician("tech-1", "Ravi", WorkMode::Office)
}

/// One CLI invocation: load, run one command, save over the file.
fn session(path: &Path) -> (Board<Database, MemorySink>, Snapshot) {
    let db = Database::load(path).unwrap();
    let base = Snapshot::of(&db);
    (Board::new(db, MemorySink::default()), base)
}

fn save(board: Board<Database, MemorySink>, base: &Snapshot, path: &Path) -> Result<Database, Error> {
    let (db, mut sink) = board.into_parts();
    db.save_over(path, base, sink.take())
}

/// A saved database holding tasks in `Review`, one per title.
fn seeded(path: &Path, titles: &[&str]) -> Vec<u64> {
    let mut db = Database::default();
    db.add_employee(Employee {
        id: "tech-1".into(),
        name: "Ravi".into(),
        department: "Accounts".into(),
        admin: false,
    })
    .unwrap();
    let mut board = Board::new(db, MemorySink::default());
    let mut ids = Vec::new();
    for title in titles {
        let new = NewTask {
            title: title.to_string(),
            description: String::new(),
            assigned_to: "tech-1".into(),
            priority: Priority::Medium,
            due: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            site: None,
            checklist: Vec::new(),
        };
        let id = board.dispatch(&boss(), new, now()).unwrap();
        board.execute(id, &Command::Start, &ravi(), None, now()).unwrap();
        board.execute(id, &Command::SubmitForReview, &ravi(), None, now()).unwrap();
        ids.push(id);
    }
    let (db, _) = board.into_parts();
    db.save(path).unwrap();
    ids
}

#[test]
fn second_admin_gets_a_conflict_and_the_approval_survives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldops.json");
    let id = seeded(&path, &["Install ventilator"])[0];

    let (mut first, first_base) = session(&path);
    let (mut second, second_base) = session(&path);

    first.execute(id, &Command::Approve, &boss(), None, now()).unwrap();
    save(first, &first_base, &path).unwrap();

    // The stale session still accepts the command in memory.
    second.execute(id, &Command::Reject, &boss(), None, now()).unwrap();
    let err = save(second, &second_base, &path).unwrap_err();
    assert!(matches!(err, Error::Conflict { expected: 2, found: 3, .. }));

    let on_disk = Database::load(&path).unwrap();
    let task = on_disk.get(id).unwrap();
    assert_eq!(task.status, Status::Done);
    assert_eq!(task.version, 3);
    let actions: Vec<&str> = task.logs.iter().map(|l| l.action.as_str()).collect();
    assert_eq!(actions, vec!["Dispatched", "Started execution", "Submitted for review", "Approved"]);
    assert_eq!(on_disk.notifications.len(), 1);
}

#[test]
fn sessions_on_different_tasks_both_land() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldops.json");
    let ids = seeded(&path, &["Install ventilator", "Replace filter"]);

    let (mut first, first_base) = session(&path);
    let (mut second, second_base) = session(&path);

    first.execute(ids[0], &Command::Approve, &boss(), None, now()).unwrap();
    save(first, &first_base, &path).unwrap();
    second.execute(ids[1], &Command::Reject, &boss(), None, now()).unwrap();
    save(second, &second_base, &path).unwrap();

    let on_disk = Database::load(&path).unwrap();
    assert_eq!(on_disk.get(ids[0]).unwrap().status, Status::Done);
    assert_eq!(on_disk.get(ids[1]).unwrap().status, Status::InProgress);
    assert_eq!(on_disk.notifications.len(), 2);
}

#[test]
fn reloading_picks_up_the_other_sessions_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldops.json");
    let id = seeded(&path, &["Install ventilator"])[0];

    let (mut first, first_base) = session(&path);
    first.execute(id, &Command::Approve, &boss(), None, now()).unwrap();
    save(first, &first_base, &path).unwrap();

    let (mut fresh, fresh_base) = session(&path);
    let err = fresh.execute(id, &Command::Reject, &boss(), None, now()).unwrap_err();
    assert!(err.rejection().is_some());
    assert_eq!(save(fresh, &fresh_base, &path).unwrap().get(id).unwrap().status, Status::Done);
}
