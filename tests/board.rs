use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use fieldops::board::Board;
use fieldops::db::Database;
use fieldops::employee::{Actor, Employee};
use fieldops::error::{Error, Rejection};
use fieldops::fields::{Priority, Status, WorkMode};
use fieldops::geo::Coordinate;
use fieldops::notify::{MemorySink, Severity};
use fieldops::store::TaskStore;
use fieldops::task::NewTask;
use fieldops::workflow::Command;

const SITE: Coordinate = Coordinate { lat: 12.9716, lng: 77.5946 };
const NEAR: Coordinate = Coordinate { lat: 12.9720, lng: 77.5950 };
const FAR: Coordinate = Coordinate { lat: 13.0616, lng: 77.5946 };

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

fn boss() -> Actor {
    Actor::admin("boss", "Meera")
}

fn ravi() -> Actor {
    Actor::technician("tech-1", "Ravi", WorkMode::Field)
}

fn anil() -> Actor {
    Actor::technician("tech-2", "Anil", WorkMode::Field)
}

fn staffed_board() -> Board<Database, MemorySink> {
    let mut db = Database::default();
    for (id, name, department, admin) in [
        ("boss", "Meera", "Operations", true),
        ("tech-1", "Ravi", "Service", false),
        ("tech-2", "Anil", "Service", false),
    ] {
        db.add_employee(Employee {
            id: id.into(),
            name: name.into(),
            department: department.into(),
            admin,
        })
        .unwrap();
    }
    Board::new(db, MemorySink::default())
}

fn job(title: &str, to: &str) -> NewTask {
    NewTask {
        title: title.into(),
        description: String::new(),
        assigned_to: to.into(),
        priority: Priority::Medium,
        due: today(),
        site: Some(SITE),
        checklist: vec!["Unpack".into(), "Calibrate".into()],
    }
}

fn dispatched(board: &mut Board<Database, MemorySink>) -> u64 {
    let id = board.dispatch(&boss(), job("Install ventilator", "tech-1"), now()).unwrap();
    board.sink_mut().take();
    id
}

#[test]
fn full_lifecycle_logs_every_step() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);

    board.execute(id, &Command::Start, &ravi(), None, now()).unwrap();
    board
        .execute(id, &Command::SubmitForReview, &ravi(), Some(NEAR), now())
        .unwrap();
    let task = board.execute(id, &Command::Approve, &boss(), None, now()).unwrap();

    assert_eq!(task.status, Status::Done);
    let actions: Vec<&str> = task.logs.iter().map(|l| l.action.as_str()).collect();
    assert_eq!(actions.len(), 4);
    assert_eq!(actions[0], "Dispatched");
    assert_eq!(actions[1], "Started execution");
    assert!(actions[2].starts_with("Submitted for review ("));
    assert_eq!(actions[3], "Approved");
    assert_eq!(task.logs[3].actor_id, "boss");
    assert_eq!(task.version, 3);

    let notes = board.sink_mut().take();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[1].severity, Severity::Success);
    assert_eq!(notes[1].task_id, Some(id));
}

#[test]
fn non_owner_cannot_start_and_nothing_changes() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    let before = board.store().get(id).unwrap().clone();

    let err = board.execute(id, &Command::Start, &anil(), None, now()).unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::NotOwner { .. })));
    assert_eq!(board.store().get(id).unwrap(), &before);
    assert!(board.sink_mut().take().is_empty());
}

#[test]
fn far_field_technician_is_held_at_in_progress() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    board.execute(id, &Command::Start, &ravi(), None, now()).unwrap();

    let err = board
        .execute(id, &Command::SubmitForReview, &ravi(), Some(FAR), now())
        .unwrap_err();
    match err.rejection() {
        Some(Rejection::OutsideGeofence { distance_km, limit_km }) => {
            assert!(*distance_km > 9.0 && *distance_km < 11.0);
            assert_eq!(*limit_km, 2.0);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(board.store().get(id).unwrap().status, Status::InProgress);
}

#[test]
fn wider_radius_lets_the_same_position_through() {
    let mut board = staffed_board().with_geofence_radius(15.0);
    let id = dispatched(&mut board);
    board.execute(id, &Command::Start, &ravi(), None, now()).unwrap();
    let task = board
        .execute(id, &Command::SubmitForReview, &ravi(), Some(FAR), now())
        .unwrap();
    assert_eq!(task.status, Status::Review);
}

#[test]
fn force_finish_from_to_do_adds_one_log_line() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);

    let err = board
        .execute(id, &Command::ForceFinish { confirmed: false }, &boss(), None, now())
        .unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::ConfirmationRequired));

    let task = board
        .execute(id, &Command::ForceFinish { confirmed: true }, &boss(), None, now())
        .unwrap();
    assert_eq!(task.status, Status::Done);
    assert_eq!(task.logs.len(), 2);
    assert_eq!(task.logs[1].action, "Force finished from To Do");

    let err = board.execute(id, &Command::Approve, &boss(), None, now()).unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::WrongState { .. }) | Some(Rejection::AlreadyDone { .. })));
}

#[test]
fn approved_move_resets_to_do_and_changes_due() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    board.execute(id, &Command::Start, &ravi(), None, now()).unwrap();
    board
        .execute(id, &Command::RequestMove { reason: "Parts delayed".into() }, &ravi(), None, now())
        .unwrap();

    let err = board
        .execute(id, &Command::RequestMove { reason: "Again".into() }, &ravi(), None, now())
        .unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::ExceptionPending { .. })));

    let new_due = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
    let task = board
        .execute(id, &Command::ApproveMove { due: new_due }, &boss(), None, now())
        .unwrap();
    assert_eq!(task.status, Status::ToDo);
    assert_eq!(task.due, new_due);
    assert!(task.exception_request.is_none());
    assert_eq!(
        task.logs.last().unwrap().action,
        "Date moved from 2026-03-02 to 2026-03-09; reset to To Do"
    );
}

#[test]
fn declined_move_keeps_status_and_date() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    board
        .execute(id, &Command::RequestMove { reason: "Rain".into() }, &ravi(), None, now())
        .unwrap();
    let task = board.execute(id, &Command::RejectMove, &boss(), None, now()).unwrap();
    assert_eq!(task.status, Status::ToDo);
    assert_eq!(task.due, today());
    assert!(task.exception_request.is_none());

    let err = board.execute(id, &Command::RejectMove, &boss(), None, now()).unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::NoPendingException { .. })));
}

#[test]
fn technicians_see_own_urgent_and_done_today() {
    let mut board = staffed_board();
    let own = board.dispatch(&boss(), job("Own", "tech-1"), now()).unwrap();
    let other = board.dispatch(&boss(), job("Other", "tech-2"), now()).unwrap();
    let mut urgent = job("Urgent", "tech-2");
    urgent.priority = Priority::High;
    let urgent = board.dispatch(&boss(), urgent, now()).unwrap();

    let ids: Vec<u64> = board.visible(&ravi(), today()).iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![own, urgent]);
    assert_eq!(board.visible(&boss(), today()).len(), 3);

    let err = board.task_for(&ravi(), other, today()).unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::NotVisible { .. })));

    board
        .execute(other, &Command::ForceFinish { confirmed: true }, &boss(), None, now())
        .unwrap();
    assert_eq!(board.visible(&ravi(), today()).len(), 3);
}

#[test]
fn stale_version_is_a_conflict() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    let mut stale = board.store().get(id).unwrap().clone();
    board.execute(id, &Command::Start, &ravi(), None, now()).unwrap();

    stale.title = "Overwritten".into();
    let version = stale.version;
    let err = board.store_mut().replace(stale, version).unwrap_err();
    assert!(matches!(err, Error::Conflict { expected: 0, found: 1, .. }));
    assert_eq!(board.store().get(id).unwrap().title, "Install ventilator");
}

#[test]
fn dispatch_needs_admin_and_known_assignee() {
    let mut board = staffed_board();
    let err = board.dispatch(&ravi(), job("Mine", "tech-1"), now()).unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::NotAdmin { .. })));

    let err = board.dispatch(&boss(), job("Ghost", "nobody"), now()).unwrap_err();
    assert!(matches!(err, Error::UnknownEmployee(ref id) if id == "nobody"));

    let err = board.dispatch(&boss(), job("  ", "tech-1"), now()).unwrap_err();
    assert_eq!(err.rejection(), Some(&Rejection::EmptyField("title")));
    assert!(board.store().tasks().is_empty());

    let id = board.dispatch(&boss(), job("Real", "tech-1"), now()).unwrap();
    let task = board.store().get(id).unwrap();
    assert_eq!(task.status, Status::ToDo);
    assert_eq!(task.sub_tasks.len(), 2);
    let notes = board.sink_mut().take();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].severity, Severity::Info);
}

#[test]
fn archive_is_admin_only() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    let err = board.archive(&ravi(), id).unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::NotAdmin { .. })));

    assert_eq!(board.archive(&boss(), id).unwrap().id, id);
    assert!(matches!(board.archive(&boss(), id), Err(Error::TaskNotFound(_))));
}

#[test]
fn checklist_edits_by_owner_or_admin_without_logging() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);

    assert!(board.toggle_checklist_item(&ravi(), id, 1).unwrap());
    let item = board.add_checklist_item(&boss(), id, "Sign off").unwrap();
    assert_eq!(item, 3);

    let err = board.toggle_checklist_item(&anil(), id, 1).unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::NotOwner { .. })));
    let err = board.toggle_checklist_item(&ravi(), id, 9).unwrap_err();
    assert!(matches!(err.rejection(), Some(Rejection::ChecklistItemNotFound { item_id: 9, .. })));

    let task = board.store().get(id).unwrap();
    assert_eq!(task.checklist_progress(), (1, 3));
    assert_eq!(task.logs.len(), 1);
    assert_eq!(task.version, 2);
}

#[test]
fn board_over_a_saved_database_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fieldops.json");

    let mut board = staffed_board();
    let id = dispatched(&mut board);
    board.execute(id, &Command::Start, &ravi(), None, now()).unwrap();
    let (db, _) = board.into_parts();
    db.save(&path).unwrap();

    let mut board = Board::new(Database::load(&path).unwrap(), MemorySink::default());
    let task = board
        .execute(id, &Command::SubmitForReview, &ravi(), Some(NEAR), now())
        .unwrap();
    assert_eq!(task.status, Status::Review);
    assert_eq!(task.logs.len(), 3);
}

/// Run a command that must be refused; the stored task must not move.
fn refused(board: &mut Board<Database, MemorySink>, id: u64, command: Command, actor: &Actor) -> Rejection {
    let before = board.store().get(id).unwrap().clone();
    let err = board.execute(id, &command, actor, None, now()).unwrap_err();
    let after = board.store().get(id).unwrap();
    assert_eq!(after, &before);
    assert_eq!(after.logs.len(), before.logs.len());
    assert!(board.sink_mut().take().is_empty());
    err.rejection().cloned().unwrap()
}

#[test]
fn technician_cannot_resolve_move_requests() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    board
        .execute(id, &Command::RequestMove { reason: "Site closed".into() }, &ravi(), None, now())
        .unwrap();
    board.sink_mut().take();

    let due = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
    let r = refused(&mut board, id, Command::ApproveMove { due }, &ravi());
    assert!(matches!(r, Rejection::NotAdmin { .. }));
    let r = refused(&mut board, id, Command::RejectMove, &ravi());
    assert!(matches!(r, Rejection::NotAdmin { .. }));
    assert!(board.store().get(id).unwrap().pending_exception().is_some());
}

#[test]
fn technician_cannot_send_back_review() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    board.execute(id, &Command::Start, &ravi(), None, now()).unwrap();
    board
        .execute(id, &Command::SubmitForReview, &ravi(), Some(NEAR), now())
        .unwrap();
    board.sink_mut().take();

    let r = refused(&mut board, id, Command::Reject, &ravi());
    assert!(matches!(r, Rejection::NotAdmin { .. }));
    assert_eq!(board.store().get(id).unwrap().status, Status::Review);
}

#[test]
fn only_the_owner_can_request_a_move() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    let r = refused(&mut board, id, Command::RequestMove { reason: "Busy".into() }, &anil());
    match r {
        Rejection::NotOwner { owner, .. } => assert_eq!(owner, "tech-1"),
        other => panic!("unexpected {:?}", other),
    }
    assert!(board.store().get(id).unwrap().exception_request.is_none());
}

#[test]
fn done_task_cannot_be_rescheduled() {
    let mut board = staffed_board();
    let id = dispatched(&mut board);
    board
        .execute(id, &Command::ForceFinish { confirmed: true }, &boss(), None, now())
        .unwrap();
    board.sink_mut().take();

    let r = refused(&mut board, id, Command::RequestMove { reason: "Too late".into() }, &ravi());
    assert_eq!(r, Rejection::AlreadyDone { task_id: id });
}
