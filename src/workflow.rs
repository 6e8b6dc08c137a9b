//! Task workflow rules.
//!
//! A task moves `ToDo -> InProgress -> Review -> Done`. Admins can send a task
//! in review back to `InProgress`, or force any unfinished task straight to
//! `Done`. Separately, the owner may ask for the due date to be moved; an admin
//! approving that resets the task to `ToDo` with the new date.
//!
//! [`apply`] is pure: it takes a task and a command and returns the updated
//! copy, or a [`Rejection`] with the original left untouched. Persisting the
//! result is the caller's business.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

use crate::employee::Actor;
use crate::error::Rejection;
use crate::fields::{ExceptionKind, ExceptionStatus, Status, WorkMode};
use crate::geo::{haversine_km, Coordinate};
use crate::notify::{Notification, Severity};
use crate::task::{ExceptionRequest, Task};

/// How close a field technician must be to the site to submit work.
pub const DEFAULT_GEOFENCE_KM: f64 = 2.0;

/// Something an actor asks to happen to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Owner begins work.
    Start,
    /// Owner hands finished work to an admin.
    SubmitForReview,
    /// Admin accepts reviewed work.
    Approve,
    /// Admin sends reviewed work back for rework.
    Reject,
    /// Admin closes the task regardless of state or guards.
    ForceFinish { confirmed: bool },
    /// Owner asks for a new due date.
    RequestMove { reason: String },
    /// Admin grants a pending move with the date they choose.
    ApproveMove { due: NaiveDate },
    /// Admin declines a pending move.
    RejectMove,
}

impl Command {
    /// Verb used in messages.
    pub fn action(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::SubmitForReview => "submit",
            Command::Approve => "approve",
            Command::Reject => "reject",
            Command::ForceFinish { .. } => "force finish",
            Command::RequestMove { .. } => "request a date move for",
            Command::ApproveMove { .. } => "approve a date move",
            Command::RejectMove => "decline a date move",
        }
    }
}

/// Facts about the moment a command is issued.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    pub actor: &'a Actor,
    /// Most recent live position of the actor, if any has been reported.
    pub position: Option<Coordinate>,
    pub now: DateTime<Utc>,
    pub geofence_km: f64,
}

impl<'a> Context<'a> {
    pub fn new(actor: &'a Actor, position: Option<Coordinate>, now: DateTime<Utc>) -> Self {
        Context {
            actor,
            position,
            now,
            geofence_km: DEFAULT_GEOFENCE_KM,
        }
    }
}

/// The result of a committed command.
#[derive(Debug, Clone)]
pub struct Transition {
    pub task: Task,
    pub notification: Option<Notification>,
    /// Distance to site measured by the geofence guard, when it ran.
    pub distance_km: Option<f64>,
}

/// Apply `command` to `task` on behalf of `ctx.actor`.
pub fn apply(task: &Task, command: &Command, ctx: &Context) -> Result<Transition, Rejection> {
    let actor = ctx.actor;
    let action = command.action();
    let mut next = task.clone();
    let mut distance_km = None;

    let (log, notification) = match command {
        Command::Start => {
            require_owner(task, actor, action)?;
            require_status(task, Status::ToDo, action)?;
            next.status = Status::InProgress;
            ("Started execution".to_string(), None)
        }
        Command::SubmitForReview => {
            require_owner(task, actor, action)?;
            require_status(task, Status::InProgress, action)?;
            distance_km = check_geofence(actor, task.site, ctx.position, ctx.geofence_km)?;
            next.status = Status::Review;
            let log = match distance_km {
                Some(d) => format!("Submitted for review ({d:.2} km from site)"),
                None => "Submitted for review".to_string(),
            };
            let note = Notification::new(
                "Job submitted",
                format!("{} submitted #{} \"{}\" for review", actor.name, task.id, task.title),
                Severity::Info,
                task.id,
                ctx.now,
            );
            (log, Some(note))
        }
        Command::Approve => {
            require_admin(actor, action)?;
            require_status(task, Status::Review, action)?;
            next.status = Status::Done;
            let note = Notification::new(
                "Job approved",
                format!("#{} \"{}\" approved by {}", task.id, task.title, actor.name),
                Severity::Success,
                task.id,
                ctx.now,
            );
            ("Approved".to_string(), Some(note))
        }
        Command::Reject => {
            require_admin(actor, action)?;
            require_status(task, Status::Review, action)?;
            next.status = Status::InProgress;
            let note = Notification::new(
                "Job sent back",
                format!("#{} \"{}\" needs rework ({})", task.id, task.title, actor.name),
                Severity::Warning,
                task.id,
                ctx.now,
            );
            ("Rejected; returned for rework".to_string(), Some(note))
        }
        Command::ForceFinish { confirmed } => {
            require_admin(actor, action)?;
            if task.status.is_terminal() {
                return Err(Rejection::AlreadyDone { task_id: task.id });
            }
            if !confirmed {
                return Err(Rejection::ConfirmationRequired);
            }
            next.status = Status::Done;
            let note = Notification::new(
                "Job closed by admin",
                format!("#{} \"{}\" was force finished by {}", task.id, task.title, actor.name),
                Severity::Success,
                task.id,
                ctx.now,
            );
            (format!("Force finished from {}", task.status), Some(note))
        }
        Command::RequestMove { reason } => {
            require_owner(task, actor, action)?;
            if task.status.is_terminal() {
                return Err(Rejection::AlreadyDone { task_id: task.id });
            }
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(Rejection::MissingReason);
            }
            if task.pending_exception().is_some() {
                return Err(Rejection::ExceptionPending { task_id: task.id });
            }
            next.exception_request = Some(ExceptionRequest {
                kind: ExceptionKind::Move,
                reason: reason.to_string(),
                status: ExceptionStatus::Pending,
                timestamp: ctx.now,
            });
            let note = Notification::new(
                "Date move requested",
                format!("{} asks to move #{} \"{}\": {}", actor.name, task.id, task.title, reason),
                Severity::Warning,
                task.id,
                ctx.now,
            );
            (format!("Requested date move: {reason}"), Some(note))
        }
        Command::ApproveMove { due } => {
            require_admin(actor, action)?;
            require_pending(task)?;
            next.exception_request = None;
            next.status = Status::ToDo;
            next.due = *due;
            let note = Notification::new(
                "Date move approved",
                format!("#{} \"{}\" rescheduled to {}", task.id, task.title, due),
                Severity::Info,
                task.id,
                ctx.now,
            );
            (format!("Date moved from {} to {}; reset to To Do", task.due, due), Some(note))
        }
        Command::RejectMove => {
            require_admin(actor, action)?;
            require_pending(task)?;
            next.exception_request = None;
            let note = Notification::new(
                "Date move declined",
                format!("#{} \"{}\" keeps its due date {}", task.id, task.title, task.due),
                Severity::Info,
                task.id,
                ctx.now,
            );
            ("Date move request declined".to_string(), Some(note))
        }
    };

    next.append_log(&actor.id, log, ctx.now);
    Ok(Transition {
        task: next,
        notification,
        distance_km,
    })
}

/// Geofence guard for submission.
///
/// Only field staff are checked, and only when both a live position and a site
/// are known; otherwise the guard passes. Returns the measured distance when
/// the check ran.
pub fn check_geofence(
    actor: &Actor,
    site: Option<Coordinate>,
    position: Option<Coordinate>,
    limit_km: f64,
) -> Result<Option<f64>, Rejection> {
    if actor.work_mode != WorkMode::Field {
        return Ok(None);
    }
    let (Some(site), Some(position)) = (site, position) else {
        warn!(
            actor = %actor.id,
            has_site = site.is_some(),
            has_position = position.is_some(),
            "geofence skipped: location unavailable"
        );
        return Ok(None);
    };
    let distance_km = haversine_km(position, site);
    if distance_km > limit_km {
        return Err(Rejection::OutsideGeofence { distance_km, limit_km });
    }
    Ok(Some(distance_km))
}

fn require_owner(task: &Task, actor: &Actor, action: &'static str) -> Result<(), Rejection> {
    if task.assigned_to != actor.id {
        return Err(Rejection::NotOwner {
            task_id: task.id,
            owner: task.assigned_to.clone(),
            action,
        });
    }
    Ok(())
}

fn require_admin(actor: &Actor, action: &'static str) -> Result<(), Rejection> {
    if !actor.is_admin {
        return Err(Rejection::NotAdmin { action });
    }
    Ok(())
}

fn require_status(task: &Task, expected: Status, action: &'static str) -> Result<(), Rejection> {
    if task.status == expected {
        return Ok(());
    }
    if task.status.is_terminal() {
        return Err(Rejection::AlreadyDone { task_id: task.id });
    }
    Err(Rejection::WrongState {
        task_id: task.id,
        action,
        status: task.status,
    })
}

fn require_pending(task: &Task) -> Result<(), Rejection> {
    match task.pending_exception() {
        Some(_) => Ok(()),
        None => Err(Rejection::NoPendingException { task_id: task.id }),
    }
}
