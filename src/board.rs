//! The task board service.
//!
//! `Board` owns a task store and a notification sink and is the one place
//! where workflow commands, dispatch, archive and checklist edits are turned
//! into committed writes. Each write replaces the whole task against the
//! version it was read at.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::employee::{Actor, Roster};
use crate::error::{Error, Rejection, Result};
use crate::geo::Coordinate;
use crate::notify::{Notification, NotificationSink, Severity};
use crate::store::TaskStore;
use crate::task::{NewTask, Task};
use crate::visibility::{is_visible, visible_tasks};
use crate::workflow::{self, Command, Context, DEFAULT_GEOFENCE_KM};

pub struct Board<S, N> {
    store: S,
    sink: N,
    geofence_km: f64,
}

impl<S: TaskStore, N: NotificationSink> Board<S, N> {
    pub fn new(store: S, sink: N) -> Self {
        Board {
            store,
            sink,
            geofence_km: DEFAULT_GEOFENCE_KM,
        }
    }

    pub fn with_geofence_radius(mut self, km: f64) -> Self {
        self.geofence_km = km;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn sink_mut(&mut self) -> &mut N {
        &mut self.sink
    }

    pub fn into_parts(self) -> (S, N) {
        (self.store, self.sink)
    }

    /// Tasks `actor` may see on `today`.
    pub fn visible(&self, actor: &Actor, today: NaiveDate) -> Vec<&Task> {
        visible_tasks(self.store.tasks(), &actor.id, actor.is_admin, today)
    }

    /// A single task, if it exists and `actor` may see it.
    pub fn task_for(&self, actor: &Actor, id: u64, today: NaiveDate) -> Result<&Task> {
        let task = self.store.get(id).ok_or(Error::TaskNotFound(id))?;
        if !is_visible(task, &actor.id, actor.is_admin, today) {
            return Err(Rejection::NotVisible {
                task_id: id,
                actor: actor.id.clone(),
            }
            .into());
        }
        Ok(task)
    }

    /// Run a workflow command and commit the result.
    pub fn execute(
        &mut self,
        id: u64,
        command: &Command,
        actor: &Actor,
        position: Option<Coordinate>,
        now: DateTime<Utc>,
    ) -> Result<&Task> {
        let current = self.store.get(id).ok_or(Error::TaskNotFound(id))?;
        let ctx = Context {
            actor,
            position,
            now,
            geofence_km: self.geofence_km,
        };
        let transition = match workflow::apply(current, command, &ctx) {
            Ok(t) => t,
            Err(rejection) => {
                warn!(task_id = id, actor = %actor.id, action = command.action(), %rejection, "command rejected");
                return Err(rejection.into());
            }
        };
        let from = current.status;
        let version = current.version;
        let to = transition.task.status;
        self.store.replace(transition.task, version)?;
        info!(task_id = id, actor = %actor.id, action = command.action(), %from, %to, "command committed");
        if let Some(note) = transition.notification {
            self.sink.notify(note);
        }
        self.store.get(id).ok_or(Error::TaskNotFound(id))
    }

    /// Hard-delete a task. Admin only.
    pub fn archive(&mut self, actor: &Actor, id: u64) -> Result<Task> {
        if !actor.is_admin {
            return Err(Rejection::NotAdmin { action: "archive tasks" }.into());
        }
        let task = self.store.remove(id)?;
        info!(task_id = id, actor = %actor.id, "task archived");
        Ok(task)
    }

    /// Add a checklist item. The owner or an admin may edit the checklist.
    pub fn add_checklist_item(&mut self, actor: &Actor, id: u64, text: &str) -> Result<u64> {
        let mut task = self.editable(actor, id, "edit the checklist of")?;
        let version = task.version;
        let item = task.add_checklist_item(text)?;
        self.store.replace(task, version)?;
        Ok(item)
    }

    /// Toggle a checklist item and return its new completion flag.
    pub fn toggle_checklist_item(&mut self, actor: &Actor, id: u64, item_id: u64) -> Result<bool> {
        let mut task = self.editable(actor, id, "edit the checklist of")?;
        let version = task.version;
        let completed = task.toggle_checklist_item(item_id)?;
        self.store.replace(task, version)?;
        Ok(completed)
    }

    fn editable(&self, actor: &Actor, id: u64, action: &'static str) -> Result<Task> {
        let task = self.store.get(id).ok_or(Error::TaskNotFound(id))?;
        if !actor.is_admin && task.assigned_to != actor.id {
            return Err(Rejection::NotOwner {
                task_id: id,
                owner: task.assigned_to.clone(),
                action,
            }
            .into());
        }
        Ok(task.clone())
    }
}

impl<S: TaskStore + Roster, N: NotificationSink> Board<S, N> {
    /// Create a task in `ToDo` for an existing employee. Admin only.
    pub fn dispatch(&mut self, actor: &Actor, new: NewTask, now: DateTime<Utc>) -> Result<u64> {
        if !actor.is_admin {
            return Err(Rejection::NotAdmin { action: "dispatch tasks" }.into());
        }
        if new.title.trim().is_empty() {
            return Err(Rejection::EmptyField("title").into());
        }
        let assignee = self
            .store
            .employee(&new.assigned_to)
            .ok_or_else(|| Error::UnknownEmployee(new.assigned_to.clone()))?
            .name
            .clone();
        let id = self.store.next_id();
        let task = Task::dispatch(id, new, &actor.id, now);
        let note = Notification::new(
            "New job dispatched",
            format!("#{} \"{}\" assigned to {}, due {}", id, task.title, assignee, task.due),
            Severity::Info,
            id,
            now,
        );
        self.store.insert(task)?;
        info!(task_id = id, actor = %actor.id, "task dispatched");
        self.sink.notify(note);
        Ok(id)
    }
}
