//! Task persistence seam.
//!
//! Stores hold whole tasks and replace them by id. Each stored task carries a
//! version; a replace must name the version it was based on, so two writers
//! racing on the same task cannot silently overwrite each other.

use crate::error::{Error, Result};
use crate::task::Task;

pub trait TaskStore {
    /// Every task, in insertion order.
    fn tasks(&self) -> &[Task];

    fn get(&self, id: u64) -> Option<&Task> {
        self.tasks().iter().find(|t| t.id == id)
    }

    /// The next unused task id.
    fn next_id(&self) -> u64 {
        self.tasks().iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    /// Add a new task. Fails if the id is taken.
    fn insert(&mut self, task: Task) -> Result<()>;

    /// Replace a task by id if its stored version is still `expected_version`.
    /// Returns the new version.
    fn replace(&mut self, task: Task, expected_version: u64) -> Result<u64>;

    /// Hard delete.
    fn remove(&mut self, id: u64) -> Result<Task>;
}

/// Shared replace logic for stores backed by a `Vec<Task>`.
pub(crate) fn replace_in(tasks: &mut [Task], mut task: Task, expected_version: u64) -> Result<u64> {
    let slot = tasks
        .iter_mut()
        .find(|t| t.id == task.id)
        .ok_or(Error::TaskNotFound(task.id))?;
    if slot.version != expected_version {
        return Err(Error::Conflict {
            id: task.id,
            expected: expected_version,
            found: slot.version,
        });
    }
    task.version = expected_version + 1;
    *slot = task;
    Ok(expected_version + 1)
}

impl<T: TaskStore + ?Sized> TaskStore for &mut T {
    fn tasks(&self) -> &[Task] {
        (**self).tasks()
    }

    fn insert(&mut self, task: Task) -> Result<()> {
        (**self).insert(task)
    }

    fn replace(&mut self, task: Task, expected_version: u64) -> Result<u64> {
        (**self).replace(task, expected_version)
    }

    fn remove(&mut self, id: u64) -> Result<Task> {
        (**self).remove(id)
    }
}
