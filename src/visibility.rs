//! Which tasks a caller gets to see.
//!
//! Admins see everything. Everyone else sees their own tasks, every
//! high-priority task, and whatever was finished today. This is a display
//! filter, not an access control.

use chrono::NaiveDate;

use crate::fields::{Priority, Status};
use crate::task::Task;

pub fn is_visible(task: &Task, caller: &str, is_admin: bool, today: NaiveDate) -> bool {
    is_admin
        || task.assigned_to == caller
        || task.priority == Priority::High
        || (task.status == Status::Done && task.due == today)
}

/// Project `tasks` down to what `caller` may see, keeping the input order.
pub fn visible_tasks<'a>(tasks: &'a [Task], caller: &str, is_admin: bool, today: NaiveDate) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| is_visible(t, caller, is_admin, today))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::{TimeZone, Utc};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn task(id: u64, owner: &str, priority: Priority, status: Status, due: NaiveDate) -> Task {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut t = Task::dispatch(
            id,
            NewTask {
                title: format!("job {id}"),
                description: String::new(),
                assigned_to: owner.into(),
                priority,
                due,
                site: None,
                checklist: Vec::new(),
            },
            "admin",
            now,
        );
        t.status = status;
        t
    }

    fn sample() -> Vec<Task> {
        let tomorrow = today().succ_opt().unwrap();
        vec![
            task(1, "tech-1", Priority::Low, Status::ToDo, tomorrow),
            task(2, "tech-2", Priority::High, Status::InProgress, tomorrow),
            task(3, "tech-2", Priority::Medium, Status::ToDo, tomorrow),
            task(4, "tech-2", Priority::Medium, Status::Done, today()),
            task(5, "tech-2", Priority::Medium, Status::Done, tomorrow),
        ]
    }

    #[test]
    fn admin_sees_everything() {
        let tasks = sample();
        assert_eq!(visible_tasks(&tasks, "admin", true, today()).len(), 5);
    }

    #[test]
    fn technician_sees_own_high_and_done_today() {
        let tasks = sample();
        let ids: Vec<u64> = visible_tasks(&tasks, "tech-1", false, today())
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }
}
