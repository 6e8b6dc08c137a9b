//! Database operations and utility functions for field tasks.
//!
//! This module provides the `Database` struct, a JSON-file store holding tasks,
//! the staff roster and the notification feed, along with helpers for date
//! parsing, formatting and task lookup used by the CLI.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{Datelike, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::employee::{Employee, Roster};
use crate::error::{Error, Result};
use crate::fields::*;
use crate::notify::Notification;
use crate::store::{replace_in, TaskStore};
use crate::task::Task;

/// How many notifications the feed keeps.
pub const FEED_LIMIT: usize = 200;

/// Task versions as they were when a database was read.
///
/// Pairs with [`Database::save_over`] to detect writes made by other sessions
/// between load and save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    versions: BTreeMap<u64, u64>,
}

impl Snapshot {
    pub fn of(db: &Database) -> Self {
        Snapshot {
            versions: db.tasks.iter().map(|t| (t.id, t.version)).collect(),
        }
    }
}

/// In-memory database for storing and managing tasks.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Database {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl Database {
    /// Load database from JSON file, returning an empty database if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no database yet, starting empty");
            return Ok(Database::default());
        }
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut buf = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut buf))
            .map_err(io_err)?;
        let db: Database = serde_json::from_str(&buf).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), tasks = db.tasks.len(), "database loaded");
        Ok(db)
    }

    /// Save database to JSON file using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let data = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let mut f = File::create(&tmp).map_err(io_err)?;
        f.write_all(data.as_bytes()).map_err(io_err)?;
        f.flush().map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        debug!(path = %path.display(), "database saved");
        Ok(())
    }

    /// Write the changes made since `base` into the database file at `path`.
    ///
    /// The file is reread first. Every task changed or archived here must
    /// still be at the version it was read at, otherwise nothing is written
    /// and [`Error::Conflict`] is returned. Tasks changed by other writers,
    /// staff added elsewhere and their notifications are kept. Returns the
    /// database as written.
    pub fn save_over(&self, path: &Path, base: &Snapshot, notes: Vec<Notification>) -> Result<Database> {
        let mut disk = Database::load(path)?;

        for task in &self.tasks {
            match base.versions.get(&task.id) {
                Some(&read) if read == task.version => {}
                Some(&read) => {
                    let slot = disk
                        .tasks
                        .iter_mut()
                        .find(|t| t.id == task.id)
                        .ok_or(Error::TaskNotFound(task.id))?;
                    if slot.version != read {
                        return Err(Error::Conflict {
                            id: task.id,
                            expected: read,
                            found: slot.version,
                        });
                    }
                    *slot = task.clone();
                }
                None => disk.insert(task.clone())?,
            }
        }

        for (&id, &read) in &base.versions {
            if self.get(id).is_some() {
                continue;
            }
            if let Some(idx) = disk.tasks.iter().position(|t| t.id == id) {
                let found = disk.tasks[idx].version;
                if found != read {
                    return Err(Error::Conflict { id, expected: read, found });
                }
                disk.tasks.remove(idx);
            }
        }

        for employee in &self.employees {
            if disk.employee(&employee.id).is_none() {
                disk.employees.push(employee.clone());
            }
        }
        disk.record_notifications(notes);
        disk.save(path)?;
        Ok(disk)
    }

    /// Add an employee to the roster.
    pub fn add_employee(&mut self, employee: Employee) -> Result<()> {
        if self.employee(&employee.id).is_some() {
            return Err(Error::DuplicateEmployee(employee.id));
        }
        info!(id = %employee.id, department = %employee.department, admin = employee.admin, "employee added");
        self.employees.push(employee);
        Ok(())
    }

    /// Append notifications to the feed, dropping the oldest past [`FEED_LIMIT`].
    pub fn record_notifications(&mut self, notes: Vec<Notification>) {
        self.notifications.extend(notes);
        if self.notifications.len() > FEED_LIMIT {
            let excess = self.notifications.len() - FEED_LIMIT;
            self.notifications.drain(..excess);
        }
    }
}

impl Roster for Database {
    fn employee(&self, id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }
}

impl TaskStore for Database {
    fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    fn insert(&mut self, task: Task) -> Result<()> {
        if self.get(task.id).is_some() {
            return Err(Error::DuplicateTask(task.id));
        }
        self.tasks.push(task);
        Ok(())
    }

    fn replace(&mut self, task: Task, expected_version: u64) -> Result<u64> {
        replace_in(&mut self.tasks, task, expected_version)
    }

    fn remove(&mut self, id: u64) -> Result<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(Error::TaskNotFound(id))?;
        Ok(self.tasks.remove(idx))
    }
}

/// Parse human-readable due date input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday".."sunday" (and three-letter forms), "next monday", etc.
/// - "end of week", "end of month"
/// - "in 3d", "in 2w"
/// - "YYYY-MM-DD" format
pub fn parse_due_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => {
            let (_, end) = start_end_of_this_week(today);
            return Some(end);
        }
        "end of month" | "eom" => {
            let (year, month) = if today.month() == 12 {
                (today.year() + 1, 1)
            } else {
                (today.year(), today.month() + 1)
            };
            let first_of_next = NaiveDate::from_ymd_opt(year, month, 1)?;
            return Some(first_of_next - Duration::days(1));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
        if let Some(nw) = rest.strip_suffix('w') {
            if let Ok(weeks) = nw.trim().parse::<i64>() {
                return Some(today + Duration::weeks(weeks));
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current_day = today.weekday().num_days_from_monday() as i64;
    for (day_name, target_day) in weekdays {
        let days_ahead = (target_day + 7 - current_day) % 7;
        if s == day_name {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {}", day_name) {
            let days_to_add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(days_to_add));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Like [`parse_due_input`] but relative to the local date, with an error for junk.
pub fn parse_due(s: &str) -> Result<NaiveDate> {
    parse_due_input(s, Local::now().date_naive()).ok_or_else(|| Error::BadDate(s.to_string()))
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Format a due date relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: NaiveDate, today: NaiveDate) -> String {
    let delta = (due - today).num_days();
    if delta == 0 {
        "today".into()
    } else if delta == 1 {
        "tomorrow".into()
    } else if delta > 1 {
        format!("in {}d", delta)
    } else {
        format!("{}d late", -delta)
    }
}

/// Print tasks in a formatted table.
pub fn print_table(tasks: &[&Task], today: NaiveDate) {
    println!(
        "{:<5} {:<12} {:<7} {:<10} {:<12} {:<6} {}",
        "ID", "Status", "Pri", "Due", "Assignee", "Check", "Title"
    );
    for t in tasks {
        let (done, total) = t.checklist_progress();
        let flag = if t.pending_exception().is_some() { " [move?]" } else { "" };
        println!(
            "{:<5} {:<12} {:<7} {:<10} {:<12} {:<6} {}{}",
            t.id,
            t.status.to_string(),
            t.priority.to_string(),
            format_due_relative(t.due, today),
            truncate(&t.assigned_to, 12),
            format!("{}/{}", done, total),
            t.title,
            flag
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

/// Resolve a task identifier (either ID or title) to a task ID.
pub fn resolve_task_identifier(identifier: &str, db: &Database) -> Result<u64> {
    if let Ok(id) = identifier.parse::<u64>() {
        return match db.get(id) {
            Some(_) => Ok(id),
            None => Err(Error::TaskNotFound(id)),
        };
    }

    let needle = identifier.to_lowercase();
    let matches: Vec<&Task> = db
        .tasks
        .iter()
        .filter(|task| task.title.to_lowercase() == needle)
        .collect();

    match matches.len() {
        0 => Err(Error::NoMatch(identifier.to_string())),
        1 => Ok(matches[0].id),
        _ => Err(Error::Ambiguous(identifier.to_string())),
    }
}

/// Sort tasks in place by the given key; ties fall back to id.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    match key {
        SortKey::Due => tasks.sort_by(|a, b| a.due.cmp(&b.due).then(a.id.cmp(&b.id))),
        SortKey::Priority => tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id))),
        SortKey::Id => tasks.sort_by_key(|t| t.id),
    }
}
