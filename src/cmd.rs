//! Command implementations for the CLI interface.
//!
//! This module contains the subcommand definitions and their handlers. Every
//! handler works on a [`Session`]: the loaded settings and database plus the
//! employee the command runs as.

use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use crate::board::Board;
use crate::cli::Cli;
use crate::config::{default_data_dir, Settings, CONFIG_FILE};
use crate::db::*;
use crate::employee::{Actor, Employee, Roster};
use crate::error::{Error, Rejection, Result};
use crate::fields::*;
use crate::geo::Coordinate;
use crate::notify::{MemorySink, TracingSink};
use crate::store::TaskStore;
use crate::task::{NewTask, Task};
use crate::tui::board_run::run_board_tui;
use crate::workflow::Command;

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch a new job to a technician (admin).
    Dispatch {
        /// Short title for the job.
        title: String,
        /// Employee id of the assigned technician.
        #[arg(long = "to")]
        assigned_to: String,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "friday" or "in Nd".
        #[arg(long)]
        due: String,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Site latitude in decimal degrees.
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Site longitude in decimal degrees.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Checklist item. May be repeated.
        #[arg(long = "check")]
        checklist: Vec<String>,
    },

    /// List the tasks you can see.
    List {
        /// Filter by status.
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Only tasks assigned to you.
        #[arg(long)]
        mine: bool,
        /// Sort key.
        #[arg(long, value_enum, default_value_t = SortKey::Due)]
        sort: SortKey,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show a task with its checklist and history.
    View {
        /// Task ID or title.
        id: String,
    },

    /// Start work on a task you own.
    Start {
        /// Task ID or title.
        id: String,
    },

    /// Submit your work for review. Field staff must be near the site.
    Submit {
        /// Task ID or title.
        id: String,
        /// Your current latitude.
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Your current longitude.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Approve a task in review (admin).
    Approve {
        /// Task ID or title.
        id: String,
    },

    /// Send a task in review back for rework (admin).
    Reject {
        /// Task ID or title.
        id: String,
    },

    /// Close a task immediately, skipping every check (admin).
    Finish {
        /// Task ID or title.
        id: String,
        /// Confirm the override.
        #[arg(long)]
        yes: bool,
    },

    /// Ask an admin to move a task's due date.
    RequestMove {
        /// Task ID or title.
        id: String,
        /// Why the date needs to move.
        #[arg(long)]
        reason: String,
    },

    /// Grant a pending date move (admin). Resets the task to To Do.
    ApproveMove {
        /// Task ID or title.
        id: String,
        /// The new due date.
        #[arg(long)]
        due: String,
    },

    /// Decline a pending date move (admin).
    RejectMove {
        /// Task ID or title.
        id: String,
    },

    /// Edit a task's checklist.
    Check {
        #[command(subcommand)]
        action: CheckAction,
    },

    /// Permanently delete a task (admin).
    Archive {
        /// Task ID or title.
        id: String,
    },

    /// Manage the staff roster.
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },

    /// Show recent notifications.
    Inbox {
        /// How many to show.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Launch the interactive task board.
    Board {
        /// Your current latitude.
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Your current longitude.
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// File a GPS logger appends `lat,lng` lines to; the newest line is used.
        #[arg(long)]
        track: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CheckAction {
    /// Append a checklist item.
    Add {
        /// Task ID or title.
        id: String,
        /// Item text.
        text: String,
    },
    /// Tick or untick a checklist item.
    Toggle {
        /// Task ID or title.
        id: String,
        /// Checklist item number.
        item: u64,
    },
}

#[derive(Subcommand)]
pub enum StaffAction {
    /// Add an employee. The first employee may be added by anyone.
    Add {
        /// Employee id used with --as.
        id: String,
        /// Display name.
        name: String,
        /// Department, e.g. Service, Sales, Accounts.
        #[arg(long)]
        department: String,
        /// Grant admin rights.
        #[arg(long)]
        admin: bool,
    },
    /// List employees.
    List,
}

/// Sinks used by CLI commands: log everything, keep a copy for the feed.
pub type Feed = (TracingSink, MemorySink);

/// Loaded state a command runs against.
pub struct Session {
    pub db_path: PathBuf,
    pub settings: Settings,
    pub db: Database,
    pub user: Option<String>,
    base: Snapshot,
}

impl Session {
    /// Resolve settings and database paths from the command line and load both.
    pub fn open(cli: &Cli) -> Result<Self> {
        let data_dir = default_data_dir();
        let config_path = cli.config.clone().unwrap_or_else(|| data_dir.join(CONFIG_FILE));
        let settings = Settings::load(&config_path)?;
        let db_path = cli
            .db
            .clone()
            .unwrap_or_else(|| settings.database_path(&data_dir));
        let db = Database::load(&db_path)?;
        Ok(Session {
            db_path,
            settings,
            base: Snapshot::of(&db),
            db,
            user: cli.user.clone(),
        })
    }

    /// Drop in-memory changes and reread the database file.
    pub fn reload(&mut self) -> Result<()> {
        self.db = Database::load(&self.db_path)?;
        self.base = Snapshot::of(&self.db);
        Ok(())
    }

    /// The employee this session acts as.
    pub fn actor(&self) -> Result<Actor> {
        let id = self.user.as_deref().ok_or(Error::NoUser)?;
        let employee = self
            .db
            .employee(id)
            .ok_or_else(|| Error::UnknownEmployee(id.to_string()))?;
        Ok(employee.actor(&self.settings.field_departments))
    }

    pub fn board(&mut self) -> Board<&mut Database, Feed> {
        Board::new(&mut self.db, (TracingSink, MemorySink::default()))
            .with_geofence_radius(self.settings.geofence_radius_km)
    }

    /// Write this session's changes and collected notifications to disk.
    ///
    /// Fails with a conflict if another session changed the same task since it
    /// was loaded; the file is then left as that session wrote it.
    pub fn commit(&mut self, mut feed: Feed) -> Result<()> {
        let written = self.db.save_over(&self.db_path, &self.base, feed.1.take())?;
        self.base = Snapshot::of(&written);
        self.db = written;
        Ok(())
    }
}

fn coordinate(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinate> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinate::new(lat, lng)),
        _ => None,
    }
}

/// Dispatch a new task.
pub fn cmd_dispatch(
    session: &mut Session,
    title: String,
    assigned_to: String,
    due: String,
    priority: Priority,
    desc: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    checklist: Vec<String>,
) -> Result<()> {
    let actor = session.actor()?;
    let new = NewTask {
        title,
        description: desc.unwrap_or_default(),
        assigned_to,
        priority,
        due: parse_due(&due)?,
        site: coordinate(lat, lng),
        checklist,
    };
    let mut board = session.board();
    let id = board.dispatch(&actor, new, Utc::now())?;
    let (_, feed) = board.into_parts();
    session.commit(feed)?;
    println!("Dispatched task {}", id);
    Ok(())
}

/// List visible tasks with optional filtering and sorting.
pub fn cmd_list(
    session: &Session,
    status: Option<Status>,
    mine: bool,
    sort: SortKey,
    limit: Option<usize>,
) -> Result<()> {
    let actor = session.actor()?;
    let today = Local::now().date_naive();
    let mut tasks: Vec<&Task> = crate::visibility::visible_tasks(session.db.tasks(), &actor.id, actor.is_admin, today)
        .into_iter()
        .filter(|t| status.map_or(true, |s| t.status == s))
        .filter(|t| !mine || t.assigned_to == actor.id)
        .collect();
    sort_tasks(&mut tasks, sort);
    if let Some(n) = limit {
        tasks.truncate(n);
    }
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }
    print_table(&tasks, today);
    Ok(())
}

/// Print a single task in full.
pub fn cmd_view(session: &mut Session, id: String) -> Result<()> {
    let actor = session.actor()?;
    let task_id = resolve_task_identifier(&id, &session.db)?;
    let today = Local::now().date_naive();
    let board = session.board();
    let t = board.task_for(&actor, task_id, today)?;

    println!("#{} {}", t.id, t.title);
    println!("  status:    {}", t.status);
    println!("  priority:  {}", t.priority);
    println!("  assigned:  {}", t.assigned_to);
    println!("  due:       {} ({})", t.due, format_due_relative(t.due, today));
    match t.site {
        Some(site) => println!("  site:      {}", site),
        None => println!("  site:      -"),
    }
    if !t.description.is_empty() {
        println!("  {}", t.description);
    }
    if let Some(req) = t.pending_exception() {
        println!("  pending date move: {} (raised {})", req.reason, req.timestamp.format("%Y-%m-%d %H:%M"));
    }
    if !t.sub_tasks.is_empty() {
        let (done, total) = t.checklist_progress();
        println!("Checklist ({}/{}):", done, total);
        for item in &t.sub_tasks {
            println!("  [{}] {}. {}", if item.completed { "x" } else { " " }, item.id, item.text);
        }
    }
    println!("History:");
    for log in &t.logs {
        println!(
            "  {}  {:<12} {}",
            log.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            log.actor_id,
            log.action
        );
    }
    Ok(())
}

/// Run one workflow command against a task.
pub fn cmd_transition(session: &mut Session, id: String, command: Command, position: Option<Coordinate>) -> Result<()> {
    let actor = session.actor()?;
    let task_id = resolve_task_identifier(&id, &session.db)?;
    let mut board = session.board();
    let status = board
        .execute(task_id, &command, &actor, position, Utc::now())?
        .status;
    let (_, feed) = board.into_parts();
    session.commit(feed)?;
    println!("Task {} is {}", task_id, status);
    Ok(())
}

/// Submit for review using the position given on the command line.
pub fn cmd_submit(session: &mut Session, id: String, lat: Option<f64>, lng: Option<f64>) -> Result<()> {
    cmd_transition(session, id, Command::SubmitForReview, coordinate(lat, lng))
}

/// Admin override: close a task, requiring --yes.
pub fn cmd_finish(session: &mut Session, id: String, yes: bool) -> Result<()> {
    if !yes {
        eprintln!("Force finish skips the geofence and review. Re-run with --yes to confirm.");
    }
    cmd_transition(session, id, Command::ForceFinish { confirmed: yes }, None)
}

pub fn cmd_approve_move(session: &mut Session, id: String, due: String) -> Result<()> {
    let due = parse_due(&due)?;
    cmd_transition(session, id, Command::ApproveMove { due }, None)
}

/// Add or toggle checklist items.
pub fn cmd_check(session: &mut Session, action: CheckAction) -> Result<()> {
    let actor = session.actor()?;
    match action {
        CheckAction::Add { id, text } => {
            let task_id = resolve_task_identifier(&id, &session.db)?;
            let mut board = session.board();
            let item = board.add_checklist_item(&actor, task_id, &text)?;
            let (_, feed) = board.into_parts();
            session.commit(feed)?;
            println!("Added item {} to task {}", item, task_id);
        }
        CheckAction::Toggle { id, item } => {
            let task_id = resolve_task_identifier(&id, &session.db)?;
            let mut board = session.board();
            let completed = board.toggle_checklist_item(&actor, task_id, item)?;
            let (_, feed) = board.into_parts();
            session.commit(feed)?;
            let state = if completed { "done" } else { "not done" };
            println!("Item {} on task {} marked {}", item, task_id, state);
        }
    }
    Ok(())
}

/// Permanently delete a task.
pub fn cmd_archive(session: &mut Session, id: String) -> Result<()> {
    let actor = session.actor()?;
    let task_id = resolve_task_identifier(&id, &session.db)?;
    let mut board = session.board();
    let task = board.archive(&actor, task_id)?;
    let (_, feed) = board.into_parts();
    session.commit(feed)?;
    println!("Archived task {} ({})", task.id, task.title);
    Ok(())
}

/// Add or list employees.
pub fn cmd_staff(session: &mut Session, action: StaffAction) -> Result<()> {
    match action {
        StaffAction::Add { id, name, department, admin } => {
            if !session.db.employees.is_empty() && !session.actor()?.is_admin {
                return Err(Rejection::NotAdmin { action: "add staff" }.into());
            }
            let employee = Employee {
                id: id.trim().to_string(),
                name: name.trim().to_string(),
                department: department.trim().to_string(),
                admin,
            };
            if employee.id.is_empty() {
                return Err(Rejection::EmptyField("employee id").into());
            }
            let mode = employee.work_mode(&session.settings.field_departments);
            session.db.add_employee(employee)?;
            session.commit(Feed::default())?;
            println!("Added {} ({:?})", id.trim(), mode);
        }
        StaffAction::List => {
            println!("{:<12} {:<20} {:<14} {:<7} {}", "ID", "Name", "Department", "Mode", "Admin");
            for e in &session.db.employees {
                println!(
                    "{:<12} {:<20} {:<14} {:<7} {}",
                    truncate(&e.id, 12),
                    truncate(&e.name, 20),
                    truncate(&e.department, 14),
                    format!("{:?}", e.work_mode(&session.settings.field_departments)),
                    if e.admin { "yes" } else { "" }
                );
            }
        }
    }
    Ok(())
}

/// Show the most recent notifications, newest first.
pub fn cmd_inbox(session: &Session, limit: usize) -> Result<()> {
    if session.db.notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }
    for n in session.db.notifications.iter().rev().take(limit) {
        println!(
            "{}  {:<8} {:<22} {}",
            n.at.with_timezone(&Local).format("%m-%d %H:%M"),
            format!("{:?}", n.severity),
            truncate(&n.title, 22),
            n.message
        );
    }
    Ok(())
}

/// Generate shell completions.
pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "fo", &mut std::io::stdout());
}

/// Launch the interactive board.
pub fn cmd_board(session: Session, lat: Option<f64>, lng: Option<f64>, track: Option<PathBuf>) -> Result<()> {
    let actor = session.actor()?;
    run_board_tui(session, actor, coordinate(lat, lng), track).map_err(|source| Error::Io {
        path: PathBuf::from("<terminal>"),
        source,
    })
}
