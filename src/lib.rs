//! # fieldops
//!
//! Workflow engine for field service jobs: dispatching work to technicians,
//! tracking it through `ToDo -> InProgress -> Review -> Done`, gating
//! submission on the technician actually being at the site, and handling
//! requests to reschedule.
//!
//! The rules live in [`workflow::apply`], a pure function over a [`task::Task`].
//! [`board::Board`] wraps it with a [`store::TaskStore`] and a
//! [`notify::NotificationSink`] to commit results; [`db::Database`] is the
//! JSON-file store used by the `fo` binary.
//!
//! ```no_run
//! use chrono::Utc;
//! use fieldops::board::Board;
//! use fieldops::db::Database;
//! use fieldops::employee::Actor;
//! use fieldops::fields::WorkMode;
//! use fieldops::notify::TracingSink;
//! use fieldops::workflow::Command;
//!
//! # fn main() -> fieldops::error::Result<()> {
//! let db = Database::load(std::path::Path::new("fieldops.json"))?;
//! let mut board = Board::new(db, TracingSink);
//! let tech = Actor::technician("tech-1", "Ravi", WorkMode::Field);
//! board.execute(1, &Command::Start, &tech, None, Utc::now())?;
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod db;
pub mod employee;
pub mod error;
pub mod fields;
pub mod geo;
pub mod notify;
pub mod position;
pub mod store;
pub mod task;
pub mod visibility;
pub mod workflow;
pub mod tui {
    pub mod board;
    pub mod board_run;
    pub mod colors;
    pub mod input;
}
