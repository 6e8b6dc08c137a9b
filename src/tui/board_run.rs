//! Task board entry point and terminal setup.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::CrosstermBackend, Terminal};
use tracing::debug;

use crate::cmd::Session;
use crate::employee::Actor;
use crate::geo::Coordinate;
use crate::position;
use crate::tui::board::BoardApp;

const TRACK_POLL: Duration = Duration::from_secs(2);

/// Initialise and run the task board for `actor`.
///
/// `fix` seeds the position; `track` names a file that keeps supplying newer
/// fixes for as long as the board is open.
pub fn run_board_tui(session: Session, actor: Actor, fix: Option<Coordinate>, track: Option<PathBuf>) -> io::Result<()> {
    let (feed, watch) = position::watch();
    if let Some(fix) = fix {
        feed.report(fix);
    }
    let producer = track.map(|path| {
        debug!(path = %path.display(), "following position file");
        position::follow_file(feed, path, TRACK_POLL)
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = BoardApp::new(session, actor, watch);
    let result = app.run(&mut terminal);
    app.teardown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // The producer notices the closed watch on its next poll.
    drop(producer);
    result
}
