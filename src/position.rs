//! Live position tracking.
//!
//! A location provider pushes fixes into a [`PositionFeed`]; the reader side,
//! [`PositionWatch`], only ever cares about the most recent one. Dropping or
//! cancelling the watch unsubscribes, after which the feed reports failure.
//!
//! [`follow_file`] is the provider used by the board: it polls a text file that
//! a GPS logger keeps appending `lat,lng` lines to.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::geo::Coordinate;

/// Producer half of a position stream.
#[derive(Debug, Clone)]
pub struct PositionFeed {
    tx: Sender<Coordinate>,
}

impl PositionFeed {
    /// Report a new fix. Returns `false` once the watch is gone.
    pub fn report(&self, fix: Coordinate) -> bool {
        self.tx.send(fix).is_ok()
    }
}

/// Consumer half: remembers the latest fix seen.
#[derive(Debug)]
pub struct PositionWatch {
    rx: Option<Receiver<Coordinate>>,
    latest: Option<Coordinate>,
}

/// Open a new position stream.
pub fn watch() -> (PositionFeed, PositionWatch) {
    let (tx, rx) = mpsc::channel();
    (
        PositionFeed { tx },
        PositionWatch {
            rx: Some(rx),
            latest: None,
        },
    )
}

impl PositionWatch {
    /// Drain pending fixes and return the newest known position.
    pub fn latest(&mut self) -> Option<Coordinate> {
        if let Some(rx) = &self.rx {
            loop {
                match rx.try_recv() {
                    Ok(fix) => {
                        if self.latest != Some(fix) {
                            debug!(%fix, "position fix");
                        }
                        self.latest = Some(fix);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.rx = None;
                        break;
                    }
                }
            }
        }
        self.latest
    }

    /// Stop listening. The last known fix is kept.
    pub fn cancel(&mut self) {
        self.rx = None;
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }
}

/// Parse one `lat,lng` (or `lat lng`) line. Blank lines, `#` comments and
/// out-of-range values yield `None`.
pub fn parse_fix(line: &str) -> Option<Coordinate> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let mut parts = line.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty());
    let lat: f64 = parts.next()?.parse().ok()?;
    let lng: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some(Coordinate::new(lat, lng))
}

/// Report the last valid fix in `path` every `interval` until the watch goes away.
pub fn follow_file(feed: PositionFeed, path: PathBuf, interval: Duration) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut unreadable = false;
        loop {
            match fs::read_to_string(&path) {
                Ok(raw) => {
                    unreadable = false;
                    if let Some(fix) = raw.lines().rev().find_map(parse_fix) {
                        if !feed.report(fix) {
                            debug!(path = %path.display(), "position watch closed");
                            return;
                        }
                    }
                }
                Err(e) if !unreadable => {
                    warn!(path = %path.display(), error = %e, "cannot read position file");
                    unreadable = true;
                }
                Err(_) => {}
            }
            thread::sleep(interval);
        }
    })
}
