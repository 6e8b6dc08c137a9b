//! Task board interface.
//!
//! A four-column board (To Do, In Progress, Review, Done) over the tasks the
//! current user can see. Workflow keys run the same commands as the CLI, and
//! any refusal is shown in the status bar.

use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate, Utc};
use crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};

use crate::cmd::Session;
use crate::db::{format_due_relative, parse_due_input};
use crate::employee::Actor;
use crate::fields::{Status, WorkMode};
use crate::position::PositionWatch;
use crate::store::TaskStore;
use crate::task::Task;
use crate::tui::colors::{card_background, status_color, GOLD};
use crate::tui::input::InputField;
use crate::visibility::is_visible;
use crate::workflow::Command;

/// What an open text prompt is collecting.
#[derive(Clone, Copy, PartialEq, Debug)]
enum Prompt {
    MoveReason,
    NewDueDate,
}

/// Main board application state
pub struct BoardApp {
    session: Session,
    actor: Actor,
    position: PositionWatch,
    selected_column: usize,
    selected_card: usize,
    column_scroll_offsets: [usize; 4],
    status_message: String,
    show_task_detail: bool,
    show_completed: bool,
    /// Task armed for force finish, waiting for `y`.
    confirm_finish: Option<u64>,
    prompt: Option<(Prompt, InputField)>,
    filter_active: bool,
    filter_text: String,
    columns: [Vec<u64>; 4],
}

impl BoardApp {
    pub fn new(session: Session, actor: Actor, position: PositionWatch) -> Self {
        let mut app = BoardApp {
            session,
            actor,
            position,
            selected_column: 0,
            selected_card: 0,
            column_scroll_offsets: [0; 4],
            status_message: String::new(),
            show_task_detail: false,
            show_completed: true,
            confirm_finish: None,
            prompt: None,
            filter_active: false,
            filter_text: String::new(),
            columns: Default::default(),
        };
        app.update_columns();
        app
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Stop listening for position updates.
    pub fn teardown(&mut self) {
        self.position.cancel();
    }

    /// Rebuild columns from the visible tasks
    fn update_columns(&mut self) {
        for column in self.columns.iter_mut() {
            column.clear();
        }
        let today = Self::today();
        let filter = self.filter_text.to_lowercase();

        for task in self.session.db.tasks() {
            if !is_visible(task, &self.actor.id, self.actor.is_admin, today) {
                continue;
            }
            if task.status == Status::Done && !self.show_completed {
                continue;
            }
            if !filter.is_empty()
                && !task.title.to_lowercase().contains(&filter)
                && !task.assigned_to.to_lowercase().contains(&filter)
            {
                continue;
            }
            self.columns[task.status.column()].push(task.id);
        }
        for column in self.columns.iter_mut() {
            let db = &self.session.db;
            column.sort_by_key(|id| db.get(*id).map(|t| (t.due, t.id)));
        }

        self.clamp_selection();
    }

    /// Ensure selected column and card indices are valid
    fn clamp_selection(&mut self) {
        if self.selected_column >= self.columns.len() {
            self.selected_column = 0;
        }
        let column_len = self.columns[self.selected_column].len();
        if column_len == 0 {
            self.selected_card = 0;
            self.column_scroll_offsets[self.selected_column] = 0;
        } else if self.selected_card >= column_len {
            self.selected_card = column_len - 1;
        }
    }

    fn selected_task_id(&self) -> Option<u64> {
        self.columns[self.selected_column].get(self.selected_card).copied()
    }

    /// Run a workflow command on the selected card and save.
    fn run_command(&mut self, command: Command) {
        let Some(task_id) = self.selected_task_id() else {
            self.set_status_message("No task selected".to_string());
            return;
        };
        // Start from what is on disk so edits made elsewhere are not overwritten.
        if let Err(e) = self.session.reload() {
            self.set_status_message(format!("Error reloading: {}", e));
            return;
        }
        let position = self.position.latest();
        let mut board = self.session.board();
        let result = board
            .execute(task_id, &command, &self.actor, position, Utc::now())
            .map(|t| t.status);
        let (_, feed) = board.into_parts();

        match result {
            Ok(status) => match self.session.commit(feed) {
                Ok(()) => {
                    self.set_status_message(format!("Task #{} is now {}", task_id, status));
                    self.update_columns();
                    self.follow_task(task_id, status);
                }
                Err(e) => {
                    self.set_status_message(format!("Error saving: {}", e));
                    self.reload();
                }
            },
            Err(e) => {
                self.set_status_message(e.to_string());
                self.update_columns();
            }
        }
    }

    /// Move the selection to wherever `task_id` landed.
    fn follow_task(&mut self, task_id: u64, status: Status) {
        let column = status.column();
        if let Some(pos) = self.columns[column].iter().position(|&id| id == task_id) {
            self.selected_column = column;
            self.selected_card = pos;
        } else {
            self.clamp_selection();
        }
    }

    /// Throw away in-memory changes and reread the database file.
    fn reload(&mut self) {
        if let Err(e) = self.session.reload() {
            self.set_status_message(format!("Error reloading: {}", e));
        }
        self.update_columns();
    }

    fn submit_prompt(&mut self) {
        let Some((kind, input)) = self.prompt.take() else {
            return;
        };
        match kind {
            Prompt::MoveReason => self.run_command(Command::RequestMove { reason: input.value }),
            Prompt::NewDueDate => match parse_due_input(&input.value, Self::today()) {
                Some(due) => self.run_command(Command::ApproveMove { due }),
                None => self.set_status_message(format!("Could not understand date '{}'", input.value)),
            },
        }
    }

    /// Set a status message
    fn set_status_message(&mut self, msg: String) {
        self.status_message = msg;
    }

    /// Clear the status message
    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    /// Handle keyboard input
    fn handle_input(&mut self) -> io::Result<bool> {
        if !event::poll(Duration::from_millis(50))? {
            return Ok(false);
        }
        let Event::Key(key) = event::read()? else {
            return Ok(false);
        };

        if let Some((_, input)) = self.prompt.as_mut() {
            match key.code {
                KeyCode::Esc => {
                    self.prompt = None;
                    self.set_status_message("Cancelled".to_string());
                }
                KeyCode::Enter => self.submit_prompt(),
                KeyCode::Backspace => input.handle_backspace(),
                KeyCode::Left => input.move_cursor_left(),
                KeyCode::Right => input.move_cursor_right(),
                KeyCode::Char(c) => input.handle_char(c),
                _ => {}
            }
            return Ok(false);
        }

        if self.filter_active {
            match key.code {
                KeyCode::Esc => {
                    self.filter_active = false;
                    self.filter_text.clear();
                    self.update_columns();
                    self.clear_status_message();
                }
                KeyCode::Enter => {
                    self.filter_active = false;
                    let total: usize = self.columns.iter().map(|c| c.len()).sum();
                    self.set_status_message(format!("Filter: '{}' ({} tasks shown)", self.filter_text, total));
                }
                KeyCode::Backspace => {
                    self.filter_text.pop();
                    self.update_columns();
                }
                KeyCode::Char(c) => {
                    self.filter_text.push(c);
                    self.update_columns();
                }
                _ => {}
            }
            return Ok(false);
        }

        if let Some(task_id) = self.confirm_finish.take() {
            if key.code == KeyCode::Char('y') && self.selected_task_id() == Some(task_id) {
                self.run_command(Command::ForceFinish { confirmed: true });
            } else {
                self.set_status_message("Force finish cancelled".to_string());
            }
            return Ok(false);
        }

        self.clear_status_message();

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(true),
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),

            KeyCode::Enter => self.show_task_detail = !self.show_task_detail,

            KeyCode::Left => {
                if self.selected_column > 0 {
                    self.selected_column -= 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Right => {
                if self.selected_column < self.columns.len() - 1 {
                    self.selected_column += 1;
                    self.clamp_selection();
                }
            }
            KeyCode::Up => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Down => {
                let column_len = self.columns[self.selected_column].len();
                if column_len > 0 && self.selected_card < column_len - 1 {
                    self.selected_card += 1;
                }
            }

            KeyCode::Char('s') => self.run_command(Command::Start),
            KeyCode::Char('r') => self.run_command(Command::SubmitForReview),
            KeyCode::Char('a') => self.run_command(Command::Approve),
            KeyCode::Char('x') => self.run_command(Command::Reject),
            KeyCode::Char('f') => {
                if let Some(id) = self.selected_task_id() {
                    self.confirm_finish = Some(id);
                    self.set_status_message(format!(
                        "Force finish #{} skipping all checks? Press y to confirm",
                        id
                    ));
                }
            }
            KeyCode::Char('m') => {
                if self.selected_task_id().is_some() {
                    self.prompt = Some((Prompt::MoveReason, InputField::new()));
                }
            }
            KeyCode::Char('g') => {
                let due = self.selected_task_id().and_then(|id| self.session.db.get(id)).map(|t| t.due);
                if let Some(due) = due {
                    self.prompt = Some((Prompt::NewDueDate, InputField::with_value(&due.to_string())));
                }
            }
            KeyCode::Char('d') => self.run_command(Command::RejectMove),

            KeyCode::Char('t') => {
                self.show_completed = !self.show_completed;
                self.update_columns();
                let status = if self.show_completed {
                    "Showing completed tasks"
                } else {
                    "Hiding completed tasks"
                };
                self.set_status_message(status.to_string());
            }
            KeyCode::Char('/') => {
                self.filter_active = true;
            }
            KeyCode::Char('h') => {
                self.set_status_message(
                    "s: Start | r: Submit | a: Approve | x: Send back | f: Force finish | m: Request move | g: Grant move | d: Decline move | Enter: Details | q: Quit"
                        .to_string(),
                );
            }
            _ => {}
        }
        Ok(false)
    }

    /// Render the task board
    fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Board
                Constraint::Length(1), // Status bar
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);
        self.render_board(f, chunks[1]);
        self.render_status_bar(f, chunks[2]);

        if self.show_task_detail {
            self.render_task_detail_popup(f);
        }
        if self.prompt.is_some() {
            self.render_prompt(f);
        }
    }

    fn render_header(&mut self, f: &mut Frame, area: Rect) {
        let role = if self.actor.is_admin {
            "admin"
        } else {
            match self.actor.work_mode {
                WorkMode::Field => "field",
                WorkMode::Office => "office",
            }
        };
        let position = match self.position.latest() {
            Some(fix) => format!("GPS {}", fix),
            None => "GPS unavailable".to_string(),
        };
        let header_text = vec![Line::from(vec![
            Span::styled("TASK BOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(
                format!("{} ({})  {}", self.actor.name, role, position),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
        ])];

        let header_block = Paragraph::new(header_text)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header_block, area);
    }

    fn render_board(&mut self, f: &mut Frame, area: Rect) {
        let columns_layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(25); 4])
            .split(area);

        for (i, status) in Status::ALL.into_iter().enumerate() {
            self.render_column(f, columns_layout[i], i, status);
        }
    }

    /// Render a single column
    fn render_column(&mut self, f: &mut Frame, area: Rect, column_index: usize, status: Status) {
        let is_selected = column_index == self.selected_column;
        let accent = status_color(status);
        let border_style = if is_selected {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        let title = format!("{} ({})", status, self.columns[column_index].len());
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);
        let inner = block.inner(area);
        f.render_widget(block, area);

        if self.columns[column_index].is_empty() {
            return;
        }

        let card_height = 5;
        let available_height = inner.height as usize;
        let visible_cards = (available_height / card_height).max(1);

        let scroll_offset = if is_selected {
            let start = self.column_scroll_offsets[column_index];
            let offset = if self.selected_card < start {
                self.selected_card
            } else if self.selected_card >= start + visible_cards {
                self.selected_card + 1 - visible_cards
            } else {
                start
            };
            self.column_scroll_offsets[column_index] = offset;
            offset
        } else {
            self.column_scroll_offsets[column_index]
        };

        let today = Self::today();
        let mut current_y = 0;
        let mut rendered = 0;
        for (card_index, &task_id) in self.columns[column_index].iter().enumerate().skip(scroll_offset) {
            if current_y + card_height > available_height {
                break;
            }
            if let Some(task) = self.session.db.get(task_id) {
                let card_area = Rect {
                    x: inner.x,
                    y: inner.y + current_y as u16,
                    width: inner.width,
                    height: card_height as u16,
                };
                let selected = is_selected && card_index == self.selected_card;
                render_card(f, card_area, task, selected, accent, today);
                current_y += card_height;
                rendered += 1;
            }
        }

        let remaining = self.columns[column_index]
            .len()
            .saturating_sub(scroll_offset + rendered);
        if remaining > 0 && inner.height > 0 {
            let indicator = Paragraph::new(format!("▼ +{} below", remaining)).style(Style::default().fg(Color::Cyan));
            f.render_widget(
                indicator,
                Rect {
                    x: inner.x,
                    y: inner.y + inner.height - 1,
                    width: inner.width,
                    height: 1,
                },
            );
        }
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let text = if self.filter_active {
            format!("Filter: {} | Type to search title/assignee, Enter to apply, Esc to cancel", self.filter_text)
        } else if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            let total: usize = self.columns.iter().map(|c| c.len()).sum();
            format!("Tasks: {} | s/r: Start/Submit | a/x: Approve/Send back | f: Finish | m: Move | h: Help", total)
        };
        let accent = status_color(Status::ALL[self.selected_column]);
        let text_color = if accent == GOLD { Color::Rgb(20, 20, 20) } else { Color::White };
        let status = Paragraph::new(text)
            .style(Style::default().bg(accent).fg(text_color))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    fn render_task_detail_popup(&self, f: &mut Frame) {
        let Some(task) = self.selected_task_id().and_then(|id| self.session.db.get(id)) else {
            return;
        };
        let popup_area = centered(f.area(), 80, 80);
        f.render_widget(Clear, popup_area);

        let today = Self::today();
        let mut lines = vec![
            Line::from(Span::styled(
                format!("Task #{}: {}", task.id, task.title),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!("Status:    {}", task.status)),
            Line::from(format!("Priority:  {}", task.priority)),
            Line::from(format!("Assigned:  {}", task.assigned_to)),
            Line::from(format!("Due:       {} ({})", task.due, format_due_relative(task.due, today))),
            Line::from(format!(
                "Site:      {}",
                task.site.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
            )),
        ];
        if let Some(req) = task.pending_exception() {
            lines.push(Line::from(Span::styled(
                format!("Date move requested: {}", req.reason),
                Style::default().fg(Color::Yellow),
            )));
        }
        if !task.description.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(task.description.clone()));
        }
        if !task.sub_tasks.is_empty() {
            let (done, total) = task.checklist_progress();
            lines.push(Line::from(""));
            lines.push(Line::from(format!("Checklist ({}/{}):", done, total)));
            for item in &task.sub_tasks {
                let mark = if item.completed { "x" } else { " " };
                lines.push(Line::from(format!("  [{}] {}", mark, item.text)));
            }
        }
        lines.push(Line::from(""));
        lines.push(Line::from("History:"));
        for log in &task.logs {
            lines.push(Line::from(format!(
                "  {}  {}  {}",
                log.timestamp.with_timezone(&Local).format("%m-%d %H:%M"),
                log.actor_id,
                log.action
            )));
        }

        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Task Details (Press Enter to close)")
                    .title_alignment(Alignment::Center)
                    .border_style(Style::default().fg(status_color(task.status)).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: true })
            .style(Style::default().bg(Color::Black));
        f.render_widget(popup, popup_area);
    }

    fn render_prompt(&self, f: &mut Frame) {
        let Some((kind, input)) = &self.prompt else {
            return;
        };
        let title = match kind {
            Prompt::MoveReason => "Why does the date need to move? (Enter to send, Esc to cancel)",
            Prompt::NewDueDate => "New due date (YYYY-MM-DD, friday, in 3d...)",
        };
        let area = centered(f.area(), 60, 20);
        let area = Rect { height: area.height.min(3), ..area };
        f.render_widget(Clear, area);
        let para = Paragraph::new(input.value.clone())
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().bg(Color::Black));
        f.render_widget(para, area);
        f.set_cursor_position((area.x + 1 + input.cursor as u16, area.y + 1));
    }

    /// Main event loop
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;
            if self.handle_input()? {
                break;
            }
        }
        Ok(())
    }
}

/// Render a single task card
fn render_card(f: &mut Frame, area: Rect, task: &Task, is_selected: bool, accent: Color, today: NaiveDate) {
    let style = if is_selected {
        Style::default().bg(accent).fg(Color::Black).add_modifier(Modifier::BOLD)
    } else {
        Style::default().bg(card_background(task.priority))
    };

    let mut card_text = vec![Line::from(format!("#{} {}", task.id, task.title))];
    let flag = if task.pending_exception().is_some() { " | move?" } else { "" };
    card_text.push(Line::from(format!("{} | {}{}", task.priority, task.assigned_to, flag)));
    let (done, total) = task.checklist_progress();
    card_text.push(Line::from(format!("due {} | {}/{}", format_due_relative(task.due, today), done, total)));

    let card = Paragraph::new(card_text)
        .block(Block::default().borders(Borders::ALL))
        .style(style)
        .wrap(Wrap { trim: true });
    f.render_widget(card, area);
}

/// A rectangle of `pct_x` by `pct_y` percent centred in `area`.
fn centered(area: Rect, pct_x: u16, pct_y: u16) -> Rect {
    let width = (area.width as u32 * pct_x as u32 / 100) as u16;
    let height = (area.height as u32 * pct_y as u32 / 100) as u16;
    Rect::new(area.x + (area.width - width) / 2, area.y + (area.height - height) / 2, width, height)
}
