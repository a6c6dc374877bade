//! Main application logic for the terminal user interface.
//!
//! This module contains the `App` struct which owns the command context
//! and a `ViewController`, handles key input per screen, writes mutations
//! through the task store, and renders the dashboard (statistics panel,
//! filter bar, task table, reminders) plus the form, detail, help and
//! confirmation screens.

use std::io;
use std::time::{Duration, Instant};

use chrono::Utc;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tracing::{debug, warn};

use crate::cmd::Context;
use crate::controller::{TaskAction, ViewController};
use crate::db::*;
use crate::error::{AppError, StoreError};
use crate::fields::*;
use crate::task::{Task, TaskId, UserId};
use crate::tui::{
    colors::{due_color, priority_color, ACCENT, DARK_RED},
    enums::{AppState, Cycle},
    task_form::{
        TaskForm, CATEGORIES_FIELD, DESCRIPTION_FIELD, DUE_FIELD, PRIORITY_FIELD, STATUS_FIELD,
        TITLE_FIELD,
    },
    utils::{centered_rect, next_category},
};
use crate::view::{due_state, DueState, ViewSelection};

/// How often the reference instant is moved forward while idle.
const CLOCK_REFRESH: Duration = Duration::from_secs(60);

/// Main application state for the dashboard.
pub struct App {
    state: AppState,
    ctx: Context,
    owner: UserId,
    controller: ViewController,
    table_state: TableState,
    form: TaskForm,
    editing: Option<TaskId>,
    confirm_delete: Option<TaskId>,
    status_message: String,
    show_reminders: bool,
    last_refresh: Instant,
}

impl App {
    /// Build the dashboard for `owner`, seeding the selection from their
    /// preferences.
    pub fn new(ctx: Context, owner: UserId) -> Result<Self, AppError> {
        let prefs = ctx.db.user(owner).map(|u| u.preferences).unwrap_or_default();
        let selection = ViewSelection {
            status: prefs.default_view,
            sort: prefs.default_sort,
            ..ViewSelection::default()
        };
        let mut controller =
            ViewController::new(selection, ctx.config.category_suggestions.clone(), ctx.now);
        controller.dispatch(TaskAction::Loaded(ctx.db.tasks_for(owner)))?;

        let mut app = App {
            state: AppState::TaskList,
            ctx,
            owner,
            controller,
            table_state: TableState::default(),
            form: TaskForm::new(),
            editing: None,
            confirm_delete: None,
            status_message: String::new(),
            show_reminders: prefs.task_reminders,
            last_refresh: Instant::now(),
        };
        app.clamp_selection();
        Ok(app)
    }

    fn set_status_message(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }

    fn clear_status_message(&mut self) {
        self.status_message.clear();
    }

    fn selected_task(&self) -> Option<&Task> {
        self.table_state
            .selected()
            .and_then(|i| self.controller.visible_at(i))
    }

    fn selected_id(&self) -> Option<TaskId> {
        self.selected_task().map(|t| t.id)
    }

    /// Keep the highlighted row inside the visible list.
    fn clamp_selection(&mut self) {
        let len = self.controller.visible_len();
        match (len, self.table_state.selected()) {
            (0, _) => self.table_state.select(None),
            (_, None) => self.table_state.select(Some(0)),
            (n, Some(i)) if i >= n => self.table_state.select(Some(n - 1)),
            _ => {}
        }
    }

    /// Run one store mutation and save it. If either step fails the
    /// in-memory store is restored, so it never holds a change the file
    /// does not.
    fn write_through<T, F>(&mut self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Database) -> Result<T, StoreError>,
    {
        let snapshot = self.ctx.db.clone();
        let result = op(&mut self.ctx.db)
            .map_err(AppError::from)
            .and_then(|out| self.ctx.save().map(|_| out));
        if result.is_err() {
            self.ctx.db = snapshot;
        }
        result
    }

    /// Tell the controller about a change that is already on disk.
    fn persist(&mut self, action: TaskAction, message: String) {
        match self.controller.dispatch(action) {
            Ok(()) => {
                self.clamp_selection();
                self.set_status_message(message);
            }
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
    }

    /// Re-read the store from disk and move the clock forward.
    fn reload(&mut self) {
        match Database::load(&self.ctx.store_path()) {
            Ok(db) => self.ctx.db = db,
            Err(e) => {
                self.set_status_message(format!("Error reloading: {e}"));
                return;
            }
        }
        let tasks = self.ctx.db.tasks_for(self.owner);
        let result = self
            .controller
            .dispatch(TaskAction::Loaded(tasks))
            .and_then(|_| self.controller.refresh(Utc::now()));
        match result {
            Ok(()) => {
                self.clamp_selection();
                self.set_status_message("Reloaded");
            }
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
        self.last_refresh = Instant::now();
    }

    fn tick(&mut self) {
        if self.last_refresh.elapsed() < CLOCK_REFRESH {
            return;
        }
        self.last_refresh = Instant::now();
        if let Err(e) = self.controller.refresh(Utc::now()) {
            warn!("refresh failed: {e}");
        }
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status_message("No task selected");
            return;
        };
        let owner = self.owner;
        match self.write_through(|db| db.toggle_task(owner, id)) {
            Ok(task) => {
                let msg = format!("Task '{}' marked {}", task.title, task.status.as_str());
                self.persist(TaskAction::Updated(task), msg);
            }
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
    }

    fn delete_confirmed(&mut self) {
        let Some(id) = self.confirm_delete.take() else {
            return;
        };
        let owner = self.owner;
        match self.write_through(|db| db.delete_task(owner, id)) {
            Ok(()) => self.persist(TaskAction::Deleted(id), format!("Task {id} deleted")),
            Err(e) => self.set_status_message(format!("Error deleting task: {e}")),
        }
    }

    fn open_add_form(&mut self) {
        self.form = TaskForm::new();
        self.editing = None;
        self.refresh_suggestions();
        self.state = AppState::AddTask;
    }

    fn open_edit_form(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            self.set_status_message("No task selected");
            return;
        };
        self.form = TaskForm::from_task(&task);
        self.editing = Some(task.id);
        self.refresh_suggestions();
        self.state = AppState::EditTask;
    }

    fn refresh_suggestions(&mut self) {
        let selected = self.form.selected_categories();
        self.form
            .set_suggestions(self.controller.category_suggestions(&selected));
    }

    fn submit_form(&mut self) {
        let now = Utc::now();
        match self.editing {
            None => {
                let draft = match self.form.to_new_task(now) {
                    Ok(d) => d,
                    Err(msg) => return self.set_status_message(msg),
                };
                let owner = self.owner;
                match self.write_through(|db| db.create_task(owner, draft, now)) {
                    Ok(task) => {
                        let msg = format!("Task '{}' created", task.title);
                        self.persist(TaskAction::Added(task), msg);
                        self.state = AppState::TaskList;
                    }
                    Err(e) => self.set_status_message(format!("Error: {e}")),
                }
            }
            Some(id) => {
                let patch = match self.form.to_patch(now) {
                    Ok(p) => p,
                    Err(msg) => return self.set_status_message(msg),
                };
                let owner = self.owner;
                match self.write_through(|db| db.update_task(owner, id, patch)) {
                    Ok(task) => {
                        let msg = format!("Task '{}' updated", task.title);
                        self.persist(TaskAction::Updated(task), msg);
                        self.state = AppState::TaskList;
                    }
                    Err(e) => self.set_status_message(format!("Error: {e}")),
                }
            }
        }
    }

    fn change_selection<F>(&mut self, apply: F)
    where
        F: FnOnce(&mut ViewController) -> Result<(), crate::error::ViewError>,
    {
        match apply(&mut self.controller) {
            Ok(()) => {
                self.clamp_selection();
                let sel = self.controller.selection();
                debug!(?sel, "selection changed");
                let msg = format!(
                    "{} of {} tasks shown",
                    self.controller.visible_len(),
                    self.controller.statistics().total
                );
                self.set_status_message(msg);
            }
            Err(e) => self.set_status_message(format!("Error: {e}")),
        }
    }

    fn move_selection(&mut self, down: bool) {
        let len = self.controller.visible_len();
        if len == 0 {
            return;
        }
        let next = match self.table_state.selected() {
            None => 0,
            Some(i) if down => (i + 1).min(len - 1),
            Some(i) => i.saturating_sub(1),
        };
        self.table_state.select(Some(next));
    }

    /// Handle keyboard input on the main task list.
    /// Returns true if the application should quit.
    fn handle_task_list_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(false),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(true),
            KeyCode::Home => self.table_state.select((self.controller.visible_len() > 0).then_some(0)),
            KeyCode::End => {
                let len = self.controller.visible_len();
                self.table_state.select(len.checked_sub(1));
            }
            KeyCode::Enter => {
                if self.selected_task().is_some() {
                    self.state = AppState::TaskDetail;
                }
            }
            KeyCode::Char('a') | KeyCode::Char('n') => self.open_add_form(),
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char(' ') | KeyCode::Char('t') => self.toggle_selected(),
            KeyCode::Char('d') | KeyCode::Delete => self.ask_delete(),
            KeyCode::Char('s') => {
                let next = self.controller.selection().status.next();
                self.change_selection(|c| c.set_status_filter(next));
            }
            KeyCode::Char('p') => {
                let next = self.controller.selection().priority.next();
                self.change_selection(|c| c.set_priority_filter(next));
            }
            KeyCode::Char('c') => {
                let next = next_category(&self.controller.selection().category, self.controller.categories());
                self.change_selection(|c| c.set_category_filter(next));
            }
            KeyCode::Char('o') => {
                let next = self.controller.selection().sort.next();
                self.change_selection(|c| c.set_sort(next));
            }
            KeyCode::Char('x') => self.change_selection(|c| {
                c.set_status_filter(StatusFilter::All)?;
                c.set_priority_filter(PriorityFilter::All)?;
                c.set_category_filter(CategoryFilter::All)
            }),
            KeyCode::Char('m') => {
                self.show_reminders = !self.show_reminders;
                let msg = if self.show_reminders { "Reminders shown" } else { "Reminders hidden" };
                self.set_status_message(msg);
            }
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('h') | KeyCode::Char('?') => self.state = AppState::Help,
            _ => {}
        }
        false
    }

    fn ask_delete(&mut self) {
        if let Some(id) = self.selected_id() {
            self.confirm_delete = Some(id);
            self.state = AppState::Confirm;
        } else {
            self.set_status_message("No task selected");
        }
    }

    fn handle_detail_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => self.state = AppState::TaskList,
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char(' ') | KeyCode::Char('t') => {
                self.toggle_selected();
            }
            KeyCode::Char('d') => self.ask_delete(),
            _ => {}
        }
        false
    }

    fn handle_form_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        let on_categories = self.form.current_field == CATEGORIES_FIELD;
        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match key {
            KeyCode::Esc => {
                self.state = if self.editing.is_some() && self.selected_task().is_some() {
                    AppState::TaskDetail
                } else {
                    AppState::TaskList
                };
                self.set_status_message("Cancelled");
            }
            KeyCode::Char('n') if ctrl && on_categories => self.form.cycle_suggestion(true),
            KeyCode::Char('p') if ctrl && on_categories => self.form.cycle_suggestion(false),
            KeyCode::Char('y') if ctrl && on_categories => {
                if let Some(label) = self.form.accept_suggestion() {
                    self.set_status_message(format!("Added category '{label}'"));
                }
                self.refresh_suggestions();
            }
            KeyCode::Tab | KeyCode::Down => self.form.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.form.prev_field(),
            KeyCode::Left => self.form.handle_left_right(false),
            KeyCode::Right => self.form.handle_left_right(true),
            KeyCode::Home => {
                if let Some(f) = self.form.active_input() {
                    f.move_home();
                }
            }
            KeyCode::End => {
                if let Some(f) = self.form.active_input() {
                    f.move_end();
                }
            }
            KeyCode::Backspace => {
                self.form.handle_backspace();
                if on_categories {
                    self.refresh_suggestions();
                }
            }
            KeyCode::Delete => {
                self.form.handle_delete();
                if on_categories {
                    self.refresh_suggestions();
                }
            }
            KeyCode::Enter => self.submit_form(),
            KeyCode::Char(c) if !ctrl => {
                self.form.handle_char(c);
                if on_categories {
                    self.refresh_suggestions();
                }
            }
            _ => {}
        }
        false
    }

    fn handle_confirm_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.delete_confirmed();
                self.state = AppState::TaskList;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.confirm_delete = None;
                self.state = AppState::TaskList;
            }
            _ => {}
        }
        false
    }

    fn handle_help_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> bool {
        if matches!(key, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h') | KeyCode::Char('?')) {
            self.state = AppState::TaskList;
        }
        false
    }

    /// Route one key press to the handler for the current screen.
    /// Returns true if the application should quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        self.clear_status_message();
        match self.state {
            AppState::TaskList => self.handle_task_list_input(key, modifiers),
            AppState::TaskDetail => self.handle_detail_input(key, modifiers),
            AppState::AddTask | AppState::EditTask => self.handle_form_input(key, modifiers),
            AppState::Help => self.handle_help_input(key, modifiers),
            AppState::Confirm => self.handle_confirm_input(key, modifiers),
        }
    }

    /// Poll for a key event. Returns true if the application should quit.
    fn handle_input(&mut self) -> io::Result<bool> {
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key.code, key.modifiers));
                }
            }
        }
        Ok(false)
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let who = self
            .ctx
            .db
            .user(self.owner)
            .map(|u| format!("{} <{}>", u.name, u.email))
            .unwrap_or_default();
        let header = Paragraph::new(Line::from(vec![
            Span::styled("TASK TRACKER", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
            Span::styled(who, Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC)),
        ]))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_statistics(&self, f: &mut Frame, area: Rect) {
        let stats = self.controller.statistics();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
            .split(area);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("Completion"))
            .gauge_style(Style::default().fg(ACCENT).bg(Color::Black))
            .percent(u16::from(stats.completion_percentage))
            .label(format!(
                "{}% ({}/{})",
                stats.completion_percentage, stats.completed, stats.total
            ));
        f.render_widget(gauge, chunks[0]);

        let counts = vec![
            Line::from(vec![
                Span::raw(format!("Total {}  ", stats.total)),
                Span::raw(format!("Pending {}  ", stats.pending)),
                Span::styled(format!("Completed {}", stats.completed), Style::default().fg(Color::DarkGray)),
            ]),
            Line::from(vec![
                Span::styled(format!("High {}  ", stats.high_priority), Style::default().fg(priority_color(Priority::High))),
                Span::styled(format!("Medium {}  ", stats.medium_priority), Style::default().fg(priority_color(Priority::Medium))),
                Span::styled(format!("Low {}  ", stats.low_priority), Style::default().fg(priority_color(Priority::Low))),
                Span::styled(format!("Due soon {}  ", stats.due_soon), Style::default().fg(Color::Yellow)),
                Span::styled(format!("Overdue {}", stats.overdue), Style::default().fg(Color::LightRed)),
            ]),
        ];
        let panel = Paragraph::new(counts).block(Block::default().borders(Borders::ALL).title("Statistics"));
        f.render_widget(panel, chunks[1]);
    }

    fn render_filter_bar(&self, f: &mut Frame, area: Rect) {
        let sel = self.controller.selection();
        let key = Style::default().fg(Color::Cyan);
        let value = Style::default().add_modifier(Modifier::BOLD);
        let line = Line::from(vec![
            Span::styled("[s]", key),
            Span::raw(" Status: "),
            Span::styled(sel.status.as_str(), value),
            Span::styled("   [p]", key),
            Span::raw(" Priority: "),
            Span::styled(sel.priority.as_str(), value),
            Span::styled("   [c]", key),
            Span::raw(" Category: "),
            Span::styled(sel.category.to_string(), value),
            Span::styled("   [o]", key),
            Span::raw(" Sort: "),
            Span::styled(sel.sort.as_str(), value),
        ]);
        let bar = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("View"));
        f.render_widget(bar, area);
    }

    fn render_table(&mut self, f: &mut Frame, area: Rect) {
        let now = self.controller.now();
        let header = Row::new(["ID", "Status", "Priority", "Due", "Title"].map(|h| {
            Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))
        }))
        .style(Style::default().bg(ACCENT).fg(Color::White))
        .height(1);

        let rows: Vec<Row> = self
            .controller
            .visible_tasks()
            .into_iter()
            .map(|task| {
                let mut style = match task.status {
                    Status::Completed => Style::default().fg(Color::DarkGray),
                    Status::Pending => Style::default().fg(Color::White),
                };
                if let Some(c) = due_color(due_state(task, now)) {
                    style = style.fg(c);
                }
                let title = if task.categories.is_empty() {
                    task.title.clone()
                } else {
                    format!("{} [{}]", task.title, task.categories.join(","))
                };
                Row::new(vec![
                    Cell::from(task.id.to_string()),
                    Cell::from(format_status(task.status)),
                    Cell::from(format_priority(task.priority))
                        .style(Style::default().fg(priority_color(task.priority))),
                    Cell::from(format_due_relative(task.due_date, now)),
                    Cell::from(title),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(5),
            Constraint::Length(10),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Min(20),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}/{}) - Press 'h' for help",
                self.controller.visible_len(),
                self.controller.statistics().total
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");

        f.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn reminder_lines(&self) -> Vec<Line<'static>> {
        if !self.show_reminders {
            return Vec::new();
        }
        let now = self.controller.now();
        self.controller
            .reminders()
            .into_iter()
            .take(4)
            .map(|r| {
                let (label, color) = match r.state {
                    DueState::Overdue => ("Overdue ", Color::LightRed),
                    DueState::DueSoon => ("Due soon", Color::Yellow),
                };
                Line::from(vec![
                    Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                    Span::raw(format!(
                        "  #{} {} ({})",
                        r.task.id,
                        truncate(&r.task.title, 60),
                        format_due_relative(r.task.due_date, now)
                    )),
                ])
            })
            .collect()
    }

    /// Render the dashboard: header, statistics (only when there are
    /// tasks), filter bar, table and reminders.
    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let show_stats = self.controller.statistics().is_displayable();
        let reminders = self.reminder_lines();

        let mut constraints = vec![Constraint::Length(3)];
        if show_stats {
            constraints.push(Constraint::Length(4));
        }
        constraints.push(Constraint::Length(3));
        constraints.push(Constraint::Min(5));
        if !reminders.is_empty() {
            constraints.push(Constraint::Length(reminders.len() as u16 + 2));
        }
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let mut i = 0;
        self.render_header(f, chunks[i]);
        i += 1;
        if show_stats {
            self.render_statistics(f, chunks[i]);
            i += 1;
        }
        self.render_filter_bar(f, chunks[i]);
        i += 1;
        self.render_table(f, chunks[i]);
        i += 1;
        if !reminders.is_empty() {
            let panel = Paragraph::new(reminders).block(Block::default().borders(Borders::ALL).title("Reminders"));
            f.render_widget(panel, chunks[i]);
        }
    }

    fn render_task_detail(&mut self, f: &mut Frame, area: Rect) {
        let now = self.controller.now();
        let Some(task) = self.selected_task() else {
            let empty = Paragraph::new("No task selected").block(Block::default().borders(Borders::ALL));
            f.render_widget(empty, area);
            return;
        };
        let label = Style::default().add_modifier(Modifier::BOLD);
        let due_text = match task.due_date {
            Some(_) => format!("{} ({})", format_due(task.due_date), format_due_relative(task.due_date, now)),
            None => "No due date".into(),
        };
        let mut due_style = Style::default();
        if let Some(c) = due_color(due_state(task, now)) {
            due_style = due_style.fg(c);
        }
        let mut lines = vec![
            Line::from(vec![Span::styled("Title:      ", label), Span::raw(task.title.clone())]),
            Line::from(vec![Span::styled("Status:     ", label), Span::raw(format_status(task.status))]),
            Line::from(vec![
                Span::styled("Priority:   ", label),
                Span::styled(format_priority(task.priority), Style::default().fg(priority_color(task.priority))),
            ]),
            Line::from(vec![Span::styled("Due:        ", label), Span::styled(due_text, due_style)]),
            Line::from(vec![
                Span::styled("Categories: ", label),
                Span::raw(if task.categories.is_empty() { "-".to_string() } else { task.categories.join(", ") }),
            ]),
            Line::from(vec![
                Span::styled("Created:    ", label),
                Span::raw(task.created_at.format("%Y-%m-%d %H:%M UTC").to_string()),
            ]),
            Line::from(""),
            Line::from(Span::styled("Description", label)),
        ];
        lines.push(Line::from(task.description.clone().unwrap_or_else(|| "-".into())));

        let detail = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(format!("Task {}", task.id)))
            .wrap(Wrap { trim: false });
        f.render_widget(detail, area);
    }

    fn render_task_form(&mut self, f: &mut Frame, area: Rect, is_edit: bool) {
        let title = if is_edit { "Edit Task" } else { "Add Task" };
        let outer = Block::default().borders(Borders::ALL).title(title);
        let inner = outer.inner(area);
        f.render_widget(outer, area);

        let mut constraints = vec![Constraint::Length(3); self.form.field_count()];
        constraints.push(Constraint::Length(3));
        constraints.push(Constraint::Min(0));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        let active = Style::default().fg(Color::Yellow);
        let idle = Style::default();
        let text_fields = [
            (TITLE_FIELD, "Title", &self.form.title),
            (DESCRIPTION_FIELD, "Description", &self.form.description),
            (DUE_FIELD, "Due (YYYY-MM-DD, today, friday, in 3d, ...)", &self.form.due),
            (CATEGORIES_FIELD, "Categories (comma-separated)", &self.form.categories),
        ];
        let mut cursor = None;
        for (index, label, field) in text_fields {
            let style = if field.active { active } else { idle };
            let p = Paragraph::new(field.value.clone())
                .block(Block::default().borders(Borders::ALL).title(label).border_style(style));
            f.render_widget(p, chunks[index]);
            if field.active {
                let x = chunks[index].x + 1 + field.cursor as u16;
                cursor = Some((x.min(chunks[index].right().saturating_sub(2)), chunks[index].y + 1));
            }
        }

        let selector = |label: &str, value: &str, on: bool| {
            Paragraph::new(format!("< {value} >")).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(label.to_string())
                    .border_style(if on { active } else { idle }),
            )
        };
        let current = self.form.current_field;
        f.render_widget(
            selector("Priority", format_priority(self.form.priority()), current == PRIORITY_FIELD),
            chunks[PRIORITY_FIELD],
        );
        if self.form.is_edit {
            f.render_widget(
                selector("Status", format_status(self.form.status()), current == STATUS_FIELD),
                chunks[STATUS_FIELD],
            );
        }

        let suggestion_spans: Vec<Span> = self
            .form
            .suggestions
            .iter()
            .enumerate()
            .flat_map(|(i, s)| {
                let style = if i == self.form.suggestion_index && current == CATEGORIES_FIELD {
                    Style::default().bg(Color::Gray).fg(Color::Black)
                } else {
                    Style::default().fg(Color::Cyan)
                };
                [Span::styled(s.clone(), style), Span::raw(" ")]
            })
            .collect();
        let suggestions = Paragraph::new(Line::from(suggestion_spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Suggestions (Ctrl+N/Ctrl+P choose, Ctrl+Y add)"),
        );
        f.render_widget(suggestions, chunks[self.form.field_count()]);

        let hint = Paragraph::new("Tab/Up/Down: move  Left/Right: change  Enter: save  Esc: cancel")
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(hint, chunks[self.form.field_count() + 1]);

        if let Some(pos) = cursor {
            f.set_cursor_position(pos);
        }
    }

    fn render_help(&mut self, f: &mut Frame, area: Rect) {
        let key = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let entries = [
            ("Up/Down, j/k", "Move selection"),
            ("Enter", "Show task details"),
            ("a", "Add task"),
            ("e", "Edit selected task"),
            ("Space, t", "Toggle pending/completed"),
            ("d", "Delete selected task"),
            ("s", "Cycle status filter"),
            ("p", "Cycle priority filter"),
            ("c", "Cycle category filter"),
            ("o", "Cycle sort order"),
            ("x", "Clear filters"),
            ("m", "Show/hide reminders"),
            ("r", "Reload from disk"),
            ("h, ?", "This help"),
            ("q, Esc", "Quit"),
        ];
        let lines: Vec<Line> = entries
            .iter()
            .map(|(k, d)| Line::from(vec![Span::styled(format!("{k:<14}"), key), Span::raw(*d)]))
            .collect();
        let help = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
        f.render_widget(help, centered_rect(60, 70, area));
    }

    fn render_confirm(&mut self, f: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Confirm Delete")
            .borders(Borders::ALL)
            .style(Style::default().bg(DARK_RED));

        let area = centered_rect(50, 25, area);
        f.render_widget(Clear, area);

        let target = self
            .confirm_delete
            .and_then(|id| self.controller.task(id))
            .map(|t| format!("Delete task {}: {}", t.id, t.title))
            .unwrap_or_default();
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(target, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from("This action cannot be undone."),
            Line::from(""),
            Line::from("Press 'y' to confirm, 'n' to cancel"),
        ];
        let paragraph = Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&mut self, f: &mut Frame, area: Rect) {
        let status_text = if !self.status_message.is_empty() {
            self.status_message.clone()
        } else {
            match self.state {
                AppState::TaskList => format!(
                    "Tasks: {}/{} | Press 'h' for help",
                    self.controller.visible_len(),
                    self.controller.statistics().total
                ),
                AppState::TaskDetail => "Task Details | e edit, t toggle, d delete, Esc back".to_string(),
                AppState::AddTask => "Add New Task".to_string(),
                AppState::EditTask => "Edit Task".to_string(),
                AppState::Help => "Help".to_string(),
                AppState::Confirm => "Confirm Delete".to_string(),
            }
        };
        let status = Paragraph::new(status_text)
            .style(Style::default().bg(ACCENT).fg(Color::White))
            .alignment(Alignment::Left);
        f.render_widget(status, area);
    }

    /// Draw the current screen plus the status bar.
    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        match self.state {
            AppState::TaskList => self.render_task_list(f, chunks[0]),
            AppState::TaskDetail => self.render_task_detail(f, chunks[0]),
            AppState::AddTask => self.render_task_form(f, chunks[0], false),
            AppState::EditTask => self.render_task_form(f, chunks[0], true),
            AppState::Help => {
                self.render_task_list(f, chunks[0]);
                f.render_widget(Clear, centered_rect(60, 70, chunks[0]));
                self.render_help(f, chunks[0]);
            }
            AppState::Confirm => {
                self.render_task_list(f, chunks[0]);
                self.render_confirm(f, chunks[0]);
            }
        }

        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop. Handles rendering and input until the user exits.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.handle_input()? {
                break;
            }
            self.tick();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::seed;
    use ratatui::backend::TestBackend;

    fn seeded_app(dir: &tempfile::TempDir) -> App {
        let mut ctx = Context::open(dir.path().to_path_buf(), Config::default(), Utc::now()).unwrap();
        let owner = seed::seed(&mut ctx.db, ctx.now).unwrap();
        ctx.save().unwrap();
        App::new(ctx, owner).unwrap()
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(code, KeyModifiers::NONE)
    }

    #[test]
    fn dashboard_shows_statistics_and_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(&dir);
        let text = screen(&mut app);
        assert!(text.contains("Statistics"));
        assert!(text.contains("33%"));
        assert!(text.contains("Complete project proposal"));
    }

    #[test]
    fn statistics_panel_hidden_without_tasks() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = Context::open(dir.path().to_path_buf(), Config::default(), Utc::now()).unwrap();
        let owner = crate::auth::register(&mut ctx.db, "Empty", "empty@example.com", "secret1", ctx.now).unwrap();
        let mut app = App::new(ctx, owner).unwrap();
        let text = screen(&mut app);
        assert!(!text.contains("Statistics"));
        assert!(text.contains("Tasks (0/0)"));
    }

    #[test]
    fn filter_keys_update_the_visible_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(&dir);
        assert_eq!(app.controller.visible_len(), 3);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.controller.selection().status, StatusFilter::Pending);
        assert_eq!(app.controller.visible_len(), 2);
        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.controller.selection().category, CategoryFilter::Label("Study".into()));
        assert_eq!(app.controller.visible_len(), 1);
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.controller.visible_len(), 3);
    }

    #[test]
    fn toggle_persists_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(&dir);
        let id = app.selected_id().unwrap();
        let before = app.controller.statistics().completed;
        press(&mut app, KeyCode::Char('t'));
        assert_ne!(app.controller.statistics().completed, before);
        assert!(app.status_message.contains("marked"));

        let stored = Database::load(&app.ctx.store_path()).unwrap();
        let on_disk = stored.tasks.iter().find(|t| t.id == id).unwrap().status;
        assert_eq!(on_disk, app.controller.task(id).unwrap().status);
    }

    #[test]
    fn failed_save_leaves_store_and_view_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(&dir);
        let id = app.selected_id().unwrap();
        let before = app.controller.task(id).unwrap().status;

        // A directory where the temp file goes makes every save fail.
        let blocker = app.ctx.store_path().with_extension("json.tmp");
        std::fs::create_dir(&blocker).unwrap();
        press(&mut app, KeyCode::Char('t'));
        assert!(app.status_message.starts_with("Error"));
        assert_eq!(app.controller.task(id).unwrap().status, before);
        assert_eq!(app.ctx.db.task(app.owner, id).unwrap().status, before);

        // The next successful write must not carry the failed toggle.
        std::fs::remove_dir(&blocker).unwrap();
        let other = app.controller.visible_at(1).unwrap().id;
        app.table_state.select(Some(1));
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        let stored = Database::load(&app.ctx.store_path()).unwrap();
        assert!(stored.tasks.iter().all(|t| t.id != other));
        assert_eq!(stored.tasks.iter().find(|t| t.id == id).unwrap().status, before);
        assert_eq!(app.controller.task(id).unwrap().status, before);
    }

    #[test]
    fn delete_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(&dir);
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.state, AppState::Confirm);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.controller.statistics().total, 3);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.state, AppState::TaskList);
        assert_eq!(app.controller.statistics().total, 2);
    }

    #[test]
    fn add_form_creates_a_task() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(&dir);
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.state, AppState::AddTask);
        for c in "Book flights".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        for _ in 0..CATEGORIES_FIELD {
            press(&mut app, KeyCode::Tab);
        }
        app.handle_key(KeyCode::Char('y'), KeyModifiers::CONTROL);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.state, AppState::TaskList);
        assert_eq!(app.controller.statistics().total, 4);
        let added = app
            .controller
            .tasks()
            .iter()
            .find(|t| t.title == "Book flights")
            .unwrap();
        assert_eq!(added.categories, vec!["Work"]);
    }

    #[test]
    fn quit_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = seeded_app(&dir);
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.state, AppState::Help);
        assert!(!press(&mut app, KeyCode::Esc));
        assert!(press(&mut app, KeyCode::Char('q')));
    }
}
