//! Task form handling for the terminal user interface.
//!
//! The form backs both the add and edit screens. Text fields are edited in
//! place; priority and status are selectors changed with Left/Right. The
//! categories field carries a suggestion list the app refreshes as the
//! user types.

use chrono::{DateTime, Utc};

use crate::db::parse_due_input;
use crate::fields::{Priority, Status};
use crate::task::{clean_text, normalise_categories, NewTask, Task, TaskPatch};
use crate::tui::input::InputField;

/// Field order in the form.
pub const TITLE_FIELD: usize = 0;
pub const DESCRIPTION_FIELD: usize = 1;
pub const PRIORITY_FIELD: usize = 2;
pub const DUE_FIELD: usize = 3;
pub const CATEGORIES_FIELD: usize = 4;
/// Only present when editing; new tasks always start pending.
pub const STATUS_FIELD: usize = 5;

const PRIORITIES: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];
const STATUSES: [Status; 2] = [Status::Pending, Status::Completed];

pub struct TaskForm {
    pub title: InputField,
    pub description: InputField,
    pub due: InputField,
    pub categories: InputField,
    pub priority: usize,
    pub status: usize,
    pub current_field: usize,
    pub is_edit: bool,
    pub suggestions: Vec<String>,
    pub suggestion_index: usize,
    /// Due date of the task being edited and the text it was shown as.
    /// Untouched text keeps the exact instant rather than re-parsing it.
    original_due: Option<(Option<DateTime<Utc>>, String)>,
}

impl TaskForm {
    pub fn new() -> Self {
        let mut form = Self {
            title: InputField::new(),
            description: InputField::new(),
            due: InputField::new(),
            categories: InputField::new(),
            priority: 1, // Medium
            status: 0,
            current_field: TITLE_FIELD,
            is_edit: false,
            suggestions: Vec::new(),
            suggestion_index: 0,
            original_due: None,
        };
        form.update_active_field();
        form
    }

    /// Create a form populated from an existing task.
    pub fn from_task(task: &Task) -> Self {
        let mut form = Self::new();
        form.is_edit = true;
        form.title = InputField::with_value(&task.title);
        form.description = InputField::with_value(task.description.as_deref().unwrap_or_default());
        let due_text = task
            .due_date
            .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        form.due = InputField::with_value(&due_text);
        form.original_due = Some((task.due_date, due_text));
        form.categories = InputField::with_value(&task.categories.join(", "));
        form.priority = PRIORITIES.iter().position(|&p| p == task.priority).unwrap_or(1);
        form.status = STATUSES.iter().position(|&s| s == task.status).unwrap_or(0);
        form.update_active_field();
        form
    }

    pub fn field_count(&self) -> usize {
        if self.is_edit {
            6
        } else {
            5
        }
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % self.field_count();
        self.update_active_field();
    }

    pub fn prev_field(&mut self) {
        self.current_field = if self.current_field == 0 {
            self.field_count() - 1
        } else {
            self.current_field - 1
        };
        self.update_active_field();
    }

    pub fn update_active_field(&mut self) {
        let current = self.current_field;
        self.title.active = current == TITLE_FIELD;
        self.description.active = current == DESCRIPTION_FIELD;
        self.due.active = current == DUE_FIELD;
        self.categories.active = current == CATEGORIES_FIELD;
    }

    /// The text field under the cursor, if the current field is not a selector.
    pub fn active_input(&mut self) -> Option<&mut InputField> {
        match self.current_field {
            TITLE_FIELD => Some(&mut self.title),
            DESCRIPTION_FIELD => Some(&mut self.description),
            DUE_FIELD => Some(&mut self.due),
            CATEGORIES_FIELD => Some(&mut self.categories),
            _ => None,
        }
    }

    pub fn handle_char(&mut self, c: char) {
        if let Some(field) = self.active_input() {
            field.handle_char(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_backspace();
        }
    }

    pub fn handle_delete(&mut self) {
        if let Some(field) = self.active_input() {
            field.handle_delete();
        }
    }

    /// Move the cursor in text fields, or change a selector value.
    pub fn handle_left_right(&mut self, right: bool) {
        match self.current_field {
            PRIORITY_FIELD => self.priority = step(self.priority, PRIORITIES.len(), right),
            STATUS_FIELD => self.status = step(self.status, STATUSES.len(), right),
            _ => {
                if let Some(field) = self.active_input() {
                    if right {
                        field.move_cursor_right();
                    } else {
                        field.move_cursor_left();
                    }
                }
            }
        }
    }

    pub fn priority(&self) -> Priority {
        PRIORITIES[self.priority % PRIORITIES.len()]
    }

    pub fn status(&self) -> Status {
        STATUSES[self.status % STATUSES.len()]
    }

    /// Categories typed so far, trimmed and de-duplicated.
    pub fn selected_categories(&self) -> Vec<String> {
        normalise_categories(self.categories.value.split(','))
    }

    /// Replace the suggestion list, keeping the highlight in range.
    pub fn set_suggestions(&mut self, suggestions: Vec<String>) {
        self.suggestions = suggestions;
        if self.suggestion_index >= self.suggestions.len() {
            self.suggestion_index = 0;
        }
    }

    pub fn cycle_suggestion(&mut self, forward: bool) {
        if !self.suggestions.is_empty() {
            self.suggestion_index = step(self.suggestion_index, self.suggestions.len(), forward);
        }
    }

    pub fn highlighted_suggestion(&self) -> Option<&str> {
        self.suggestions.get(self.suggestion_index).map(String::as_str)
    }

    /// Append the highlighted suggestion to the categories field.
    pub fn accept_suggestion(&mut self) -> Option<String> {
        let label = self.highlighted_suggestion()?.to_string();
        let mut cats = self.selected_categories();
        cats.push(label.clone());
        self.categories.set(&cats.join(", "));
        Some(label)
    }

    /// Whether the due text still reads as it did when the form opened.
    fn due_unchanged(&self) -> bool {
        self.original_due
            .as_ref()
            .is_some_and(|(_, text)| text.trim() == self.due.value.trim())
    }

    fn parse_due(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, String> {
        let raw = self.due.value.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        parse_due_input(raw, now)
            .map(Some)
            .ok_or_else(|| format!("Could not understand due date '{raw}'"))
    }

    pub fn to_new_task(&self, now: DateTime<Utc>) -> Result<NewTask, String> {
        if self.title.value.trim().is_empty() {
            return Err("Title is required".into());
        }
        Ok(NewTask {
            title: self.title.value.clone(),
            description: clean_text(Some(self.description.value.clone())),
            priority: self.priority(),
            due_date: self.parse_due(now)?,
            categories: self.selected_categories(),
        })
    }

    /// Build a patch that sets every field the form shows. The due date is
    /// left alone unless its text was edited.
    pub fn to_patch(&self, now: DateTime<Utc>) -> Result<TaskPatch, String> {
        if self.title.value.trim().is_empty() {
            return Err("Title is required".into());
        }
        Ok(TaskPatch {
            title: Some(self.title.value.clone()),
            description: Some(clean_text(Some(self.description.value.clone()))),
            status: Some(self.status()),
            priority: Some(self.priority()),
            due_date: if self.due_unchanged() { None } else { Some(self.parse_due(now)?) },
            categories: Some(self.selected_categories()),
        })
    }
}

fn step(i: usize, len: usize, forward: bool) -> usize {
    if forward {
        (i + 1) % len
    } else if i == 0 {
        len - 1
    } else {
        i - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, TaskStore};
    use crate::task::{TaskId, UserId};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 0).unwrap()
    }

    fn existing() -> Task {
        Task {
            id: TaskId(4),
            title: "Pay rent".into(),
            description: Some("before the 1st".into()),
            status: Status::Completed,
            priority: Priority::High,
            due_date: Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()),
            categories: vec!["Finance".into(), "Home".into()],
            created_at: now(),
            owner: UserId(1),
        }
    }

    #[test]
    fn edit_form_round_trips_the_task() {
        let task = existing();
        let form = TaskForm::from_task(&task);
        assert_eq!(form.field_count(), 6);
        let patch = form.to_patch(now()).unwrap();
        assert_eq!(patch.title.as_deref(), Some("Pay rent"));
        assert_eq!(patch.status, Some(Status::Completed));
        assert_eq!(patch.priority, Some(Priority::High));
        assert_eq!(patch.due_date, None);
        assert_eq!(patch.categories, Some(task.categories.clone()));
    }

    #[test]
    fn editing_other_fields_keeps_the_exact_due_instant() {
        let due = Utc.with_ymd_and_hms(2024, 5, 20, 10, 0, 30).unwrap();
        let mut db = Database::default();
        let owner = crate::auth::register(&mut db, "Ada", "ada@example.com", "secret1", now()).unwrap();
        let draft = NewTask {
            title: "Pay rent".into(),
            due_date: Some(due),
            ..NewTask::default()
        };
        let task = db.create_task(owner, draft, now()).unwrap();

        let mut form = TaskForm::from_task(&task);
        form.title.set("Pay rent today");
        let patch = form.to_patch(now()).unwrap();
        assert_eq!(patch.due_date, None);

        let updated = db.update_task(owner, task.id, patch).unwrap();
        assert_eq!(updated.title, "Pay rent today");
        assert_eq!(updated.due_date, Some(due));
    }

    #[test]
    fn edited_due_text_is_parsed() {
        let mut form = TaskForm::from_task(&existing());
        form.due.set("2024-06-03");
        let patch = form.to_patch(now()).unwrap();
        assert_eq!(patch.due_date, Some(Some(Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap())));

        form.due.set("");
        assert_eq!(form.to_patch(now()).unwrap().due_date, Some(None));
    }

    #[test]
    fn new_form_defaults() {
        let mut form = TaskForm::new();
        assert_eq!(form.field_count(), 5);
        assert!(form.to_new_task(now()).is_err());
        for c in "Call mom".chars() {
            form.handle_char(c);
        }
        let draft = form.to_new_task(now()).unwrap();
        assert_eq!(draft.title, "Call mom");
        assert_eq!(draft.priority, Priority::Medium);
        assert_eq!(draft.due_date, None);
        assert_eq!(draft.description, None);
    }

    #[test]
    fn selectors_wrap() {
        let mut form = TaskForm::new();
        form.current_field = PRIORITY_FIELD;
        form.handle_left_right(true);
        assert_eq!(form.priority(), Priority::High);
        form.handle_left_right(true);
        assert_eq!(form.priority(), Priority::Low);
        form.handle_left_right(false);
        assert_eq!(form.priority(), Priority::High);
    }

    #[test]
    fn bad_due_date_is_reported() {
        let mut form = TaskForm::new();
        form.title.set("x");
        form.due.set("whenever");
        assert!(form.to_new_task(now()).unwrap_err().contains("whenever"));
        form.due.set("tomorrow");
        assert!(form.to_new_task(now()).unwrap().due_date.is_some());
    }

    #[test]
    fn accepting_suggestions_appends_categories() {
        let mut form = TaskForm::new();
        form.categories.set("Work");
        form.set_suggestions(vec!["Personal".into(), "Study".into()]);
        form.cycle_suggestion(true);
        assert_eq!(form.accept_suggestion().as_deref(), Some("Study"));
        assert_eq!(form.categories.value, "Work, Study");
        assert_eq!(form.selected_categories(), vec!["Work", "Study"]);
    }
}
