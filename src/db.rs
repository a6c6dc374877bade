//! Document store and utility functions for task management.
//!
//! This module provides the `Database` struct that persists users, sessions
//! and tasks in a single JSON file, the owner-scoped `TaskStore` interface
//! over it, and helpers for date parsing and table formatting.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::auth::{Session, User};
use crate::error::StoreError;
use crate::fields::*;
use crate::task::{normalise_categories, NewTask, Task, TaskId, TaskPatch, UserId};
use crate::view::Statistics;

/// Store file name inside the data directory.
pub const STORE_FILE_NAME: &str = "store.json";

/// Owner-scoped task persistence.
///
/// Every operation takes the owner explicitly; a task that belongs to a
/// different user is indistinguishable from a missing one.
pub trait TaskStore {
    fn create_task(&mut self, owner: UserId, draft: NewTask, now: DateTime<Utc>) -> Result<Task, StoreError>;
    fn task(&self, owner: UserId, id: TaskId) -> Result<&Task, StoreError>;
    fn update_task(&mut self, owner: UserId, id: TaskId, patch: TaskPatch) -> Result<Task, StoreError>;
    fn toggle_task(&mut self, owner: UserId, id: TaskId) -> Result<Task, StoreError>;
    fn delete_task(&mut self, owner: UserId, id: TaskId) -> Result<(), StoreError>;
    fn tasks_for(&self, owner: UserId) -> Vec<Task>;
}

/// In-memory image of the store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub sessions: Vec<Session>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    next_task_id: u64,
    #[serde(default)]
    next_user_id: u64,
}

impl Database {
    /// Load the store from a JSON file. A missing file is an empty store; a
    /// file that does not parse is an error, never silently replaced.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(?path, "store file not found, starting empty");
            return Ok(Database::default());
        }
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        let db: Database = serde_json::from_str(&buf)?;
        debug!(?path, users = db.users.len(), tasks = db.tasks.len(), "store loaded");
        Ok(db)
    }

    /// Save the store using atomic write (temp file + rename).
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(self)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, path)?;
        debug!(?path, "store saved");
        Ok(())
    }

    /// Generate the next task id. Ids are never reused, even after deletes.
    pub fn next_task_id(&mut self) -> TaskId {
        let floor = self.tasks.iter().map(|t| t.id.0).max().unwrap_or(0);
        self.next_task_id = self.next_task_id.max(floor) + 1;
        TaskId(self.next_task_id)
    }

    /// Generate the next user id.
    pub fn next_user_id(&mut self) -> UserId {
        let floor = self.users.iter().map(|u| u.id.0).max().unwrap_or(0);
        self.next_user_id = self.next_user_id.max(floor) + 1;
        UserId(self.next_user_id)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim().to_lowercase();
        self.users.iter().find(|u| u.email == email)
    }

    fn task_mut(&mut self, owner: UserId, id: TaskId) -> Result<&mut Task, StoreError> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == id && t.owner == owner)
            .ok_or(StoreError::TaskNotFound(id))
    }

    /// Drop every user, session and task.
    pub fn clear(&mut self) {
        self.users.clear();
        self.sessions.clear();
        self.tasks.clear();
    }
}

fn clean_title(title: &str) -> Result<String, StoreError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(StoreError::Invalid("title must not be empty".into()));
    }
    Ok(title.to_string())
}

impl TaskStore for Database {
    fn create_task(&mut self, owner: UserId, draft: NewTask, now: DateTime<Utc>) -> Result<Task, StoreError> {
        if self.user(owner).is_none() {
            return Err(StoreError::UserNotFound);
        }
        let title = clean_title(&draft.title)?;
        let task = Task {
            id: self.next_task_id(),
            title,
            description: crate::task::clean_text(draft.description),
            status: Status::Pending,
            priority: draft.priority,
            due_date: draft.due_date,
            categories: normalise_categories(&draft.categories),
            created_at: now,
            owner,
        };
        info!(task = %task.id, %owner, "task created");
        self.tasks.push(task.clone());
        Ok(task)
    }

    fn task(&self, owner: UserId, id: TaskId) -> Result<&Task, StoreError> {
        self.tasks
            .iter()
            .find(|t| t.id == id && t.owner == owner)
            .ok_or(StoreError::TaskNotFound(id))
    }

    fn update_task(&mut self, owner: UserId, id: TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let title = patch.title.as_deref().map(clean_title).transpose()?;
        let task = self.task_mut(owner, id)?;
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = crate::task::clean_text(description);
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = due_date;
        }
        if let Some(categories) = patch.categories {
            task.categories = normalise_categories(&categories);
        }
        info!(task = %id, %owner, "task updated");
        Ok(task.clone())
    }

    fn toggle_task(&mut self, owner: UserId, id: TaskId) -> Result<Task, StoreError> {
        let task = self.task_mut(owner, id)?;
        task.toggle();
        info!(task = %id, status = task.status.as_str(), "task toggled");
        Ok(task.clone())
    }

    fn delete_task(&mut self, owner: UserId, id: TaskId) -> Result<(), StoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|t| !(t.id == id && t.owner == owner));
        if self.tasks.len() == before {
            return Err(StoreError::TaskNotFound(id));
        }
        info!(task = %id, %owner, "task deleted");
        Ok(())
    }

    fn tasks_for(&self, owner: UserId) -> Vec<Task> {
        self.tasks.iter().filter(|t| t.owner == owner).cloned().collect()
    }
}

/// Parse human-readable due date input.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday", "next friday", "this sunday" (and three-letter forms)
/// - "end of week" / "eow", "end of month" / "eom", "weekend"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD", "YYYY-MM-DD HH:MM" and RFC 3339 instants
///
/// Date-only forms resolve to midnight UTC of that date.
pub fn parse_due_input(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let raw = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Some(dt.and_utc());
    }
    parse_due_date(&raw.to_lowercase(), now.date_naive()).and_then(midnight_utc)
}

fn midnight_utc(d: NaiveDate) -> Option<DateTime<Utc>> {
    d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc())
}

fn parse_due_date(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    match s {
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
        "this weekend" | "weekend" => {
            let days_until_saturday = (5 + 7 - today.weekday().num_days_from_monday()) % 7;
            return Some(today + Duration::days(days_until_saturday as i64));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let (num, unit) = rest.split_at(rest.len().saturating_sub(1));
        if let Ok(n) = num.trim().parse::<i64>() {
            match unit {
                "d" => return Some(today + Duration::days(n)),
                "w" => return Some(today + Duration::weeks(n)),
                // Approximate: 30 days per month
                "m" => return Some(today + Duration::days(n * 30)),
                _ => {}
            }
        }
    }

    let weekdays = [
        ("monday", 0), ("tuesday", 1), ("wednesday", 2), ("thursday", 3),
        ("friday", 4), ("saturday", 5), ("sunday", 6),
        ("mon", 0), ("tue", 1), ("wed", 2), ("thu", 3),
        ("fri", 4), ("sat", 5), ("sun", 6),
    ];
    let current = today.weekday().num_days_from_monday() as i64;
    for (name, target) in weekdays {
        let days_ahead = (target + 7 - current) % 7;
        if s == name || s == format!("this {name}") {
            return Some(today + Duration::days(days_ahead));
        }
        if s == format!("next {name}") {
            let add = if days_ahead == 0 { 7 } else { days_ahead + 7 };
            return Some(today + Duration::days(add));
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Calculate the start and end dates of the current ISO week (Monday to Sunday).
pub fn start_end_of_this_week(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = today.weekday().num_days_from_monday() as i64;
    let start = today - Duration::days(weekday);
    (start, start + Duration::days(6))
}

/// Format a due date relative to now ("today", "tomorrow", "in 3d", "2d late").
pub fn format_due_relative(due: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match due {
        None => "-".into(),
        Some(d) => {
            let days = (d.date_naive() - now.date_naive()).num_days();
            match days {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {n}d"),
                n => format!("{}d late", -n),
            }
        }
    }
}

/// Format a due date for detail views.
pub fn format_due(due: Option<DateTime<Utc>>) -> String {
    match due {
        Some(d) => d.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => "No due date".into(),
    }
}

/// Format a task status for display.
pub fn format_status(s: Status) -> &'static str {
    match s {
        Status::Pending => "Pending",
        Status::Completed => "Completed",
    }
}

/// Format a priority for display.
pub fn format_priority(p: Priority) -> &'static str {
    match p {
        Priority::Low => "Low",
        Priority::Medium => "Medium",
        Priority::High => "High",
    }
}

/// Print tasks in a formatted table, in the order given.
pub fn print_table(tasks: &[&Task], now: DateTime<Utc>) {
    println!(
        "{:<5} {:<10} {:<7} {:<10} {}",
        "ID", "Status", "Pri", "Due", "Title [categories]"
    );
    for t in tasks {
        let cats = if t.categories.is_empty() {
            String::new()
        } else {
            format!(" [{}]", t.categories.join(","))
        };
        println!(
            "{:<5} {:<10} {:<7} {:<10} {}{}",
            t.id,
            format_status(t.status),
            format_priority(t.priority),
            format_due_relative(t.due_date, now),
            truncate(&t.title, 60),
            cats
        );
    }
    let n = tasks.len();
    println!("{n} task{} displayed", if n == 1 { "" } else { "s" });
}

/// Print the statistics summary. Nothing is printed for an empty list.
pub fn print_statistics(stats: &Statistics) {
    if !stats.is_displayable() {
        return;
    }
    println!("Completion:   {}%", stats.completion_percentage);
    println!(
        "Tasks:        {} total, {} completed, {} pending",
        stats.total, stats.completed, stats.pending
    );
    println!(
        "Priority:     {} high, {} medium, {} low",
        stats.high_priority, stats.medium_priority, stats.low_priority
    );
    println!("Due soon:     {} (next 3 days)", stats.due_soon);
    println!("Overdue:      {}", stats.overdue);
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::register;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        // A Wednesday.
        Utc.with_ymd_and_hms(2024, 6, 12, 15, 30, 0).unwrap()
    }

    fn db_with_two_users() -> (Database, UserId, UserId) {
        let mut db = Database::default();
        let alice = register(&mut db, "Alice", "alice@example.com", "secret1", now()).unwrap();
        let bob = register(&mut db, "Bob", "bob@example.com", "secret2", now()).unwrap();
        (db, alice, bob)
    }

    fn draft(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            ..NewTask::default()
        }
    }

    #[test]
    fn created_tasks_start_pending_and_owned() {
        let (mut db, alice, _) = db_with_two_users();
        let mut d = draft("  Buy milk ");
        d.categories = vec!["Home".into(), "Home".into(), " ".into()];
        let t = db.create_task(alice, d, now()).unwrap();
        assert_eq!(t.title, "Buy milk");
        assert_eq!(t.status, Status::Pending);
        assert_eq!(t.owner, alice);
        assert_eq!(t.created_at, now());
        assert_eq!(t.categories, vec!["Home"]);
    }

    #[test]
    fn blank_title_is_rejected_at_the_boundary() {
        let (mut db, alice, _) = db_with_two_users();
        assert!(matches!(
            db.create_task(alice, draft("   "), now()),
            Err(StoreError::Invalid(_))
        ));
        let t = db.create_task(alice, draft("ok"), now()).unwrap();
        let patch = TaskPatch {
            title: Some(String::new()),
            ..TaskPatch::default()
        };
        assert!(db.update_task(alice, t.id, patch).is_err());
        assert_eq!(db.task(alice, t.id).unwrap().title, "ok");
    }

    #[test]
    fn other_owners_tasks_are_invisible() {
        let (mut db, alice, bob) = db_with_two_users();
        let t = db.create_task(alice, draft("private"), now()).unwrap();
        assert!(matches!(db.task(bob, t.id), Err(StoreError::TaskNotFound(_))));
        assert!(db.toggle_task(bob, t.id).is_err());
        assert!(db.delete_task(bob, t.id).is_err());
        assert!(db.tasks_for(bob).is_empty());
        assert_eq!(db.tasks_for(alice).len(), 1);
    }

    #[test]
    fn update_leaves_identity_fields_alone() {
        let (mut db, alice, _) = db_with_two_users();
        let t = db.create_task(alice, draft("draft"), now()).unwrap();
        let patch = TaskPatch {
            title: Some("final".into()),
            description: Some(Some("details".into())),
            priority: Some(Priority::High),
            due_date: Some(Some(now() + Duration::days(1))),
            categories: Some(vec!["Work".into()]),
            ..TaskPatch::default()
        };
        let u = db.update_task(alice, t.id, patch).unwrap();
        assert_eq!(u.id, t.id);
        assert_eq!(u.owner, t.owner);
        assert_eq!(u.created_at, t.created_at);
        assert_eq!(u.title, "final");
        assert_eq!(u.priority, Priority::High);

        let clear = TaskPatch {
            description: Some(None),
            due_date: Some(None),
            ..TaskPatch::default()
        };
        let c = db.update_task(alice, t.id, clear).unwrap();
        assert_eq!(c.description, None);
        assert_eq!(c.due_date, None);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let (mut db, alice, _) = db_with_two_users();
        let a = db.create_task(alice, draft("a"), now()).unwrap();
        let b = db.create_task(alice, draft("b"), now()).unwrap();
        db.delete_task(alice, b.id).unwrap();
        let c = db.create_task(alice, draft("c"), now()).unwrap();
        assert!(c.id > b.id);
        assert!(b.id > a.id);
    }

    #[test]
    fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        let (mut db, alice, _) = db_with_two_users();
        db.create_task(alice, draft("persisted"), now()).unwrap();
        db.save(&path).unwrap();

        let loaded = Database::load(&path).unwrap();
        assert_eq!(loaded.tasks, db.tasks);
        assert_eq!(loaded.users.len(), 2);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_file_is_empty_but_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(STORE_FILE_NAME);
        assert!(Database::load(&path).unwrap().tasks.is_empty());
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Database::load(&path), Err(StoreError::Json(_))));
    }

    #[rstest]
    #[case("today", "2024-06-12")]
    #[case("tomorrow", "2024-06-13")]
    #[case("in 3d", "2024-06-15")]
    #[case("in 2w", "2024-06-26")]
    #[case("friday", "2024-06-14")]
    #[case("next wednesday", "2024-06-19")]
    #[case("eow", "2024-06-16")]
    #[case("eom", "2024-06-30")]
    #[case("weekend", "2024-06-15")]
    #[case("2024-07-01", "2024-07-01")]
    fn due_input_resolves_to_midnight_utc(#[case] input: &str, #[case] date: &str) {
        let got = parse_due_input(input, now()).unwrap();
        assert_eq!(got.format("%Y-%m-%d %H:%M").to_string(), format!("{date} 00:00"));
    }

    #[test]
    fn due_input_accepts_instants() {
        let got = parse_due_input("2024-06-20T09:15:00+02:00", now()).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 6, 20, 7, 15, 0).unwrap());
        let got = parse_due_input("2024-06-20 18:00", now()).unwrap();
        assert_eq!(got, Utc.with_ymd_and_hms(2024, 6, 20, 18, 0, 0).unwrap());
        assert!(parse_due_input("someday", now()).is_none());
    }

    #[test]
    fn relative_due_formatting() {
        assert_eq!(format_due_relative(None, now()), "-");
        assert_eq!(format_due_relative(Some(now()), now()), "today");
        assert_eq!(format_due_relative(Some(now() + Duration::days(1)), now()), "tomorrow");
        assert_eq!(format_due_relative(Some(now() + Duration::days(4)), now()), "in 4d");
        assert_eq!(format_due_relative(Some(now() - Duration::days(2)), now()), "2d late");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
