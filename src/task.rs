//! Task data structure and related functionality.
//!
//! This module defines the `Task` record, the identifiers that key it, and
//! the draft/patch types the store accepts for create and edit.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{Priority, Status};

/// Opaque task identifier, unique within the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of the user that owns a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A unit of work tracked for exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub owner: UserId,
}

impl Task {
    /// Check the record-level invariants: non-empty title and no duplicate
    /// category labels (case-sensitive).
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title is empty".into());
        }
        let mut seen = HashSet::new();
        for c in &self.categories {
            if !seen.insert(c.as_str()) {
                return Err(format!("duplicate category '{c}'"));
            }
        }
        Ok(())
    }

    /// Flip the status between pending and completed.
    pub fn toggle(&mut self) {
        self.status = self.status.toggled();
    }
}

/// Field values for a task about to be created.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
}

/// Partial edit of a task. `None` leaves a field untouched; the nested
/// options on `description`/`due_date` allow clearing.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub categories: Option<Vec<String>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.categories.is_none()
    }
}

/// Trim labels, drop empty ones and remove duplicates keeping the first
/// occurrence. Order is otherwise preserved.
pub fn normalise_categories<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in labels {
        let label = raw.as_ref().trim();
        if label.is_empty() || out.iter().any(|c| c == label) {
            continue;
        }
        out.push(label.to_string());
    }
    out
}

/// Split comma-separated category arguments and normalise them.
pub fn split_categories(inputs: &[String]) -> Vec<String> {
    normalise_categories(inputs.iter().flat_map(|raw| raw.split(',')))
}

/// Trim optional free text, mapping blank input to `None`.
pub fn clean_text(s: Option<String>) -> Option<String> {
    s.map(|d| d.trim().to_string()).filter(|d| !d.is_empty())
}
