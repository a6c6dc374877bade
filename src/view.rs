//! Task list derivation: filter, sort and aggregate.
//!
//! Everything here is a pure function of its arguments. The reference
//! instant `now` is always passed in, never read from the clock, so the
//! same inputs give the same visible list and statistics.
//!
//! Statistics are computed over the raw collection, not the filtered one,
//! so the summary always describes the owner's whole list.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::ViewError;
use crate::fields::{CategoryFilter, Priority, PriorityFilter, SortKey, Status, StatusFilter};
use crate::task::Task;

/// Width of the "due soon" window after `now`.
pub const DUE_SOON_WINDOW_DAYS: i64 = 3;

/// The user's current filter and sort choices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewSelection {
    pub status: StatusFilter,
    pub priority: PriorityFilter,
    pub category: CategoryFilter,
    pub sort: SortKey,
}

/// Summary counts over the raw collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high_priority: usize,
    pub medium_priority: usize,
    pub low_priority: usize,
    pub due_soon: usize,
    pub overdue: usize,
    pub completion_percentage: u8,
}

impl Statistics {
    /// Statistics are not shown at all for an empty list.
    pub fn is_displayable(&self) -> bool {
        self.total > 0
    }
}

/// Derived output: tasks in render order plus the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct View<'a> {
    pub visible: Vec<&'a Task>,
    pub statistics: Statistics,
}

/// Where a pending task stands relative to its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DueState {
    Overdue,
    DueSoon,
}

/// A pending task that needs attention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reminder<'a> {
    pub task: &'a Task,
    pub state: DueState,
}

/// Filter, sort and summarise `tasks` for one owner.
///
/// Fails with `InvalidTask` if a record breaks the data model (blank title,
/// duplicate categories, repeated id) and with `InvalidSelection` if the
/// category filter names a label no task carries.
pub fn compute_view<'a>(
    tasks: &'a [Task],
    selection: &ViewSelection,
    now: DateTime<Utc>,
) -> Result<View<'a>, ViewError> {
    validate_collection(tasks)?;
    validate_selection(selection, tasks)?;

    let mut visible = filter_tasks(tasks, selection);
    sort_tasks(&mut visible, selection.sort);

    Ok(View {
        visible,
        statistics: compute_statistics(tasks, now),
    })
}

/// Check every record and the uniqueness of ids.
pub fn validate_collection(tasks: &[Task]) -> Result<(), ViewError> {
    let mut ids = HashSet::with_capacity(tasks.len());
    for t in tasks {
        t.validate().map_err(|reason| ViewError::InvalidTask { id: t.id, reason })?;
        if !ids.insert(t.id) {
            return Err(ViewError::InvalidTask {
                id: t.id,
                reason: "id appears more than once".into(),
            });
        }
    }
    Ok(())
}

/// A category filter must name an observed facet.
pub fn validate_selection(selection: &ViewSelection, tasks: &[Task]) -> Result<(), ViewError> {
    if let CategoryFilter::Label(label) = &selection.category {
        let observed = tasks.iter().any(|t| t.categories.iter().any(|c| c == label));
        if !observed {
            return Err(ViewError::InvalidSelection(format!(
                "category '{label}' is not used by any task"
            )));
        }
    }
    Ok(())
}

/// Keep the tasks that pass all three filters, in input order.
pub fn filter_tasks<'a, I>(tasks: I, selection: &ViewSelection) -> Vec<&'a Task>
where
    I: IntoIterator<Item = &'a Task>,
{
    tasks
        .into_iter()
        .filter(|t| {
            selection.status.matches(t.status)
                && selection.priority.matches(t.priority)
                && selection.category.matches(&t.categories)
        })
        .collect()
}

/// Stable sort by the given key; equal keys keep their relative order.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    match key {
        SortKey::DueDate => tasks.sort_by(|a, b| compare_due(a.due_date, b.due_date)),
        SortKey::Priority => tasks.sort_by_key(|t| t.priority.rank()),
        SortKey::Title => tasks.sort_by(|a, b| compare_titles(&a.title, &b.title)),
        SortKey::CreatedAt => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
}

/// Ascending by due date; tasks without one go last.
fn compare_due(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Case-insensitive first, then lowercase before uppercase.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| b.cmp(a))
}

/// Classify a task against `now`. Completed tasks and tasks without a due
/// date are never due soon or overdue.
pub fn due_state(task: &Task, now: DateTime<Utc>) -> Option<DueState> {
    if task.status == Status::Completed {
        return None;
    }
    let due = task.due_date?;
    if due < now {
        Some(DueState::Overdue)
    } else if due > now && due <= now + Duration::days(DUE_SOON_WINDOW_DAYS) {
        Some(DueState::DueSoon)
    } else {
        None
    }
}

pub fn compute_statistics(tasks: &[Task], now: DateTime<Utc>) -> Statistics {
    let mut stats = Statistics {
        total: tasks.len(),
        ..Statistics::default()
    };

    for t in tasks {
        match t.status {
            Status::Completed => stats.completed += 1,
            Status::Pending => stats.pending += 1,
        }
        match t.priority {
            Priority::High => stats.high_priority += 1,
            Priority::Medium => stats.medium_priority += 1,
            Priority::Low => stats.low_priority += 1,
        }
        match due_state(t, now) {
            Some(DueState::DueSoon) => stats.due_soon += 1,
            Some(DueState::Overdue) => stats.overdue += 1,
            None => {}
        }
    }

    stats.completion_percentage = completion_percentage(stats.completed, stats.total);
    stats
}

fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Every category label in the collection, deduplicated and sorted.
pub fn available_categories(tasks: &[Task]) -> Vec<String> {
    tasks
        .iter()
        .flat_map(|t| t.categories.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Labels to offer while editing a task's categories: the configured seed
/// list in its own order, then labels seen in the data, minus the ones the
/// task already has.
pub fn category_suggestions(seed: &[String], tasks: &[Task], selected: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let observed = available_categories(tasks);
    for label in seed.iter().chain(observed.iter()) {
        if selected.contains(label) || out.contains(label) {
            continue;
        }
        out.push(label.clone());
    }
    out
}

/// Pending tasks that are overdue or due soon, earliest due first.
pub fn reminders(tasks: &[Task], now: DateTime<Utc>) -> Vec<Reminder<'_>> {
    let mut out: Vec<Reminder<'_>> = tasks
        .iter()
        .filter_map(|task| due_state(task, now).map(|state| Reminder { task, state }))
        .collect();
    out.sort_by(|a, b| compare_due(a.task.due_date, b.task.due_date));
    out
}
