//! View state: the owner's task snapshot plus the current selection.
//!
//! The controller is the only place that mutates either input of the
//! derivation engine. Every change goes through [`ViewController::dispatch`]
//! or one of the selection setters and is followed by a synchronous
//! recompute, so readers never see a visible list that was derived from a
//! different snapshot than the one held.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::ViewError;
use crate::fields::{CategoryFilter, PriorityFilter, SortKey, StatusFilter};
use crate::task::{Task, TaskId};
use crate::view::{self, compute_view, Reminder, Statistics, ViewSelection};

/// Changes to the raw collection reported by the store layer.
#[derive(Debug, Clone)]
pub enum TaskAction {
    Loaded(Vec<Task>),
    Added(Task),
    Updated(Task),
    Deleted(TaskId),
}

#[derive(Debug, Clone)]
pub struct ViewController {
    tasks: Vec<Task>,
    selection: ViewSelection,
    seed_categories: Vec<String>,
    now: DateTime<Utc>,
    visible_ids: Vec<TaskId>,
    statistics: Statistics,
    categories: Vec<String>,
}

impl ViewController {
    pub fn new(selection: ViewSelection, seed_categories: Vec<String>, now: DateTime<Utc>) -> Self {
        Self {
            tasks: Vec::new(),
            selection,
            seed_categories,
            now,
            visible_ids: Vec::new(),
            statistics: Statistics::default(),
            categories: Vec::new(),
        }
    }

    /// Apply a collection change and recompute.
    ///
    /// The new snapshot is derived before it replaces the old one: if the
    /// derivation rejects it, the controller keeps its previous state.
    pub fn dispatch(&mut self, action: TaskAction) -> Result<(), ViewError> {
        let mut next = self.tasks.clone();
        match action {
            TaskAction::Loaded(tasks) => next = tasks,
            TaskAction::Added(task) => next.push(task),
            TaskAction::Updated(task) => {
                if let Some(slot) = next.iter_mut().find(|t| t.id == task.id) {
                    *slot = task;
                } else {
                    next.push(task);
                }
            }
            TaskAction::Deleted(id) => next.retain(|t| t.id != id),
        }
        self.commit(next, self.selection.clone())
    }

    pub fn set_status_filter(&mut self, status: StatusFilter) -> Result<(), ViewError> {
        let selection = ViewSelection {
            status,
            ..self.selection.clone()
        };
        self.commit(self.tasks.clone(), selection)
    }

    pub fn set_priority_filter(&mut self, priority: PriorityFilter) -> Result<(), ViewError> {
        let selection = ViewSelection {
            priority,
            ..self.selection.clone()
        };
        self.commit(self.tasks.clone(), selection)
    }

    /// Unlike the stale-label reset after a collection change, choosing a
    /// label that no task carries is rejected.
    pub fn set_category_filter(&mut self, category: CategoryFilter) -> Result<(), ViewError> {
        let selection = ViewSelection {
            category,
            ..self.selection.clone()
        };
        view::validate_selection(&selection, &self.tasks)?;
        self.commit(self.tasks.clone(), selection)
    }

    pub fn set_sort(&mut self, sort: SortKey) -> Result<(), ViewError> {
        let selection = ViewSelection {
            sort,
            ..self.selection.clone()
        };
        self.commit(self.tasks.clone(), selection)
    }

    /// Move the reference instant forward and recompute the due counts.
    pub fn refresh(&mut self, now: DateTime<Utc>) -> Result<(), ViewError> {
        self.now = now;
        self.commit(self.tasks.clone(), self.selection.clone())
    }

    fn commit(&mut self, tasks: Vec<Task>, mut selection: ViewSelection) -> Result<(), ViewError> {
        if let CategoryFilter::Label(label) = &selection.category {
            if !tasks.iter().any(|t| t.categories.contains(label)) {
                warn!(category = %label, "category filter no longer matches any task, resetting");
                selection.category = CategoryFilter::All;
            }
        }

        let derived = compute_view(&tasks, &selection, self.now)?;
        let visible_ids = derived.visible.iter().map(|t| t.id).collect();
        let statistics = derived.statistics;
        let categories = view::available_categories(&tasks);

        self.tasks = tasks;
        self.selection = selection;
        self.visible_ids = visible_ids;
        self.statistics = statistics;
        self.categories = categories;
        debug!(
            total = self.statistics.total,
            visible = self.visible_ids.len(),
            "view recomputed"
        );
        Ok(())
    }

    /// Visible tasks in render order.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.visible_ids
            .iter()
            .filter_map(|id| self.tasks.iter().find(|t| t.id == *id))
            .collect()
    }

    pub fn visible_len(&self) -> usize {
        self.visible_ids.len()
    }

    pub fn visible_at(&self, index: usize) -> Option<&Task> {
        let id = self.visible_ids.get(index)?;
        self.tasks.iter().find(|t| t.id == *id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn selection(&self) -> &ViewSelection {
        &self.selection
    }

    /// Facet labels observed in the current snapshot.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Suggestions for a task editor that already carries `selected`.
    pub fn category_suggestions(&self, selected: &[String]) -> Vec<String> {
        view::category_suggestions(&self.seed_categories, &self.tasks, selected)
    }

    pub fn reminders(&self) -> Vec<Reminder<'_>> {
        view::reminders(&self.tasks, self.now)
    }
}
