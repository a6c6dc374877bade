//! Enumerations for TUI state management.

use crate::fields::{PriorityFilter, SortKey, StatusFilter};

/// Application state for the terminal user interface.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum AppState {
    TaskList,
    TaskDetail,
    AddTask,
    EditTask,
    Help,
    Confirm,
}

/// Selection values the dashboard steps through with a single key.
pub trait Cycle: Sized + Copy + PartialEq + 'static {
    const ORDER: &'static [Self];

    fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|v| *v == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }
}

impl Cycle for StatusFilter {
    const ORDER: &'static [Self] = &[StatusFilter::All, StatusFilter::Pending, StatusFilter::Completed];
}

impl Cycle for PriorityFilter {
    const ORDER: &'static [Self] = &[
        PriorityFilter::All,
        PriorityFilter::High,
        PriorityFilter::Medium,
        PriorityFilter::Low,
    ];
}

impl Cycle for SortKey {
    const ORDER: &'static [Self] = &[SortKey::DueDate, SortKey::Priority, SortKey::Title, SortKey::CreatedAt];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_wrap_around() {
        assert_eq!(StatusFilter::Completed.next(), StatusFilter::All);
        assert_eq!(PriorityFilter::All.next(), PriorityFilter::High);
        assert_eq!(SortKey::CreatedAt.next(), SortKey::DueDate);
        let mut s = SortKey::DueDate;
        for _ in 0..SortKey::ORDER.len() {
            s = s.next();
        }
        assert_eq!(s, SortKey::DueDate);
    }
}
