//! Enumerations and field types for tasks and views.
//!
//! Task fields (status, priority) and the View Selection vocabulary (filters
//! and sort keys). Parsing from free text fails fast with
//! `ViewError::InvalidSelection` instead of defaulting.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::ViewError;

/// Task completion status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Pending,
    Completed,
}

impl Status {
    /// The other status. Toggling is the only status transition.
    pub fn toggled(self) -> Self {
        match self {
            Status::Pending => Status::Completed,
            Status::Completed => Status::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
        }
    }
}

/// Priority classification for task importance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Severity rank used for sorting: high(1) < medium(2) < low(3).
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

/// Available sorting options for the visible task list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    DueDate,
    Priority,
    Title,
    CreatedAt,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::DueDate => "dueDate",
            SortKey::Priority => "priority",
            SortKey::Title => "title",
            SortKey::CreatedAt => "createdAt",
        }
    }
}

/// Status filter of a View Selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Pending => status == Status::Pending,
            StatusFilter::Completed => status == Status::Completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Pending => "pending",
            StatusFilter::Completed => "completed",
        }
    }
}

/// Priority filter of a View Selection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityFilter {
    #[default]
    All,
    Low,
    Medium,
    High,
}

impl PriorityFilter {
    pub fn matches(self, priority: Priority) -> bool {
        match self {
            PriorityFilter::All => true,
            PriorityFilter::Low => priority == Priority::Low,
            PriorityFilter::Medium => priority == Priority::Medium,
            PriorityFilter::High => priority == Priority::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PriorityFilter::All => "all",
            PriorityFilter::Low => "low",
            PriorityFilter::Medium => "medium",
            PriorityFilter::High => "high",
        }
    }
}

/// Category filter of a View Selection: everything, or one facet label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Label(String),
}

impl CategoryFilter {
    /// Membership test against a task's categories (exact, case-sensitive).
    pub fn matches(&self, categories: &[String]) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Label(label) => categories.iter().any(|c| c == label),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Label(label) => f.write_str(label),
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(CategoryFilter::All)
        } else if s.trim().is_empty() {
            Err(ViewError::InvalidSelection("category filter is empty".into()))
        } else {
            Ok(CategoryFilter::Label(s.to_string()))
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "pending" => Ok(StatusFilter::Pending),
            "completed" => Ok(StatusFilter::Completed),
            other => Err(ViewError::InvalidSelection(format!(
                "unknown status filter '{other}'"
            ))),
        }
    }
}

impl FromStr for PriorityFilter {
    type Err = ViewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(PriorityFilter::All),
            "low" => Ok(PriorityFilter::Low),
            "medium" => Ok(PriorityFilter::Medium),
            "high" => Ok(PriorityFilter::High),
            other => Err(ViewError::InvalidSelection(format!(
                "unknown priority filter '{other}'"
            ))),
        }
    }
}

impl FromStr for SortKey {
    type Err = ViewError;

    /// Accepts both the camelCase names and the CLI's kebab-case spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dueDate" | "due-date" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            "title" => Ok(SortKey::Title),
            "createdAt" | "created-at" => Ok(SortKey::CreatedAt),
            other => Err(ViewError::InvalidSelection(format!(
                "unknown sort key '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn toggling_twice_is_identity() {
        for s in [Status::Pending, Status::Completed] {
            assert_ne!(s.toggled(), s);
            assert_eq!(s.toggled().toggled(), s);
        }
    }

    #[test]
    fn priority_rank_puts_high_first() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[rstest]
    #[case("dueDate", SortKey::DueDate)]
    #[case("due-date", SortKey::DueDate)]
    #[case("priority", SortKey::Priority)]
    #[case("title", SortKey::Title)]
    #[case("createdAt", SortKey::CreatedAt)]
    #[case("created-at", SortKey::CreatedAt)]
    fn sort_key_parses(#[case] input: &str, #[case] expected: SortKey) {
        assert_eq!(input.parse::<SortKey>().unwrap(), expected);
    }

    #[rstest]
    #[case("size")]
    #[case("DueDate")]
    #[case("")]
    fn unknown_sort_key_is_rejected(#[case] input: &str) {
        assert!(matches!(
            input.parse::<SortKey>(),
            Err(ViewError::InvalidSelection(_))
        ));
    }

    #[test]
    fn status_and_priority_filters_fail_fast() {
        assert!("done".parse::<StatusFilter>().is_err());
        assert!("urgent".parse::<PriorityFilter>().is_err());
        assert_eq!("pending".parse::<StatusFilter>().unwrap(), StatusFilter::Pending);
        assert_eq!("high".parse::<PriorityFilter>().unwrap(), PriorityFilter::High);
    }

    #[test]
    fn category_filter_parsing() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "Work".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Label("Work".into())
        );
        assert!("   ".parse::<CategoryFilter>().is_err());
    }

    #[test]
    fn category_filter_is_membership_not_substring() {
        let cats = vec!["Workshop".to_string(), "Home".to_string()];
        assert!(!CategoryFilter::Label("Work".into()).matches(&cats));
        assert!(CategoryFilter::Label("Home".into()).matches(&cats));
        assert!(!CategoryFilter::Label("home".into()).matches(&cats));
        assert!(CategoryFilter::All.matches(&[]));
    }

    #[test]
    fn sort_key_serializes_camel_case() {
        let json = serde_json::to_string(&SortKey::CreatedAt).unwrap();
        assert_eq!(json, "\"createdAt\"");
        assert_eq!(SortKey::CreatedAt.as_str(), "createdAt");
    }
}
