//! Sample data for trying the tracker out.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::auth::register;
use crate::db::{Database, TaskStore};
use crate::error::AppError;
use crate::fields::{Priority, Status};
use crate::task::{NewTask, TaskPatch, UserId};

pub const SAMPLE_NAME: &str = "Test User";
pub const SAMPLE_EMAIL: &str = "test@example.com";
pub const SAMPLE_PASSWORD: &str = "password123";

/// Wipe the store and recreate the sample account with three tasks whose
/// due dates are relative to `now`.
pub fn seed(db: &mut Database, now: DateTime<Utc>) -> Result<UserId, AppError> {
    db.clear();
    let owner = register(db, SAMPLE_NAME, SAMPLE_EMAIL, SAMPLE_PASSWORD, now)?;

    let samples = [
        (
            "Complete project proposal",
            "Finish the project proposal for the client meeting",
            Priority::High,
            Status::Pending,
            Duration::days(1),
            "Work",
        ),
        (
            "Schedule team meeting",
            "Set up a team meeting to discuss project timeline",
            Priority::Medium,
            Status::Completed,
            Duration::days(-1),
            "Work",
        ),
        (
            "Research new technologies",
            "Look into new frameworks for upcoming projects",
            Priority::Low,
            Status::Pending,
            Duration::days(2),
            "Study",
        ),
    ];

    for (title, description, priority, status, due_in, category) in samples {
        let draft = NewTask {
            title: title.into(),
            description: Some(description.into()),
            priority,
            due_date: Some(now + due_in),
            categories: vec![category.into()],
        };
        let task = db.create_task(owner, draft, now)?;
        if status != Status::Pending {
            let patch = TaskPatch {
                status: Some(status),
                ..TaskPatch::default()
            };
            db.update_task(owner, task.id, patch)?;
        }
    }
    info!(user = %owner, "sample data created");
    Ok(owner)
}

/// Remove every user, session and task.
pub fn destroy(db: &mut Database) {
    db.clear();
    info!("all data deleted");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{compute_view, ViewSelection};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn seeded_data_matches_the_worked_example() {
        let mut db = Database::default();
        let owner = seed(&mut db, now()).unwrap();
        let tasks = db.tasks_for(owner);
        let view = compute_view(&tasks, &ViewSelection::default(), now()).unwrap();
        let s = view.statistics;
        assert_eq!((s.total, s.completed, s.pending), (3, 1, 2));
        assert_eq!((s.due_soon, s.overdue), (2, 0));
        assert_eq!(s.completion_percentage, 33);
    }

    #[test]
    fn seeding_twice_replaces_previous_data() {
        let mut db = Database::default();
        seed(&mut db, now()).unwrap();
        let owner = seed(&mut db, now()).unwrap();
        assert_eq!(db.users.len(), 1);
        assert_eq!(db.tasks_for(owner).len(), 3);
        assert!(db.user(owner).unwrap().verify_password(SAMPLE_PASSWORD));
    }

    #[test]
    fn destroy_empties_the_store() {
        let mut db = Database::default();
        seed(&mut db, now()).unwrap();
        destroy(&mut db);
        assert!(db.users.is_empty() && db.tasks.is_empty() && db.sessions.is_empty());
    }
}
