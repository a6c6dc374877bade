//! Error types for every layer of the tracker.
//!
//! Each concern gets its own enum; `AppError` wraps them for the command
//! handlers so `main` has a single place to report failures.

use thiserror::Error;

use crate::task::TaskId;

/// Contract violations detected by the derivation engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    /// A View Selection value outside its enumerated domain.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    /// A task record that breaks a data-model invariant.
    #[error("invalid task record {id}: {reason}")]
    InvalidTask { id: TaskId, reason: String },
}

/// Failures of the owner-scoped document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Also returned for tasks that exist but belong to someone else.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("user not found")]
    UserNotFound,

    #[error("an account with email '{0}' already exists")]
    EmailTaken(String),

    #[error("invalid task: {0}")]
    Invalid(String),
}

/// Failures of the account and session layer.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("not logged in; run `tt login` first")]
    NotLoggedIn,

    #[error("session token is not recognised; please log in again")]
    InvalidToken,

    #[error("session expired; please log in again")]
    TokenExpired,

    #[error("{0}")]
    Validation(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("session file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures while loading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Top-level error returned by command handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_selection_display() {
        let err = ViewError::InvalidSelection("unknown sort key 'size'".into());
        assert_eq!(err.to_string(), "invalid selection: unknown sort key 'size'");
    }

    #[test]
    fn invalid_task_display_names_the_task() {
        let err = ViewError::InvalidTask {
            id: TaskId(7),
            reason: "title is empty".into(),
        };
        assert_eq!(err.to_string(), "invalid task record 7: title is empty");
    }

    #[test]
    fn store_error_wraps_into_app_error() {
        let err: AppError = StoreError::TaskNotFound(TaskId(3)).into();
        assert_eq!(err.to_string(), "task 3 not found");
    }

    #[test]
    fn io_error_converts_to_auth_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AuthError::from(io_err);
        assert!(matches!(err, AuthError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }
}
