//! Accounts, bearer-token sessions and the local session file.
//!
//! Passwords are stored as argon2id PHC strings. Login issues a random
//! token; the store keeps only the digest of that token, and the raw value
//! lives in `<home>/session.json` (mode 0600) on the client side.

use std::path::{Path, PathBuf};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::db::Database;
use crate::error::{AuthError, StoreError};
use crate::fields::{SortKey, StatusFilter};
use crate::task::UserId;

/// Session file name inside the data directory.
const SESSION_FILE_NAME: &str = "session.json";

pub const MIN_PASSWORD_LEN: usize = 6;

/// Per-user defaults for the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub default_view: StatusFilter,
    pub default_sort: SortKey,
    pub task_reminders: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            default_view: StatusFilter::All,
            default_sort: SortKey::DueDate,
            task_reminders: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    /// argon2id hash in PHC format; the salt and cost are embedded.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub preferences: Preferences,
}

impl User {
    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

/// Server-side record of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token_digest: String,
    pub user: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// What the caller gets back from a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub user: UserId,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Requested profile changes. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub new_password: Option<String>,
    pub current_password: Option<String>,
    pub preferences: Option<Preferences>,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

fn token_digest(token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(token.as_bytes()))
}

fn new_token() -> String {
    let bytes: [u8; 32] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn clean_name(name: &str) -> Result<String, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::Validation("name must not be empty".into()));
    }
    Ok(name.to_string())
}

fn clean_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::Validation(format!("'{email}' is not a valid email address"))),
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Create an account. Emails are unique, compared case-insensitively.
pub fn register(
    db: &mut Database,
    name: &str,
    email: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<UserId, AuthError> {
    let name = clean_name(name)?;
    let email = clean_email(email)?;
    check_password(password)?;
    if db.user_by_email(&email).is_some() {
        return Err(StoreError::EmailTaken(email).into());
    }

    let password_hash = hash_password(password)?;
    let id = db.next_user_id();
    db.users.push(User {
        id,
        name,
        password_hash,
        email,
        created_at: now,
        preferences: Preferences::default(),
    });
    info!(user = %id, "account registered");
    Ok(id)
}

/// Verify credentials and issue a bearer token valid for `ttl`.
pub fn login(
    db: &mut Database,
    email: &str,
    password: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<IssuedToken, AuthError> {
    let user = db
        .user_by_email(email)
        .filter(|u| u.verify_password(password))
        .ok_or(AuthError::InvalidCredentials)?;
    let (user_id, email) = (user.id, user.email.clone());

    let token = new_token();
    let expires_at = now + ttl;
    db.sessions.push(Session {
        token_digest: token_digest(&token),
        user: user_id,
        created_at: now,
        expires_at,
    });
    info!(user = %user_id, %expires_at, "session issued");
    Ok(IssuedToken {
        token,
        user: user_id,
        email,
        expires_at,
    })
}

/// Resolve a bearer token to its user. Expired sessions are purged.
pub fn authenticate(db: &mut Database, token: &str, now: DateTime<Utc>) -> Result<UserId, AuthError> {
    let digest = token_digest(token);
    let session = db
        .sessions
        .iter()
        .find(|s| s.token_digest == digest)
        .cloned()
        .ok_or(AuthError::InvalidToken)?;

    let before = db.sessions.len();
    db.sessions.retain(|s| s.expires_at > now);
    if db.sessions.len() != before {
        debug!(purged = before - db.sessions.len(), "expired sessions removed");
    }

    if session.expires_at <= now {
        warn!(user = %session.user, "session expired");
        return Err(AuthError::TokenExpired);
    }
    if db.user(session.user).is_none() {
        return Err(AuthError::InvalidToken);
    }
    Ok(session.user)
}

/// Revoke a token. Returns whether a session was removed.
pub fn logout(db: &mut Database, token: &str) -> bool {
    let digest = token_digest(token);
    let before = db.sessions.len();
    db.sessions.retain(|s| s.token_digest != digest);
    let removed = db.sessions.len() != before;
    if removed {
        info!("session revoked");
    }
    removed
}

/// Apply profile changes. A password change needs the current password.
pub fn update_profile(db: &mut Database, id: UserId, update: ProfileUpdate) -> Result<(), AuthError> {
    let name = update.name.as_deref().map(clean_name).transpose()?;
    let email = update.email.as_deref().map(clean_email).transpose()?;
    if let Some(email) = &email {
        if db.user_by_email(email).is_some_and(|u| u.id != id) {
            return Err(StoreError::EmailTaken(email.clone()).into());
        }
    }

    let user = db.user_mut(id).ok_or(StoreError::UserNotFound)?;
    if let Some(new_password) = &update.new_password {
        let current = update.current_password.as_deref().unwrap_or_default();
        if !user.verify_password(current) {
            return Err(AuthError::Validation("current password is incorrect".into()));
        }
        check_password(new_password)?;
        user.password_hash = hash_password(new_password)?;
    }
    if let Some(name) = name {
        user.name = name;
    }
    if let Some(email) = email {
        user.email = email;
    }
    if let Some(preferences) = update.preferences {
        user.preferences = preferences;
    }
    info!(user = %id, "profile updated");
    Ok(())
}

/// Get the session file path under the given data directory.
pub fn session_file_path(home: &Path) -> PathBuf {
    home.join(SESSION_FILE_NAME)
}

/// Write the client-side token holder with 0600 permissions.
pub fn save_session(path: &Path, issued: &IssuedToken) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(issued)?;
    std::fs::write(path, json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

/// Read the token holder. A missing file means nobody is logged in.
pub fn load_session(path: &Path) -> Result<Option<IssuedToken>, AuthError> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&data)?))
}

pub fn clear_session(path: &Path) -> Result<(), AuthError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
