//! Command implementations for the CLI interface.
//!
//! Each subcommand maps to one `cmd_*` handler. Handlers share a
//! [`Context`] holding the data directory, configuration and the loaded
//! store, and return `AppError` instead of exiting so `main` can report
//! failures in one place.

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};
use serde_json::json;
use tracing::{debug, warn};

use crate::auth::{self, Preferences, ProfileUpdate};
use crate::config::Config;
use crate::db::*;
use crate::error::{AppError, AuthError};
use crate::fields::*;
use crate::seed;
use crate::task::{split_categories, NewTask, TaskId, TaskPatch, UserId};
use crate::tui::run::run_tui;
use crate::view::{self, compute_view, DueState, Reminder, ViewSelection};

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and log in.
    Register {
        /// Display name.
        name: String,
        /// Email address, used to log in.
        email: String,
        /// Password (at least 6 characters). Prompted for when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Log in and store the session token locally.
    Login {
        email: String,
        /// Prompted for when omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Revoke the current session.
    Logout,

    /// Show the logged-in user.
    Whoami,

    /// Show or change profile details and list preferences.
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// New password. The current one is prompted for unless
        /// --current-password is given.
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        current_password: Option<String>,
        /// Prompt for the current and new password.
        #[arg(long, conflicts_with = "password")]
        change_password: bool,
        /// Status filter applied when `list` is run without --status.
        #[arg(long, value_enum)]
        default_view: Option<StatusFilter>,
        /// Sort key applied when `list` is run without --sort.
        #[arg(long, value_enum)]
        default_sort: Option<SortKey>,
        /// Show due and overdue reminders after listing tasks.
        #[arg(long)]
        reminders: Option<bool>,
    },

    /// Add a new task.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Due date: YYYY-MM-DD, "YYYY-MM-DD HH:MM", "today", "friday", "in 3d", ...
        #[arg(long)]
        due: Option<String>,
        /// Comma-separated categories. May be repeated.
        #[arg(long = "category")]
        categories: Vec<String>,
    },

    /// List tasks through the current filters and sort order.
    List {
        /// Status filter. Defaults to the profile preference.
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        #[arg(long, value_enum, default_value_t = PriorityFilter::All)]
        priority: PriorityFilter,
        /// Category label, or "all".
        #[arg(long, default_value = "all")]
        category: String,
        /// Sort key. Defaults to the profile preference.
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
        /// Print the visible tasks and statistics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// View a single task.
    View {
        id: u64,
        #[arg(long)]
        json: bool,
    },

    /// Change fields on a task.
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, conflicts_with = "desc")]
        clear_desc: bool,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
        /// Replace all categories. May be repeated and comma-separated.
        #[arg(long = "category")]
        categories: Vec<String>,
        /// Add categories. May be repeated and comma-separated.
        #[arg(long = "add-category")]
        add_categories: Vec<String>,
        /// Remove categories. May be repeated and comma-separated.
        #[arg(long = "rm-category")]
        rm_categories: Vec<String>,
    },

    /// Flip a task between pending and completed.
    Toggle { id: u64 },

    /// Delete a task.
    Delete { id: u64 },

    /// List categories in use with task counts.
    Categories {
        /// Show the suggestion list offered when adding categories instead.
        #[arg(long)]
        suggest: bool,
    },

    /// Show completion and due-date statistics.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Launch the interactive dashboard.
    Ui,

    /// Replace all data with a sample account and tasks.
    Seed {
        /// Delete everything instead.
        #[arg(long)]
        destroy: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// State shared by the command handlers.
pub struct Context {
    pub home: PathBuf,
    pub config: Config,
    pub db: Database,
    pub now: DateTime<Utc>,
}

impl Context {
    /// Load the store under `home`.
    pub fn open(home: PathBuf, config: Config, now: DateTime<Utc>) -> Result<Self, AppError> {
        std::fs::create_dir_all(&home)?;
        let db = Database::load(&home.join(STORE_FILE_NAME))?;
        Ok(Self { home, config, db, now })
    }

    pub fn store_path(&self) -> PathBuf {
        self.home.join(STORE_FILE_NAME)
    }

    pub fn session_path(&self) -> PathBuf {
        auth::session_file_path(&self.home)
    }

    pub fn save(&self) -> Result<(), AppError> {
        self.db.save(&self.store_path())?;
        Ok(())
    }

    /// Resolve the stored token to a user. A rejected token removes the
    /// local session file; purged sessions are written back either way.
    pub fn require_session(&mut self) -> Result<UserId, AppError> {
        let session_path = self.session_path();
        let issued = auth::load_session(&session_path)?.ok_or(AuthError::NotLoggedIn)?;
        let before = self.db.sessions.len();
        let result = auth::authenticate(&mut self.db, &issued.token, self.now);
        if self.db.sessions.len() != before {
            self.save()?;
        }
        match result {
            Ok(user) => Ok(user),
            Err(e) => {
                auth::clear_session(&session_path)?;
                Err(e.into())
            }
        }
    }

    fn preferences(&self, user: UserId) -> Preferences {
        self.db.user(user).map(|u| u.preferences).unwrap_or_default()
    }
}

/// Run one subcommand. `completions` is handled by the caller since it
/// needs no data directory.
pub fn dispatch(ctx: Context, command: Commands) -> Result<(), AppError> {
    let mut ctx = ctx;
    match command {
        Commands::Register { name, email, password } => {
            let password = read_password(password, "Password: ")?;
            cmd_register(&mut ctx, &name, &email, &password)
        }
        Commands::Login { email, password } => {
            let password = read_password(password, "Password: ")?;
            cmd_login(&mut ctx, &email, &password)
        }
        Commands::Logout => cmd_logout(&mut ctx),
        Commands::Whoami => cmd_whoami(&mut ctx),
        Commands::Profile {
            name, email, password, current_password, change_password, default_view, default_sort, reminders,
        } => {
            let wants_new = change_password || password.is_some();
            let current_password = match current_password {
                None if wants_new => Some(read_password(None, "Current password: ")?),
                other => other,
            };
            let password = match password {
                None if change_password => Some(read_password(None, "New password: ")?),
                other => other,
            };
            cmd_profile(
                &mut ctx, name, email, password, current_password, default_view, default_sort, reminders,
            )
        }
        Commands::Add { title, desc, priority, due, categories } =>
            cmd_add(&mut ctx, title, desc, priority, due, categories),
        Commands::List { status, priority, category, sort, json } =>
            cmd_list(&mut ctx, status, priority, &category, sort, json),
        Commands::View { id, json } => cmd_view(&mut ctx, TaskId(id), json),
        Commands::Edit {
            id, title, desc, clear_desc, priority, status, due, clear_due,
            categories, add_categories, rm_categories,
        } => cmd_edit(
            &mut ctx, TaskId(id), title, desc, clear_desc, priority, status, due, clear_due,
            categories, add_categories, rm_categories,
        ),
        Commands::Toggle { id } => cmd_toggle(&mut ctx, TaskId(id)),
        Commands::Delete { id } => cmd_delete(&mut ctx, TaskId(id)),
        Commands::Categories { suggest } => cmd_categories(&mut ctx, suggest),
        Commands::Stats { json } => cmd_stats(&mut ctx, json),
        Commands::Ui => cmd_ui(ctx),
        Commands::Seed { destroy } => cmd_seed(&mut ctx, destroy),
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Use the flag value if given, otherwise prompt without echo. Piped
/// input is read as one line.
fn read_password(flag: Option<String>, prompt: &str) -> Result<String, AppError> {
    if let Some(password) = flag {
        warn!("password passed on the command line; omit --password to be prompted");
        return Ok(password);
    }
    if std::io::stdin().is_terminal() {
        return Ok(rpassword::prompt_password(prompt)?);
    }
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Create an account and immediately log it in.
pub fn cmd_register(ctx: &mut Context, name: &str, email: &str, password: &str) -> Result<(), AppError> {
    let id = auth::register(&mut ctx.db, name, email, password, ctx.now)?;
    let issued = auth::login(&mut ctx.db, email, password, ctx.config.token_ttl(), ctx.now)?;
    ctx.save()?;
    auth::save_session(&ctx.session_path(), &issued)?;
    println!("Registered and logged in as {} (user {id}).", issued.email);
    Ok(())
}

pub fn cmd_login(ctx: &mut Context, email: &str, password: &str) -> Result<(), AppError> {
    let issued = auth::login(&mut ctx.db, email, password, ctx.config.token_ttl(), ctx.now)?;
    ctx.save()?;
    auth::save_session(&ctx.session_path(), &issued)?;
    println!(
        "Logged in as {}. Session expires {}.",
        issued.email,
        issued.expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

pub fn cmd_logout(ctx: &mut Context) -> Result<(), AppError> {
    let path = ctx.session_path();
    match auth::load_session(&path)? {
        Some(issued) => {
            if auth::logout(&mut ctx.db, &issued.token) {
                ctx.save()?;
            }
            auth::clear_session(&path)?;
            println!("Logged out.");
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

pub fn cmd_whoami(ctx: &mut Context) -> Result<(), AppError> {
    let id = ctx.require_session()?;
    let user = ctx.db.user(id).ok_or(AuthError::InvalidToken)?;
    println!("{} <{}> (user {})", user.name, user.email, user.id);
    Ok(())
}

/// Print the profile, or apply the requested changes.
#[allow(clippy::too_many_arguments)]
pub fn cmd_profile(
    ctx: &mut Context,
    name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    current_password: Option<String>,
    default_view: Option<StatusFilter>,
    default_sort: Option<SortKey>,
    reminders: Option<bool>,
) -> Result<(), AppError> {
    let id = ctx.require_session()?;
    let mut preferences = ctx.preferences(id);
    let prefs_changed = default_view.is_some() || default_sort.is_some() || reminders.is_some();
    if let Some(v) = default_view {
        preferences.default_view = v;
    }
    if let Some(s) = default_sort {
        preferences.default_sort = s;
    }
    if let Some(r) = reminders {
        preferences.task_reminders = r;
    }

    let update = ProfileUpdate {
        name,
        email,
        new_password: password,
        current_password,
        preferences: prefs_changed.then_some(preferences),
    };
    let changed = update.name.is_some()
        || update.email.is_some()
        || update.new_password.is_some()
        || update.preferences.is_some();
    if changed {
        auth::update_profile(&mut ctx.db, id, update)?;
        ctx.save()?;
        println!("Profile updated.");
    }

    let user = ctx.db.user(id).ok_or(AuthError::InvalidToken)?;
    println!("Name:         {}", user.name);
    println!("Email:        {}", user.email);
    println!("Member since: {}", user.created_at.format("%Y-%m-%d"));
    println!("Default view: {}", user.preferences.default_view.as_str());
    println!("Default sort: {}", user.preferences.default_sort.as_str());
    println!("Reminders:    {}", if user.preferences.task_reminders { "on" } else { "off" });
    Ok(())
}

fn parse_due(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, AppError> {
    parse_due_input(input, now).ok_or_else(|| AppError::Usage(format!("could not understand due date '{input}'")))
}

/// Add a new task for the logged-in user.
pub fn cmd_add(
    ctx: &mut Context,
    title: String,
    desc: Option<String>,
    priority: Priority,
    due: Option<String>,
    categories: Vec<String>,
) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    let due_date = due.as_deref().map(|d| parse_due(d, ctx.now)).transpose()?;
    let draft = NewTask {
        title,
        description: desc,
        priority,
        due_date,
        categories: split_categories(&categories),
    };
    let task = ctx.db.create_task(owner, draft, ctx.now)?;
    ctx.save()?;
    println!("Added task {}: {}", task.id, task.title);
    Ok(())
}

/// List tasks through the derivation engine.
pub fn cmd_list(
    ctx: &mut Context,
    status: Option<StatusFilter>,
    priority: PriorityFilter,
    category: &str,
    sort: Option<SortKey>,
    json: bool,
) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    let prefs = ctx.preferences(owner);
    let selection = ViewSelection {
        status: status.unwrap_or(prefs.default_view),
        priority,
        category: category.parse()?,
        sort: sort.unwrap_or(prefs.default_sort),
    };
    debug!(?selection, "listing tasks");

    let tasks = ctx.db.tasks_for(owner);
    let derived = compute_view(&tasks, &selection, ctx.now)?;

    if json {
        let out = json!({
            "tasks": derived.visible,
            "statistics": derived.statistics,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if derived.visible.is_empty() {
        println!("No tasks found.");
    } else {
        print_table(&derived.visible, ctx.now);
    }
    if prefs.task_reminders {
        print_reminders(&view::reminders(&tasks, ctx.now), ctx.now);
    }
    Ok(())
}

fn print_reminders(reminders: &[Reminder<'_>], now: DateTime<Utc>) {
    if reminders.is_empty() {
        return;
    }
    println!();
    println!("Reminders:");
    for r in reminders {
        let label = match r.state {
            DueState::Overdue => "overdue ",
            DueState::DueSoon => "due soon",
        };
        println!(
            "  {label}  #{} {} ({})",
            r.task.id,
            truncate(&r.task.title, 50),
            format_due_relative(r.task.due_date, now)
        );
    }
}

pub fn cmd_view(ctx: &mut Context, id: TaskId, json: bool) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    let task = ctx.db.task(owner, id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(task)?);
        return Ok(());
    }
    println!("ID:           {}", task.id);
    println!("Title:        {}", task.title);
    println!("Status:       {}", format_status(task.status));
    println!("Priority:     {}", format_priority(task.priority));
    println!(
        "Due:          {}",
        match task.due_date {
            Some(_) => format!("{} ({})", format_due(task.due_date), format_due_relative(task.due_date, ctx.now)),
            None => "-".into(),
        }
    );
    println!(
        "Categories:   {}",
        if task.categories.is_empty() { "-".into() } else { task.categories.join(", ") }
    );
    println!("Created UTC:  {}", task.created_at.to_rfc3339());
    println!("Description:\n{}", task.description.as_deref().unwrap_or("-"));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_edit(
    ctx: &mut Context,
    id: TaskId,
    title: Option<String>,
    desc: Option<String>,
    clear_desc: bool,
    priority: Option<Priority>,
    status: Option<Status>,
    due: Option<String>,
    clear_due: bool,
    categories: Vec<String>,
    add_categories: Vec<String>,
    rm_categories: Vec<String>,
) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    let current = ctx.db.task(owner, id)?.categories.clone();

    let new_categories = if !categories.is_empty() || !add_categories.is_empty() || !rm_categories.is_empty() {
        let mut cats = if categories.is_empty() { current } else { split_categories(&categories) };
        cats.extend(split_categories(&add_categories));
        let remove = split_categories(&rm_categories);
        cats.retain(|c| !remove.contains(c));
        Some(cats)
    } else {
        None
    };

    let due_date = if clear_due {
        Some(None)
    } else {
        due.as_deref().map(|d| parse_due(d, ctx.now)).transpose()?.map(Some)
    };

    let patch = TaskPatch {
        title,
        description: if clear_desc { Some(None) } else { desc.map(Some) },
        status,
        priority,
        due_date,
        categories: new_categories,
    };
    if patch.is_empty() {
        return Err(AppError::Usage("nothing to change; pass at least one field flag".into()));
    }
    let task = ctx.db.update_task(owner, id, patch)?;
    ctx.save()?;
    println!("Updated task {}: {}", task.id, task.title);
    Ok(())
}

pub fn cmd_toggle(ctx: &mut Context, id: TaskId) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    let task = ctx.db.toggle_task(owner, id)?;
    ctx.save()?;
    println!("Task {} is now {}.", task.id, task.status.as_str());
    Ok(())
}

pub fn cmd_delete(ctx: &mut Context, id: TaskId) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    ctx.db.delete_task(owner, id)?;
    ctx.save()?;
    println!("Deleted task {id}.");
    Ok(())
}

/// Print category labels with counts, or the suggestion list.
pub fn cmd_categories(ctx: &mut Context, suggest: bool) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    let tasks = ctx.db.tasks_for(owner);
    if suggest {
        for label in view::category_suggestions(&ctx.config.category_suggestions, &tasks, &[]) {
            println!("{label}");
        }
        return Ok(());
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in &tasks {
        for c in &t.categories {
            *counts.entry(c.as_str()).or_default() += 1;
        }
    }
    if counts.is_empty() {
        println!("No categories in use.");
        return Ok(());
    }
    println!("{:<20} {}", "Category", "Count");
    for label in view::available_categories(&tasks) {
        let n = counts.get(label.as_str()).copied().unwrap_or(0);
        println!("{:<20} {}", truncate(&label, 20), n);
    }
    Ok(())
}

pub fn cmd_stats(ctx: &mut Context, json: bool) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    let tasks = ctx.db.tasks_for(owner);
    view::validate_collection(&tasks)?;
    let stats = view::compute_statistics(&tasks, ctx.now);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if stats.is_displayable() {
        print_statistics(&stats);
    } else {
        println!("No tasks yet.");
    }
    Ok(())
}

/// Launch the terminal user interface.
pub fn cmd_ui(mut ctx: Context) -> Result<(), AppError> {
    let owner = ctx.require_session()?;
    run_tui(ctx, owner)
}

pub fn cmd_seed(ctx: &mut Context, destroy: bool) -> Result<(), AppError> {
    if destroy {
        seed::destroy(&mut ctx.db);
        ctx.save()?;
        auth::clear_session(&ctx.session_path())?;
        println!("All data deleted.");
        return Ok(());
    }
    seed::seed(&mut ctx.db, ctx.now)?;
    ctx.save()?;
    if let Err(e) = auth::clear_session(&ctx.session_path()) {
        warn!("could not remove stale session file: {e}");
    }
    println!(
        "Sample data created. Log in with: tt login {} (password: {})",
        seed::SAMPLE_EMAIL,
        seed::SAMPLE_PASSWORD
    );
    Ok(())
}

pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap()
    }

    fn context(dir: &tempfile::TempDir) -> Context {
        Context::open(dir.path().to_path_buf(), Config::default(), now()).unwrap()
    }

    #[test]
    fn task_commands_need_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        let err = cmd_add(&mut ctx, "x".into(), None, Priority::Low, None, vec![]).unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::NotLoggedIn)));
    }

    #[test]
    fn register_add_edit_toggle_delete_flow() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        cmd_register(&mut ctx, "Ada", "ada@example.com", "secret1").unwrap();
        assert!(ctx.session_path().exists());

        cmd_add(
            &mut ctx,
            "Write notes".into(),
            None,
            Priority::High,
            Some("tomorrow".into()),
            vec!["Work,Study".into()],
        )
        .unwrap();

        // Reload from disk to check persistence.
        let mut ctx = context(&dir);
        let owner = ctx.require_session().unwrap();
        let task = ctx.db.tasks_for(owner).remove(0);
        assert_eq!(task.categories, vec!["Work", "Study"]);

        cmd_edit(
            &mut ctx, task.id, None, Some("details".into()), false, None, None, None, true,
            vec![], vec!["Home".into()], vec!["Study".into()],
        )
        .unwrap();
        let edited = ctx.db.task(owner, task.id).unwrap().clone();
        assert_eq!(edited.categories, vec!["Work", "Home"]);
        assert_eq!(edited.due_date, None);
        assert_eq!(edited.description.as_deref(), Some("details"));

        cmd_toggle(&mut ctx, task.id).unwrap();
        assert_eq!(ctx.db.task(owner, task.id).unwrap().status, Status::Completed);

        cmd_delete(&mut ctx, task.id).unwrap();
        assert!(ctx.db.tasks_for(owner).is_empty());
    }

    #[test]
    fn empty_edit_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        cmd_register(&mut ctx, "Ada", "ada@example.com", "secret1").unwrap();
        cmd_add(&mut ctx, "t".into(), None, Priority::Low, None, vec![]).unwrap();
        let err = cmd_edit(
            &mut ctx, TaskId(1), None, None, false, None, None, None, false, vec![], vec![], vec![],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));
    }

    #[test]
    fn unknown_category_filter_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        cmd_register(&mut ctx, "Ada", "ada@example.com", "secret1").unwrap();
        let err = cmd_list(&mut ctx, None, PriorityFilter::All, "Nowhere", None, false).unwrap_err();
        assert!(matches!(err, AppError::View(_)));
    }

    #[test]
    fn expired_session_clears_the_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        cmd_register(&mut ctx, "Ada", "ada@example.com", "secret1").unwrap();

        let later = now() + ctx.config.token_ttl() + chrono::Duration::hours(1);
        let mut ctx = Context::open(dir.path().to_path_buf(), Config::default(), later).unwrap();
        let err = ctx.require_session().unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::TokenExpired)));
        assert!(!ctx.session_path().exists());
        assert!(Database::load(&ctx.store_path()).unwrap().sessions.is_empty());
    }

    #[test]
    fn logout_revokes_server_side_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        cmd_register(&mut ctx, "Ada", "ada@example.com", "secret1").unwrap();
        cmd_logout(&mut ctx).unwrap();
        assert!(ctx.db.sessions.is_empty());
        assert!(!ctx.session_path().exists());
    }

    #[test]
    fn profile_preferences_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        cmd_register(&mut ctx, "Ada", "ada@example.com", "secret1").unwrap();
        cmd_profile(
            &mut ctx, None, None, None, None, Some(StatusFilter::Pending), Some(SortKey::Title), Some(false),
        )
        .unwrap();
        let ctx = context(&dir);
        let user = ctx.db.user_by_email("ada@example.com").unwrap();
        assert_eq!(user.preferences.default_view, StatusFilter::Pending);
        assert_eq!(user.preferences.default_sort, SortKey::Title);
        assert!(!user.preferences.task_reminders);
    }

    #[test]
    fn password_flag_skips_the_prompt() {
        assert_eq!(read_password(Some("secret1".into()), "Password: ").unwrap(), "secret1");
    }

    #[test]
    fn password_is_optional_on_the_command_line() {
        use clap::Parser;
        let cli = crate::cli::Cli::try_parse_from(["tt", "login", "ada@example.com"]).unwrap();
        assert!(matches!(cli.command, Commands::Login { password: None, .. }));
        let cli = crate::cli::Cli::try_parse_from(["tt", "profile", "--change-password"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Profile { change_password: true, password: None, .. }
        ));
        assert!(crate::cli::Cli::try_parse_from(["tt", "profile", "--change-password", "--password", "x"]).is_err());
    }

    #[test]
    fn seed_then_login() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        cmd_seed(&mut ctx, false).unwrap();
        cmd_login(&mut ctx, seed::SAMPLE_EMAIL, seed::SAMPLE_PASSWORD).unwrap();
        let owner = ctx.require_session().unwrap();
        assert_eq!(ctx.db.tasks_for(owner).len(), 3);
        cmd_stats(&mut ctx, true).unwrap();
    }
}
