//! # tt - personal task tracker
//!
//! A command-line task tracker with per-user accounts, filtered and sorted
//! task views, completion statistics and an optional terminal dashboard.
//!
//! ## Key Features
//!
//! - **Accounts and sessions**: register, log in, and every task command runs
//!   as the logged-in user against only that user's tasks
//! - **Views**: filter by status, priority and category; sort by due date,
//!   priority, title or creation time; the same derivation drives the CLI
//!   and the dashboard
//! - **Statistics**: completion percentage, per-priority counts, due-soon
//!   (next 3 days) and overdue counts
//! - **Reminders**: overdue and due-soon tasks listed after `tt list`
//! - **Local storage**: a single JSON document store in `~/.tt/`
//!
//! ## Quick Start
//!
//! ```bash
//! tt register "Ada" ada@example.com          # prompts for a password
//! tt add "Write report" --priority high --due friday --category Work
//! tt list --status pending --sort priority
//! tt ui
//! ```
//!
//! `tt seed` creates a sample account (`test@example.com` / `password123`).
//! Set `TT_LOG=debug` to see what the store and view layers are doing.

use chrono::Utc;
use clap::Parser;
use tracing::warn;

pub mod auth;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod fields;
pub mod logging;
pub mod seed;
pub mod task;
pub mod view;
pub mod tui {
    pub mod app;
    pub mod colors;
    pub mod enums;
    pub mod input;
    pub mod run;
    pub mod task_form;
    pub mod utils;
}

use cli::Cli;
use cmd::*;
use config::{resolve_home, Config};
use error::AppError;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    if let Commands::Completions { shell } = &cli.command {
        cmd_completions(*shell);
        return Ok(());
    }

    let home = resolve_home(cli.home);
    let config = Config::load(&home)?;
    logging::init(&config.log_level);
    for ignored in &config.ignored_env {
        warn!(value = %ignored, "invalid environment override, ignoring");
    }

    let ctx = Context::open(home, config, Utc::now())?;
    dispatch(ctx, cli.command)
}
