use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Personal task tracker with accounts, filtered views and a dashboard.
/// Data lives in ~/.tt unless --home or TT_HOME says otherwise.
#[derive(Parser)]
#[command(name = "tt", version, about = "Personal task tracker")]
pub struct Cli {
    /// Data directory holding store.json, session.json and config.toml.
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn list_flags_parse() {
        let cli = Cli::try_parse_from([
            "tt", "--home", "/tmp/x", "list", "--status", "pending", "--sort", "created-at", "--json",
        ])
        .unwrap();
        assert_eq!(cli.home, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Commands::List { json: true, .. }));
    }

    #[test]
    fn unknown_sort_key_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["tt", "list", "--sort", "size"]).is_err());
    }
}
