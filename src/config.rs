//! Configuration loading: defaults, then `config.toml`, then environment.
//!
//! The data directory itself is chosen before any file is read: the
//! `--home` flag, else `TT_HOME`, else `~/.tt`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const HOME_ENV_VAR: &str = "TT_HOME";

const TTL_RANGE: (u64, u64) = (1, 8760);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default tracing filter when `TT_LOG` is unset.
    pub log_level: String,
    /// Lifetime of a login token.
    pub token_ttl_hours: u64,
    /// Seed list offered first when picking task categories.
    pub category_suggestions: Vec<String>,

    /// Environment overrides that were rejected. Reported once logging is up.
    #[serde(skip)]
    pub ignored_env: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".into(),
            token_ttl_hours: 720,
            category_suggestions: [
                "Work", "Personal", "Study", "Health", "Finance", "Home", "Shopping", "Family",
                "Travel",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            ignored_env: Vec::new(),
        }
    }
}

impl Config {
    /// Load `<home>/config.toml` with env overrides. A missing file yields
    /// defaults; a malformed one is an error.
    pub fn load(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            debug!(?path, "loading config");
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            config
        } else {
            Config::default()
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(TTL_RANGE.0..=TTL_RANGE.1).contains(&self.token_ttl_hours) {
            return Err(ConfigError::InvalidValue(format!(
                "token_ttl_hours must be between {} and {}, got {}",
                TTL_RANGE.0, TTL_RANGE.1, self.token_ttl_hours
            )));
        }
        if self.category_suggestions.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::InvalidValue(
                "category_suggestions must not contain blank labels".into(),
            ));
        }
        Ok(())
    }

    /// Apply `TT_TOKEN_TTL_HOURS` and `TT_LOG_LEVEL`. Invalid values are
    /// skipped and recorded in `ignored_env`.
    pub fn apply_env_overrides<F>(&mut self, read: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = read("TT_TOKEN_TTL_HOURS") {
            match parse_u64_range(&val, TTL_RANGE.0, TTL_RANGE.1) {
                Some(v) => self.token_ttl_hours = v,
                None => self.ignored_env.push(format!("TT_TOKEN_TTL_HOURS={val}")),
            }
        }
        if let Some(val) = read("TT_LOG_LEVEL").filter(|v| !v.is_empty()) {
            self.log_level = val;
        }
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.token_ttl_hours as i64)
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Resolve the data directory from the flag, `TT_HOME`, or `~/.tt`.
pub fn resolve_home(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Some(dir) = std::env::var_os(HOME_ENV_VAR).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    let home = std::env::var_os("HOME").unwrap_or_else(|| ".".into());
    PathBuf::from(home).join(".tt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut expected = Config::default();
        expected.apply_env_overrides(|name| std::env::var(name).ok());
        assert_eq!(Config::load(dir.path()).unwrap(), expected);
        assert_eq!(Config::default().token_ttl_hours, 720);
        assert_eq!(Config::default().category_suggestions[0], "Work");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "token_ttl_hours = 24\ncategory_suggestions = [\"Errands\"]\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.category_suggestions, vec!["Errands"]);
        assert_eq!(config.log_level, Config::default().log_level);
    }

    #[test]
    fn out_of_range_file_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "token_ttl_hours = 0\n").unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "token_ttl_hours = \"soon\"\n").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn env_overrides_apply_and_bad_values_are_recorded() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[("TT_TOKEN_TTL_HOURS", "48"), ("TT_LOG_LEVEL", "debug")]));
        assert_eq!(config.token_ttl_hours, 48);
        assert_eq!(config.log_level, "debug");

        config.apply_env_overrides(env(&[("TT_TOKEN_TTL_HOURS", "99999")]));
        assert_eq!(config.token_ttl_hours, 48);
        assert_eq!(config.ignored_env, vec!["TT_TOKEN_TTL_HOURS=99999"]);
    }

    #[test]
    fn parse_range_bounds() {
        assert_eq!(parse_u64_range("1", 1, 8760), Some(1));
        assert_eq!(parse_u64_range("8760", 1, 8760), Some(8760));
        assert_eq!(parse_u64_range("8761", 1, 8760), None);
        assert_eq!(parse_u64_range("-3", 1, 8760), None);
    }

    #[test]
    fn explicit_home_wins() {
        let dir = PathBuf::from("/tmp/tt-explicit");
        assert_eq!(resolve_home(Some(dir.clone())), dir);
    }
}
