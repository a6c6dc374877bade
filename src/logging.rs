//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides every other log level source.
pub const LOG_ENV_VAR: &str = "TT_LOG";

/// Build the filter: `TT_LOG` wins, otherwise `level`. An unparseable
/// directive falls back to `warn`.
pub fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber writing compact lines to stderr.
///
/// Call once at startup. Later calls are no-ops.
pub fn init(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}
