//! Logging setup using `tracing` + `tracing-subscriber`
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `--verbose` (debug)
//! 3. `TASKDEPS_LOG` environment variable (e.g. "info", "debug")
//! 4. `log_level` in the project config
//! 5. default to `warn`
//!
//! Logs go to stderr so JSON on stdout stays machine-readable.

use std::io::IsTerminal;

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Initialise the global logging subscriber
///
/// A second call is a no-op: the first subscriber stays installed.
pub fn init_logging(
    cli_level: Option<LogLevel>,
    verbose: bool,
    config_level: Option<&str>,
) -> Result<()> {
    let level = resolve_level(
        cli_level,
        verbose,
        std::env::var("TASKDEPS_LOG").ok().as_deref(),
        config_level,
    );

    let _ = fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();

    Ok(())
}

fn resolve_level(
    cli_level: Option<LogLevel>,
    verbose: bool,
    env_level: Option<&str>,
    config_level: Option<&str>,
) -> tracing::Level {
    if let Some(lvl) = cli_level {
        return level_from_log_level(lvl);
    }
    if verbose {
        return tracing::Level::DEBUG;
    }
    env_level
        .and_then(parse_level_str)
        .or_else(|| config_level.and_then(parse_level_str))
        .unwrap_or(tracing::Level::WARN)
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

/// Parses a level name, case-insensitively
pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn parses_level_names() {
        assert_eq!(parse_level_str("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level_str(" warning "), Some(Level::WARN));
        assert_eq!(parse_level_str("loud"), None);
    }

    #[test]
    fn flag_beats_everything() {
        let level = resolve_level(Some(LogLevel::Error), true, Some("trace"), Some("info"));
        assert_eq!(level, Level::ERROR);
    }

    #[test]
    fn verbose_means_debug() {
        assert_eq!(resolve_level(None, true, Some("error"), None), Level::DEBUG);
    }

    #[test]
    fn env_beats_config() {
        assert_eq!(resolve_level(None, false, Some("info"), Some("trace")), Level::INFO);
    }

    #[test]
    fn unparseable_env_falls_through_to_config() {
        assert_eq!(resolve_level(None, false, Some("loud"), Some("trace")), Level::TRACE);
    }

    #[test]
    fn defaults_to_warn() {
        assert_eq!(resolve_level(None, false, None, None), Level::WARN);
    }
}
