use std::str::FromStr;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::state::LogConfig;

const LOG_FILE_NAME: &str = "timevault.log";

/// Level from the config file; unknown names fall back to `warn`
fn parse_level(name: &str) -> Level {
    Level::from_str(name.trim()).unwrap_or(Level::WARN)
}

/// `RUST_LOG` wins over the configured level
fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the stderr layer, plus a daily rolling file when `log.dir` is set.
/// Keep the returned guards alive until exit or buffered lines are lost.
pub fn init_logging(config: &LogConfig) -> Vec<WorkerGuard> {
    let level = parse_level(&config.level);
    let mut guards = Vec::new();

    // stdout carries command output
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);
    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stderr_writer)
        .with_filter(env_filter(level));

    let file_layer = config.dir.as_ref().map(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Failed to create log directory {:?}: {}", dir, e);
        }
        let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        guards.push(file_guard);
        tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_filter(env_filter(level))
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    register_panic_logger();

    guards
}

/// Registers a panic hook that logs panics using the `tracing` crate
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}

pub fn report_build_info() {
    let build = common::prelude::build_info();

    tracing::info!(
        build_profile = ?build.build_profile,
        features = ?build.build_features,
        version = ?build.version,
        "timevault starting up"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level(" INFO "), Level::INFO);
        assert_eq!(parse_level("chatty"), Level::WARN);
    }
}
