use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_rolling_file::{RollingConditionBase, RollingFileAppender};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use crate::config::LoggingConfig;

/// Guard wrapper that ensures logs are flushed on drop
pub struct LogGuard(Option<WorkerGuard>);

impl Drop for LogGuard {
    fn drop(&mut self) {
        if let Some(guard) = self.0.take() {
            drop(guard);
            std::thread::sleep(std::time::Duration::from_millis(200));
        }
    }
}

/// Map a configured level name onto a tracing level, defaulting to INFO
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging to the terminal and optionally to a size-rotated file.
///
/// Terminal output goes to stderr so it does not interleave with the
/// interactive console on stdout. `verbose` forces DEBUG regardless of the
/// configured level. The returned guard must be kept alive for the duration
/// of the program.
pub fn init_logging(
    config: Option<&LoggingConfig>,
    verbose: bool,
) -> Result<LogGuard, anyhow::Error> {
    let level = match (verbose, config) {
        (true, _) => Level::DEBUG,
        (false, Some(config)) => parse_level(&config.level),
        (false, None) => Level::INFO,
    };

    let config = match config {
        Some(config) => config,
        None => {
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_ansi(true)
                        .with_filter(tracing_subscriber::filter::LevelFilter::from_level(level)),
                )
                .init();

            return Ok(LogGuard(None));
        }
    };

    if let Some(parent) = Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file_appender = RollingFileAppender::new(
        &config.path,
        RollingConditionBase::new().max_size(config.size * 1024 * 1024),
        config.max_files,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create rolling file appender: {}", e))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true)
                .with_filter(tracing_subscriber::filter::LevelFilter::from_level(level)),
        )
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(tracing_subscriber::filter::LevelFilter::from_level(level)),
        )
        .init();

    Ok(LogGuard(Some(guard)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_case_insensitive() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("Warning"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(parse_level("chatty"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }
}
