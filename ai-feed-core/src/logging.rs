//! Logging for ai-feed
//!
//! Two sinks: compact records on stderr, and a daily-rotated file under
//! `$XDG_STATE_HOME/ai-feed/` (~/.local/state/ai-feed/). Stdout is reserved
//! for command output such as check reports and printed recommendations.
//!
//! The level comes from, in order: `RUST_LOG`, `--verbose` (debug), then
//! `logging.level` in `config.yml`.

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

/// Prefix of the rotated log files; rotation appends the date.
pub const LOG_FILE_PREFIX: &str = "ai-feed.log";

/// Install the global subscriber, logging to the XDG state directory.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<LoggingGuard> {
    init_in(&Config::state_dir(), config, verbose)
}

/// Install the global subscriber, logging to files under `log_dir`.
pub fn init_in(log_dir: &Path, config: &LoggingConfig, verbose: bool) -> Result<LoggingGuard> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        Error::Config(format!(
            "failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let directive = filter_directive(config, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .map_err(|e| Error::Config(format!("failed to initialize logging: {}", e)))?;

    tracing::debug!(dir = %log_dir.display(), level = directive, "Logging ready");

    Ok(LoggingGuard {
        log_dir: log_dir.to_path_buf(),
        _worker: worker,
    })
}

fn filter_directive(config: &LoggingConfig, verbose: bool) -> &str {
    if verbose {
        "debug"
    } else {
        config.level.trim()
    }
}

/// Route logs to the test harness. Safe to call from every test.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Run `f` with every event it emits recorded as plain text.
#[cfg(test)]
pub(crate) fn capture<T>(f: impl FnOnce() -> T) -> (T, String) {
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let buffer = Buffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let out = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (out, text)
}

/// Keeps the file writer alive; pending records are flushed on drop.
pub struct LoggingGuard {
    log_dir: PathBuf,
    _worker: WorkerGuard,
}

impl LoggingGuard {
    /// Directory the rotated log files are written to.
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_config_level() {
        let config = LoggingConfig {
            level: "warn".to_string(),
        };
        assert_eq!(filter_directive(&config, false), "warn");
        assert_eq!(filter_directive(&config, true), "debug");
    }

    #[test]
    fn test_config_level_is_trimmed() {
        let config = LoggingConfig {
            level: " info\n".to_string(),
        };
        assert_eq!(filter_directive(&config, false), "info");
    }

    #[test]
    fn test_state_dir_holds_logs() {
        assert!(Config::state_dir().ends_with("ai-feed"));
    }
}
