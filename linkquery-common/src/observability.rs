//! Shared observability helpers for the binary and integration tests.
//!
//! The logging initializer centralises our `tracing` setup so that every run
//! emits into the same daily rolling file sink, leaving stdout to the
//! program's own output. Call [`init_logging`] once near process start and
//! keep the returned [`LogGuard`] alive until exit: dropping it flushes the
//! buffered events. Additional callers get a guard that owns nothing.
//! When the file sink cannot be set up, [`init_stderr_logging`] is the
//! fallback.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::Utc;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "LINKQUERY_LOG_DIR";

/// Output encoding for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Configuration passed to [`init_logging`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Logical name of the component (used for defaults and file names).
    pub app_name: &'static str,
    /// Optional explicit directory for log output. If `None`, we consult
    /// `LINKQUERY_LOG_DIR` and finally fall back to `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    /// Whether to duplicate events to `stderr` in addition to the file sink.
    pub emit_stderr: bool,
    /// Preferred log encoding.
    pub format: LogFormat,
    /// Default filter applied when `RUST_LOG` is unset.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "linkquery",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Keeps the non-blocking file writer alive. Events still queued are
/// written out when this is dropped, so hold it until the process exits.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug)]
pub struct LogGuard {
    path: PathBuf,
    _worker: Option<WorkerGuard>,
}

impl LogGuard {
    /// Log file for the day the subscriber was installed.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Initialise the global `tracing` subscriber.
///
/// The returned guard carries the concrete log file path for the current
/// day. Subsequent calls are cheap and hand back a guard for the originally
/// resolved location that owns no writer.
pub fn init_logging(config: LogConfig) -> anyhow::Result<LogGuard> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(LogGuard {
            path: path.clone(),
            _worker: None,
        });
    }

    let resolved_dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&resolved_dir)
        .with_context(|| format!("failed to create log directory: {}", resolved_dir.display()))?;

    let log_filename = format!("{}.log", config.app_name);
    // rolling::daily names files by UTC date
    let today = Utc::now().format("%Y-%m-%d").to_string();
    let full_path = resolved_dir.join(format!("{log_filename}.{today}"));

    let appender = rolling::daily(resolved_dir, log_filename);
    let (writer, worker) = tracing_appender::non_blocking(appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    match (config.format, config.emit_stderr) {
        (LogFormat::Text, false) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .try_init()
                .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;
        }
        (LogFormat::Text, true) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;
        }
        (LogFormat::Json, false) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(writer))
                .try_init()
                .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;
        }
        (LogFormat::Json, true) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(writer))
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;
        }
    }

    let _ = LOG_PATH.set(full_path.clone());
    tracing::info!(path = %full_path.display(), "logging.initialised");
    Ok(LogGuard {
        path: full_path,
        _worker: Some(worker),
    })
}

/// Stderr-only subscriber for when the file sink is unavailable.
pub fn init_stderr_logging(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));
    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return expand_home(dir);
    }

    if let Ok(env_dir) = std::env::var(LOG_DIR_ENV) {
        return expand_home(Path::new(&env_dir));
    }

    default_data_dir(app_name)
}

fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

fn default_data_dir(app_name: &str) -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(app_name)
    } else {
        PathBuf::from(".").join(app_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn explicit_dir_wins_over_env() {
        temp_env::with_vars(
            [(LOG_DIR_ENV, Some("/tmp/from-env")), ("HOME", Some("/home/u"))],
            || {
                let dir = resolve_log_dir("linkquery", Some(Path::new("~/logs")));
                assert_eq!(dir, PathBuf::from("/home/u/logs"));
            },
        );
    }

    #[test]
    #[serial]
    fn env_dir_used_when_no_explicit_dir() {
        temp_env::with_var(LOG_DIR_ENV, Some("/tmp/from-env"), || {
            let dir = resolve_log_dir("linkquery", None);
            assert_eq!(dir, PathBuf::from("/tmp/from-env"));
        });
    }

    #[test]
    #[serial]
    fn falls_back_to_local_share() {
        temp_env::with_vars(
            [(LOG_DIR_ENV, None::<&str>), ("HOME", Some("/home/u"))],
            || {
                let dir = resolve_log_dir("linkquery", None);
                assert_eq!(dir, PathBuf::from("/home/u/.local/share/linkquery"));
            },
        );
    }

    #[test]
    fn unusable_log_dir_is_an_error() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let err = init_logging(LogConfig {
            log_dir: Some(blocker.path().join("logs")),
            ..LogConfig::default()
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("failed to create log directory"));
        assert!(LOG_PATH.get().is_none());
    }

    #[test]
    fn non_home_paths_are_untouched() {
        assert_eq!(
            expand_home(Path::new("/var/log/linkquery")),
            PathBuf::from("/var/log/linkquery")
        );
    }
}
