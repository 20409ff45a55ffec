use crate::cli::LogLevel;
use anyhow::{Context, anyhow};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_NAME: &str = "lcsx.log";

/// `~/.lcsx/logs`
pub fn default_log_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot locate the home directory"))?;
    Ok(home.join(".lcsx").join("logs"))
}

/// Initialize file logging.
///
/// Without `log_file`, logs go to `~/.lcsx/logs/lcsx.log` with daily
/// rotation. `RUST_LOG` overrides `level`. The returned guard flushes the
/// background writer when dropped and must be held until exit.
pub fn init(level: LogLevel, log_file: Option<&Path>) -> anyhow::Result<WorkerGuard> {
    let file_appender = match log_file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            tracing_appender::rolling::never(dir, name)
        }
        None => {
            let dir = default_log_dir()?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            tracing_appender::rolling::daily(dir, LOG_FILE_NAME)
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_filter()))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(guard)
}

fn split_log_path(path: &Path) -> anyhow::Result<(PathBuf, PathBuf)> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, PathBuf::from(name)))
}
