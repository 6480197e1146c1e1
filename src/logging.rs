//! Logging configuration using tracing
//!
//! The TUI owns the terminal, so it logs to a daily rolling file. CLI
//! subcommands log to stderr. Both honour RUST_LOG.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "cyberfolio.log";

/// Where log output goes
#[derive(Debug, Clone)]
pub enum LogTarget {
  Stderr,
  /// Daily rolling files in the given directory
  File(PathBuf),
}

impl LogTarget {
  fn default_filter(&self) -> &'static str {
    match self {
      Self::Stderr => "warn",
      Self::File(_) => "info",
    }
  }
}

/// Default log directory: `$XDG_DATA_HOME/cyberfolio/logs`
pub fn default_log_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;
  Ok(data_dir.join("cyberfolio").join("logs"))
}

/// Initialize the tracing subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init(target: LogTarget) -> Result<Option<WorkerGuard>> {
  let env_filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(target.default_filter()));

  match target {
    LogTarget::Stderr => {
      tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
      Ok(None)
    }
    LogTarget::File(dir) => {
      let (writer, guard) = file_writer(&dir)?;
      tracing_subscriber::registry()
        .with(env_filter)
        .with(
          fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true),
        )
        .try_init()
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;
      tracing::info!(dir = %dir.display(), "Logging to file");
      Ok(Some(guard))
    }
  }
}

fn file_writer(dir: &Path) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
  let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
  Ok(tracing_appender::non_blocking(appender))
}
