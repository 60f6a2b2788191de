//! File logging for embedded hosts.
//!
//! The host usually owns the terminal or window, so logs go to a per-session
//! file only.
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::ClientConfig;

const LOG_FILE: &str = "client.log";

/// Platform-specific log directory.
///
/// - macOS: `~/Library/Caches/combat-client/logs`
/// - Linux: `~/.cache/combat-client/logs` (or `$XDG_CACHE_HOME/combat-client/logs`)
/// - Windows: `%LOCALAPPDATA%\combat-client\cache\logs`
/// - Fallback: `/tmp/combat-client/logs`
pub fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "combat-client")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/tmp/combat-client"))
        .join("logs")
}

/// Installs the global subscriber: `EnvFilter` (default `info`) over a
/// non-blocking file layer in the session's log directory.
///
/// Keep the returned guard alive for as long as logs should be flushed.
pub fn setup_logging(config: &ClientConfig) -> Result<WorkerGuard> {
    let session_id = config.session_id.clone().unwrap_or_else(default_session_id);
    let base = config.log_dir.clone().unwrap_or_else(log_dir);
    let session_dir = prepare_session_dir(&base, &session_id)?;

    let file_appender = tracing_appender::rolling::never(&session_dir, LOG_FILE);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("tracing subscriber already installed")?;

    tracing::info!("Logging initialized: session={}", session_id);
    tracing::info!("Log file: {}", session_dir.join(LOG_FILE).display());

    Ok(guard)
}

/// Creates `<base>/<session_id>` and returns it.
pub fn prepare_session_dir(base: &Path, session_id: &str) -> Result<PathBuf> {
    let dir = base.join(session_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    Ok(dir)
}

fn default_session_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    format!("session_{}", secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_dir_is_created_under_base() {
        let base = tempfile::tempdir().unwrap();
        let dir = prepare_session_dir(base.path(), "session_42").unwrap();

        assert!(dir.is_dir());
        assert_eq!(dir, base.path().join("session_42"));
        // Idempotent.
        prepare_session_dir(base.path(), "session_42").unwrap();
    }

    #[test]
    fn default_session_id_is_timestamped() {
        assert!(default_session_id().starts_with("session_"));
    }

    #[test]
    fn platform_log_dir_ends_in_logs() {
        assert!(log_dir().ends_with("logs"));
    }
}
