//! Host configuration structures and loaders.
use std::env;
use std::path::PathBuf;

use client_core::EngineConfig;

/// Configuration required to bootstrap an encounter client.
#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    pub engine: EngineConfig,
    /// Session identifier used to name the log directory.
    pub session_id: Option<String>,
    /// Overrides the platform log directory.
    pub log_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub const fn new(engine: EngineConfig) -> Self {
        Self {
            engine,
            session_id: None,
            log_dir: None,
        }
    }

    /// Loads a `.env` file if one exists, then reads the environment.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_env()
    }

    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `COMBAT_SESSION_ID` - Session identifier for log files (default: timestamp)
    /// - `COMBAT_LOG_DIR` - Log directory (default: platform cache dir)
    /// - every `COMBAT_*` variable read by [`EngineConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            engine: EngineConfig::from_env(),
            session_id: env::var("COMBAT_SESSION_ID").ok().filter(|id| !id.is_empty()),
            log_dir: env::var_os("COMBAT_LOG_DIR").map(PathBuf::from),
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}
