//! Composition root for hosts embedding the encounter engine.
//!
//! Loads configuration, installs logging and assembles an
//! [`client_core::EncounterEngine`] from the collaborators a host provides.
pub mod builder;
pub mod config;
pub mod logging;

pub use builder::EncounterBuilder;
pub use config::ClientConfig;
pub use logging::{log_dir, setup_logging};
