//! CLI error types and exit codes.
//!
//! Exit codes:
//! - 0: full success
//! - 1: one or more per-device action failures
//! - 2: at least one tenant run aborted
//! - 3: fatal error (configuration, inventory store, setup)
//!
//! Codes 0-2 come from the sync report; errors of this type always map
//! to 3.

use thiserror::Error;

use fleetlink_connector::ConnectorError;
use fleetlink_sync::SyncError;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Client setup error: {0}")]
    Client(#[from] ConnectorError),

    #[error("Sync failed: {0}")]
    Sync(#[from] SyncError),
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        fleetlink_sync::report::EXIT_FATAL
    }

    pub fn print(&self) {
        eprintln!("Error: {self}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_exit_3() {
        assert_eq!(CliError::Config("missing".into()).exit_code(), 3);
        assert_eq!(CliError::Database("down".into()).exit_code(), 3);
    }
}
