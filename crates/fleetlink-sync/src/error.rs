//! Engine error types.

use thiserror::Error;

use fleetlink_connector::ConnectorError;
use fleetlink_store::StoreError;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a reconciliation run.
///
/// Per-device action failures and tenant-level aborts are not represented
/// here: they are collected into the [`crate::SyncReport`] and the run
/// continues. An error of this type means the run itself could not
/// proceed (inventory store unreachable, invalid configuration).
#[derive(Debug, Error)]
pub enum SyncError {
    /// Inventory store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Remote system failure escalated to run level.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Invalid engine configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}
