//! Capability-based trait definitions for hub connectors.
//!
//! Each provider integration implements the subset of twin operations its
//! API supports. The reconciliation engine requires the full set (see
//! [`TwinSync`]); read-only consumers can depend on [`TwinQueryOp`] alone.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::ConnectorResult;
use crate::ids::DeviceId;
use crate::types::{Provider, TwinStatus};

/// Base trait for all hub connectors.
#[async_trait]
pub trait HubConnector: Send + Sync {
    /// The provider this connector talks to.
    fn provider(&self) -> Provider;

    /// Display name for this connector instance.
    fn display_name(&self) -> &str;

    /// Test the connection to the hub.
    ///
    /// Returns `Ok(())` if the hub is reachable with the configured
    /// credentials.
    async fn test_connection(&self) -> ConnectorResult<()>;
}

/// Capability for querying device twins in bulk.
#[async_trait]
pub trait TwinQueryOp: HubConnector {
    /// Fetch the twin status for each of `device_ids`.
    ///
    /// Devices without a twin at the hub are absent from the returned map.
    /// Implementations must issue a bounded number of remote requests per
    /// call (one query plus continuation pages), not one per device.
    async fn query_twins(
        &self,
        device_ids: &[DeviceId],
    ) -> ConnectorResult<HashMap<DeviceId, TwinStatus>>;
}

/// Capability for creating device twins.
#[async_trait]
pub trait TwinCreateOp: HubConnector {
    /// Create a twin for `device_id` with the given status.
    ///
    /// Must be idempotent: creating a twin that already exists updates it
    /// in place and never duplicates or errors destructively.
    async fn create_twin(&self, device_id: &DeviceId, status: TwinStatus) -> ConnectorResult<()>;
}

/// Capability for updating the status of existing twins.
#[async_trait]
pub trait TwinUpdateOp: HubConnector {
    /// Set the twin status for `device_id`.
    async fn set_twin_status(
        &self,
        device_id: &DeviceId,
        status: TwinStatus,
    ) -> ConnectorResult<()>;
}

/// Capability for deleting device twins.
#[async_trait]
pub trait TwinDeleteOp: HubConnector {
    /// Delete the twin for `device_id`.
    ///
    /// Must be idempotent: deleting an absent twin succeeds.
    async fn delete_twin(&self, device_id: &DeviceId) -> ConnectorResult<()>;
}

/// Marker trait for connectors supporting the full twin-synchronization
/// capability set.
pub trait TwinSync: TwinQueryOp + TwinCreateOp + TwinUpdateOp + TwinDeleteOp {}

// Blanket implementation for any connector implementing all twin ops.
impl<T> TwinSync for T where T: TwinQueryOp + TwinCreateOp + TwinUpdateOp + TwinDeleteOp {}
