//! Seam for the device-authentication status fetch.
//!
//! The engine consumes acceptance statuses through this trait so that
//! remote doubles are injected per engine instance, never process-wide.

use async_trait::async_trait;
use std::collections::HashMap;

use fleetlink_connector::{ConnectorResult, DeviceId, TenantId};
use fleetlink_devauth::{AuthStatus, DeviceAuthClient};

/// Source of per-device acceptance statuses.
#[async_trait]
pub trait AuthStatusSource: Send + Sync {
    /// Fetch acceptance statuses for `device_ids` within `tenant_id`.
    ///
    /// Devices unknown to the source are absent from the returned map;
    /// the engine treats absence as unauthenticated.
    async fn fetch_statuses(
        &self,
        tenant_id: &TenantId,
        device_ids: &[DeviceId],
    ) -> ConnectorResult<HashMap<DeviceId, AuthStatus>>;
}

#[async_trait]
impl AuthStatusSource for DeviceAuthClient {
    async fn fetch_statuses(
        &self,
        tenant_id: &TenantId,
        device_ids: &[DeviceId],
    ) -> ConnectorResult<HashMap<DeviceId, AuthStatus>> {
        DeviceAuthClient::fetch_statuses(self, tenant_id, device_ids).await
    }
}
