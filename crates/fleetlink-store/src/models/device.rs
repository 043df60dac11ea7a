//! Device inventory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetlink_connector::{DeviceId, IntegrationId, TenantId};

/// A locally known device, keyed by `(tenant_id, device_id)`.
///
/// Created by the upstream device-acceptance workflow; the reconciler only
/// reads records and maintains the `integration_ids` association. Records
/// are never deleted by the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub tenant_id: TenantId,
    pub device_id: DeviceId,
    /// Integrations this device is associated with, one per active provider.
    pub integration_ids: Vec<IntegrationId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DeviceRecord {
    /// Create a record associated with the given integrations.
    pub fn new(
        tenant_id: impl Into<TenantId>,
        device_id: impl Into<DeviceId>,
        integration_ids: Vec<IntegrationId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: tenant_id.into(),
            device_id: device_id.into(),
            integration_ids,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the device is associated with `integration_id`.
    #[must_use]
    pub fn has_integration(&self, integration_id: IntegrationId) -> bool {
        self.integration_ids.contains(&integration_id)
    }
}
