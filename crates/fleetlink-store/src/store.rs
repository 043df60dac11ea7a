//! The `DeviceStore` trait and its Postgres implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use fleetlink_connector::{Credentials, DeviceId, IntegrationId, Provider, TenantId};

use crate::error::{StoreError, StoreResult};
use crate::models::{DeviceRecord, Integration};

/// A keyset page of results, ordered by device id.
///
/// Cursor-based rather than offset-based: the reconciler removes
/// integration associations while paging, which would shift offsets under
/// its feet. A `device_id > after` cursor stays stable under such
/// removals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Return devices strictly after this id; `None` starts at the
    /// beginning.
    pub after: Option<DeviceId>,
    pub limit: u64,
}

impl Page {
    /// The first page.
    #[must_use]
    pub fn first(limit: u64) -> Self {
        Self { after: None, limit }
    }

    /// The page following the given last-seen device id.
    #[must_use]
    pub fn after(last: DeviceId, limit: u64) -> Self {
        Self {
            after: Some(last),
            limit,
        }
    }
}

/// Read/update access to the local device inventory.
///
/// No deletion operation is exposed: the reconciler prunes devices at
/// provider hubs, never locally.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// List devices of a tenant in stable `device_id` order, optionally
    /// restricted to devices associated with one integration.
    async fn list_devices(
        &self,
        tenant_id: &TenantId,
        integration_id: Option<IntegrationId>,
        page: Page,
    ) -> StoreResult<Vec<DeviceRecord>>;

    /// Replace the integration-id associations of a device.
    async fn update_integration_ids(
        &self,
        tenant_id: &TenantId,
        device_id: &DeviceId,
        integration_ids: &[IntegrationId],
    ) -> StoreResult<()>;

    /// All integrations configured for a tenant.
    ///
    /// Integrations are created by the management registration endpoint,
    /// which is not part of this subsystem; the reconciler only resolves
    /// them.
    async fn get_integrations(&self, tenant_id: &TenantId) -> StoreResult<Vec<Integration>>;

    /// Distinct tenants present in the device inventory.
    async fn list_tenants(&self) -> StoreResult<Vec<TenantId>>;

    /// Connectivity check.
    async fn ping(&self) -> StoreResult<()>;
}

/// Postgres-backed [`DeviceStore`].
#[derive(Debug, Clone)]
pub struct PgDeviceStore {
    pool: PgPool,
}

impl PgDeviceStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    tenant_id: String,
    device_id: String,
    integration_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DeviceRow> for DeviceRecord {
    fn from(row: DeviceRow) -> Self {
        DeviceRecord {
            tenant_id: TenantId::from(row.tenant_id),
            device_id: DeviceId::from(row.device_id),
            integration_ids: row
                .integration_ids
                .into_iter()
                .map(IntegrationId::from_uuid)
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IntegrationRow {
    id: Uuid,
    tenant_id: String,
    provider: String,
    credentials: serde_json::Value,
}

impl IntegrationRow {
    fn into_model(self) -> StoreResult<Integration> {
        let provider: Provider = self
            .provider
            .parse()
            .map_err(|_| StoreError::Serialization(format!("unknown provider: {}", self.provider)))?;
        let credentials: Credentials = serde_json::from_value(self.credentials)
            .map_err(|e| StoreError::Serialization(format!("integration credentials: {e}")))?;
        Ok(Integration {
            id: IntegrationId::from_uuid(self.id),
            tenant_id: TenantId::from(self.tenant_id),
            provider,
            credentials,
        })
    }
}

#[async_trait]
impl DeviceStore for PgDeviceStore {
    async fn list_devices(
        &self,
        tenant_id: &TenantId,
        integration_id: Option<IntegrationId>,
        page: Page,
    ) -> StoreResult<Vec<DeviceRecord>> {
        let rows: Vec<DeviceRow> = sqlx::query_as(
            r"
            SELECT tenant_id, device_id, integration_ids, created_at, updated_at
            FROM devices
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR $2 = ANY(integration_ids))
              AND ($3::text IS NULL OR device_id > $3)
            ORDER BY device_id
            LIMIT $4
            ",
        )
        .bind(tenant_id.as_str())
        .bind(integration_id.as_ref().map(IntegrationId::as_uuid))
        .bind(page.after.as_ref().map(DeviceId::as_str))
        .bind(page.limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DeviceRecord::from).collect())
    }

    async fn update_integration_ids(
        &self,
        tenant_id: &TenantId,
        device_id: &DeviceId,
        integration_ids: &[IntegrationId],
    ) -> StoreResult<()> {
        let ids: Vec<Uuid> = integration_ids.iter().map(|id| id.as_uuid()).collect();
        let result = sqlx::query(
            r"
            UPDATE devices
            SET integration_ids = $3, updated_at = NOW()
            WHERE tenant_id = $1 AND device_id = $2
            ",
        )
        .bind(tenant_id.as_str())
        .bind(device_id.as_str())
        .bind(&ids)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "device {device_id} in tenant {tenant_id}"
            )));
        }
        Ok(())
    }

    async fn get_integrations(&self, tenant_id: &TenantId) -> StoreResult<Vec<Integration>> {
        let rows: Vec<IntegrationRow> = sqlx::query_as(
            r"
            SELECT id, tenant_id, provider, credentials
            FROM integrations
            WHERE tenant_id = $1
            ORDER BY created_at, id
            ",
        )
        .bind(tenant_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(IntegrationRow::into_model).collect()
    }

    async fn list_tenants(&self) -> StoreResult<Vec<TenantId>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT tenant_id FROM devices ORDER BY tenant_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(t,)| TenantId::from(t)).collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_cursor() {
        let page = Page::first(100);
        assert_eq!(page.after, None);
        let next = Page::after(DeviceId::from("dev-x"), 100);
        assert_eq!(next.after.as_ref().map(DeviceId::as_str), Some("dev-x"));
        assert_eq!(next.limit, 100);
    }

    #[test]
    fn test_integration_row_into_model() {
        let row = IntegrationRow {
            id: Uuid::new_v4(),
            tenant_id: "TestSync01".into(),
            provider: "iot-hub".into(),
            credentials: serde_json::json!({
                "type": "sas",
                "connection_string":
                    "HostName=hub.azure-devices.net;SharedAccessKeyName=sync;SharedAccessKey=c2VjcmV0",
            }),
        };
        let integration = row.into_model().unwrap();
        assert_eq!(integration.provider, Provider::IotHub);
    }

    #[test]
    fn test_integration_row_rejects_unknown_provider() {
        let row = IntegrationRow {
            id: Uuid::new_v4(),
            tenant_id: "TestSync01".into(),
            provider: "iot-core".into(),
            credentials: serde_json::json!({}),
        };
        assert!(matches!(
            row.into_model(),
            Err(StoreError::Serialization(_))
        ));
    }
}
