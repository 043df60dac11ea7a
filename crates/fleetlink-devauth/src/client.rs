//! HTTP client for the device-authentication internal API.

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use fleetlink_connector::{ConnectorError, ConnectorResult, DeviceId, TenantId};

use crate::status::AuthStatus;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`DeviceAuthClient`].
#[derive(Debug, Clone)]
pub struct DeviceAuthConfig {
    /// Base URL of the device-authentication service.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl DeviceAuthConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }
}

/// Per-device status row returned by the service.
#[derive(Debug, Deserialize)]
struct DeviceStatusRow {
    id: String,
    status: AuthStatus,
}

/// Client for the device-authentication service.
#[derive(Debug, Clone)]
pub struct DeviceAuthClient {
    base_url: String,
    timeout_secs: u64,
    client: Client,
}

impl DeviceAuthClient {
    pub fn new(config: DeviceAuthConfig) -> ConnectorResult<Self> {
        if config.base_url.is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "device-authentication base URL is required",
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout_secs,
            client,
        })
    }

    /// Fetch acceptance statuses for `device_ids` within `tenant_id`.
    ///
    /// One request per call. Devices the service does not know are absent
    /// from the returned map; callers decide what absence means.
    pub async fn fetch_statuses(
        &self,
        tenant_id: &TenantId,
        device_ids: &[DeviceId],
    ) -> ConnectorResult<HashMap<DeviceId, AuthStatus>> {
        if device_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let url = format!(
            "{}/api/internal/v1/devauth/tenants/{}/devices/status",
            self.base_url, tenant_id
        );
        let ids: Vec<&str> = device_ids.iter().map(DeviceId::as_str).collect();

        let rsp = self
            .client
            .post(&url)
            .json(&ids)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ConnectorError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    ConnectorError::unavailable_with_source("device-authentication request failed", e)
                }
            })?;

        match rsp.status() {
            s if s.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ConnectorError::AuthRejected {
                    message: format!("device-authentication rejected tenant {tenant_id}"),
                })
            }
            s => {
                return Err(ConnectorError::from_status(
                    s.as_u16(),
                    "device-authentication status query",
                ))
            }
        }

        let rows: Vec<DeviceStatusRow> = rsp.json().await.map_err(|e| {
            ConnectorError::Serialization {
                message: format!("device-authentication response: {e}"),
            }
        })?;
        debug!(
            tenant_id = %tenant_id,
            requested = device_ids.len(),
            returned = rows.len(),
            "fetched device acceptance statuses"
        );

        Ok(rows
            .into_iter()
            .map(|row| (DeviceId::from(row.id), row.status))
            .collect())
    }
}
